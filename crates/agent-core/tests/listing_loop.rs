use std::sync::{Arc, Mutex};

use action_primitives::{Action, ActionError, ImageFetcher, Pacing};
use agent_core::{
    AgentLoopConfig, ListingAgent, ListingPayload, MarketplaceProfile, PlanRequest, PlanResponse,
    Planner, PlannerError, RunEvent, RunEventKind, RunNotifier, RunStatus,
};
use async_trait::async_trait;
use cdp_adapter::{
    fake::{DomCall, FakeDom, FakeElement},
    FilePayload,
};

const CREATE_URL: &str = "https://poshmark.com/create-listing";

type Script = Box<dyn Fn(&PlanRequest, usize) -> Result<PlanResponse, PlannerError> + Send + Sync>;

/// Planner answering from a closure and keeping every request it saw.
struct ScriptedPlanner {
    requests: Mutex<Vec<PlanRequest>>,
    script: Script,
}

impl ScriptedPlanner {
    fn new(
        script: impl Fn(&PlanRequest, usize) -> Result<PlanResponse, PlannerError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            script: Box::new(script),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> PlanRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, request: &PlanRequest) -> Result<PlanResponse, PlannerError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };
        (self.script)(request, index)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<RunEvent>>,
}

#[async_trait]
impl RunNotifier for RecordingNotifier {
    async fn notify(&self, event: RunEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct StubFetcher;

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FilePayload, ActionError> {
        match url.strip_prefix("https://img.test/") {
            Some(name) => Ok(FilePayload {
                name: name.to_string(),
                mime: "image/jpeg".to_string(),
                bytes: vec![0xFF, 0xD8],
            }),
            None => Err(ActionError::Fetch(format!("unreachable: {url}"))),
        }
    }
}

fn listing() -> ListingPayload {
    ListingPayload {
        title: "Levi's denim jacket".to_string(),
        description: "Classic trucker jacket, barely worn.".to_string(),
        price: Some(25.0),
        size: Some("S".to_string()),
        ..ListingPayload::default()
    }
}

fn agent(
    dom: &FakeDom,
    planner: Arc<ScriptedPlanner>,
    config: AgentLoopConfig,
    notifier: Arc<RecordingNotifier>,
) -> ListingAgent {
    ListingAgent::builder(
        Arc::new(dom.clone()),
        planner,
        MarketplaceProfile::poshmark(),
    )
    .config(config)
    .pacing(Pacing::instant())
    .fetcher(Arc::new(StubFetcher))
    .notifier(notifier)
    .build()
    .unwrap()
}

fn done() -> Result<PlanResponse, PlannerError> {
    Ok(PlanResponse::with_actions(vec![Action::done()]))
}

fn set_value_count(dom: &FakeDom, selector: &str, value: &str) -> usize {
    let target = dom.find(selector).unwrap();
    dom.calls()
        .into_iter()
        .filter(|call| {
            matches!(call, DomCall::SetValue { handle, value: v } if *handle == target && v == value)
        })
        .count()
}

#[tokio::test]
async fn test_click_then_done_succeeds() {
    let dom = FakeDom::new(CREATE_URL);
    let next = dom.add(FakeElement::new("button").id("next").text("Next"));
    let planner = ScriptedPlanner::new(|_, _| {
        Ok(PlanResponse::with_actions(vec![
            Action::click("#next"),
            Action::done(),
        ]))
    });
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = agent(&dom, planner.clone(), AgentLoopConfig::instant(), notifier.clone())
        .run(&listing())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(outcome.url.as_deref(), Some(CREATE_URL));
    assert_eq!(outcome.iterations, 1);
    assert!(dom.was_clicked(next));
    assert_eq!(planner.calls(), 1);

    let events = notifier.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, RunEventKind::RunSucceeded);
    assert_eq!(events[0].marketplace, "poshmark");
    assert_eq!(events[0].listing.title, "Levi's denim jacket");
}

#[tokio::test]
async fn test_each_action_is_recorded_before_the_next_round() {
    let dom = FakeDom::new(CREATE_URL);
    dom.add(FakeElement::new("input").attr("name", "title").id("title"));
    let planner = ScriptedPlanner::new(|request, call| match call {
        0 => {
            assert_eq!(request.current_step, "filling");
            assert_eq!(request.marketplace, "poshmark");
            Ok(PlanResponse::with_actions(vec![
                Action::type_text("#title", "Jacket").with_description("fill the title"),
                Action::click("#publish").with_description("click next"),
            ]))
        }
        _ => done(),
    });

    let outcome = agent(
        &dom,
        planner.clone(),
        AgentLoopConfig::instant(),
        Arc::new(RecordingNotifier::default()),
    )
    .run(&listing())
    .await;
    assert!(outcome.success);

    let second = planner.request(1);
    let log: Vec<(String, bool)> = second
        .previous_actions
        .iter()
        .map(|record| (record.action.kind().to_string(), record.success))
        .collect();
    assert_eq!(
        log,
        vec![("type".to_string(), true), ("click".to_string(), false)]
    );
    assert!(second.previous_actions[1].error.is_some());
    assert_eq!(second.current_step, "submit");
}

#[tokio::test]
async fn test_stuck_size_error_runs_recovery_before_replanning() {
    let dom = FakeDom::new(CREATE_URL);
    dom.add(
        FakeElement::new("div")
            .class("error-message")
            .text("Size is required"),
    );
    dom.add(FakeElement::new("select").attr("name", "size").id("size").children([
        FakeElement::new("option").attr("value", "").text("Select size"),
        FakeElement::new("option").attr("value", "S").text("S"),
        FakeElement::new("option").attr("value", "M").text("M"),
    ]));
    let size = dom.find("#size").unwrap();

    let seen_sizes = Arc::new(Mutex::new(Vec::new()));
    let planner = {
        let dom = dom.clone();
        let seen_sizes = seen_sizes.clone();
        ScriptedPlanner::new(move |_, call| {
            seen_sizes
                .lock()
                .unwrap()
                .push(dom.value_of(size).unwrap_or_default());
            if call < 3 {
                Ok(PlanResponse::with_actions(vec![Action::wait(0)]))
            } else {
                done()
            }
        })
    };

    let outcome = agent(
        &dom,
        planner.clone(),
        AgentLoopConfig::instant(),
        Arc::new(RecordingNotifier::default()),
    )
    .run(&listing())
    .await;

    assert!(outcome.success);
    // Three planning rounds on an unchanged page, one recovery round, then the final plan.
    assert_eq!(planner.calls(), 4);
    assert_eq!(outcome.iterations, 5);
    assert_eq!(*seen_sizes.lock().unwrap(), vec!["", "", "", "S"]);

    let recovery = planner.request(3).previous_actions;
    let last = recovery.last().unwrap();
    assert_eq!(last.action.kind(), "select");
    assert!(last.success);
}

#[tokio::test]
async fn test_failed_upload_is_not_fatal() {
    let dom = FakeDom::new(CREATE_URL);
    dom.add(FakeElement::new("input").attr("type", "file").hidden());
    let planner = ScriptedPlanner::new(|_, _| done());

    let mut payload = listing();
    payload.images = vec!["bad-url".to_string()];
    let outcome = agent(
        &dom,
        planner.clone(),
        AgentLoopConfig::instant(),
        Arc::new(RecordingNotifier::default()),
    )
    .run(&payload)
    .await;

    assert!(outcome.success);
    let first = planner.request(0);
    assert_eq!(first.previous_actions.len(), 1);
    assert_eq!(first.previous_actions[0].action.kind(), "upload");
    assert!(!first.previous_actions[0].success);
    assert!(!dom
        .calls()
        .iter()
        .any(|call| matches!(call, DomCall::SetFiles { .. })));
}

#[tokio::test]
async fn test_upload_phase_injects_images_and_closes_crop_dialogs() {
    let dom = FakeDom::new(CREATE_URL);
    let input = dom.add(FakeElement::new("input").attr("type", "file").hidden());
    let crop = dom.add(FakeElement::new("div").attr("role", "dialog").children([
        FakeElement::new("p").text("Crop your photo"),
        FakeElement::new("button").id("crop-apply").class("btn-primary").text("Apply"),
    ]));
    let apply = dom.find("#crop-apply").unwrap();
    dom.on_click(apply, move |page| page.remove(crop));
    let planner = ScriptedPlanner::new(|_, _| done());

    let mut payload = listing();
    payload.images = vec![
        "https://img.test/front.jpg".to_string(),
        "https://img.test/back.jpg".to_string(),
    ];
    let outcome = agent(
        &dom,
        planner.clone(),
        AgentLoopConfig::instant(),
        Arc::new(RecordingNotifier::default()),
    )
    .run(&payload)
    .await;

    assert!(outcome.success);
    let uploaded = dom.calls().into_iter().find_map(|call| match call {
        DomCall::SetFiles { handle, names } if handle == input => Some(names),
        _ => None,
    });
    assert_eq!(
        uploaded,
        Some(vec!["01-front.jpg".to_string(), "02-back.jpg".to_string()])
    );
    assert!(dom.was_clicked(apply));
    assert!(planner.request(0).page_context.modals.is_empty());
}

#[tokio::test]
async fn test_unreachable_planner_escalates_to_direct_fill() {
    let dom = FakeDom::new(CREATE_URL);
    dom.add(FakeElement::new("input").attr("name", "title").id("title"));
    dom.add(FakeElement::new("textarea").attr("name", "description").id("description"));
    dom.add(FakeElement::new("input").attr("name", "price").id("price"));
    dom.add(
        FakeElement::new("select")
            .attr("name", "condition")
            .id("condition")
            .children([
                FakeElement::new("option").attr("value", "").text("Select condition"),
                FakeElement::new("option").attr("value", "nwt").text("NWT"),
                FakeElement::new("option").attr("value", "nwot").text("NWOT"),
                FakeElement::new("option").attr("value", "good").text("Good"),
            ]),
    );
    let planner = ScriptedPlanner::new(|_, _| {
        Err(PlannerError::Transport("connection refused".to_string()))
    });
    let notifier = Arc::new(RecordingNotifier::default());

    let config = AgentLoopConfig {
        max_iterations: 8,
        ..AgentLoopConfig::instant()
    };
    let listing = ListingPayload {
        condition: Some("like_new".to_string()),
        ..listing()
    };
    let outcome = agent(&dom, planner.clone(), config, notifier.clone())
        .run(&listing)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.status, RunStatus::Exhausted);
    assert_eq!(outcome.iterations, 8);

    let title = dom.find("#title").unwrap();
    assert_eq!(dom.value_of(title).as_deref(), Some("Levi's denim jacket"));
    let price = dom.find("#price").unwrap();
    assert_eq!(dom.value_of(price).as_deref(), Some("25"));
    let description = dom.find("#description").unwrap();
    assert_eq!(
        dom.value_of(description).as_deref(),
        Some("Classic trucker jacket, barely worn.")
    );
    let condition = dom.find("#condition").unwrap();
    assert_eq!(dom.value_of(condition).as_deref(), Some("nwot"));

    // Failures at iterations 1-3 trigger the first fill; the counter resets, so the second
    // fill needs three more failed rounds (5, 6, 8; 4 and 7 are stuck recoveries).
    assert_eq!(set_value_count(&dom, "#title", ""), 2);

    let events = notifier.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, RunEventKind::RunFailed);
}

#[tokio::test]
async fn test_url_change_to_listing_is_detected_next_iteration() {
    let dom = FakeDom::new(CREATE_URL);
    let publish = dom.add(FakeElement::new("button").id("publish").text("List this item"));
    dom.on_click(publish, |page| {
        page.set_url("https://poshmark.com/listing/levis-denim-jacket-64f1a2")
    });
    let planner = ScriptedPlanner::new(|_, _| {
        Ok(PlanResponse::with_actions(vec![
            Action::click("#publish"),
            Action::type_text("#title", "still pending"),
        ]))
    });

    let outcome = agent(
        &dom,
        planner.clone(),
        AgentLoopConfig::instant(),
        Arc::new(RecordingNotifier::default()),
    )
    .run(&listing())
    .await;

    assert!(outcome.success);
    assert_eq!(
        outcome.url.as_deref(),
        Some("https://poshmark.com/listing/levis-denim-jacket-64f1a2")
    );
    assert_eq!(outcome.iterations, 2);
    assert_eq!(planner.calls(), 1);
}

#[tokio::test]
async fn test_success_phrase_on_page_ends_the_run() {
    let dom = FakeDom::new(CREATE_URL);
    let share = dom.add(FakeElement::new("button").id("share").text("Share"));
    dom.on_click(share, |page| {
        let body = page.body();
        page.append(body, FakeElement::new("h1").text("Your listing is live!"));
    });
    let planner = ScriptedPlanner::new(|_, _| {
        Ok(PlanResponse::with_actions(vec![Action::click("#share")]))
    });

    let outcome = agent(
        &dom,
        planner.clone(),
        AgentLoopConfig::instant(),
        Arc::new(RecordingNotifier::default()),
    )
    .run(&listing())
    .await;

    assert!(outcome.success);
    assert_eq!(outcome.url.as_deref(), Some(CREATE_URL));
    assert_eq!(planner.calls(), 1);
}

#[tokio::test]
async fn test_always_empty_planner_terminates_at_the_cap() {
    let dom = FakeDom::new(CREATE_URL);
    let next = dom.add(FakeElement::new("button").id("next").text("Next"));
    let planner = ScriptedPlanner::new(|_, _| Ok(PlanResponse::with_actions(vec![])));

    let config = AgentLoopConfig {
        max_iterations: 7,
        ..AgentLoopConfig::instant()
    };
    let outcome = agent(
        &dom,
        planner.clone(),
        config,
        Arc::new(RecordingNotifier::default()),
    )
    .run(&listing())
    .await;

    assert_eq!(outcome.status, RunStatus::Exhausted);
    assert_eq!(outcome.iterations, 7);
    // Iterations 4 and 7 are stuck recoveries and never consult the planner.
    assert_eq!(planner.calls(), 5);
    assert_eq!(dom.clicks().last(), Some(&next));
}

#[tokio::test]
async fn test_error_action_ends_the_batch_but_not_the_run() {
    let dom = FakeDom::new(CREATE_URL);
    let next = dom.add(FakeElement::new("button").id("next").text("Next"));
    let planner = ScriptedPlanner::new(|_, call| match call {
        0 => Ok(PlanResponse::with_actions(vec![
            Action::Error {
                description: Some("cannot find the category picker".to_string()),
            },
            Action::click("#next"),
        ])),
        _ => done(),
    });

    let outcome = agent(
        &dom,
        planner.clone(),
        AgentLoopConfig::instant(),
        Arc::new(RecordingNotifier::default()),
    )
    .run(&listing())
    .await;

    assert!(outcome.success);
    assert_eq!(planner.calls(), 2);
    assert!(!dom.was_clicked(next));
}

#[tokio::test]
async fn test_dismissed_overlay_skips_straight_to_the_next_iteration() {
    let dom = FakeDom::new(CREATE_URL);
    let dialog = dom.add(FakeElement::new("div").attr("role", "dialog").children([
        FakeElement::new("p").text("Draft saved"),
        FakeElement::new("button").id("ok").text("OK"),
    ]));
    let ok = dom.find("#ok").unwrap();
    dom.on_click(ok, move |page| page.remove(dialog));
    let planner = ScriptedPlanner::new(|_, _| done());

    let outcome = agent(
        &dom,
        planner.clone(),
        AgentLoopConfig::instant(),
        Arc::new(RecordingNotifier::default()),
    )
    .run(&listing())
    .await;

    assert!(outcome.success);
    assert_eq!(outcome.iterations, 2);
    assert!(dom.was_clicked(ok));
    assert!(planner.request(0).page_context.modals.is_empty());
}

#[tokio::test]
async fn test_invalid_listing_fails_without_touching_the_page() {
    let dom = FakeDom::new(CREATE_URL);
    let planner = ScriptedPlanner::new(|_, _| done());
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = agent(&dom, planner.clone(), AgentLoopConfig::instant(), notifier.clone())
        .run(&ListingPayload::default())
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.status, RunStatus::Failed);
    assert!(outcome.error.unwrap().contains("title"));
    assert_eq!(planner.calls(), 0);
    assert!(dom.calls().is_empty());
    assert_eq!(notifier.events.lock().unwrap()[0].kind, RunEventKind::RunFailed);
}

#[tokio::test]
async fn test_picker_dialog_stays_open_until_its_select_is_filled() {
    let dom = FakeDom::new(CREATE_URL);
    let category = dom.add(FakeElement::new("button").id("category").text("Category"));
    let dialog = dom.add(
        FakeElement::new("div")
            .attr("role", "dialog")
            .hidden()
            .children([
                FakeElement::new("p").text("Choose a category"),
                FakeElement::new("select").id("cat-select").children([
                    FakeElement::new("option").attr("value", "").text("Select one"),
                    FakeElement::new("option").attr("value", "shoes").text("Shoes"),
                ]),
                FakeElement::new("button").id("cat-done").class("btn-primary").text("Done"),
            ]),
    );
    dom.on_click(category, move |page| page.show(dialog));
    let cat_done = dom.find("#cat-done").unwrap();
    dom.on_click(cat_done, move |page| page.remove(dialog));
    let select = dom.find("#cat-select").unwrap();

    let planner = ScriptedPlanner::new(|_, _| {
        Ok(PlanResponse::with_actions(vec![
            Action::click("#category"),
            Action::select("#cat-select", "Shoes"),
            Action::done(),
        ]))
    });
    let outcome = agent(
        &dom,
        planner,
        AgentLoopConfig::instant(),
        Arc::new(RecordingNotifier::default()),
    )
    .run(&listing())
    .await;

    assert!(outcome.success);
    assert_eq!(dom.value_of(select).as_deref(), Some("shoes"));
    let calls = dom.calls();
    let filled = calls
        .iter()
        .position(|call| matches!(call, DomCall::SetValue { handle, .. } if *handle == select))
        .unwrap();
    let confirmed = calls
        .iter()
        .position(|call| *call == DomCall::Click(cat_done))
        .unwrap();
    assert!(filled < confirmed);
    assert_eq!(dom.clicks(), vec![category, cat_done]);
}
