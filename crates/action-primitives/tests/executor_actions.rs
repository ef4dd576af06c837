use std::sync::Arc;

use action_locator::ElementLocator;
use action_primitives::{
    Action, ActionError, ActionExecutor, ExecutionOutcome, ExecutorOptions, ImageFetcher, Pacing,
};
use async_trait::async_trait;
use cdp_adapter::{
    fake::{DomCall, FakeDom, FakeElement},
    ElementHandle, FilePayload,
};

/// Serves a tiny image for URLs under `https://img.test/`, fails for everything else.
struct StubFetcher;

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FilePayload, ActionError> {
        match url.strip_prefix("https://img.test/") {
            Some(name) => Ok(FilePayload {
                name: name.to_string(),
                mime: "image/jpeg".to_string(),
                bytes: vec![0xFF, 0xD8, 0xFF],
            }),
            None => Err(ActionError::Fetch(format!("unreachable: {url}"))),
        }
    }
}

fn executor(dom: &FakeDom) -> ActionExecutor {
    ActionExecutor::new(
        ElementLocator::new(Arc::new(dom.clone())),
        Arc::new(StubFetcher),
        Pacing::instant(),
        ExecutorOptions {
            max_images: 2,
            price_markers: vec!["data-price".to_string()],
        },
    )
}

fn events_on(dom: &FakeDom, target: ElementHandle) -> Vec<&'static str> {
    dom.calls()
        .into_iter()
        .filter_map(|call| match call {
            DomCall::Dispatch { handle, event } if handle == target => Some(event.name()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_type_clears_then_types_each_character() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    let title = dom.add(FakeElement::new("input").id("title").value("old"));

    let outcome = executor(&dom).execute(&Action::type_text("#title", "Tee")).await;
    assert_eq!(outcome, ExecutionOutcome::Succeeded);
    assert_eq!(dom.value_of(title).as_deref(), Some("Tee"));

    let values: Vec<String> = dom
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            DomCall::SetValue { value, .. } => Some(value),
            _ => None,
        })
        .collect();
    assert_eq!(values, vec!["", "T", "Te", "Tee"]);

    let events = events_on(&dom, title);
    assert_eq!(events.first(), Some(&"focus"));
    assert_eq!(events.iter().filter(|e| **e == "keydown").count(), 3);
    assert_eq!(events.iter().filter(|e| **e == "keyup").count(), 3);
    assert_eq!(&events[events.len() - 2..], &["change", "blur"]);
}

#[tokio::test]
async fn test_typing_a_price_dismisses_the_suggestion_dialog() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    dom.add(FakeElement::new("input").attr("data-price", "listing").id("amount"));
    let dialog = dom.add(FakeElement::new("div").attr("role", "dialog").children([
        FakeElement::new("p").text("We suggest a price of $18"),
        FakeElement::new("button").text("OK"),
    ]));
    let ok = dom.find("[role=\"dialog\"] button").unwrap();
    let amount = dom.find("#amount").unwrap();
    dom.on_click(ok, move |page| page.hide(dialog));

    let outcome = executor(&dom).execute(&Action::type_text("#amount", "25")).await;
    assert_eq!(outcome, ExecutionOutcome::Succeeded);
    assert!(dom.was_clicked(ok));
    assert_eq!(dom.value_of(amount).as_deref(), Some("25"));
}

#[tokio::test]
async fn test_click_falls_back_to_text_then_fails() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    let next = dom.add(FakeElement::new("button").text("Next"));
    let exec = executor(&dom);

    let by_selector_text = exec.execute(&Action::click("Next")).await;
    assert_eq!(by_selector_text, ExecutionOutcome::Succeeded);
    assert!(dom.was_clicked(next));

    let events = events_on(&dom, next);
    assert_eq!(events, vec!["mouseover", "mousedown", "mouseup"]);

    let missing = exec.execute(&Action::click("#publish")).await;
    assert!(matches!(missing, ExecutionOutcome::Failed { .. }));
}

#[tokio::test]
async fn test_click_prefers_value_text_over_selector() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    let women = dom.add(FakeElement::new("li").attr("role", "option").text("Women"));
    let action = Action::Click {
        selector: Some("div.category-card:nth".to_string()),
        value: Some("women".to_string()),
        description: Some("pick department".to_string()),
    };
    assert_eq!(executor(&dom).execute(&action).await, ExecutionOutcome::Succeeded);
    assert!(dom.was_clicked(women));
}

#[tokio::test]
async fn test_select_native_and_custom() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    let size = dom.add(FakeElement::new("select").id("size").children([
        FakeElement::new("option").attr("value", "").text("Select"),
        FakeElement::new("option").attr("value", "M").text("Medium"),
    ]));
    let toggle = dom.add(
        FakeElement::new("div")
            .attr("role", "combobox")
            .id("color")
            .text("Color"),
    );
    let menu = dom.add(
        FakeElement::new("ul")
            .attr("role", "listbox")
            .hidden()
            .children([
                FakeElement::new("li").attr("role", "option").text("Black"),
                FakeElement::new("li").attr("role", "option").id("blue").text("Blue"),
            ]),
    );
    dom.on_click(toggle, move |page| page.show(menu));
    let exec = executor(&dom);

    assert_eq!(
        exec.execute(&Action::select("#size", "medium")).await,
        ExecutionOutcome::Succeeded
    );
    assert_eq!(dom.value_of(size).as_deref(), Some("M"));
    assert_eq!(events_on(&dom, size), vec!["input", "change"]);

    assert_eq!(
        exec.execute(&Action::select("#color", "Blue")).await,
        ExecutionOutcome::Succeeded
    );
    assert!(dom.was_clicked(toggle));
    assert!(dom.was_clicked(dom.find("#blue").unwrap()));

    let missing = exec.execute(&Action::select("#size", "XXL")).await;
    assert!(matches!(missing, ExecutionOutcome::Failed { reason } if reason.contains("XXL")));
}

#[tokio::test]
async fn test_custom_select_picks_exact_option_over_longer_label() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    let toggle = dom.add(
        FakeElement::new("div")
            .attr("role", "combobox")
            .id("size")
            .text("Size"),
    );
    let menu = dom.add(
        FakeElement::new("ul")
            .attr("role", "listbox")
            .hidden()
            .children([
                FakeElement::new("li").attr("role", "option").id("small").text("Small"),
                FakeElement::new("li").attr("role", "option").id("medium").text("M"),
            ]),
    );
    dom.on_click(toggle, move |page| page.show(menu));

    assert_eq!(
        executor(&dom).execute(&Action::select("#size", "M")).await,
        ExecutionOutcome::Succeeded
    );
    assert!(dom.was_clicked(dom.find("#medium").unwrap()));
    assert!(!dom.was_clicked(dom.find("#small").unwrap()));
}

#[tokio::test]
async fn test_upload_skips_failed_fetches_and_caps_count() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    let input = dom.add(FakeElement::new("input").attr("type", "file").hidden());
    let urls = vec![
        "https://elsewhere.test/broken.jpg".to_string(),
        "https://img.test/front.jpg".to_string(),
        "https://img.test/back.jpg".to_string(),
        "https://img.test/tag.jpg".to_string(),
    ];

    let outcome = executor(&dom)
        .execute(&Action::upload(Some("#dropzone-input".to_string()), &urls))
        .await;
    assert_eq!(outcome, ExecutionOutcome::Succeeded);

    let uploaded = dom.calls().into_iter().find_map(|call| match call {
        DomCall::SetFiles { handle, names } if handle == input => Some(names),
        _ => None,
    });
    // Only the first two URLs are attempted; the broken one is skipped.
    assert_eq!(uploaded, Some(vec!["02-front.jpg".to_string()]));
    assert_eq!(events_on(&dom, input), vec!["input", "change"]);
}

#[tokio::test]
async fn test_upload_with_only_bad_urls_fails_without_panicking() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    dom.add(FakeElement::new("input").attr("type", "file"));
    let exec = executor(&dom);

    let bad = exec
        .execute(&Action::upload(None, &["bad-url".to_string()]))
        .await;
    assert!(matches!(bad, ExecutionOutcome::Failed { .. }));

    let malformed = Action::Upload {
        selector: None,
        value: "not json".to_string(),
        description: None,
    };
    assert!(matches!(
        exec.execute(&malformed).await,
        ExecutionOutcome::Failed { .. }
    ));
    assert!(!dom
        .calls()
        .iter()
        .any(|call| matches!(call, DomCall::SetFiles { .. })));
}

#[tokio::test]
async fn test_scroll_wait_and_terminal_signals() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    let footer = dom.add(FakeElement::new("footer").id("footer"));
    let exec = executor(&dom);

    assert_eq!(exec.execute(&Action::scroll(None)).await, ExecutionOutcome::Succeeded);
    assert_eq!(
        exec.execute(&Action::scroll(Some("#footer".to_string()))).await,
        ExecutionOutcome::Succeeded
    );
    assert!(matches!(
        exec.execute(&Action::scroll(Some("#missing".to_string()))).await,
        ExecutionOutcome::Failed { .. }
    ));
    let calls = dom.calls();
    assert!(calls.contains(&DomCall::ScrollViewport(500)));
    assert!(calls.contains(&DomCall::ScrollIntoView(footer)));

    assert_eq!(exec.execute(&Action::wait(5)).await, ExecutionOutcome::Succeeded);
    assert_eq!(exec.execute(&Action::done()).await, ExecutionOutcome::Done);

    let error = Action::Error {
        description: Some("cannot find the category".to_string()),
    };
    assert_eq!(
        exec.execute(&error).await,
        ExecutionOutcome::Error {
            description: "cannot find the category".to_string()
        }
    );

    let unknown: Action = serde_json::from_str(r##"{"type":"hover","selector":"#x"}"##).unwrap();
    assert!(matches!(
        exec.execute(&unknown).await,
        ExecutionOutcome::Failed { .. }
    ));
}

#[tokio::test]
async fn test_stale_target_is_a_failure_not_a_panic() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    let title = dom.add(FakeElement::new("input").id("title"));
    dom.with_page(|page| page.remove(title));

    let outcome = executor(&dom).execute(&Action::type_text("#title", "x")).await;
    assert!(matches!(outcome, ExecutionOutcome::Failed { .. }));
    assert!(!dom
        .calls()
        .iter()
        .any(|call| matches!(call, DomCall::SetValue { .. })));
}
