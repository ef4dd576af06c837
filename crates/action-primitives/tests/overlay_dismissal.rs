use std::sync::Arc;

use action_locator::ElementLocator;
use action_primitives::{OverlayHandler, Pacing};
use cdp_adapter::{
    fake::{FakeDom, FakeElement},
    DomPort,
};

fn handler(dom: &FakeDom) -> OverlayHandler {
    OverlayHandler::new(ElementLocator::new(Arc::new(dom.clone())), Pacing::instant())
}

#[tokio::test]
async fn test_nothing_to_dismiss() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    dom.add(FakeElement::new("button").class("btn-primary").text("Save"));
    assert!(!handler(&dom).dismiss_any().await);
    assert!(dom.clicks().is_empty());
}

#[tokio::test]
async fn test_primary_button_wins_over_vocabulary() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    let dialog = dom.add(FakeElement::new("div").attr("role", "dialog").children([
        FakeElement::new("button").text("Done"),
        FakeElement::new("button").class("btn btn-primary").text("Apply"),
    ]));
    let apply = dom.find("button.btn-primary").unwrap();
    dom.on_click(apply, move |page| page.remove(dialog));

    assert!(handler(&dom).dismiss_any().await);
    assert_eq!(dom.clicks(), vec![apply]);
}

#[tokio::test]
async fn test_vocabulary_fallback_skips_disabled_and_unrelated() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    dom.add(FakeElement::new("div").class("modal-wrapper").children([
        FakeElement::new("button").text("Close"),
        FakeElement::new("button").attr("disabled", "").text("Save"),
        FakeElement::new("button").id("continue").text("Continue"),
    ]));
    let continue_button = dom.find("#continue").unwrap();

    assert!(handler(&dom).dismiss_any().await);
    assert_eq!(dom.clicks(), vec![continue_button]);
}

#[tokio::test]
async fn test_buttons_outside_overlays_are_ignored() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    dom.add(FakeElement::new("button").text("OK"));
    dom.add(
        FakeElement::new("div")
            .attr("role", "dialog")
            .hidden()
            .child(FakeElement::new("button").text("OK")),
    );
    assert!(!handler(&dom).dismiss_any().await);
}

#[tokio::test]
async fn test_dismiss_repeatedly_handles_crop_dialog_chain() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    for n in 0..3 {
        let dialog = dom.add(FakeElement::new("div").attr("role", "dialog").children([
            FakeElement::new("p").text(&format!("Crop photo {}", n + 1)),
            FakeElement::new("button")
                .id(&format!("crop-done-{n}"))
                .class("btn-primary")
                .text("Done"),
        ]));
        let done = dom.find(&format!("#crop-done-{n}")).unwrap();
        dom.on_click(done, move |page| page.remove(dialog));
    }

    assert_eq!(handler(&dom).dismiss_repeatedly(5).await, 3);
    assert_eq!(dom.clicks().len(), 3);
    assert_eq!(handler(&dom).dismiss_repeatedly(5).await, 0);
}

#[tokio::test]
async fn test_dismiss_matching_only_touches_matching_overlays() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    dom.add(FakeElement::new("div").attr("role", "dialog").children([
        FakeElement::new("p").text("Share your listing"),
        FakeElement::new("button").text("OK"),
    ]));
    assert!(!handler(&dom).dismiss_matching(&["price"]).await);
    assert!(dom.clicks().is_empty());

    dom.add(FakeElement::new("div").attr("role", "dialog").children([
        FakeElement::new("p").text("Suggested price"),
        FakeElement::new("button").id("keep-price").text("OK"),
    ]));
    assert!(handler(&dom).dismiss_matching(&["price"]).await);
    assert_eq!(dom.clicks(), vec![dom.find("#keep-price").unwrap()]);
}

#[tokio::test]
async fn test_modal_open_body_does_not_expose_form_buttons() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    dom.with_page(|page| {
        let body = page.body();
        page.set_attr(body, "class", "modal-open");
    });
    dom.add(FakeElement::new("form").child(
        FakeElement::new("button")
            .id("list")
            .class("btn btn-primary")
            .text("List this item"),
    ));
    let dialog = dom.add(
        FakeElement::new("div")
            .attr("role", "dialog")
            .child(FakeElement::new("button").id("done").text("Done")),
    );
    let done = dom.find("#done").unwrap();
    dom.on_click(done, move |page| page.remove(dialog));

    assert!(handler(&dom).dismiss_any().await);
    assert_eq!(dom.clicks(), vec![done]);
    assert!(!dom.was_clicked(dom.find("#list").unwrap()));
}

#[tokio::test]
async fn test_overlay_with_empty_required_select_stays_open() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    dom.add(FakeElement::new("div").attr("role", "dialog").children([
        FakeElement::new("p").text("Pick a category"),
        FakeElement::new("select").id("cat-select").children([
            FakeElement::new("option").attr("value", "").text("Select one"),
            FakeElement::new("option").attr("value", "shoes").text("Shoes"),
        ]),
        FakeElement::new("button").id("cat-done").class("btn-primary").text("Done"),
    ]));
    let select = dom.find("#cat-select").unwrap();
    let done = dom.find("#cat-done").unwrap();
    let handler = handler(&dom);

    assert!(!handler.dismiss_any().await);
    assert!(!dom.was_clicked(done));

    dom.set_value(select, "shoes").await.unwrap();
    assert!(handler.dismiss_any().await);
    assert_eq!(dom.clicks(), vec![done]);
}

#[tokio::test]
async fn test_overlay_with_empty_text_field_stays_open() {
    let dom = FakeDom::new("https://shop.test/create-listing");
    dom.add(FakeElement::new("div").class("ModalContainer").children([
        FakeElement::new("label").text("Brand"),
        FakeElement::new("input").attr("type", "text").attr("name", "brand"),
        FakeElement::new("button").text("Save"),
    ]));

    assert!(!handler(&dom).dismiss_any().await);
    assert!(dom.clicks().is_empty());
}
