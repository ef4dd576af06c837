//! Pointer sequences that satisfy hover-gated widgets.

use cdp_adapter::{DomEvent, DomPort, ElementHandle};

use crate::{
    errors::ActionError,
    pacing::{pause, Pacing},
};

/// Scroll into view, settle, mouseover, mousedown, mouseup, then a native click.
///
/// Several marketplaces only arm their buttons after `mouseover`, so the order is fixed.
pub async fn synthetic_click(
    dom: &dyn DomPort,
    handle: ElementHandle,
    pacing: &Pacing,
) -> Result<(), ActionError> {
    dom.scroll_into_view(handle).await?;
    pause(pacing.click_settle_ms).await;
    for event in [DomEvent::MouseOver, DomEvent::MouseDown, DomEvent::MouseUp] {
        dom.dispatch(handle, event).await?;
    }
    dom.native_click(handle).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::fake::{DomCall, FakeDom, FakeElement};

    #[tokio::test]
    async fn test_event_order() {
        let dom = FakeDom::new("https://shop.test/");
        let button = dom.add(FakeElement::new("button").text("Next"));
        synthetic_click(&dom, button, &Pacing::instant()).await.unwrap();

        let calls = dom.calls();
        let names: Vec<String> = calls
            .iter()
            .map(|call| match call {
                DomCall::ScrollIntoView(_) => "scroll".to_string(),
                DomCall::Dispatch { event, .. } => event.name().to_string(),
                DomCall::Click(_) => "click".to_string(),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(
            names,
            vec!["scroll", "mouseover", "mousedown", "mouseup", "click"]
        );
    }
}
