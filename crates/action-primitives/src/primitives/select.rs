//! Select primitive - Select from dropdown/listbox

use action_locator::{normalize_text, text_matches};
use cdp_adapter::{DomEvent, OptionInfo};
use tracing::{debug, info};

use crate::{
    errors::ActionError,
    gesture::synthetic_click,
    pacing::pause,
    primitives::ActionExecutor,
};

/// Execute select primitive
///
/// Native `<select>`: pick the option whose value or text matches, set it, fire change.
/// Custom widget: click it open, wait for the menu to render, click the matching option.
pub async fn execute_select(
    executor: &ActionExecutor,
    selector: &str,
    item: &str,
) -> Result<(), ActionError> {
    info!(selector, item, "Executing select primitive");
    if item.trim().is_empty() {
        return Err(ActionError::invalid("select action without a value"));
    }

    let handle = executor.target(selector).await?;
    let dom = executor.dom();
    let info = dom.describe(handle).await?;

    if info.tag == "select" {
        let option = find_option(&info.options, item)
            .ok_or_else(|| ActionError::OptionNotFound(format!("{item} in {selector}")))?;
        debug!(value = %option.value, text = %option.text, "Selecting native option");
        dom.focus(handle).await?;
        dom.set_value(handle, &option.value).await?;
        dom.dispatch(handle, DomEvent::Input).await?;
        dom.dispatch(handle, DomEvent::Change).await?;
        return Ok(());
    }

    synthetic_click(dom, handle, executor.pacing()).await?;
    pause(executor.pacing().menu_render_ms).await;

    let locator = executor.locator();
    let option = match locator.resolve_option_by_text(item).await {
        Some(option) => Some(option),
        None => locator
            .resolve_by_text(item)
            .await
            .filter(|candidate| *candidate != handle),
    };
    let option =
        option.ok_or_else(|| ActionError::OptionNotFound(format!("{item} in {selector}")))?;
    synthetic_click(dom, option, executor.pacing()).await?;
    debug!(%option, "Custom option selected");
    Ok(())
}

/// Exact value or text first, then fuzzy text. Placeholder options with an empty value
/// are never picked.
fn find_option<'a>(options: &'a [OptionInfo], item: &str) -> Option<&'a OptionInfo> {
    let wanted = normalize_text(item);
    let candidates = || options.iter().filter(|o| !o.value.is_empty());
    candidates()
        .find(|o| normalize_text(&o.value) == wanted || normalize_text(&o.text) == wanted)
        .or_else(|| candidates().find(|o| text_matches(&o.text, item)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(value: &str, text: &str) -> OptionInfo {
        OptionInfo {
            value: value.to_string(),
            text: text.to_string(),
            selected: false,
        }
    }

    #[test]
    fn test_option_matching() {
        let options = vec![
            option("", "Select a size"),
            option("S", "Small"),
            option("M", "Medium"),
            option("XS", "Extra Small"),
        ];
        assert_eq!(find_option(&options, "m").unwrap().text, "Medium");
        assert_eq!(find_option(&options, "Small").unwrap().value, "S");
        assert_eq!(find_option(&options, "extra").unwrap().value, "XS");
        assert!(find_option(&options, "Huge").is_none());
        assert!(find_option(&options, "size").is_none());
    }
}
