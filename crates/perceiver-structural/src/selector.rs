//! Selector synthesis for re-resolving snapshot elements later.
//!
//! Priority: stable id, known test/data attributes, placeholder, name, up to two
//! non-generated classes, then a positional fallback the locator refuses to resolve.

use action_locator::selectors::POSITIONAL_PREFIX;
use cdp_adapter::ElementInfo;
use once_cell::sync::Lazy;
use regex::Regex;

/// Data attributes front-ends keep stable across builds.
pub const DATA_ATTRIBUTES: &[&str] = &["data-testid", "data-test", "data-qa", "data-cy", "data-vv-name"];

static CSS_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[A-Za-z_][A-Za-z0-9_-]*$").expect("valid ident regex"));

static GENERATED_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:ember\d|react-|radix-|headlessui-|mui-|rc[-_]|downshift-)|\d{4,}|[0-9a-f]{8}-[0-9a-f]{4}")
        .expect("valid id regex")
});

static GENERATED_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:css-|sc-|jsx-|emotion-|svelte-)|__[A-Za-z0-9_-]{5,}$|\d{3,}")
        .expect("valid class regex")
});

/// Build the most stable selector available for `info`; `position` is its index among
/// elements with the same tag.
pub fn synthesize(info: &ElementInfo, position: usize) -> String {
    let tag = info.tag.as_str();

    if let Some(id) = info.attr("id").filter(|id| is_stable_id(id)) {
        return format!("#{id}");
    }

    for name in DATA_ATTRIBUTES {
        if let Some(value) = info.attr(name).filter(|v| !v.trim().is_empty()) {
            return format!("{tag}[{name}=\"{}\"]", escape(value));
        }
    }

    for name in ["placeholder", "name"] {
        if let Some(value) = info.attr(name).filter(|v| !v.trim().is_empty()) {
            return format!("{tag}[{name}=\"{}\"]", escape(value));
        }
    }

    let classes: Vec<&str> = info
        .classes()
        .filter(|class| CSS_IDENT.is_match(class) && !GENERATED_CLASS.is_match(class))
        .take(2)
        .collect();
    if !classes.is_empty() {
        return format!("{tag}.{}", classes.join("."));
    }

    format!("{POSITIONAL_PREFIX}{tag}:{position}")
}

fn is_stable_id(id: &str) -> bool {
    CSS_IDENT.is_match(id) && !GENERATED_ID.is_match(id)
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
