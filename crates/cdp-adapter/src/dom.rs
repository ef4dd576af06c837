//! The document port and the element descriptions it returns.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AdapterError, ElementHandle};

/// Rendered bounding box in CSS pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The computed style properties the visibility predicate needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
        }
    }
}

/// One `<option>` of a native listbox.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionInfo {
    pub value: String,
    pub text: String,
    pub selected: bool,
}

/// Point-in-time description of one element.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Lowercase tag name.
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Rendered text, whitespace-collapsed.
    pub text: String,
    /// Current form value (empty for non-form elements).
    pub value: String,
    pub style: ComputedStyle,
    pub rect: Rect,
    /// Native `<option>` children; empty unless the element is a `<select>`.
    pub options: Vec<OptionInfo>,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Visible means: display is not `none`, visibility is not `hidden`, opacity is
    /// non-zero, and the rendered box has non-zero width and height.
    pub fn is_visible(&self) -> bool {
        self.style.display != "none"
            && self.style.visibility != "hidden"
            && self.style.opacity > 0.0
            && self.rect.width > 0.0
            && self.rect.height > 0.0
    }

    pub fn is_disabled(&self) -> bool {
        self.has_attr("disabled") || self.attr("aria-disabled") == Some("true")
    }
}

/// Synthetic DOM events the executor fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DomEvent {
    Input,
    Change,
    Focus,
    Blur,
    KeyDown { key: String },
    KeyUp { key: String },
    MouseOver,
    MouseDown,
    MouseUp,
}

impl DomEvent {
    /// DOM event type name.
    pub fn name(&self) -> &'static str {
        match self {
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::Focus => "focus",
            DomEvent::Blur => "blur",
            DomEvent::KeyDown { .. } => "keydown",
            DomEvent::KeyUp { .. } => "keyup",
            DomEvent::MouseOver => "mouseover",
            DomEvent::MouseDown => "mousedown",
            DomEvent::MouseUp => "mouseup",
        }
    }
}

/// A file to inject into an `<input type="file">`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePayload {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Access to the live document of the page the agent drives.
///
/// Implementations must tolerate handles that have gone stale by returning
/// [`AdapterErrorKind::StaleHandle`](crate::AdapterErrorKind) rather than panicking.
#[async_trait]
pub trait DomPort: Send + Sync {
    async fn current_url(&self) -> Result<String, AdapterError>;

    async fn title(&self) -> Result<String, AdapterError>;

    /// Visible text of the document body.
    async fn body_text(&self) -> Result<String, AdapterError>;

    /// All elements matching `selector` in document order, optionally limited to the
    /// descendants of `scope`.
    async fn query_all(
        &self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, AdapterError>;

    async fn describe(&self, handle: ElementHandle) -> Result<ElementInfo, AdapterError>;

    /// Nearest inclusive ancestor matching `selector`.
    async fn closest(
        &self,
        handle: ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>, AdapterError>;

    async fn set_value(&self, handle: ElementHandle, value: &str) -> Result<(), AdapterError>;

    async fn dispatch(&self, handle: ElementHandle, event: DomEvent) -> Result<(), AdapterError>;

    async fn focus(&self, handle: ElementHandle) -> Result<(), AdapterError>;

    /// The element's own `click()`.
    async fn native_click(&self, handle: ElementHandle) -> Result<(), AdapterError>;

    async fn scroll_into_view(&self, handle: ElementHandle) -> Result<(), AdapterError>;

    async fn scroll_viewport(&self, delta_y: i64) -> Result<(), AdapterError>;

    async fn set_files(
        &self,
        handle: ElementHandle,
        files: &[FilePayload],
    ) -> Result<(), AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible() -> ElementInfo {
        ElementInfo {
            tag: "div".into(),
            rect: Rect {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_visibility_predicate() {
        assert!(visible().is_visible());

        let mut el = visible();
        el.style.display = "none".into();
        assert!(!el.is_visible());

        let mut el = visible();
        el.style.visibility = "hidden".into();
        assert!(!el.is_visible());

        let mut el = visible();
        el.style.opacity = 0.0;
        assert!(!el.is_visible());

        let mut el = visible();
        el.rect.height = 0.0;
        assert!(!el.is_visible());
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(DomEvent::KeyDown { key: "a".into() }).unwrap();
        assert_eq!(json["kind"], "keydown");
        assert_eq!(json["key"], "a");
        assert_eq!(DomEvent::MouseOver.name(), "mouseover");
    }
}
