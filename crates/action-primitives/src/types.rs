//! The action vocabulary shared with the planner.
//!
//! On the wire an action is a flat object keyed by `type`:
//!
//! ```json
//! {"type": "click", "selector": "#next", "description": "go to the next step"}
//! {"type": "wait", "waitMs": 800}
//! {"done": true}
//! ```
//!
//! Decoding never fails on an unfamiliar `type`; it becomes [`Action::Unknown`] and the
//! executor treats it as a no-op failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of interaction, or a terminal signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAction", into = "RawAction")]
pub enum Action {
    Type {
        selector: Option<String>,
        value: String,
        description: Option<String>,
    },
    Click {
        selector: Option<String>,
        /// Visible text to fall back on when the selector misses.
        value: Option<String>,
        description: Option<String>,
    },
    Select {
        selector: Option<String>,
        value: String,
        description: Option<String>,
    },
    /// `value` is a JSON array of image URLs.
    Upload {
        selector: Option<String>,
        value: String,
        description: Option<String>,
    },
    Scroll {
        selector: Option<String>,
        description: Option<String>,
    },
    Wait {
        wait_ms: Option<u64>,
        description: Option<String>,
    },
    Done {
        description: Option<String>,
    },
    Error {
        description: Option<String>,
    },
    Unknown {
        kind: String,
        description: Option<String>,
    },
}

impl Action {
    pub fn type_text(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Action::Type {
            selector: Some(selector.into()),
            value: value.into(),
            description: None,
        }
    }

    pub fn click(selector: impl Into<String>) -> Self {
        Action::Click {
            selector: Some(selector.into()),
            value: None,
            description: None,
        }
    }

    /// Click whatever control reads `text`.
    pub fn click_text(text: impl Into<String>) -> Self {
        Action::Click {
            selector: None,
            value: Some(text.into()),
            description: None,
        }
    }

    pub fn select(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Action::Select {
            selector: Some(selector.into()),
            value: value.into(),
            description: None,
        }
    }

    pub fn upload(selector: Option<String>, urls: &[String]) -> Self {
        Action::Upload {
            selector,
            value: serde_json::to_string(urls).unwrap_or_else(|_| "[]".to_string()),
            description: None,
        }
    }

    pub fn scroll(selector: Option<String>) -> Self {
        Action::Scroll {
            selector,
            description: None,
        }
    }

    pub fn wait(wait_ms: u64) -> Self {
        Action::Wait {
            wait_ms: Some(wait_ms),
            description: None,
        }
    }

    pub fn done() -> Self {
        Action::Done { description: None }
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match &mut self {
            Action::Type { description, .. }
            | Action::Click { description, .. }
            | Action::Select { description, .. }
            | Action::Upload { description, .. }
            | Action::Scroll { description, .. }
            | Action::Wait { description, .. }
            | Action::Done { description }
            | Action::Error { description }
            | Action::Unknown { description, .. } => *description = text,
        }
        self
    }

    /// Wire name of the action kind.
    pub fn kind(&self) -> &str {
        match self {
            Action::Type { .. } => "type",
            Action::Click { .. } => "click",
            Action::Select { .. } => "select",
            Action::Upload { .. } => "upload",
            Action::Scroll { .. } => "scroll",
            Action::Wait { .. } => "wait",
            Action::Done { .. } => "done",
            Action::Error { .. } => "error",
            Action::Unknown { kind, .. } => kind,
        }
    }

    pub fn selector(&self) -> Option<&str> {
        match self {
            Action::Type { selector, .. }
            | Action::Click { selector, .. }
            | Action::Select { selector, .. }
            | Action::Upload { selector, .. }
            | Action::Scroll { selector, .. } => selector.as_deref(),
            _ => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Action::Type { description, .. }
            | Action::Click { description, .. }
            | Action::Select { description, .. }
            | Action::Upload { description, .. }
            | Action::Scroll { description, .. }
            | Action::Wait { description, .. }
            | Action::Done { description }
            | Action::Error { description }
            | Action::Unknown { description, .. } => description.as_deref(),
        }
    }

    /// `done` and `error` end a batch instead of touching the page.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Action::Done { .. } | Action::Error { .. })
    }
}

/// Flat wire form. Every field is optional so that decoding is total.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wait_ms: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing)]
    done: Option<bool>,
}

/// Strings pass through, arrays and objects become JSON text, scalars their display form.
fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn millis(value: Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl From<RawAction> for Action {
    fn from(raw: RawAction) -> Self {
        let RawAction {
            kind,
            selector,
            value,
            wait_ms,
            description,
            done,
        } = raw;
        let selector = selector.filter(|s| !s.trim().is_empty());
        let value = value.and_then(stringify);

        let kind = match kind {
            Some(kind) => kind.trim().to_ascii_lowercase(),
            None if done == Some(true) => "done".to_string(),
            None => String::new(),
        };

        match kind.as_str() {
            "type" | "fill" => Action::Type {
                selector,
                value: value.unwrap_or_default(),
                description,
            },
            "click" => Action::Click {
                selector,
                value,
                description,
            },
            "select" => Action::Select {
                selector,
                value: value.unwrap_or_default(),
                description,
            },
            "upload" => Action::Upload {
                selector,
                value: value.unwrap_or_default(),
                description,
            },
            "scroll" => Action::Scroll {
                selector,
                description,
            },
            "wait" => Action::Wait {
                wait_ms: wait_ms.and_then(millis),
                description,
            },
            "done" => Action::Done { description },
            "error" => Action::Error { description },
            _ => Action::Unknown { kind, description },
        }
    }
}

impl From<Action> for RawAction {
    fn from(action: Action) -> Self {
        let kind = Some(action.kind().to_string());
        let mut raw = RawAction {
            kind,
            ..RawAction::default()
        };
        match action {
            Action::Type {
                selector,
                value,
                description,
            }
            | Action::Select {
                selector,
                value,
                description,
            }
            | Action::Upload {
                selector,
                value,
                description,
            } => {
                raw.selector = selector;
                raw.value = Some(Value::String(value));
                raw.description = description;
            }
            Action::Click {
                selector,
                value,
                description,
            } => {
                raw.selector = selector;
                raw.value = value.map(Value::String);
                raw.description = description;
            }
            Action::Scroll {
                selector,
                description,
            } => {
                raw.selector = selector;
                raw.description = description;
            }
            Action::Wait {
                wait_ms,
                description,
            } => {
                raw.wait_ms = wait_ms.map(Value::from);
                raw.description = description;
            }
            Action::Done { description }
            | Action::Error { description }
            | Action::Unknown { description, .. } => raw.description = description,
        }
        raw
    }
}

/// What happened when one action ran.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Succeeded,
    Failed { reason: String },
    /// The planner declared the listing complete.
    Done,
    /// The planner gave up on this batch.
    Error { description: String },
}

impl ExecutionOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        ExecutionOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded | ExecutionOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Action {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decodes_planner_batch() {
        let batch: Vec<Action> =
            serde_json::from_value(json!([{"type": "click", "selector": "#next"}, {"done": true}]))
                .unwrap();
        assert_eq!(batch[0], Action::click("#next"));
        assert_eq!(batch[1], Action::done());
        assert!(batch[1].is_terminal());
    }

    #[test]
    fn test_unknown_kind_is_not_a_decode_error() {
        let action = decode(json!({"type": "hover", "selector": "#x", "description": "peek"}));
        assert_eq!(action.kind(), "hover");
        assert_eq!(action.description(), Some("peek"));
        assert!(matches!(action, Action::Unknown { .. }));

        let empty = decode(json!({}));
        assert!(matches!(empty, Action::Unknown { .. }));
    }

    #[test]
    fn test_values_are_normalized_to_strings() {
        let price = decode(json!({"type": "type", "selector": "#price", "value": 25}));
        assert_eq!(price, Action::type_text("#price", "25"));

        let upload = decode(json!({
            "type": "upload",
            "selector": "input[type=\"file\"]",
            "value": ["https://img.test/a.jpg", "https://img.test/b.jpg"]
        }));
        let Action::Upload { value, .. } = upload else {
            panic!("expected upload");
        };
        let urls: Vec<String> = serde_json::from_str(&value).unwrap();
        assert_eq!(urls.len(), 2);

        let wait = decode(json!({"type": "wait", "waitMs": "750"}));
        assert_eq!(wait, Action::wait(750));
    }

    #[test]
    fn test_encodes_flat_wire_shape() {
        let action = Action::wait(500).with_description("let the menu render");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            json!({"type": "wait", "waitMs": 500, "description": "let the menu render"})
        );

        let blank_selector = decode(json!({"type": "scroll", "selector": "  "}));
        assert_eq!(blank_selector, Action::scroll(None));
    }
}
