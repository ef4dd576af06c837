use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bounds applied while capturing, so a snapshot stays small on busy pages.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SnapshotLimits {
    pub max_label_len: usize,
    pub max_text_len: usize,
    pub max_options: usize,
    pub max_modal_text_len: usize,
    pub max_elements_per_kind: usize,
    pub max_errors: usize,
}

impl Default for SnapshotLimits {
    fn default() -> Self {
        Self {
            max_label_len: 100,
            max_text_len: 200,
            max_options: 50,
            max_modal_text_len: 500,
            max_elements_per_kind: 150,
            max_errors: 20,
        }
    }
}

/// Point-in-time description of everything actionable on the page.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub captured_at: DateTime<Utc>,
    pub inputs: Vec<InputField>,
    pub textareas: Vec<TextArea>,
    pub buttons: Vec<Button>,
    pub dropdowns: Vec<Dropdown>,
    pub labels: Vec<Label>,
    pub modals: Vec<Modal>,
    pub errors: Vec<String>,
}

impl PageSnapshot {
    /// Error messages mentioning `word`, case-insensitively.
    pub fn errors_mentioning<'a>(&'a self, word: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let word = word.to_lowercase();
        self.errors
            .iter()
            .map(String::as_str)
            .filter(move |message| message.to_lowercase().contains(&word))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    pub selector: String,
    pub input_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub required: bool,
    pub disabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextArea {
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub required: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub selector: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_type: Option<String>,
    pub disabled: bool,
    pub is_primary: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DropdownKind {
    Native,
    Custom,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dropdown {
    pub selector: String,
    pub kind: DropdownKind,
    /// Current selection; `None` when nothing is chosen yet.
    pub value: Option<String>,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_label: Option<String>,
    pub is_expanded: bool,
    pub required: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_id: Option<String>,
}

/// Diagnostic classification of an overlay by its text.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModalKind {
    Price,
    Crop,
    Category,
    Size,
    Color,
    Brand,
    Condition,
    Generic,
}

impl ModalKind {
    /// First keyword group found in `text` wins.
    pub fn classify(text: &str) -> Self {
        const KEYWORDS: &[(&[&str], ModalKind)] = &[
            (&["price"], ModalKind::Price),
            (&["crop", "photo"], ModalKind::Crop),
            (&["category"], ModalKind::Category),
            (&["size"], ModalKind::Size),
            (&["color", "colour"], ModalKind::Color),
            (&["brand"], ModalKind::Brand),
            (&["condition"], ModalKind::Condition),
        ];
        let lower = text.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(words, _)| words.iter().any(|word| lower.contains(word)))
            .map(|(_, kind)| *kind)
            .unwrap_or(ModalKind::Generic)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Modal {
    pub selector: String,
    #[serde(rename = "type")]
    pub kind: ModalKind,
    pub text: String,
    pub buttons: Vec<Button>,
    pub dropdowns: Vec<Dropdown>,
    pub inputs: Vec<InputField>,
    pub has_required_fields: bool,
    pub can_auto_dismiss: bool,
}

impl Modal {
    /// Required when any nested dropdown has no selection or any nested input is empty.
    pub fn compute_required(dropdowns: &[Dropdown], inputs: &[InputField]) -> bool {
        dropdowns.iter().any(|dropdown| dropdown.value.is_none())
            || inputs.iter().any(|input| input.value.trim().is_empty())
    }

    /// Auto-dismissable only without required fields and with a primary button to press.
    pub fn compute_auto_dismiss(has_required_fields: bool, buttons: &[Button]) -> bool {
        !has_required_fields && buttons.iter().any(|button| button.is_primary)
    }
}
