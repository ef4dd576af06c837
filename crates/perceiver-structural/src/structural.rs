//! Page Snapshot Builder.

use std::collections::{HashMap, HashSet};

use action_locator::{label_of, selectors, ElementLocator, Located};
use cdp_adapter::{ElementHandle, ElementInfo};
use chrono::Utc;
use tracing::{debug, instrument};

use crate::{
    errors::PerceiverError,
    model::{
        Button, Dropdown, DropdownKind, InputField, Label, Modal, ModalKind, PageSnapshot,
        SnapshotLimits, TextArea,
    },
    selector::synthesize,
};

const SKIPPED_INPUT_TYPES: &[&str] = &["hidden", "submit", "button", "image", "reset"];

const SECTION_CONTAINER: &str = "fieldset, [class*=\"section\"], [class*=\"Section\"], \
[class*=\"form-group\"], [class*=\"FormGroup\"], [class*=\"field\"], [class*=\"Field\"]";

const SECTION_HEADING: &str = "legend, label, h2, h3, h4, h5, [class*=\"label\"], \
[class*=\"Label\"], [class*=\"title\"], [class*=\"Title\"]";

/// Placeholder captions custom dropdowns show before a choice is made.
const UNSET_CAPTIONS: &[&str] = &["select", "choose", "pick", "--"];

/// Read-only walker producing [`PageSnapshot`]s.
#[derive(Clone)]
pub struct StructuralPerceiver {
    locator: ElementLocator,
    limits: SnapshotLimits,
}

/// Per-capture cache of `tag -> elements` used for positional selectors.
#[derive(Default)]
struct CaptureCtx {
    by_tag: HashMap<String, Vec<ElementHandle>>,
}

impl StructuralPerceiver {
    pub fn new(locator: ElementLocator, limits: SnapshotLimits) -> Self {
        Self { locator, limits }
    }

    /// Describe one overlay exactly as it would appear in a snapshot's modal list.
    pub async fn describe_overlay(&self, overlay: Located) -> Modal {
        self.modal(overlay, &mut CaptureCtx::default()).await
    }

    /// Visible body text; the orchestrator's success-phrase check reads through here.
    pub async fn page_text(&self) -> Result<String, PerceiverError> {
        Ok(self.locator.dom().body_text().await?)
    }

    /// Capture everything currently visible. Element-level failures are skipped; only an
    /// unreachable page is an error.
    #[instrument(skip(self), level = "debug")]
    pub async fn capture(&self) -> Result<PageSnapshot, PerceiverError> {
        let dom = self.locator.dom();
        let url = dom.current_url().await?;
        let title = dom.title().await?;
        let mut ctx = CaptureCtx::default();

        let inputs = self.inputs(None, &mut ctx).await;
        let textareas = self.textareas(None, &mut ctx).await;
        let buttons = self.buttons(None, &mut ctx).await;
        let dropdowns = self.dropdowns(None, &mut ctx).await;
        let labels = self.labels().await;

        let mut modals = Vec::new();
        for overlay in self.locator.open_overlays().await {
            modals.push(self.modal(overlay, &mut ctx).await);
        }

        let errors = self.errors().await;

        debug!(
            url = %url,
            inputs = inputs.len(),
            buttons = buttons.len(),
            dropdowns = dropdowns.len(),
            modals = modals.len(),
            errors = errors.len(),
            "snapshot captured"
        );

        Ok(PageSnapshot {
            url,
            title,
            captured_at: Utc::now(),
            inputs,
            textareas,
            buttons,
            dropdowns,
            labels,
            modals,
            errors,
        })
    }

    async fn visible(&self, scope: Option<ElementHandle>, selector: &str) -> Vec<Located> {
        let mut found = self.locator.find_visible(scope, selector).await;
        found.truncate(self.limits.max_elements_per_kind);
        found
    }

    async fn selector_for(&self, located: &Located, ctx: &mut CaptureCtx) -> String {
        let tag = located.info.tag.clone();
        if !ctx.by_tag.contains_key(&tag) {
            let all = self
                .locator
                .dom()
                .query_all(None, &tag)
                .await
                .unwrap_or_default();
            ctx.by_tag.insert(tag.clone(), all);
        }
        let position = ctx
            .by_tag
            .get(&tag)
            .and_then(|all| all.iter().position(|h| *h == located.handle))
            .unwrap_or(0);
        synthesize(&located.info, position)
    }

    async fn inputs(&self, scope: Option<ElementHandle>, ctx: &mut CaptureCtx) -> Vec<InputField> {
        let mut out = Vec::new();
        for located in self.visible(scope, "input").await {
            let info = &located.info;
            let input_type = info.attr("type").unwrap_or("text").to_ascii_lowercase();
            if SKIPPED_INPUT_TYPES.contains(&input_type.as_str()) {
                continue;
            }
            out.push(InputField {
                selector: self.selector_for(&located, ctx).await,
                input_type,
                name: self.attr(info, "name"),
                placeholder: self.attr(info, "placeholder"),
                value: self.clip(&info.value, self.limits.max_text_len),
                label: self.field_label(&located).await,
                required: is_required(info),
                disabled: info.is_disabled(),
            });
        }
        out
    }

    async fn textareas(&self, scope: Option<ElementHandle>, ctx: &mut CaptureCtx) -> Vec<TextArea> {
        let mut out = Vec::new();
        for located in self.visible(scope, "textarea").await {
            let info = &located.info;
            out.push(TextArea {
                selector: self.selector_for(&located, ctx).await,
                name: self.attr(info, "name"),
                placeholder: self.attr(info, "placeholder"),
                value: self.clip(&info.value, self.limits.max_text_len),
                label: self.field_label(&located).await,
                required: is_required(info),
            });
        }
        out
    }

    async fn buttons(&self, scope: Option<ElementHandle>, ctx: &mut CaptureCtx) -> Vec<Button> {
        let mut out = Vec::new();
        for located in self.visible(scope, selectors::BUTTON).await {
            let info = &located.info;
            out.push(Button {
                selector: self.selector_for(&located, ctx).await,
                text: self.clip(&label_of(info), self.limits.max_label_len),
                button_type: self.attr(info, "type"),
                disabled: info.is_disabled(),
                is_primary: is_primary(info),
            });
        }
        out
    }

    async fn dropdowns(&self, scope: Option<ElementHandle>, ctx: &mut CaptureCtx) -> Vec<Dropdown> {
        let mut out = Vec::new();
        for located in self.visible(scope, selectors::DROPDOWN_CONTROL).await {
            let selector = self.selector_for(&located, ctx).await;
            let section_label = self.field_label(&located).await;
            let dropdown = if located.info.tag == "select" {
                self.native_dropdown(&located.info, selector, section_label)
            } else {
                self.custom_dropdown(&located, selector, section_label).await
            };
            out.push(dropdown);
        }
        out
    }

    fn native_dropdown(
        &self,
        info: &ElementInfo,
        selector: String,
        section_label: Option<String>,
    ) -> Dropdown {
        let value = info
            .options
            .iter()
            .find(|option| option.selected && !option.value.is_empty())
            .map(|option| self.clip(&option.text, self.limits.max_label_len));
        let options = info
            .options
            .iter()
            .filter(|option| !option.value.is_empty() && !option.text.is_empty())
            .take(self.limits.max_options)
            .map(|option| self.clip(&option.text, self.limits.max_label_len))
            .collect();
        Dropdown {
            selector,
            kind: DropdownKind::Native,
            value,
            options,
            section_label,
            is_expanded: false,
            required: is_required(info),
        }
    }

    async fn custom_dropdown(
        &self,
        located: &Located,
        selector: String,
        section_label: Option<String>,
    ) -> Dropdown {
        let info = &located.info;
        let is_expanded = info.attr("aria-expanded") == Some("true");
        let caption = label_of(info);
        let lowered = caption.trim().to_lowercase();
        let value = (!lowered.is_empty()
            && !UNSET_CAPTIONS.iter().any(|unset| lowered.starts_with(unset)))
        .then(|| self.clip(caption.trim(), self.limits.max_label_len));

        let options = if is_expanded {
            self.expanded_options(located).await
        } else {
            Vec::new()
        };

        Dropdown {
            selector,
            kind: DropdownKind::Custom,
            value,
            options,
            section_label,
            is_expanded,
            required: is_required(info),
        }
    }

    /// Options of an expanded custom dropdown: its `aria-controls` target, then its own
    /// descendants, then any open menu on the page.
    async fn expanded_options(&self, located: &Located) -> Vec<String> {
        let mut scopes = Vec::new();
        if let Some(controls) = located.info.attr("aria-controls") {
            let target = format!("[id=\"{}\"]", controls.replace('"', "\\\""));
            scopes.extend(self.visible(None, &target).await.into_iter().map(|l| l.handle));
        }
        scopes.push(located.handle);
        for menu in self.visible(None, selectors::DROPDOWN_MENU).await {
            scopes.push(menu.handle);
        }

        for scope in scopes {
            let options: Vec<String> = self
                .visible(Some(scope), selectors::OPTION)
                .await
                .iter()
                .map(|option| label_of(&option.info))
                .filter(|text| !text.trim().is_empty())
                .take(self.limits.max_options)
                .map(|text| self.clip(&text, self.limits.max_label_len))
                .collect();
            if !options.is_empty() {
                return options;
            }
        }
        Vec::new()
    }

    async fn labels(&self) -> Vec<Label> {
        self.visible(None, "label, legend")
            .await
            .into_iter()
            .filter(|located| !located.info.text.is_empty())
            .map(|located| Label {
                text: self.clip(&located.info.text, self.limits.max_label_len),
                for_id: self.attr(&located.info, "for"),
            })
            .collect()
    }

    async fn modal(&self, overlay: Located, ctx: &mut CaptureCtx) -> Modal {
        let scope = Some(overlay.handle);
        let buttons = self.buttons(scope, ctx).await;
        let dropdowns = self.dropdowns(scope, ctx).await;
        let mut inputs = self.inputs(scope, ctx).await;
        inputs.extend(
            self.textareas(scope, ctx)
                .await
                .into_iter()
                .map(|textarea| InputField {
                    selector: textarea.selector,
                    input_type: "textarea".to_string(),
                    name: textarea.name,
                    placeholder: textarea.placeholder,
                    value: textarea.value,
                    label: textarea.label,
                    required: textarea.required,
                    disabled: false,
                }),
        );
        // Toggles carry a value attribute whether or not they are set.
        let fillable: Vec<InputField> = inputs
            .iter()
            .filter(|input| !matches!(input.input_type.as_str(), "checkbox" | "radio" | "file"))
            .cloned()
            .collect();

        let has_required_fields = Modal::compute_required(&dropdowns, &fillable);
        let can_auto_dismiss = Modal::compute_auto_dismiss(has_required_fields, &buttons);
        let selector = self.selector_for(&overlay, ctx).await;

        Modal {
            selector,
            kind: ModalKind::classify(&overlay.info.text),
            text: self.clip(&overlay.info.text, self.limits.max_modal_text_len),
            buttons,
            dropdowns,
            inputs,
            has_required_fields,
            can_auto_dismiss,
        }
    }

    async fn errors(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for located in self.visible(None, selectors::ERROR_MESSAGE).await {
            let text = self.clip(&located.info.text, self.limits.max_text_len);
            if text.is_empty() || !seen.insert(text.clone()) {
                continue;
            }
            out.push(text);
            if out.len() >= self.limits.max_errors {
                break;
            }
        }
        out
    }

    /// aria-label, `label[for=id]`, wrapping label, then the heading of the enclosing section.
    async fn field_label(&self, located: &Located) -> Option<String> {
        let info = &located.info;
        if let Some(label) = self.attr(info, "aria-label") {
            return Some(self.clip(&label, self.limits.max_label_len));
        }

        let dom = self.locator.dom();
        if let Some(id) = info.attr("id").filter(|id| !id.is_empty()) {
            let selector = format!("label[for=\"{}\"]", id.replace('"', "\\\""));
            if let Some(label) = self.visible(None, &selector).await.into_iter().next() {
                if !label.info.text.is_empty() {
                    return Some(self.clip(&label.info.text, self.limits.max_label_len));
                }
            }
        }

        if let Ok(Some(wrapper)) = dom.closest(located.handle, "label").await {
            if let Ok(wrapper) = dom.describe(wrapper).await {
                if !wrapper.text.is_empty() {
                    return Some(self.clip(&wrapper.text, self.limits.max_label_len));
                }
            }
        }

        let section = dom
            .closest(located.handle, SECTION_CONTAINER)
            .await
            .ok()
            .flatten()?;
        self.visible(Some(section), SECTION_HEADING)
            .await
            .into_iter()
            .find(|heading| heading.handle != located.handle && !heading.info.text.is_empty())
            .map(|heading| self.clip(&heading.info.text, self.limits.max_label_len))
    }

    fn attr(&self, info: &ElementInfo, name: &str) -> Option<String> {
        info.attr(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| self.clip(value, self.limits.max_label_len))
    }

    fn clip(&self, text: &str, max: usize) -> String {
        let text = text.trim();
        match text.char_indices().nth(max) {
            Some((idx, _)) => text[..idx].to_string(),
            None => text.to_string(),
        }
    }
}

fn is_required(info: &ElementInfo) -> bool {
    info.has_attr("required") || info.attr("aria-required") == Some("true")
}

fn is_primary(info: &ElementInfo) -> bool {
    info.classes()
        .any(|class| class.to_ascii_lowercase().contains("primary"))
        || info
            .attr("data-testid")
            .map(|v| v.to_ascii_lowercase().contains("primary"))
            .unwrap_or(false)
}
