//! Element resolver with layered fallback.

use std::sync::Arc;

use cdp_adapter::{DomPort, ElementHandle, ElementInfo};
use tracing::{debug, trace};

use crate::{
    errors::LocatorError,
    selectors::{self, is_positional},
    strategies::LocatorStrategy,
    text::{normalize_text, text_matches},
};

/// A located element together with the description used to pick it.
#[derive(Debug, Clone)]
pub struct Located {
    pub handle: ElementHandle,
    pub info: ElementInfo,
}

/// Resolves selectors and human-readable text to live elements.
#[derive(Clone)]
pub struct ElementLocator {
    dom: Arc<dyn DomPort>,
}

impl ElementLocator {
    pub fn new(dom: Arc<dyn DomPort>) -> Self {
        Self { dom }
    }

    pub fn dom(&self) -> &Arc<dyn DomPort> {
        &self.dom
    }

    /// Direct structural lookup. Prefers the first visible match, else the first match.
    ///
    /// Positional selectors and malformed selectors resolve to `None`.
    pub async fn resolve(&self, selector: &str) -> Option<ElementHandle> {
        self.swallow("resolve", selector, self.try_resolve(selector, false))
            .await
    }

    /// Like [`resolve`](Self::resolve) but only accepts a visible element.
    pub async fn resolve_visible(&self, selector: &str) -> Option<ElementHandle> {
        self.swallow("resolve_visible", selector, self.try_resolve(selector, true))
            .await
    }

    /// Text search across overlays, open menus, then interactive controls.
    ///
    /// Within one scope an exact label beats a partial one.
    pub async fn resolve_by_text(&self, text: &str) -> Option<ElementHandle> {
        self.swallow(
            "resolve_by_text",
            text,
            self.try_resolve_text(text, &LocatorStrategy::TEXT_ORDER),
        )
        .await
    }

    /// Text search restricted to dropdown entries (overlay options, then open menus).
    pub async fn resolve_option_by_text(&self, text: &str) -> Option<ElementHandle> {
        self.swallow(
            "resolve_option_by_text",
            text,
            self.try_resolve_text(text, &LocatorStrategy::OPTION_ORDER),
        )
        .await
    }

    /// Visible overlay containers in document order.
    ///
    /// `html` and `body` never count, whatever their classes say. A loose match (class or
    /// test id only) that merely wraps one real dialog gives way to that dialog, as does a
    /// dialog with a single dialog stacked inside it.
    pub async fn open_overlays(&self) -> Vec<Located> {
        self.swallow("open_overlays", selectors::OVERLAY, self.try_open_overlays())
            .await
            .unwrap_or_default()
    }

    /// Visible elements matching `selector`, optionally inside `scope`.
    pub async fn find_visible(&self, scope: Option<ElementHandle>, selector: &str) -> Vec<Located> {
        self.swallow("find_visible", selector, async {
            Ok::<_, LocatorError>(Some(self.visible_matches(scope, selector).await?))
        })
        .await
        .unwrap_or_default()
    }

    /// `true` when the element sits inside any overlay container.
    pub async fn is_inside_overlay(&self, handle: ElementHandle) -> bool {
        matches!(
            self.dom.closest(handle, selectors::OVERLAY).await,
            Ok(Some(_))
        )
    }

    async fn swallow<T, F>(&self, op: &'static str, input: &str, fut: F) -> Option<T>
    where
        F: std::future::Future<Output = Result<Option<T>, LocatorError>>,
    {
        match fut.await {
            Ok(found) => found,
            Err(err) => {
                debug!(op, input, %err, "lookup failed; treating as not found");
                None
            }
        }
    }

    async fn try_resolve(
        &self,
        selector: &str,
        visible_only: bool,
    ) -> Result<Option<ElementHandle>, LocatorError> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Ok(None);
        }
        if is_positional(selector) {
            return Err(LocatorError::PositionalSelector(selector.to_string()));
        }

        let mut fallback = None;
        for handle in self.dom.query_all(None, selector).await? {
            let Ok(info) = self.dom.describe(handle).await else {
                continue;
            };
            if info.is_visible() {
                trace!(selector, %handle, strategy = LocatorStrategy::Selector.name(), "resolved");
                return Ok(Some(handle));
            }
            fallback.get_or_insert(handle);
        }
        Ok(if visible_only { None } else { fallback })
    }

    async fn try_resolve_text(
        &self,
        text: &str,
        order: &[LocatorStrategy],
    ) -> Result<Option<ElementHandle>, LocatorError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        for strategy in order {
            if let Some(found) = self.search(*strategy, text).await? {
                debug!(text, strategy = strategy.name(), handle = %found, "resolved by text");
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    async fn search(
        &self,
        strategy: LocatorStrategy,
        text: &str,
    ) -> Result<Option<ElementHandle>, LocatorError> {
        let Some(candidates) = strategy.candidate_selector() else {
            return self.try_resolve(text, true).await;
        };

        let scopes: Vec<Option<ElementHandle>> = match strategy {
            LocatorStrategy::OverlayOptions => self
                .try_open_overlays()
                .await?
                .unwrap_or_default()
                .into_iter()
                .map(|overlay| Some(overlay.handle))
                .collect(),
            LocatorStrategy::MenuOptions => {
                let mut menus = Vec::new();
                for menu in self.visible_matches(None, selectors::DROPDOWN_MENU).await? {
                    if !self.is_inside_overlay(menu.handle).await {
                        menus.push(Some(menu.handle));
                    }
                }
                menus
            }
            _ => vec![None],
        };

        let wanted = normalize_text(text);
        for scope in scopes {
            let matches = self.visible_matches(scope, candidates).await?;
            let exact = matches
                .iter()
                .find(|candidate| normalize_text(&label_of(&candidate.info)) == wanted);
            let found = exact.or_else(|| {
                matches
                    .iter()
                    .find(|candidate| text_matches(&label_of(&candidate.info), text))
            });
            if let Some(found) = found {
                return Ok(Some(found.handle));
            }
        }
        Ok(None)
    }

    async fn try_open_overlays(&self) -> Result<Option<Vec<Located>>, LocatorError> {
        let visible = self.visible_matches(None, selectors::OVERLAY).await?;
        let mut open = Vec::new();
        for overlay in self.outermost(visible).await? {
            open.push(self.descend(overlay).await?);
        }
        Ok(Some(open))
    }

    /// Drops page roots and anything nested inside another candidate.
    async fn outermost(&self, overlays: Vec<Located>) -> Result<Vec<Located>, LocatorError> {
        let overlays: Vec<Located> = overlays
            .into_iter()
            .filter(|overlay| !matches!(overlay.info.tag.as_str(), "html" | "body"))
            .collect();
        let mut nested = Vec::new();
        for overlay in &overlays {
            nested.extend(self.dom.query_all(Some(overlay.handle), selectors::OVERLAY).await?);
        }
        Ok(overlays
            .into_iter()
            .filter(|overlay| !nested.contains(&overlay.handle))
            .collect())
    }

    async fn descend(&self, overlay: Located) -> Result<Located, LocatorError> {
        let mut current = overlay;
        loop {
            let inner = self
                .outermost(self.visible_matches(Some(current.handle), selectors::OVERLAY).await?)
                .await?;
            let [only] = inner.as_slice() else {
                return Ok(current);
            };
            let wrapper = if is_dialog(&current.info) {
                is_dialog(&only.info)
            } else {
                is_dialog(&only.info) || !self.has_controls_outside(&current, only).await?
            };
            if !wrapper {
                return Ok(current);
            }
            trace!(outer = %current.handle, inner = %only.handle, "descending into nested overlay");
            current = only.clone();
        }
    }

    async fn has_controls_outside(
        &self,
        outer: &Located,
        inner: &Located,
    ) -> Result<bool, LocatorError> {
        let within = self.dom.query_all(Some(inner.handle), selectors::INTERACTIVE).await?;
        Ok(self
            .visible_matches(Some(outer.handle), selectors::INTERACTIVE)
            .await?
            .iter()
            .any(|control| control.handle != inner.handle && !within.contains(&control.handle)))
    }

    async fn visible_matches(
        &self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Vec<Located>, LocatorError> {
        let mut out = Vec::new();
        for handle in self.dom.query_all(scope, selector).await? {
            match self.dom.describe(handle).await {
                Ok(info) if info.is_visible() => out.push(Located { handle, info }),
                Ok(_) => {}
                Err(err) => trace!(%handle, %err, "skipping element"),
            }
        }
        Ok(out)
    }
}

/// Matched by role or `aria-modal` rather than by a class name.
fn is_dialog(info: &ElementInfo) -> bool {
    matches!(info.attr("role"), Some("dialog" | "alertdialog"))
        || info.attr("aria-modal") == Some("true")
}

/// The text a user would read on the control.
pub fn label_of(info: &ElementInfo) -> String {
    if !info.text.trim().is_empty() {
        return info.text.clone();
    }
    ["aria-label", "value", "title", "alt"]
        .iter()
        .find_map(|name| info.attr(name).filter(|v| !v.trim().is_empty()))
        .unwrap_or_default()
        .to_string()
}
