//! In-memory document implementing [`DomPort`].
//!
//! Tests build a tree with [`FakeElement`], script page reactions with [`FakeDom::on_click`],
//! and inspect the recorded [`DomCall`] log afterwards.

mod selector;

use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;

pub use selector::SelectorList;
use selector::SelectorTree;

use crate::{
    dom::{ComputedStyle, DomEvent, DomPort, ElementInfo, FilePayload, OptionInfo, Rect},
    AdapterError, ElementHandle,
};

const DEFAULT_SIZE: (f64, f64) = (120.0, 32.0);

/// Declarative element used to build fake documents.
#[derive(Clone, Debug)]
pub struct FakeElement {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    value: String,
    style: ComputedStyle,
    size: (f64, f64),
    children: Vec<FakeElement>,
}

impl FakeElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            text: String::new(),
            value: String::new(),
            style: ComputedStyle::default(),
            size: DEFAULT_SIZE,
            children: Vec::new(),
        }
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    /// `display: none`
    pub fn hidden(mut self) -> Self {
        self.style.display = "none".to_string();
        self
    }

    /// `visibility: hidden`
    pub fn invisible(mut self) -> Self {
        self.style.visibility = "hidden".to_string();
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.style.opacity = opacity;
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.size = (width, height);
        self
    }

    pub fn child(mut self, child: FakeElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = FakeElement>) -> Self {
        self.children.extend(children);
        self
    }
}

/// One recorded interaction with the fake document.
#[derive(Clone, Debug, PartialEq)]
pub enum DomCall {
    SetValue { handle: ElementHandle, value: String },
    Dispatch { handle: ElementHandle, event: DomEvent },
    Focus(ElementHandle),
    Click(ElementHandle),
    ScrollIntoView(ElementHandle),
    ScrollViewport(i64),
    SetFiles { handle: ElementHandle, names: Vec<String> },
}

type ClickHook = Arc<dyn Fn(&mut FakePage) + Send + Sync>;

#[derive(Clone, Debug)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    value: String,
    style: ComputedStyle,
    size: (f64, f64),
    parent: Option<usize>,
    children: Vec<usize>,
    detached: bool,
}

/// Mutable view of the fake document, handed to click hooks.
pub struct FakePage {
    url: String,
    title: String,
    nodes: Vec<Node>,
    calls: Vec<DomCall>,
    hooks: HashMap<usize, Vec<ClickHook>>,
}

impl SelectorTree for FakePage {
    fn tag(&self, node: usize) -> &str {
        &self.nodes[node].tag
    }

    fn attr(&self, node: usize, name: &str) -> Option<&str> {
        self.nodes[node].attrs.get(name).map(String::as_str)
    }

    fn parent(&self, node: usize) -> Option<usize> {
        self.nodes[node].parent
    }
}

impl FakePage {
    const ROOT: usize = 0;

    fn new(url: &str) -> Self {
        let mut body = FakeElement::new("body");
        body.size = (1280.0, 2000.0);
        let mut page = Self {
            url: url.to_string(),
            title: String::new(),
            nodes: Vec::new(),
            calls: Vec::new(),
            hooks: HashMap::new(),
        };
        page.insert(None, body);
        page
    }

    pub fn body(&self) -> ElementHandle {
        ElementHandle(Self::ROOT as u64)
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn append(&mut self, parent: ElementHandle, element: FakeElement) -> ElementHandle {
        ElementHandle(self.insert(Some(parent.0 as usize), element) as u64)
    }

    pub fn remove(&mut self, handle: ElementHandle) {
        if let Some(node) = self.nodes.get_mut(handle.0 as usize) {
            node.detached = true;
        }
    }

    pub fn hide(&mut self, handle: ElementHandle) {
        if let Some(node) = self.nodes.get_mut(handle.0 as usize) {
            node.style.display = "none".to_string();
        }
    }

    pub fn show(&mut self, handle: ElementHandle) {
        if let Some(node) = self.nodes.get_mut(handle.0 as usize) {
            node.style.display = "block".to_string();
        }
    }

    pub fn set_text(&mut self, handle: ElementHandle, text: &str) {
        if let Some(node) = self.nodes.get_mut(handle.0 as usize) {
            node.text = text.to_string();
        }
    }

    pub fn set_attr(&mut self, handle: ElementHandle, name: &str, value: &str) {
        if let Some(node) = self.nodes.get_mut(handle.0 as usize) {
            node.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn value(&self, handle: ElementHandle) -> Option<String> {
        self.node(handle)
            .ok()
            .map(|_| self.current_value(handle.0 as usize))
    }

    /// First attached element matching `selector`, regardless of visibility.
    pub fn find(&self, selector: &str) -> Option<ElementHandle> {
        self.query(None, selector).ok()?.into_iter().next()
    }

    fn insert(&mut self, parent: Option<usize>, element: FakeElement) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node {
            tag: element.tag,
            attrs: element.attrs,
            text: element.text,
            value: element.value,
            style: element.style,
            size: element.size,
            parent,
            children: Vec::new(),
            detached: false,
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(idx);
        }
        for child in element.children {
            self.insert(Some(idx), child);
        }
        idx
    }

    fn attached(&self, idx: usize) -> bool {
        let mut cursor = Some(idx);
        while let Some(current) = cursor {
            match self.nodes.get(current) {
                Some(node) if !node.detached => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    fn node(&self, handle: ElementHandle) -> Result<&Node, AdapterError> {
        let idx = handle.0 as usize;
        if idx < self.nodes.len() && self.attached(idx) {
            Ok(&self.nodes[idx])
        } else {
            Err(AdapterError::stale(handle))
        }
    }

    fn ancestors_inclusive(&self, idx: usize) -> impl Iterator<Item = &Node> + '_ {
        let mut cursor = Some(idx);
        std::iter::from_fn(move || {
            let current = cursor?;
            let node = &self.nodes[current];
            cursor = node.parent;
            Some(node)
        })
    }

    fn rendered(&self, idx: usize) -> bool {
        self.ancestors_inclusive(idx)
            .all(|node| node.style.display != "none")
    }

    fn preorder(&self, start: usize, out: &mut Vec<usize>) {
        for &child in &self.nodes[start].children {
            if self.nodes[child].detached {
                continue;
            }
            out.push(child);
            self.preorder(child, out);
        }
    }

    fn collect_text(&self, idx: usize, rendered_only: bool, out: &mut Vec<String>) {
        let node = &self.nodes[idx];
        if rendered_only && node.style.display == "none" {
            return;
        }
        let own = node.text.trim();
        if !own.is_empty() {
            out.push(own.to_string());
        }
        for &child in &node.children {
            if !self.nodes[child].detached {
                self.collect_text(child, rendered_only, out);
            }
        }
    }

    fn text_of(&self, idx: usize) -> String {
        let mut parts = Vec::new();
        self.collect_text(idx, false, &mut parts);
        parts
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn option_children(&self, idx: usize) -> Vec<&Node> {
        let mut all = Vec::new();
        self.preorder(idx, &mut all);
        all.into_iter()
            .map(|i| &self.nodes[i])
            .filter(|node| node.tag == "option")
            .collect()
    }

    fn option_value(node: &Node) -> String {
        node.attrs
            .get("value")
            .cloned()
            .unwrap_or_else(|| node.text.trim().to_string())
    }

    fn current_value(&self, idx: usize) -> String {
        let node = &self.nodes[idx];
        if node.tag != "select" || !node.value.is_empty() {
            return node.value.clone();
        }
        let options = self.option_children(idx);
        options
            .iter()
            .find(|option| option.attrs.contains_key("selected"))
            .or_else(|| options.first())
            .map(|option| Self::option_value(option))
            .unwrap_or_default()
    }

    fn describe(&self, handle: ElementHandle) -> Result<ElementInfo, AdapterError> {
        let node = self.node(handle)?;
        let idx = handle.0 as usize;

        let mut style = node.style.clone();
        if self
            .ancestors_inclusive(idx)
            .any(|n| n.style.visibility == "hidden")
        {
            style.visibility = "hidden".to_string();
        }
        let rect = if self.rendered(idx) {
            Rect {
                x: 0.0,
                y: 0.0,
                width: node.size.0,
                height: node.size.1,
            }
        } else {
            Rect::default()
        };

        let value = self.current_value(idx);
        let options = if node.tag == "select" {
            self.option_children(idx)
                .into_iter()
                .map(|option| {
                    let option_value = Self::option_value(option);
                    OptionInfo {
                        selected: option_value == value,
                        value: option_value,
                        text: option.text.trim().to_string(),
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(ElementInfo {
            tag: node.tag.clone(),
            attributes: node.attrs.clone(),
            text: self.text_of(idx),
            value,
            style,
            rect,
            options,
        })
    }

    fn query(
        &self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, AdapterError> {
        let parsed =
            SelectorList::parse(selector).map_err(|_| AdapterError::invalid_selector(selector))?;
        let mut order = Vec::new();
        match scope {
            Some(scope) => {
                self.node(scope)?;
                self.preorder(scope.0 as usize, &mut order);
            }
            None => {
                order.push(Self::ROOT);
                self.preorder(Self::ROOT, &mut order);
            }
        }
        Ok(order
            .into_iter()
            .filter(|&idx| parsed.matches(self, idx))
            .map(|idx| ElementHandle(idx as u64))
            .collect())
    }

    fn set_value_raw(&mut self, handle: ElementHandle, value: &str) -> Result<(), AdapterError> {
        self.node(handle)?;
        let idx = handle.0 as usize;
        let stored = if self.nodes[idx].tag == "select" {
            let known = self
                .option_children(idx)
                .iter()
                .any(|option| Self::option_value(option) == value);
            if known {
                value.to_string()
            } else {
                String::new()
            }
        } else {
            value.to_string()
        };
        self.nodes[idx].value = stored;
        Ok(())
    }
}

/// Shared handle to an in-memory document.
#[derive(Clone)]
pub struct FakeDom {
    page: Arc<Mutex<FakePage>>,
}

impl FakeDom {
    pub fn new(url: &str) -> Self {
        Self {
            page: Arc::new(Mutex::new(FakePage::new(url))),
        }
    }

    /// Append an element tree under `<body>`.
    pub fn add(&self, element: FakeElement) -> ElementHandle {
        let mut page = self.page.lock();
        let body = page.body();
        page.append(body, element)
    }

    pub fn append(&self, parent: ElementHandle, element: FakeElement) -> ElementHandle {
        self.page.lock().append(parent, element)
    }

    /// Register a reaction to `native_click` on `handle`.
    pub fn on_click<F>(&self, handle: ElementHandle, hook: F)
    where
        F: Fn(&mut FakePage) + Send + Sync + 'static,
    {
        self.page
            .lock()
            .hooks
            .entry(handle.0 as usize)
            .or_default()
            .push(Arc::new(hook));
    }

    pub fn with_page<R>(&self, f: impl FnOnce(&mut FakePage) -> R) -> R {
        f(&mut self.page.lock())
    }

    pub fn find(&self, selector: &str) -> Option<ElementHandle> {
        self.page.lock().find(selector)
    }

    pub fn value_of(&self, handle: ElementHandle) -> Option<String> {
        self.page.lock().value(handle)
    }

    pub fn set_url(&self, url: &str) {
        self.page.lock().set_url(url);
    }

    pub fn calls(&self) -> Vec<DomCall> {
        self.page.lock().calls.clone()
    }

    pub fn clicks(&self) -> Vec<ElementHandle> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DomCall::Click(handle) => Some(handle),
                _ => None,
            })
            .collect()
    }

    pub fn was_clicked(&self, handle: ElementHandle) -> bool {
        self.clicks().contains(&handle)
    }
}

#[async_trait]
impl DomPort for FakeDom {
    async fn current_url(&self) -> Result<String, AdapterError> {
        Ok(self.page.lock().url.clone())
    }

    async fn title(&self) -> Result<String, AdapterError> {
        Ok(self.page.lock().title.clone())
    }

    async fn body_text(&self) -> Result<String, AdapterError> {
        let page = self.page.lock();
        let mut parts = Vec::new();
        page.collect_text(FakePage::ROOT, true, &mut parts);
        Ok(parts.join("\n"))
    }

    async fn query_all(
        &self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, AdapterError> {
        self.page.lock().query(scope, selector)
    }

    async fn describe(&self, handle: ElementHandle) -> Result<ElementInfo, AdapterError> {
        self.page.lock().describe(handle)
    }

    async fn closest(
        &self,
        handle: ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>, AdapterError> {
        let page = self.page.lock();
        page.node(handle)?;
        let parsed =
            SelectorList::parse(selector).map_err(|_| AdapterError::invalid_selector(selector))?;
        let mut cursor = Some(handle.0 as usize);
        while let Some(idx) = cursor {
            if parsed.matches(&*page, idx) {
                return Ok(Some(ElementHandle(idx as u64)));
            }
            cursor = page.nodes[idx].parent;
        }
        Ok(None)
    }

    async fn set_value(&self, handle: ElementHandle, value: &str) -> Result<(), AdapterError> {
        let mut page = self.page.lock();
        page.set_value_raw(handle, value)?;
        page.calls.push(DomCall::SetValue {
            handle,
            value: value.to_string(),
        });
        Ok(())
    }

    async fn dispatch(&self, handle: ElementHandle, event: DomEvent) -> Result<(), AdapterError> {
        let mut page = self.page.lock();
        page.node(handle)?;
        page.calls.push(DomCall::Dispatch { handle, event });
        Ok(())
    }

    async fn focus(&self, handle: ElementHandle) -> Result<(), AdapterError> {
        let mut page = self.page.lock();
        page.node(handle)?;
        page.calls.push(DomCall::Focus(handle));
        Ok(())
    }

    async fn native_click(&self, handle: ElementHandle) -> Result<(), AdapterError> {
        let mut page = self.page.lock();
        page.node(handle)?;
        page.calls.push(DomCall::Click(handle));
        let hooks = page
            .hooks
            .get(&(handle.0 as usize))
            .cloned()
            .unwrap_or_default();
        for hook in hooks {
            hook(&mut page);
        }
        Ok(())
    }

    async fn scroll_into_view(&self, handle: ElementHandle) -> Result<(), AdapterError> {
        let mut page = self.page.lock();
        page.node(handle)?;
        page.calls.push(DomCall::ScrollIntoView(handle));
        Ok(())
    }

    async fn scroll_viewport(&self, delta_y: i64) -> Result<(), AdapterError> {
        self.page.lock().calls.push(DomCall::ScrollViewport(delta_y));
        Ok(())
    }

    async fn set_files(
        &self,
        handle: ElementHandle,
        files: &[FilePayload],
    ) -> Result<(), AdapterError> {
        let mut page = self.page.lock();
        page.node(handle)?;
        page.calls.push(DomCall::SetFiles {
            handle,
            names: files.iter().map(|file| file.name.clone()).collect(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdapterErrorKind;

    fn form() -> (FakeDom, ElementHandle) {
        let dom = FakeDom::new("https://shop.test/create-listing");
        let form = dom.add(
            FakeElement::new("form")
                .child(FakeElement::new("input").id("title").attr("placeholder", "Title"))
                .child(
                    FakeElement::new("div")
                        .hidden()
                        .child(FakeElement::new("span").class("error").text("Required")),
                )
                .child(
                    FakeElement::new("select")
                        .attr("name", "size")
                        .child(FakeElement::new("option").attr("value", "").text("Select"))
                        .child(FakeElement::new("option").attr("value", "M").text("Medium")),
                ),
        );
        (dom, form)
    }

    #[tokio::test]
    async fn test_query_scoped_and_document_order() {
        let (dom, form) = form();
        let all = dom.query_all(None, "input, span, select").await.unwrap();
        assert_eq!(all.len(), 3);
        let tags: Vec<String> = futures::future::join_all(all.iter().map(|h| dom.describe(*h)))
            .await
            .into_iter()
            .map(|info| info.unwrap().tag)
            .collect();
        assert_eq!(tags, vec!["input", "span", "select"]);

        let scoped = dom.query_all(Some(form), "form").await.unwrap();
        assert!(scoped.is_empty());
    }

    #[tokio::test]
    async fn test_hidden_ancestor_collapses_rect() {
        let (dom, _) = form();
        let span = dom.find("span.error").unwrap();
        let info = dom.describe(span).await.unwrap();
        assert_eq!(info.rect.width, 0.0);
        assert!(!info.is_visible());
        assert!(!dom.body_text().await.unwrap().contains("Required"));
    }

    #[tokio::test]
    async fn test_native_select_value_semantics() {
        let (dom, _) = form();
        let select = dom.find("select").unwrap();
        let info = dom.describe(select).await.unwrap();
        assert_eq!(info.value, "");
        assert_eq!(info.options.len(), 2);

        dom.set_value(select, "M").await.unwrap();
        let info = dom.describe(select).await.unwrap();
        assert_eq!(info.value, "M");
        assert!(info.options[1].selected);
    }

    #[tokio::test]
    async fn test_click_hooks_and_stale_handles() {
        let (dom, _) = form();
        let button = dom.add(FakeElement::new("button").text("Next"));
        let title = dom.find("#title").unwrap();
        dom.on_click(button, move |page| {
            page.set_url("https://shop.test/listing/abc");
            page.remove(title);
        });

        dom.native_click(button).await.unwrap();
        assert_eq!(dom.current_url().await.unwrap(), "https://shop.test/listing/abc");
        assert!(dom.was_clicked(button));

        let err = dom.describe(title).await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::StaleHandle);
    }

    #[tokio::test]
    async fn test_invalid_selector_is_an_error() {
        let (dom, _) = form();
        let err = dom.query_all(None, "div[").await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::InvalidSelector);
    }
}
