use parking_lot::RwLock;

use super::{Host, HostError, NodeId, Result};
use crate::core::css::{CSSParser, MediaEnvironment, MediaQueryList, StyleSheet};
use crate::core::viewport::ViewportSize;

/// `navigator.appVersion` of Internet Explorer 9 on Windows 7.
pub const IE9_APP_VERSION: &str = "5.0 (compatible; MSIE 9.0; Windows NT 6.1; Trident/5.0)";

/// A `<style>` element in the document head.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleElement {
    pub node: NodeId,
    pub id: Option<String>,
    pub media: Option<String>,
    pub text: String,
    /// `false` models a sheet whose rules cannot be read, such as a
    /// cross-origin `<link>`.
    pub accessible: bool,
}

#[derive(Debug)]
struct DocumentState {
    head: Option<Vec<StyleElement>>,
    viewport: ViewportSize,
    next_node: u64,
    style_writes: usize,
    media_evaluation: bool,
}

/// In-process document used by the command-line front end and tests.
#[derive(Debug)]
pub struct MemoryDocument {
    app_version: String,
    state: RwLock<DocumentState>,
}

impl MemoryDocument {
    pub fn new(app_version: impl Into<String>, viewport: ViewportSize) -> Self {
        Self {
            app_version: app_version.into(),
            state: RwLock::new(DocumentState {
                head: Some(Vec::new()),
                viewport,
                next_node: 1,
                style_writes: 0,
                media_evaluation: true,
            }),
        }
    }

    /// A document without a `<head>`; inserting the output element fails.
    pub fn headless(app_version: impl Into<String>, viewport: ViewportSize) -> Self {
        let document = Self::new(app_version, viewport);
        document.state.write().head = None;
        document
    }

    pub fn append_style(&self, css: &str) -> NodeId {
        self.append_element(None, None, css, true)
    }

    pub fn append_style_with(&self, id: Option<&str>, media: Option<&str>, css: &str) -> NodeId {
        self.append_element(id, media, css, true)
    }

    pub fn append_inaccessible_style(&self, css: &str) -> NodeId {
        self.append_element(None, None, css, false)
    }

    fn append_element(&self, id: Option<&str>, media: Option<&str>, css: &str, accessible: bool) -> NodeId {
        let mut state = self.state.write();
        let node = NodeId(state.next_node);
        state.next_node += 1;

        let element = StyleElement {
            node,
            id: id.map(str::to_string),
            media: media.map(str::to_string),
            text: css.to_string(),
            accessible,
        };
        if let Some(head) = state.head.as_mut() {
            head.push(element);
        }

        node
    }

    pub fn set_viewport(&self, width: f64, height: f64) {
        self.state.write().viewport = ViewportSize::new(width, height);
    }

    /// Turns media evaluation off, as in an environment without
    /// `matchMedia`.
    pub fn set_media_evaluation(&self, enabled: bool) {
        self.state.write().media_evaluation = enabled;
    }

    pub fn style_elements(&self) -> Vec<StyleElement> {
        self.state.read().head.clone().unwrap_or_default()
    }

    pub fn find_by_id(&self, id: &str) -> Option<StyleElement> {
        self.style_elements()
            .into_iter()
            .find(|element| element.id.as_deref() == Some(id))
    }

    pub fn style_text(&self, node: NodeId) -> Option<String> {
        self.style_elements()
            .into_iter()
            .find(|element| element.node == node)
            .map(|element| element.text)
    }

    /// Number of times the output element has been rewritten.
    pub fn style_writes(&self) -> usize {
        self.state.read().style_writes
    }
}

impl Host for MemoryDocument {
    fn app_version(&self) -> String {
        self.app_version.clone()
    }

    fn style_sheets(&self) -> Vec<StyleSheet> {
        self.style_elements()
            .into_iter()
            .map(|element| StyleSheet {
                owner_id: element.id,
                media: element.media,
                rules: element.accessible.then(|| CSSParser::new().parse(&element.text)),
            })
            .collect()
    }

    fn viewport_size(&self) -> ViewportSize {
        self.state.read().viewport
    }

    fn matches_media(&self, media_text: &str) -> Option<bool> {
        let state = self.state.read();
        if !state.media_evaluation {
            return None;
        }

        let env = MediaEnvironment::screen(state.viewport.width, state.viewport.height);
        Some(MediaQueryList::parse(media_text).matches(&env))
    }

    fn insert_style_node(&self, id: &str) -> Result<NodeId> {
        if self.state.read().head.is_none() {
            return Err(HostError::MissingHead);
        }
        Ok(self.append_element(Some(id), None, "", true))
    }

    fn update_style_node(&self, node: NodeId, css_text: &str) -> Result<()> {
        let mut state = self.state.write();
        let head = state.head.as_mut().ok_or(HostError::MissingHead)?;

        let index = head
            .iter()
            .position(|element| element.node == node)
            .ok_or(HostError::NodeNotFound(node))?;

        let mut element = head.remove(index);
        element.text = css_text.to_string();
        head.push(element);

        state.style_writes += 1;
        Ok(())
    }
}
