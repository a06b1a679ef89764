pub mod document;

pub use document::{MemoryDocument, StyleElement, IE9_APP_VERSION};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::css::StyleSheet;
use crate::core::viewport::ViewportSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Document has no element to hold styles")]
    MissingHead,
    #[error("Host operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, HostError>;

/// The embedding environment: its stylesheets, viewport, media evaluation
/// and the one style element the buggyfill writes into.
pub trait Host: Send + Sync + 'static {
    /// Browser identification string used to decide whether the buggyfill
    /// applies.
    fn app_version(&self) -> String;

    /// Snapshot of the document's stylesheets in cascade order.
    fn style_sheets(&self) -> Vec<StyleSheet>;

    fn viewport_size(&self) -> ViewportSize;

    /// Whether `media_text` matches the current environment, or `None` when
    /// the environment cannot evaluate media queries.
    fn matches_media(&self, _media_text: &str) -> Option<bool> {
        None
    }

    /// Creates a `<style id="...">` element at the end of the document head.
    fn insert_style_node(&self, id: &str) -> Result<NodeId>;

    /// Replaces the element's text and moves it after every other child of
    /// its parent.
    fn update_style_node(&self, node: NodeId, css_text: &str) -> Result<()>;
}
