pub mod system;

pub use system::*;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Resize(ResizeEvent),
    OrientationChange(ResizeEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Resize(_) => RESIZE,
            Event::OrientationChange(_) => ORIENTATION_CHANGE,
        }
    }
}

pub const RESIZE: &str = "resize";
pub const ORIENTATION_CHANGE: &str = "orientationchange";

/// New dimensions of the rendering surface after a change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeEvent {
    pub width: f64,
    pub height: f64,
}
