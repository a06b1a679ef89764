use serde::{Deserialize, Serialize};

use super::css::ViewportUnit;

/// Width and height of the rendering surface in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Viewport dimensions read once per rewrite pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSample {
    pub width: f64,
    pub height: f64,
    pub min: f64,
    pub max: f64,
}

impl ViewportSample {
    pub fn new(width: f64, height: f64) -> Self {
        let width = sanitize(width);
        let height = sanitize(height);

        Self {
            width,
            height,
            min: width.min(height),
            max: width.max(height),
        }
    }

    pub fn from_size(size: ViewportSize) -> Self {
        Self::new(size.width, size.height)
    }

    /// Pixel length of `100` units of `unit`.
    pub fn get(&self, unit: ViewportUnit) -> f64 {
        match unit {
            ViewportUnit::Vh => self.height,
            ViewportUnit::Vw => self.width,
            ViewportUnit::Vmin => self.min,
            ViewportUnit::Vmax => self.max,
        }
    }
}

fn sanitize(dimension: f64) -> f64 {
    if dimension.is_finite() && dimension > 0.0 {
        dimension
    } else {
        0.0
    }
}
