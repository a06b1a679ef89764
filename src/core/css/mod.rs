pub mod media;
pub mod parser;
pub mod units;

pub use media::{MediaEnvironment, MediaQuery, MediaQueryList};
pub use parser::{
    CSSParser, CssRule, Declaration, KeyframesRule, MediaRule, OpaqueRule,
    ParseError, StyleRule, StyleSheet,
};
pub use units::{contains_viewport_unit, find_viewport_units, replace_viewport_units, UnitMatch};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewportUnit {
    Vh,
    Vw,
    Vmin,
    Vmax,
}

impl ViewportUnit {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "vh" => Some(ViewportUnit::Vh),
            "vw" => Some(ViewportUnit::Vw),
            "vmin" => Some(ViewportUnit::Vmin),
            "vmax" => Some(ViewportUnit::Vmax),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewportUnit::Vh => "vh",
            ViewportUnit::Vw => "vw",
            ViewportUnit::Vmin => "vmin",
            ViewportUnit::Vmax => "vmax",
        }
    }
}

impl std::fmt::Display for ViewportUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
