use serde::{Deserialize, Serialize};
use tracing::trace;

use super::css::replace_viewport_units;
use super::scanner::DeclarationRecord;
use super::viewport::ViewportSample;

/// A declaration rewritten to pixels, with the headers that reopen its
/// original scope (`@media ...` blocks, then the selector).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewrittenItem {
    pub headers: Vec<String>,
    pub content: String,
}

impl RewrittenItem {
    pub fn is_unscoped(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Replaces every viewport-unit token of `value` with its pixel length.
///
/// Tokens whose number has no digits are left as written.
pub fn rewrite_value(value: &str, sample: &ViewportSample) -> String {
    replace_viewport_units(value, |token| {
        let number = token.value()?;
        Some(format_px(number / 100.0 * sample.get(token.unit)))
    })
    .into_owned()
}

pub fn rewrite_declaration(record: &DeclarationRecord<'_>, sample: &ViewportSample) -> RewrittenItem {
    let value = rewrite_value(record.value, sample);

    let mut headers: Vec<String> = record
        .ancestors
        .iter()
        .map(|condition| format!("@media {}", condition))
        .collect();

    let content = match record.property {
        Some(name) => {
            if let Some(selector) = record.rule.selector_text() {
                headers.push(selector.to_string());
            }
            let priority = if record.important { " !important" } else { "" };
            format!("{}: {}{};", name, value, priority)
        }
        None => value,
    };

    trace!("Rewrote {:?} -> {:?}", record.value, content);

    RewrittenItem { headers, content }
}

/// Rewrites a whole pass against one sample so every declaration sees the
/// same dimensions.
pub fn rewrite_declarations(records: &[DeclarationRecord<'_>], sample: &ViewportSample) -> Vec<RewrittenItem> {
    records
        .iter()
        .map(|record| rewrite_declaration(record, sample))
        .collect()
}

/// Formats a pixel length with full float precision.
pub fn format_px(px: f64) -> String {
    if px == 0.0 {
        // avoid "-0px"
        return "0px".to_string();
    }
    format!("{}px", px)
}
