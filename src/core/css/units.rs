use std::borrow::Cow;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::ViewportUnit;

static VIEWPORT_UNIT_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([+-]?[0-9.]+)(vh|vw|vmin|vmax)").unwrap());

/// A single `<number><unit>` occurrence inside a value string.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitMatch<'a> {
    /// Byte range of the whole token in the scanned value.
    pub span: Range<usize>,
    /// The numeric part exactly as written, sign included.
    pub number: &'a str,
    pub unit: ViewportUnit,
}

impl UnitMatch<'_> {
    /// Lenient numeric reading of the token: the longest prefix that forms a
    /// decimal number. `None` when the token carries no digit at all.
    pub fn value(&self) -> Option<f64> {
        parse_number_prefix(self.number)
    }
}

/// Whether `value` contains at least one viewport-unit token.
///
/// Every call starts scanning at the beginning of `value`; nothing is shared
/// between calls.
pub fn contains_viewport_unit(value: &str) -> bool {
    VIEWPORT_UNIT_EXPRESSION.is_match(value)
}

/// All non-overlapping viewport-unit tokens in `value`, left to right.
pub fn find_viewport_units(value: &str) -> Vec<UnitMatch<'_>> {
    VIEWPORT_UNIT_EXPRESSION
        .captures_iter(value)
        .filter_map(|caps| to_unit_match(&caps))
        .collect()
}

/// Replaces every viewport-unit token in a single left-to-right pass.
///
/// `replace` returns the substitute text, or `None` to keep the token as
/// written.
pub fn replace_viewport_units<'v, F>(value: &'v str, mut replace: F) -> Cow<'v, str>
where
    F: FnMut(&UnitMatch<'_>) -> Option<String>,
{
    let mut output: Option<String> = None;
    let mut last = 0;

    for caps in VIEWPORT_UNIT_EXPRESSION.captures_iter(value) {
        let Some(token) = to_unit_match(&caps) else {
            continue;
        };
        let Some(replacement) = replace(&token) else {
            continue;
        };

        let out = output.get_or_insert_with(|| String::with_capacity(value.len() + 16));
        out.push_str(&value[last..token.span.start]);
        out.push_str(&replacement);
        last = token.span.end;
    }

    match output {
        Some(mut out) => {
            out.push_str(&value[last..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(value),
    }
}

fn to_unit_match<'a>(caps: &Captures<'a>) -> Option<UnitMatch<'a>> {
    let whole = caps.get(0)?;
    let number = caps.get(1)?.as_str();
    let unit = ViewportUnit::from_suffix(caps.get(2)?.as_str())?;

    Some(UnitMatch {
        span: whole.range(),
        number,
        unit,
    })
}

/// Reads `[+-]?digits[.digits]` from the start of `text`, stopping at the
/// first character that cannot extend the number (a second `.` included).
pub fn parse_number_prefix(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    while let Some(&byte) = bytes.get(end) {
        match byte {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }

    if !seen_digit {
        return None;
    }

    text[..end].trim_end_matches('.').parse::<f64>().ok()
}
