pub mod css;
pub mod debounce;
pub mod dom;
pub mod events;
pub mod rewriter;
pub mod scanner;
pub mod serializer;
pub mod viewport;

use tracing::debug;

use self::css::StyleSheet;
use self::viewport::ViewportSample;

/// Runs one full scan, rewrite and serialize pass over `sheets`.
///
/// Sheets owned by `excluded_owner` are never read, so the buggyfill's own
/// output does not feed back into the next pass.
pub fn build_override_css<M>(
    sheets: &[StyleSheet],
    excluded_owner: &str,
    sample: &ViewportSample,
    matches_media: M,
) -> String
where
    M: Fn(&str) -> Option<bool>,
{
    let records = scanner::find_declarations(sheets, excluded_owner, matches_media);
    let items = rewriter::rewrite_declarations(&records, sample);

    debug!(
        sheets = sheets.len(),
        declarations = records.len(),
        width = sample.width,
        height = sample.height,
        "Rewrote viewport units"
    );

    serializer::serialize(items)
}
