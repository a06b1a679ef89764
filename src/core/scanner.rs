use smallvec::SmallVec;
use tracing::{debug, trace};

use super::css::{contains_viewport_unit, CssRule, StyleSheet};

/// A declaration whose value carries at least one viewport-unit token.
#[derive(Debug, Clone)]
pub struct DeclarationRecord<'a> {
    pub rule: &'a CssRule,
    /// Condition text of the enclosing media rules, outermost first.
    pub ancestors: SmallVec<[&'a str; 2]>,
    /// `None` for whole-value rules such as `@keyframes`.
    pub property: Option<&'a str>,
    pub value: &'a str,
    pub important: bool,
}

/// Walks every applicable stylesheet and collects the declarations that use
/// viewport units, in sheet, rule, then declaration order.
///
/// Sheets owned by `excluded_owner`, sheets without a readable rule list and
/// sheets whose media condition `matches_media` rejects are skipped.
/// `matches_media` returns `None` when no evaluator is available, which keeps
/// the sheet.
pub fn find_declarations<'a, M>(
    sheets: &'a [StyleSheet],
    excluded_owner: &str,
    matches_media: M,
) -> Vec<DeclarationRecord<'a>>
where
    M: Fn(&str) -> Option<bool>,
{
    let mut records = Vec::new();
    let mut ancestors: SmallVec<[&'a str; 2]> = SmallVec::new();

    for (index, sheet) in sheets.iter().enumerate() {
        if sheet.owner_id.as_deref() == Some(excluded_owner) {
            trace!("Skipping stylesheet {} (buggyfill output)", index);
            continue;
        }

        let Some(rules) = sheet.rules.as_ref() else {
            debug!("Skipping stylesheet {} (rules not accessible)", index);
            continue;
        };

        if let Some(media) = sheet.media.as_deref().filter(|m| !m.trim().is_empty()) {
            if matches_media(media) == Some(false) {
                trace!("Skipping stylesheet {} (media {:?} does not match)", index, media);
                continue;
            }
        }

        for rule in rules {
            scan_rule(&mut records, rule, &mut ancestors);
        }
    }

    records
}

/// Dispatches on what the rule carries rather than on its kind, so any
/// conditional group exposing nested rules is descended into.
fn scan_rule<'a>(records: &mut Vec<DeclarationRecord<'a>>, rule: &'a CssRule, ancestors: &mut SmallVec<[&'a str; 2]>) {
    if let Some(declarations) = rule.declarations() {
        for declaration in declarations {
            if contains_viewport_unit(&declaration.value) {
                records.push(DeclarationRecord {
                    rule,
                    ancestors: ancestors.clone(),
                    property: Some(&declaration.property),
                    value: &declaration.value,
                    important: declaration.important,
                });
            }
        }
    } else if let Some(children) = rule.child_rules() {
        if let Some(condition) = rule.condition_text() {
            ancestors.push(condition);
        }
        for child in children {
            scan_rule(records, child, ancestors);
        }
        if rule.condition_text().is_some() {
            ancestors.pop();
        }
    } else if let Some(value) = rule.whole_value() {
        if contains_viewport_unit(value) {
            records.push(DeclarationRecord {
                rule,
                ancestors: ancestors.clone(),
                property: None,
                value,
                important: false,
            });
        }
    }
}
