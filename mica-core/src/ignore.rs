//! Per-note publishability evaluation against an ordered ignore-rule list.
//!
//! Rules are checked in list order and the first match wins; a rule only
//! applies when its property exists in the note's frontmatter.

use crate::frontmatter::DomainFrontmatter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the prioritized ignore-rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoreRule {
    /// Dot-path into the frontmatter, normalized before lookup.
    pub property: String,

    /// Reject the note when the property resolves to this boolean.
    #[serde(default)]
    pub ignore_if: Option<bool>,

    /// Reject the note when the property (or any element of an array
    /// property) strictly equals one of these values.
    #[serde(default)]
    pub ignore_values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IgnoreReason {
    IgnoreIf,
    IgnoreValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoredByRule {
    pub property: String,
    pub reason: IgnoreReason,
    pub matched_value: Value,
    pub rule_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEligibility {
    pub is_publishable: bool,
    pub ignored_by_rule: Option<IgnoredByRule>,
}

impl NoteEligibility {
    fn publishable() -> Self {
        Self {
            is_publishable: true,
            ignored_by_rule: None,
        }
    }

    fn ignored(rule: IgnoredByRule) -> Self {
        Self {
            is_publishable: false,
            ignored_by_rule: Some(rule),
        }
    }
}

/// Evaluate a note's frontmatter against the rule list. No rules means
/// publishable; rule order is the sole precedence and the first match
/// short-circuits.
pub fn evaluate(frontmatter: &DomainFrontmatter, rules: Option<&[IgnoreRule]>) -> NoteEligibility {
    let Some(rules) = rules else {
        return NoteEligibility::publishable();
    };

    for (index, rule) in rules.iter().enumerate() {
        // A rule without its property present does not apply.
        let Some(value) = frontmatter.resolve(&rule.property) else {
            continue;
        };

        if let (Some(expected), Value::Bool(actual)) = (rule.ignore_if, value) {
            if *actual == expected {
                return NoteEligibility::ignored(IgnoredByRule {
                    property: rule.property.clone(),
                    reason: IgnoreReason::IgnoreIf,
                    matched_value: value.clone(),
                    rule_index: index,
                });
            }
        }

        if let Some(targets) = rule.ignore_values.as_deref() {
            if targets.is_empty() {
                continue;
            }
            let matched = match value {
                Value::Array(items) => items.iter().find(|item| targets.contains(*item)),
                scalar => targets.contains(scalar).then_some(scalar),
            };
            if let Some(matched) = matched {
                return NoteEligibility::ignored(IgnoredByRule {
                    property: rule.property.clone(),
                    reason: IgnoreReason::IgnoreValues,
                    matched_value: matched.clone(),
                    rule_index: index,
                });
            }
        }
    }

    NoteEligibility::publishable()
}
