//! Regex-based markdown cleanup rules, represented as data and compiled once.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SanitizeError {
    #[error("Invalid pattern in sanitization rule '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("Unsupported sanitization rule: {0}")]
    UnsupportedRule(String),
}

/// One cleanup rule: a named regex replace over the note's markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizationRule {
    pub name: String,
    pub pattern: String,
    pub replacement: String,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// The always-available built-in rule: remove fenced code blocks
/// (triple-backtick and triple-tilde, non-greedy).
pub fn code_block_removal() -> SanitizationRule {
    SanitizationRule {
        name: "codeBlockRemoval".to_string(),
        pattern: r"```[\s\S]*?```|~~~[\s\S]*?~~~".to_string(),
        replacement: String::new(),
        is_enabled: true,
    }
}

/// Look up a built-in rule by name. Unknown names are a typed error, not a
/// panic.
pub fn builtin_rule(name: &str) -> Result<SanitizationRule, SanitizeError> {
    match name {
        "codeBlockRemoval" => Ok(code_block_removal()),
        other => Err(SanitizeError::UnsupportedRule(other.to_string())),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SanitizeOutcome {
    pub content: String,
    /// Names of rules that actually changed the content, for diagnostics.
    pub applied_rules: Vec<String>,
}

struct CompiledRule {
    name: String,
    regex: Regex,
    replacement: String,
}

/// Enabled rules compiled up front, reusable across every note of a folder.
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(rules: &[SanitizationRule]) -> Result<Self, SanitizeError> {
        let mut compiled = Vec::new();
        for rule in rules.iter().filter(|r| r.is_enabled) {
            let regex = Regex::new(&rule.pattern).map_err(|source| SanitizeError::InvalidPattern {
                name: rule.name.clone(),
                source: Box::new(source),
            })?;
            compiled.push(CompiledRule {
                name: rule.name.clone(),
                regex,
                replacement: rule.replacement.clone(),
            });
        }
        Ok(Self { rules: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule in list order as a global replace, tracking which
    /// rules produced an actual change.
    pub fn apply(&self, content: &str) -> SanitizeOutcome {
        let mut current = content.to_string();
        let mut applied = Vec::new();

        for rule in &self.rules {
            let replaced = rule
                .regex
                .replace_all(&current, rule.replacement.as_str())
                .into_owned();
            if replaced != current {
                applied.push(rule.name.clone());
            }
            current = replaced;
        }

        SanitizeOutcome {
            content: current,
            applied_rules: applied,
        }
    }
}

/// Sanitize markdown against a nullable rule list. No rules is a
/// passthrough with no applied-rules recorded.
pub fn sanitize(
    content: &str,
    rules: Option<&[SanitizationRule]>,
) -> Result<SanitizeOutcome, SanitizeError> {
    match rules {
        None => Ok(SanitizeOutcome {
            content: content.to_string(),
            applied_rules: Vec::new(),
        }),
        Some(rules) => Ok(RuleSet::compile(rules)?.apply(content)),
    }
}
