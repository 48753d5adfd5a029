//! Inline `` `= this.<property>` `` expression rendering against frontmatter.

use crate::frontmatter::DomainFrontmatter;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

static EXPRESSION_REGEX: OnceLock<Regex> = OnceLock::new();

fn expression_regex() -> &'static Regex {
    EXPRESSION_REGEX.get_or_init(|| Regex::new(r"`\s*=\s*this\.([^`]+?)\s*`").unwrap())
}

/// Replace every `` `= this.<propertyPath>` `` inline-code span with the
/// rendered frontmatter value. Everything else is left untouched; spans whose
/// path does not resolve render as the empty string.
pub fn render_expressions(content: &str, frontmatter: &DomainFrontmatter) -> String {
    expression_regex()
        .replace_all(content, |caps: &Captures| {
            let path = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            frontmatter
                .resolve(path)
                .map(render_value)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Render a frontmatter value to display text: arrays join their sorted
/// stringified elements with `", "`, objects join sorted `key: value` pairs,
/// primitives stringify directly, null renders empty.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let mut parts: Vec<String> = items.iter().map(render_value).collect();
            parts.sort();
            parts.join(", ")
        }
        Value::Object(map) => {
            let mut parts: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{}: {}", key, render_value(value)))
                .collect();
            parts.sort();
            parts.join(", ")
        }
    }
}
