//! Frontmatter normalization into canonical flat + nested form.
//!
//! Raw frontmatter arrives as an arbitrary key/value map. Keys are
//! normalized to camelCase (`type-creature`, `type_creature` and
//! `type creature` all become `typeCreature`); dotted keys additionally
//! materialize an object tree so that `author.name` is reachable both as
//! `flat["author.name"]` and `nested.author.name`.

use crate::slug::fold_diacritics;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported frontmatter value: {0}")]
    Convert(#[from] serde_json::Error),
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX.get_or_init(|| Regex::new(r"(?s)^---\s*\n(.*?)\n---\s*\n?(.*)$").unwrap())
}

/// Split a `---` fenced YAML frontmatter block off a markdown document.
///
/// Returns the raw key/value map (None when the document has no block or the
/// block is not a mapping) and the remaining body.
pub fn parse_raw_frontmatter(
    content: &str,
) -> Result<(Option<Map<String, Value>>, String), FrontmatterError> {
    let re = frontmatter_regex();

    let Some(captures) = re.captures(content) else {
        return Ok((None, content.to_string()));
    };

    let yaml = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let body = captures.get(2).map(|m| m.as_str()).unwrap_or_default();

    let parsed: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    let converted: Value = serde_json::to_value(parsed)?;

    match converted {
        Value::Object(map) => Ok((Some(map), body.to_string())),
        _ => Ok((None, body.to_string())),
    }
}

/// Normalize a frontmatter property key.
///
/// Each dot-separated segment is folded to camelCase: diacritics stripped,
/// split on `-`/`_`/whitespace, joined with interior capitals. Segments that
/// carry no separators pass through unchanged, so normalization is
/// idempotent.
///
/// ```
/// use mica_core::frontmatter::normalize_key;
///
/// assert_eq!(normalize_key("type-creature"), "typeCreature");
/// assert_eq!(normalize_key("type_creature"), "typeCreature");
/// assert_eq!(normalize_key("typeCreature"), "typeCreature");
/// assert_eq!(normalize_key("author.display-name"), "author.displayName");
/// ```
pub fn normalize_key(key: &str) -> String {
    key.split('.')
        .map(normalize_segment)
        .collect::<Vec<_>>()
        .join(".")
}

fn normalize_segment(segment: &str) -> String {
    let folded = fold_diacritics(segment.trim());
    let parts: Vec<&str> = folded
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    if parts.len() <= 1 {
        return parts.first().map(|p| (*p).to_string()).unwrap_or_default();
    }

    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        let lower = part.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// Canonical frontmatter: normalized flat keys plus a mirrored object tree.
///
/// Invariant: every key in `flat` has exactly one corresponding leaf in
/// `nested`, reachable by splitting the key on `.`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainFrontmatter {
    pub flat: Map<String, Value>,
    pub nested: Map<String, Value>,
    pub tags: Vec<String>,
}

impl DomainFrontmatter {
    /// Normalize a raw frontmatter map. Missing input yields empty structures;
    /// absence is never an error.
    pub fn normalize(raw: Option<&Map<String, Value>>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        let mut flat = Map::new();
        let mut nested = Map::new();

        for (key, value) in raw {
            let normalized = normalize_key(key);
            if normalized.is_empty() {
                continue;
            }
            flat.insert(normalized.clone(), value.clone());

            if normalized.contains('.') {
                insert_nested_path(&mut nested, &normalized, value.clone());
            } else {
                match nested.get(&normalized) {
                    // A deeper dotted key already filled this in; an empty
                    // placeholder object may be overwritten, a populated one
                    // may not.
                    Some(Value::Object(existing)) if !existing.is_empty() => {}
                    _ => {
                        nested.insert(normalized, value.clone());
                    }
                }
            }
        }

        let tags = extract_tags(flat.get("tags"));
        Self { flat, nested, tags }
    }

    /// Resolve a dot-separated property path against the nested tree.
    /// Each segment is normalized the same way frontmatter keys are.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        let normalized = normalize_key(path);
        let mut segments = normalized.split('.');
        let mut current = self.nested.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }
}

fn insert_nested_path(nested: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = nested;

    for segment in &segments[..segments.len() - 1] {
        let entry = current
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !matches!(entry, Value::Object(_)) {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(map) = entry else {
            unreachable!()
        };
        current = map;
    }

    current.insert(segments[segments.len() - 1].to_string(), value);
}

fn extract_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}
