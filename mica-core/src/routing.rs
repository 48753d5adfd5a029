//! Deterministic route computation from folder configuration and vault paths.

use crate::slug::slugify;
use mica_types::NoteId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Fixed slug used when a note has no usable relative path segments.
pub const ROOT_NOTE_SLUG: &str = "note";

/// Routed location of a published note.
///
/// `full_path` is `route_base + path + slug` joined with single slashes;
/// it always starts with `/` and never contains doubled slashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRoutingInfo {
    pub id: String,
    pub slug: String,
    pub path: String,
    pub route_base: String,
    pub full_path: String,
}

/// Compute routing for a note from its folder's route base and its raw
/// vault-relative path.
///
/// ```
/// use mica_core::routing::compute_routing;
/// use mica_types::NoteId;
///
/// let routing = compute_routing(&NoteId::new("n1"), "/docs", "Guide/Getting Started.md");
/// assert_eq!(routing.full_path, "/docs/guide/getting-started");
/// assert_eq!(routing.slug, "getting-started");
/// assert_eq!(routing.path, "guide");
/// ```
pub fn compute_routing(note_id: &NoteId, route_base: &str, relative_path: &str) -> NoteRoutingInfo {
    let route_base = normalize_route_base(route_base);
    let normalized = relative_path.replace('\\', "/");
    let segments: Vec<&str> = normalized
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        let full_path = join_route(&route_base, "", ROOT_NOTE_SLUG);
        return NoteRoutingInfo {
            // Root-case notes are keyed by the fixed slug, not the note id.
            id: ROOT_NOTE_SLUG.to_string(),
            slug: ROOT_NOTE_SLUG.to_string(),
            path: String::new(),
            route_base,
            full_path,
        };
    }

    let file = segments[segments.len() - 1];
    let slug = slugify(strip_extension(file));
    let path = segments[..segments.len() - 1]
        .iter()
        .map(|s| slugify(s))
        .collect::<Vec<_>>()
        .join("/");
    let full_path = join_route(&route_base, &path, &slug);

    NoteRoutingInfo {
        id: note_id.as_str().to_string(),
        slug,
        path,
        route_base,
        full_path,
    }
}

/// Ensure a single leading `/` and no trailing `/` (root stays `/`).
fn normalize_route_base(base: &str) -> String {
    format!("/{}", base.trim().trim_matches('/'))
}

fn strip_extension(file: &str) -> &str {
    match file.rfind('.') {
        // Dotfiles keep their full name.
        Some(0) | None => file,
        Some(pos) => &file[..pos],
    }
}

static MULTI_SLASH_REGEX: OnceLock<Regex> = OnceLock::new();

fn join_route(base: &str, path: &str, slug: &str) -> String {
    let re = MULTI_SLASH_REGEX.get_or_init(|| Regex::new(r"/{2,}").unwrap());
    re.replace_all(&format!("{}/{}/{}", base, path, slug), "/")
        .into_owned()
}
