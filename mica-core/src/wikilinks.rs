//! `[[wikilink]]` detection and two-phase cross-note resolution.
//!
//! Detection runs per note and is independent of every other note.
//! Resolution is a strictly separate batch step: the alias index is built
//! from every routed note first, then each link is looked up against it.
//! No partial or streaming resolution is valid.

use crate::models::PublishableNote;
use mica_types::NoteId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WikilinkKind {
    Note,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikilinkRef {
    pub raw: String,
    /// Everything before the first `#` or `|`.
    pub target: String,
    /// The linkable path portion of the target, matched against the alias map.
    pub path: String,
    pub subpath: Option<String>,
    pub alias: Option<String>,
    pub kind: WikilinkKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedWikilink {
    #[serde(flatten)]
    pub link: WikilinkRef,
    pub is_resolved: bool,
    pub target_note_id: Option<NoteId>,
    pub href: Option<String>,
}

/// Scan markdown for `[[target]]`, `[[target|alias]]`, `[[target#subpath]]`
/// and combinations. Embeds (`![[...]]`) are not wikilinks.
pub fn detect_wikilinks(content: &str) -> Vec<WikilinkRef> {
    let mut links = Vec::new();
    let mut rest = content;
    let mut offset = 0usize;

    while let Some(start) = rest.find("[[") {
        let Some(end) = rest[start..].find("]]") else {
            break;
        };
        let inner = &rest[start + 2..start + end];
        // A stray unmatched opener must not swallow a real link after it;
        // restart the scan at the innermost opener.
        if let Some(nested) = inner.find("[[") {
            let advance = start + 2 + nested;
            offset += advance;
            rest = &rest[advance..];
            continue;
        }
        let is_embed = content[..offset + start].ends_with('!');
        if !is_embed && !inner.trim().is_empty() {
            if let Some(link) = parse_wikilink(&rest[start..start + end + 2], inner) {
                links.push(link);
            }
        }
        offset += start + end + 2;
        rest = &rest[start + end + 2..];
    }

    links
}

fn parse_wikilink(raw: &str, inner: &str) -> Option<WikilinkRef> {
    let (before_alias, alias) = match inner.find('|') {
        Some(pos) => (&inner[..pos], Some(inner[pos + 1..].trim().to_string())),
        None => (inner, None),
    };
    let (target, subpath) = match before_alias.find('#') {
        Some(pos) => (
            before_alias[..pos].trim(),
            Some(before_alias[pos + 1..].trim().to_string()),
        ),
        None => (before_alias.trim(), None),
    };
    if target.is_empty() {
        return None;
    }

    let kind = if has_file_extension(target) {
        WikilinkKind::File
    } else {
        WikilinkKind::Note
    };

    Some(WikilinkRef {
        raw: raw.to_string(),
        target: target.to_string(),
        path: target.to_string(),
        subpath: subpath.filter(|s| !s.is_empty()),
        alias: alias.filter(|s| !s.is_empty()),
        kind,
    })
}

/// A target "carries a file extension" when the extension is short,
/// alphanumeric and not purely numeric (so `Note v1.2` stays a note link).
fn has_file_extension(target: &str) -> bool {
    crate::assets::extension(target).is_some_and(|ext| {
        ext.len() <= 5
            && ext.chars().all(|c| c.is_ascii_alphanumeric())
            && ext.chars().any(|c| c.is_ascii_alphabetic())
    })
}

/// Normalize a linkable alias: trim, `\` to `/`, strip leading slashes,
/// lowercase.
pub fn normalize_alias(alias: &str) -> String {
    alias
        .trim()
        .replace('\\', "/")
        .trim_start_matches('/')
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AliasTarget {
    pub note_id: NoteId,
    pub href: String,
}

/// Global alias map built from every routed note's candidate linkable
/// aliases: title, slug, and relative-path variants. First registration for
/// a normalized alias wins; conflicts are not an error.
#[derive(Debug, Default)]
pub struct AliasIndex {
    entries: HashMap<String, AliasTarget>,
}

impl AliasIndex {
    pub fn build(notes: &[PublishableNote]) -> Self {
        let mut index = Self::default();
        for note in notes {
            let Some(routing) = note.routing.as_ref() else {
                continue;
            };
            let target = AliasTarget {
                note_id: note.core.note_id.clone(),
                href: routing.full_path.clone(),
            };
            index.register(&note.core.title, &target);
            index.register(&routing.slug, &target);
            index.register(&note.core.relative_path, &target);
            index.register(without_extension(&note.core.relative_path), &target);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn register(&mut self, alias: &str, target: &AliasTarget) {
        let key = normalize_alias(alias);
        if key.is_empty() {
            return;
        }
        if let Some(existing) = self.entries.get(&key) {
            if existing.href != target.href {
                tracing::debug!(alias = %key, kept = %existing.href, dropped = %target.href, "alias already registered, first wins");
            }
            return;
        }
        self.entries.insert(key, target.clone());
    }

    pub fn lookup(&self, alias: &str) -> Option<&AliasTarget> {
        self.entries.get(&normalize_alias(alias))
    }
}

fn without_extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(pos) if pos > path.rfind('/').map_or(0, |p| p + 1) => &path[..pos],
        _ => path,
    }
}

/// Resolve detected wikilinks against the alias index. Unresolved links keep
/// `is_resolved: false`; resolved links append `#subpath` to the target href.
pub fn resolve_wikilinks(links: &[WikilinkRef], index: &AliasIndex) -> Vec<ResolvedWikilink> {
    links.iter().map(|link| resolve_one(link, index)).collect()
}

fn resolve_one(link: &WikilinkRef, index: &AliasIndex) -> ResolvedWikilink {
    match index.lookup(&link.path) {
        Some(target) => {
            let href = match &link.subpath {
                Some(subpath) => format!("{}#{}", target.href, subpath),
                None => target.href.clone(),
            };
            ResolvedWikilink {
                link: link.clone(),
                is_resolved: true,
                target_note_id: Some(target.note_id.clone()),
                href: Some(href),
            }
        }
        None => ResolvedWikilink {
            link: link.clone(),
            is_resolved: false,
            target_note_id: None,
            href: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_plain_link() {
        let links = detect_wikilinks("See [[Other Note]] for details");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "Other Note");
        assert_eq!(links[0].kind, WikilinkKind::Note);
        assert_eq!(links[0].raw, "[[Other Note]]");
        assert!(links[0].alias.is_none());
        assert!(links[0].subpath.is_none());
    }

    #[test]
    fn test_detect_alias_and_subpath() {
        let links = detect_wikilinks("[[Guide#Setup|the setup docs]]");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "Guide");
        assert_eq!(links[0].subpath.as_deref(), Some("Setup"));
        assert_eq!(links[0].alias.as_deref(), Some("the setup docs"));
    }

    #[test]
    fn test_embeds_excluded() {
        let links = detect_wikilinks("![[image.png]] then [[A Note]]");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "A Note");
    }

    #[test]
    fn test_file_kind() {
        let links = detect_wikilinks("[[manual.pdf]] and [[Note v1.2]]");
        assert_eq!(links[0].kind, WikilinkKind::File);
        assert_eq!(links[1].kind, WikilinkKind::Note);
    }

    #[test]
    fn test_unclosed_link_ignored() {
        assert!(detect_wikilinks("broken [[link without close").is_empty());
    }

    #[test]
    fn test_stray_opener_does_not_swallow_following_link() {
        let links = detect_wikilinks("x [[open [[Real]] y");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "Real");
        assert_eq!(links[0].raw, "[[Real]]");

        let links = detect_wikilinks("[[open [[A]] and [[B]]");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].target, "A");
        assert_eq!(links[1].target, "B");
    }

    #[test]
    fn test_normalize_alias() {
        assert_eq!(normalize_alias("  /Guide\\Intro "), "guide/intro");
        assert_eq!(normalize_alias("NoteA"), "notea");
    }

    #[test]
    fn test_first_registration_wins() {
        let mut index = AliasIndex::default();
        let first = AliasTarget {
            note_id: NoteId::new("n1"),
            href: "/x/a".to_string(),
        };
        let second = AliasTarget {
            note_id: NoteId::new("n2"),
            href: "/x/b".to_string(),
        };
        index.register("Shared", &first);
        index.register("shared", &second);
        assert_eq!(index.lookup("SHARED").unwrap().href, "/x/a");
        assert_eq!(index.len(), 1);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_resolution_with_subpath() {
        let mut index = AliasIndex::default();
        index.register(
            "NoteA",
            &AliasTarget {
                note_id: NoteId::new("a"),
                href: "/x/a".to_string(),
            },
        );

        let links = detect_wikilinks("[[NoteA#Sec]]");
        let resolved = resolve_wikilinks(&links, &index);
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].is_resolved);
        assert_eq!(resolved[0].href.as_deref(), Some("/x/a#Sec"));
        assert_eq!(resolved[0].target_note_id, Some(NoteId::new("a")));
    }

    #[test]
    fn test_unresolved_link() {
        let index = AliasIndex::default();
        let links = detect_wikilinks("[[Nowhere]]");
        let resolved = resolve_wikilinks(&links, &index);
        assert!(!resolved[0].is_resolved);
        assert!(resolved[0].href.is_none());
        assert!(resolved[0].target_note_id.is_none());
    }
}
