//! Note values flowing through the publication pipeline.
//!
//! A `RawNote` comes from the vault reader, becomes a `NoteCore` once it
//! passes eligibility filtering, and is then carried as a `PublishableNote`
//! that each stage enriches by returning a new value. Identity fields never
//! change after the core is built.

use crate::assets::AssetRef;
use crate::config::{FolderConfig, VpsConfig};
use crate::frontmatter::{parse_raw_frontmatter, DomainFrontmatter, FrontmatterError};
use crate::routing::NoteRoutingInfo;
use crate::wikilinks::{ResolvedWikilink, WikilinkRef};
use chrono::{DateTime, Utc};
use mica_types::NoteId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A note exactly as handed over by the vault reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNote {
    /// Absolute location inside the vault.
    pub vault_path: String,
    /// Raw, un-slugified path relative to the configured folder.
    pub relative_path: String,
    pub content: String,
    #[serde(default)]
    pub frontmatter: Option<Map<String, Value>>,
}

impl RawNote {
    pub fn new(
        vault_path: impl Into<String>,
        relative_path: impl Into<String>,
        content: impl Into<String>,
        frontmatter: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            vault_path: vault_path.into(),
            relative_path: relative_path.into(),
            content: content.into(),
            frontmatter,
        }
    }

    /// Build a raw note from full markdown text, splitting off the
    /// frontmatter block.
    pub fn from_markdown(
        vault_path: impl Into<String>,
        relative_path: impl Into<String>,
        markdown: &str,
    ) -> Result<Self, FrontmatterError> {
        let (frontmatter, body) = parse_raw_frontmatter(markdown)?;
        Ok(Self {
            vault_path: vault_path.into(),
            relative_path: relative_path.into(),
            content: body,
            frontmatter,
        })
    }
}

/// The immutable identity and per-stage content of an eligible note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteCore {
    pub note_id: NoteId,
    pub title: String,
    pub vault_path: String,
    pub relative_path: String,
    /// Markdown content; reassigned (never mutated in place) by stages.
    pub content: String,
    pub frontmatter: DomainFrontmatter,
    pub folder: FolderConfig,
    pub vps: VpsConfig,
}

impl NoteCore {
    /// Build the core for a collected note that passed eligibility.
    /// A fresh note id is generated here, once.
    pub fn from_raw(
        raw: RawNote,
        frontmatter: DomainFrontmatter,
        folder: &FolderConfig,
        vps: &VpsConfig,
    ) -> Self {
        let title = derive_title(&frontmatter, &raw.relative_path);
        Self {
            note_id: NoteId::generate(),
            title,
            vault_path: raw.vault_path,
            relative_path: raw.relative_path,
            content: raw.content,
            frontmatter,
            folder: folder.clone(),
            vps: vps.clone(),
        }
    }
}

/// Title from normalized frontmatter when present, else the file stem.
fn derive_title(frontmatter: &DomainFrontmatter, relative_path: &str) -> String {
    if let Some(Value::String(title)) = frontmatter.flat.get("title") {
        if !title.trim().is_empty() {
            return title.clone();
        }
    }

    let normalized = relative_path.replace('\\', "/");
    let file = normalized.rsplit('/').next().unwrap_or(&normalized);
    let stem = match file.rfind('.') {
        Some(pos) if pos > 0 => &file[..pos],
        _ => file,
    };
    if stem.trim().is_empty() {
        "Untitled".to_string()
    } else {
        stem.to_string()
    }
}

/// A note that passed eligibility, enriched stage by stage until it is
/// handed to upload. Every `with_*` helper returns a new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishableNote {
    pub core: NoteCore,
    pub published_at: DateTime<Utc>,
    pub routing: Option<NoteRoutingInfo>,
    pub content_html: Option<String>,
    pub assets: Option<Vec<AssetRef>>,
    pub wikilinks: Option<Vec<WikilinkRef>>,
    pub resolved_wikilinks: Option<Vec<ResolvedWikilink>>,
}

impl PublishableNote {
    pub fn new(core: NoteCore, published_at: DateTime<Utc>) -> Self {
        Self {
            core,
            published_at,
            routing: None,
            content_html: None,
            assets: None,
            wikilinks: None,
            resolved_wikilinks: None,
        }
    }

    pub fn id(&self) -> &NoteId {
        &self.core.note_id
    }

    pub fn with_content(mut self, content: String) -> Self {
        self.core.content = content;
        self
    }

    pub fn with_html(mut self, html: String) -> Self {
        self.content_html = Some(html);
        self
    }

    pub fn with_assets(mut self, assets: Vec<AssetRef>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn with_wikilinks(mut self, wikilinks: Vec<WikilinkRef>) -> Self {
        self.wikilinks = Some(wikilinks);
        self
    }

    pub fn with_resolved_wikilinks(mut self, resolved: Vec<ResolvedWikilink>) -> Self {
        self.resolved_wikilinks = Some(resolved);
        self
    }

    pub fn with_routing(mut self, routing: NoteRoutingInfo) -> Self {
        self.routing = Some(routing);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frontmatter(pairs: &[(&str, Value)]) -> DomainFrontmatter {
        let map: Map<String, Value> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        DomainFrontmatter::normalize(Some(&map))
    }

    #[test]
    fn test_title_from_frontmatter() {
        let fm = frontmatter(&[("title", json!("My Note"))]);
        assert_eq!(derive_title(&fm, "dir/file.md"), "My Note");
    }

    #[test]
    fn test_title_falls_back_to_file_stem() {
        let fm = frontmatter(&[]);
        assert_eq!(derive_title(&fm, "Guide/Getting Started.md"), "Getting Started");
        assert_eq!(derive_title(&fm, "Plain"), "Plain");
    }

    #[test]
    fn test_blank_title_falls_back() {
        let fm = frontmatter(&[("title", json!("   "))]);
        assert_eq!(derive_title(&fm, "a/b.md"), "b");
    }

    #[test]
    fn test_from_markdown_splits_frontmatter() {
        let raw = RawNote::from_markdown(
            "/vault/a.md",
            "a.md",
            "---\ntitle: Hello\n---\nBody text\n",
        )
        .unwrap();
        assert_eq!(raw.content.trim(), "Body text");
        let fm = raw.frontmatter.unwrap();
        assert_eq!(fm.get("title"), Some(&json!("Hello")));
    }
}
