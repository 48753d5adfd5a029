//! Embedded-asset detection and display-modifier parsing.
//!
//! Assets are referenced with Obsidian-style embed syntax
//! `![[target|modifier|...]]` in note bodies, or declared on configured
//! frontmatter properties.

use crate::frontmatter::DomainFrontmatter;
use crate::models::PublishableNote;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to read asset '{target}': {message}")]
    Read { target: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Audio,
    Video,
    Pdf,
    Other,
}

impl AssetKind {
    /// Classify a target by file extension; unknown extensions are `Other`.
    pub fn from_target(target: &str) -> Self {
        match extension(target) {
            Some(ext) => match ext.to_lowercase().as_str() {
                "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "bmp" | "avif" => Self::Image,
                "mp3" | "wav" | "ogg" | "m4a" | "flac" => Self::Audio,
                "mp4" | "webm" | "mov" | "mkv" => Self::Video,
                "pdf" => Self::Pdf,
                _ => Self::Other,
            },
            None => Self::Other,
        }
    }
}

/// File extension of the last path segment, if any.
pub(crate) fn extension(target: &str) -> Option<&str> {
    let file = target.rsplit('/').next().unwrap_or(target);
    match file.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < file.len() => Some(&file[pos + 1..]),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetAlignment {
    Left,
    Right,
    Center,
}

/// Display hints parsed from the pipe-delimited embed modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetDisplay {
    pub alignment: Option<AssetAlignment>,
    /// A bare integer modifier, interpreted as pixel width.
    pub width: Option<u32>,
    /// Unrecognized modifier tokens, passed through verbatim.
    pub classes: Vec<String>,
    pub raw_modifiers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetOrigin {
    Content,
    Frontmatter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    pub raw: String,
    pub target: String,
    pub kind: AssetKind,
    pub display: AssetDisplay,
    pub origin: AssetOrigin,
    pub frontmatter_path: Option<String>,
}

static EMBED_REGEX: OnceLock<Regex> = OnceLock::new();

fn embed_regex() -> &'static Regex {
    EMBED_REGEX.get_or_init(|| Regex::new(r"!\[\[([^\[\]]+)\]\]").unwrap())
}

/// Scan markdown content for embed references.
pub fn detect_assets(content: &str) -> Vec<AssetRef> {
    embed_regex()
        .captures_iter(content)
        .filter_map(|caps| {
            let raw = caps.get(0)?.as_str();
            let inner = caps.get(1)?.as_str();
            parse_embed(raw, inner, AssetOrigin::Content, None)
        })
        .collect()
}

/// Collect asset references declared on the configured frontmatter
/// properties. String values and string arrays are accepted.
pub fn detect_frontmatter_assets(
    frontmatter: &DomainFrontmatter,
    properties: &[String],
) -> Vec<AssetRef> {
    let mut assets = Vec::new();
    for property in properties {
        let Some(value) = frontmatter.resolve(property) else {
            continue;
        };
        match value {
            Value::String(target) => {
                if let Some(asset) = parse_embed(
                    target,
                    trim_embed_syntax(target),
                    AssetOrigin::Frontmatter,
                    Some(property.clone()),
                ) {
                    assets.push(asset);
                }
            }
            Value::Array(items) => {
                for item in items {
                    let Some(target) = item.as_str() else { continue };
                    if let Some(asset) = parse_embed(
                        target,
                        trim_embed_syntax(target),
                        AssetOrigin::Frontmatter,
                        Some(property.clone()),
                    ) {
                        assets.push(asset);
                    }
                }
            }
            _ => {}
        }
    }
    assets
}

/// Frontmatter values may carry the full `![[...]]` syntax or a bare target.
fn trim_embed_syntax(value: &str) -> &str {
    value
        .trim()
        .trim_start_matches("![[")
        .trim_end_matches("]]")
}

fn parse_embed(
    raw: &str,
    inner: &str,
    origin: AssetOrigin,
    frontmatter_path: Option<String>,
) -> Option<AssetRef> {
    let mut parts = inner.split('|');
    let target = parts.next()?.trim().to_string();
    if target.is_empty() {
        return None;
    }

    let mut display = AssetDisplay::default();
    for modifier in parts {
        let token = modifier.trim();
        if token.is_empty() {
            continue;
        }
        display.raw_modifiers.push(token.to_string());
        match token.to_lowercase().as_str() {
            "left" => display.alignment = Some(AssetAlignment::Left),
            "right" => display.alignment = Some(AssetAlignment::Right),
            "center" | "centre" => display.alignment = Some(AssetAlignment::Center),
            _ => {
                if let Ok(width) = token.parse::<u32>() {
                    display.width = Some(width);
                } else {
                    display.classes.push(token.to_string());
                }
            }
        }
    }

    Some(AssetRef {
        raw: raw.to_string(),
        kind: AssetKind::from_target(&target),
        target,
        display,
        origin,
        frontmatter_path,
    })
}

/// An asset located and read by the host, ready to upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAssetFile {
    pub vault_path: String,
    pub file_name: String,
    pub relative_asset_path: String,
    pub content: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Collaborator locating asset files for a note. Vault-wide fallback lookup
/// is attempted only when the folder explicitly enables it.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    async fn resolve(
        &self,
        note: &PublishableNote,
        asset: &AssetRef,
        vault_fallback: bool,
    ) -> Result<Option<ResolvedAssetFile>, AssetError>;
}
