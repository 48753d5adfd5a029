//! Versioned site manifest: merge by note id, latest publishedAt wins.

use crate::models::PublishableNote;
use chrono::{DateTime, Utc};
use mica_types::{NoteId, SessionId, VpsId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write manifest: {0}")]
    Write(#[source] io::Error),

    #[error("Invalid manifest JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One published page as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPage {
    pub id: NoteId,
    pub title: String,
    pub slug: String,
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ManifestPage {
    /// Manifest projection of a routed, uploaded note. Notes without routing
    /// cannot appear in the manifest.
    pub fn from_note(note: &PublishableNote) -> Option<Self> {
        let routing = note.routing.as_ref()?;
        let description = note
            .core
            .frontmatter
            .flat
            .get("description")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let tags = if note.core.frontmatter.tags.is_empty() {
            None
        } else {
            Some(note.core.frontmatter.tags.clone())
        };
        Some(Self {
            id: note.core.note_id.clone(),
            title: note.core.title.clone(),
            slug: routing.slug.clone(),
            route: routing.full_path.clone(),
            description,
            published_at: note.published_at,
            vault_path: Some(note.core.vault_path.clone()),
            relative_path: Some(note.core.relative_path.clone()),
            tags,
        })
    }
}

/// Persisted catalog of all published pages for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub pages: Vec<ManifestPage>,
}

impl Manifest {
    pub fn new(session_id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            created_at: now,
            last_updated_at: now,
            pages: Vec::new(),
        }
    }

    /// Merge freshly published pages into an optional persisted manifest.
    ///
    /// Same session: merge by id, the page with the greater `published_at`
    /// wins, pages untouched in this run are preserved. Different session:
    /// the persisted manifest is replaced wholesale.
    pub fn merge(
        existing: Option<Manifest>,
        session_id: &SessionId,
        pages: Vec<ManifestPage>,
        now: DateTime<Utc>,
    ) -> Manifest {
        let mut manifest = match existing {
            Some(manifest) if &manifest.session_id == session_id => manifest,
            _ => Manifest::new(session_id.clone(), now),
        };

        for page in pages {
            match manifest.pages.iter_mut().find(|p| p.id == page.id) {
                Some(slot) => {
                    if page.published_at > slot.published_at {
                        *slot = page;
                    }
                }
                None => manifest.pages.push(page),
            }
        }

        manifest.last_updated_at = now;
        manifest
    }

    pub fn page_by_id(&self, id: &NoteId) -> Option<&ManifestPage> {
        self.pages.iter().find(|p| &p.id == id)
    }
}

/// Persistence seam for per-target manifests.
pub trait ManifestStore: Send + Sync {
    fn load(&self, vps_id: &VpsId) -> Result<Option<Manifest>, ManifestError>;
    fn save(&self, vps_id: &VpsId, manifest: &Manifest) -> Result<(), ManifestError>;
}

/// Stores one `manifest.json` per target under a root directory.
pub struct FsManifestStore {
    root: PathBuf,
}

impl FsManifestStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, vps_id: &VpsId) -> PathBuf {
        self.root.join(vps_id.as_str()).join("manifest.json")
    }
}

impl ManifestStore for FsManifestStore {
    fn load(&self, vps_id: &VpsId) -> Result<Option<Manifest>, ManifestError> {
        let path = self.path_for(vps_id);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path).map_err(ManifestError::Read)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn save(&self, vps_id: &VpsId, manifest: &Manifest) -> Result<(), ManifestError> {
        let path = self.path_for(vps_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ManifestError::Write)?;
        }
        let data = serde_json::to_string_pretty(manifest)?;
        fs::write(&path, data).map_err(ManifestError::Write)
    }
}

/// Keeps manifests in memory; for tests and embedding hosts.
#[derive(Default)]
pub struct MemoryManifestStore {
    inner: Mutex<HashMap<VpsId, Manifest>>,
}

impl MemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ManifestStore for MemoryManifestStore {
    fn load(&self, vps_id: &VpsId) -> Result<Option<Manifest>, ManifestError> {
        let inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(inner.get(vps_id).cloned())
    }

    fn save(&self, vps_id: &VpsId, manifest: &Manifest) -> Result<(), ManifestError> {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.insert(vps_id.clone(), manifest.clone());
        Ok(())
    }
}
