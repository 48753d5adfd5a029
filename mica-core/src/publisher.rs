//! The publish orchestrator: collect, filter, transform, group, upload.
//!
//! The orchestrator owns run-level control flow only. Every stage it calls
//! is a pure function over note values; side effects live behind the
//! collaborator traits (`VaultReader`, `MarkdownRenderer`, `NoteUploader`,
//! `ManifestStore`, `AssetResolver`).
//!
//! Failure handling is tiered: configuration and environment failures abort
//! the run as `Err`, a rejected or failed batch ends the run early with
//! `PublishOutcome::Error` (batches already uploaded stay uploaded), and a
//! note that fails to render is dropped from the run and reported in the
//! summary without affecting its siblings.

use crate::assets::{detect_assets, detect_frontmatter_assets, AssetResolver, ResolvedAssetFile};
use crate::config::{FolderConfig, PublishConfig, VpsConfig};
use crate::expressions::render_expressions;
use crate::frontmatter::DomainFrontmatter;
use crate::ignore;
use crate::manifest::{Manifest, ManifestError, ManifestPage, ManifestStore};
use crate::models::{NoteCore, PublishableNote, RawNote};
use crate::render::MarkdownRenderer;
use crate::routing::compute_routing;
use crate::sanitize::{RuleSet, SanitizeError};
use crate::site_index::{render_site_indexes, IndexPage};
use crate::upload::{NoteUploader, UploadBatch};
use crate::vault::{VaultError, VaultReader};
use crate::wikilinks::{detect_wikilinks, resolve_wikilinks, AliasIndex};
use chrono::Utc;
use mica_types::{NoteId, SessionId, VpsId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPhase {
    Collecting,
    Filtering,
    Transforming,
    Grouping,
    Uploading,
    Done,
}

/// Progress snapshot handed to the caller's callback after each unit of
/// work. `processed`/`total` count notes within the current folder.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishProgress {
    pub phase: PublishPhase,
    pub folder: Option<String>,
    pub processed: usize,
    pub total: usize,
}

/// A folder whose configured target id matches no VPS entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingVps {
    pub folder: String,
    pub vps_id: VpsId,
}

/// A note dropped from the run by a per-note transform failure.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteFailure {
    pub note_id: NoteId,
    pub relative_path: String,
    pub message: String,
}

/// The run ended early on a failed or rejected batch. Targets listed in
/// `completed` were uploaded before the failure and are not rolled back.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishFailure {
    pub message: String,
    pub completed: Vec<VpsId>,
}

/// Per-target result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetResult {
    pub vps_id: VpsId,
    pub manifest: Manifest,
    pub index_pages: Vec<IndexPage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishSummary {
    pub published: usize,
    pub skipped: usize,
    pub errors: Vec<NoteFailure>,
    pub targets: Vec<TargetResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// No targets or no folders are configured; nothing to do.
    NoConfig,
    /// One or more folders point at an unknown target. Nothing is uploaded.
    MissingVpsConfig(Vec<MissingVps>),
    /// A batch failed or was rejected; earlier batches stay uploaded.
    Error(PublishFailure),
    Done(PublishSummary),
}

/// Orchestrates one publication run over injected collaborators.
pub struct Publisher<V, R, U, M> {
    vault: V,
    renderer: R,
    uploader: U,
    manifest_store: M,
    asset_resolver: Option<Box<dyn AssetResolver>>,
    session_id: SessionId,
}

impl<V, R, U, M> Publisher<V, R, U, M>
where
    V: VaultReader,
    R: MarkdownRenderer,
    U: NoteUploader,
    M: ManifestStore,
{
    pub fn new(vault: V, renderer: R, uploader: U, manifest_store: M) -> Self {
        Self {
            vault,
            renderer,
            uploader,
            manifest_store,
            asset_resolver: None,
            session_id: SessionId::generate(),
        }
    }

    /// Pin the session id; manifests merge only within the same session.
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_asset_resolver(mut self, resolver: Box<dyn AssetResolver>) -> Self {
        self.asset_resolver = Some(resolver);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    pub fn manifest_store(&self) -> &M {
        &self.manifest_store
    }

    pub async fn publish(&self, config: &PublishConfig) -> Result<PublishOutcome, PublishError> {
        self.publish_with_progress(config, |_| {}).await
    }

    pub async fn publish_with_progress(
        &self,
        config: &PublishConfig,
        mut on_progress: impl FnMut(PublishProgress),
    ) -> Result<PublishOutcome, PublishError> {
        if config.vps.is_empty() || config.folders.is_empty() {
            tracing::info!("nothing configured, publish is a no-op");
            return Ok(PublishOutcome::NoConfig);
        }

        // Every folder must map to a known target before any note is read.
        let missing: Vec<MissingVps> = config
            .folders
            .iter()
            .filter(|folder| config.vps_by_id(&folder.vps_id).is_none())
            .map(|folder| MissingVps {
                folder: folder.name.clone(),
                vps_id: folder.vps_id.clone(),
            })
            .collect();
        if !missing.is_empty() {
            tracing::warn!(count = missing.len(), "folders with unknown vps targets");
            return Ok(PublishOutcome::MissingVpsConfig(missing));
        }

        let mut notes: Vec<PublishableNote> = Vec::new();
        let mut errors: Vec<NoteFailure> = Vec::new();
        let mut skipped = 0usize;

        for folder in &config.folders {
            // Checked above; a folder with an unknown target never gets here.
            let Some(vps) = config.vps_by_id(&folder.vps_id).cloned() else {
                continue;
            };

            on_progress(PublishProgress {
                phase: PublishPhase::Collecting,
                folder: Some(folder.name.clone()),
                processed: 0,
                total: 0,
            });
            let raw_notes = self.vault.collect_from_folder(folder).await?;
            tracing::info!(folder = %folder.name, count = raw_notes.len(), "collected notes");

            let rules = RuleSet::compile(&folder.sanitization_rules)?;
            let total = raw_notes.len();

            for (processed, raw) in raw_notes.into_iter().enumerate() {
                match self.process_note(raw, folder, &vps, &rules, &mut errors) {
                    Processed::Published(note) => {
                        notes.push(note);
                        on_progress(PublishProgress {
                            phase: PublishPhase::Transforming,
                            folder: Some(folder.name.clone()),
                            processed: processed + 1,
                            total,
                        });
                    }
                    Processed::Skipped => {
                        skipped += 1;
                        on_progress(PublishProgress {
                            phase: PublishPhase::Filtering,
                            folder: Some(folder.name.clone()),
                            processed: processed + 1,
                            total,
                        });
                    }
                    Processed::Failed => {
                        on_progress(PublishProgress {
                            phase: PublishPhase::Transforming,
                            folder: Some(folder.name.clone()),
                            processed: processed + 1,
                            total,
                        });
                    }
                }
            }
        }

        // Wikilink resolution is a batch step over every routed note.
        let index = AliasIndex::build(&notes);
        tracing::debug!(aliases = index.len(), notes = notes.len(), "alias index built");
        for note in &mut notes {
            if let Some(links) = note.wikilinks.clone() {
                note.resolved_wikilinks = Some(resolve_wikilinks(&links, &index));
            }
        }

        on_progress(PublishProgress {
            phase: PublishPhase::Grouping,
            folder: None,
            processed: 0,
            total: notes.len(),
        });
        let batches = group_by_target(config, notes);

        let published: usize = batches.iter().map(|(_, notes)| notes.len()).sum();
        let batch_count = batches.len();
        let mut targets = Vec::new();
        let mut completed = Vec::new();

        for (vps, batch_notes) in batches {
            on_progress(PublishProgress {
                phase: PublishPhase::Uploading,
                folder: None,
                processed: completed.len(),
                total: batch_count,
            });

            let assets = self.resolve_assets(&batch_notes).await;
            let batch = UploadBatch {
                vps: vps.clone(),
                notes: batch_notes,
                assets,
            };

            let accepted = match self.uploader.upload(&batch).await {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::error!(vps = %vps.name, error = %err, "batch upload failed");
                    return Ok(PublishOutcome::Error(PublishFailure {
                        message: err.to_string(),
                        completed,
                    }));
                }
            };
            if !accepted {
                tracing::error!(vps = %vps.name, "batch rejected by target");
                return Ok(PublishOutcome::Error(PublishFailure {
                    message: format!("Upload rejected by '{}'", vps.name),
                    completed,
                }));
            }

            // Merge this batch into the persisted manifest right away so an
            // abort later in the run cannot lose acknowledged uploads.
            let pages: Vec<ManifestPage> = batch
                .notes
                .iter()
                .filter_map(ManifestPage::from_note)
                .collect();
            let existing = self.manifest_store.load(&vps.id)?;
            let manifest = Manifest::merge(existing, &self.session_id, pages, Utc::now());
            self.manifest_store.save(&vps.id, &manifest)?;

            let index_pages = render_site_indexes(&manifest);
            tracing::info!(
                vps = %vps.name,
                notes = batch.notes.len(),
                pages = manifest.pages.len(),
                "batch uploaded and manifest merged"
            );

            completed.push(vps.id.clone());
            targets.push(TargetResult {
                vps_id: vps.id,
                manifest,
                index_pages,
            });
        }

        on_progress(PublishProgress {
            phase: PublishPhase::Done,
            folder: None,
            processed: published,
            total: published,
        });
        Ok(PublishOutcome::Done(PublishSummary {
            published,
            skipped,
            errors,
            targets,
        }))
    }

    /// Run one note through filtering and every transform stage. Render
    /// failures drop the note and record a `NoteFailure`.
    fn process_note(
        &self,
        raw: RawNote,
        folder: &FolderConfig,
        vps: &VpsConfig,
        rules: &RuleSet,
        errors: &mut Vec<NoteFailure>,
    ) -> Processed {
        let frontmatter = DomainFrontmatter::normalize(raw.frontmatter.as_ref());
        let eligibility = ignore::evaluate(&frontmatter, Some(folder.ignore_rules.as_slice()));
        if !eligibility.is_publishable {
            tracing::debug!(path = %raw.relative_path, "note skipped by ignore rule");
            return Processed::Skipped;
        }

        let core = NoteCore::from_raw(raw, frontmatter, folder, vps);
        let note = PublishableNote::new(core, Utc::now());

        let content = render_expressions(&note.core.content, &note.core.frontmatter);
        let sanitized = rules.apply(&content);
        let note = note.with_content(sanitized.content);

        let html = match self.renderer.render(&note.core.content) {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(path = %note.core.relative_path, error = %err, "render failed, note dropped");
                errors.push(NoteFailure {
                    note_id: note.core.note_id.clone(),
                    relative_path: note.core.relative_path.clone(),
                    message: err.to_string(),
                });
                return Processed::Failed;
            }
        };

        let mut assets = detect_assets(&note.core.content);
        assets.extend(detect_frontmatter_assets(
            &note.core.frontmatter,
            &folder.asset_properties,
        ));
        let wikilinks = detect_wikilinks(&note.core.content);
        let routing = compute_routing(
            &note.core.note_id,
            &folder.route_base,
            &note.core.relative_path,
        );

        Processed::Published(
            note.with_html(html)
                .with_assets(assets)
                .with_wikilinks(wikilinks)
                .with_routing(routing),
        )
    }

    /// Locate asset files for a batch. A missing asset or resolver failure
    /// is logged and skipped; it never fails the batch.
    async fn resolve_assets(&self, notes: &[PublishableNote]) -> Vec<ResolvedAssetFile> {
        let Some(resolver) = self.asset_resolver.as_ref() else {
            return Vec::new();
        };

        let mut resolved = Vec::new();
        for note in notes {
            let Some(assets) = note.assets.as_ref() else {
                continue;
            };
            for asset in assets {
                match resolver
                    .resolve(note, asset, note.core.folder.vault_asset_fallback)
                    .await
                {
                    Ok(Some(file)) => resolved.push(file),
                    Ok(None) => {
                        tracing::warn!(target = %asset.target, note = %note.core.relative_path, "asset not found")
                    }
                    Err(err) => {
                        tracing::warn!(target = %asset.target, error = %err, "asset resolution failed")
                    }
                }
            }
        }
        resolved
    }
}

enum Processed {
    Published(PublishableNote),
    Skipped,
    Failed,
}

/// Group transformed notes per target, preserving the order in which each
/// target first appears in the note stream.
fn group_by_target(
    config: &PublishConfig,
    notes: Vec<PublishableNote>,
) -> Vec<(VpsConfig, Vec<PublishableNote>)> {
    let mut batches: Vec<(VpsConfig, Vec<PublishableNote>)> = Vec::new();
    for note in notes {
        let vps_id = note.core.vps.id.clone();
        match batches.iter_mut().find(|(vps, _)| vps.id == vps_id) {
            Some((_, batch)) => batch.push(note),
            None => {
                let Some(vps) = config.vps_by_id(&vps_id) else {
                    continue;
                };
                batches.push((vps.clone(), vec![note]));
            }
        }
    }
    batches
}
