//! Integration tests for the publication pipeline.
//!
//! These run the full orchestrator over in-memory collaborators and a real
//! filesystem manifest store, end to end.

use async_trait::async_trait;
use mica_core::config::{FolderConfig, PublishConfig, VpsConfig};
use mica_core::ignore::IgnoreRule;
use mica_core::manifest::FsManifestStore;
use mica_core::models::RawNote;
use mica_core::publisher::{PublishOutcome, Publisher};
use mica_core::render::{CmarkRenderer, MarkdownRenderer, RenderError};
use mica_core::upload::{NoteUploader, UploadBatch, UploadError};
use mica_core::vault::MemoryVault;
use mica_types::{SessionId, VpsId};
use serde_json::{json, Map, Value};
use std::sync::Mutex;

struct AcceptAllUploader {
    batches: Mutex<Vec<UploadBatch>>,
}

impl AcceptAllUploader {
    fn new() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NoteUploader for AcceptAllUploader {
    async fn upload(&self, batch: &UploadBatch) -> Result<bool, UploadError> {
        self.batches
            .lock()
            .expect("uploader mutex poisoned")
            .push(batch.clone());
        Ok(true)
    }
}

/// Fails on a content marker so a single note can be made unrenderable.
struct PickyRenderer {
    inner: CmarkRenderer,
}

impl MarkdownRenderer for PickyRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        if markdown.contains("BOOM") {
            return Err(RenderError::Failed("marker hit".to_string()));
        }
        self.inner.render(markdown)
    }
}

fn vps(id: &str) -> VpsConfig {
    VpsConfig {
        id: VpsId::new(id),
        name: format!("target-{id}"),
        base_url: format!("https://{id}.example"),
        api_key: "secret".to_string(),
    }
}

fn folder(name: &str, vps_id: &str) -> FolderConfig {
    FolderConfig {
        name: name.to_string(),
        source_path: format!("/vault/{name}"),
        route_base: format!("/{name}"),
        vps_id: VpsId::new(vps_id),
        ignore_rules: Vec::new(),
        sanitization_rules: Vec::new(),
        asset_properties: Vec::new(),
        vault_asset_fallback: false,
    }
}

fn note(relative_path: &str, content: &str, fm: &[(&str, Value)]) -> RawNote {
    let frontmatter = if fm.is_empty() {
        None
    } else {
        Some(
            fm.iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    };
    RawNote::new(
        format!("/vault/{relative_path}"),
        relative_path,
        content,
        frontmatter,
    )
}

#[tokio::test]
async fn publishes_filters_and_reports_failures_in_one_run() {
    let mut vault = MemoryVault::new();
    vault.insert(
        "docs",
        vec![
            note(
                "Getting Started.md",
                "# Welcome\n\nHello",
                &[("title", json!("Getting Started"))],
            ),
            note("Draft.md", "not ready", &[("publish", json!(false))]),
            note("Broken.md", "BOOM", &[]),
        ],
    );

    let mut docs = folder("docs", "v1");
    docs.ignore_rules = vec![IgnoreRule {
        property: "publish".to_string(),
        ignore_if: Some(false),
        ignore_values: None,
    }];
    let config = PublishConfig {
        vps: vec![vps("v1")],
        folders: vec![docs],
    };

    let dir = tempfile::tempdir().unwrap();
    let publisher = Publisher::new(
        vault,
        PickyRenderer {
            inner: CmarkRenderer::new(),
        },
        AcceptAllUploader::new(),
        FsManifestStore::new(dir.path()),
    );

    let summary = match publisher.publish(&config).await.unwrap() {
        PublishOutcome::Done(summary) => summary,
        other => panic!("expected Done, got {other:?}"),
    };

    assert_eq!(summary.published, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].relative_path, "Broken.md");

    let manifest = &summary.targets[0].manifest;
    assert_eq!(manifest.pages.len(), 1);
    assert_eq!(manifest.pages[0].title, "Getting Started");
    assert_eq!(manifest.pages[0].route, "/docs/getting-started");

    // The site index fragments reflect exactly the published page.
    let root = summary.targets[0]
        .index_pages
        .iter()
        .find(|i| i.route == "/index")
        .unwrap();
    assert!(root.html.contains("docs (1)"));
}

#[tokio::test]
async fn wikilinks_resolve_against_published_titles() {
    let mut vault = MemoryVault::new();
    vault.insert(
        "wiki",
        vec![
            note("Rust Notes.md", "about rust", &[]),
            note("Index.md", "start with [[Rust Notes#Setup|setup]]", &[]),
        ],
    );
    let config = PublishConfig {
        vps: vec![vps("v1")],
        folders: vec![folder("wiki", "v1")],
    };

    let dir = tempfile::tempdir().unwrap();
    let publisher = Publisher::new(
        vault,
        CmarkRenderer::new(),
        AcceptAllUploader::new(),
        FsManifestStore::new(dir.path()),
    );
    let outcome = publisher.publish(&config).await.unwrap();
    assert!(matches!(outcome, PublishOutcome::Done(_)));

    let batches = publisher_batches(&publisher);
    let index_note = batches[0]
        .notes
        .iter()
        .find(|n| n.core.relative_path == "Index.md")
        .unwrap();
    let resolved = index_note.resolved_wikilinks.as_ref().unwrap();
    assert_eq!(resolved.len(), 1);
    assert!(resolved[0].is_resolved);
    assert_eq!(resolved[0].href.as_deref(), Some("/wiki/rust-notes#Setup"));
    assert_eq!(resolved[0].link.alias.as_deref(), Some("setup"));
}

#[tokio::test]
async fn manifest_accumulates_within_a_session_and_resets_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionId::new("session-one");
    let config = PublishConfig {
        vps: vec![vps("v1")],
        folders: vec![folder("docs", "v1")],
    };

    let mut vault = MemoryVault::new();
    vault.insert("docs", vec![note("First.md", "one", &[])]);
    let run1 = Publisher::new(
        vault,
        CmarkRenderer::new(),
        AcceptAllUploader::new(),
        FsManifestStore::new(dir.path()),
    )
    .with_session_id(session.clone());
    assert!(matches!(
        run1.publish(&config).await.unwrap(),
        PublishOutcome::Done(_)
    ));

    // Second run, same session: the earlier page is preserved.
    let mut vault = MemoryVault::new();
    vault.insert("docs", vec![note("Second.md", "two", &[])]);
    let run2 = Publisher::new(
        vault,
        CmarkRenderer::new(),
        AcceptAllUploader::new(),
        FsManifestStore::new(dir.path()),
    )
    .with_session_id(session.clone());
    let summary = match run2.publish(&config).await.unwrap() {
        PublishOutcome::Done(summary) => summary,
        other => panic!("expected Done, got {other:?}"),
    };
    let manifest = &summary.targets[0].manifest;
    assert_eq!(manifest.pages.len(), 2);
    assert!(manifest.pages.iter().any(|p| p.route == "/docs/first"));
    assert!(manifest.pages.iter().any(|p| p.route == "/docs/second"));

    // Third run under a new session replaces the manifest wholesale.
    let mut vault = MemoryVault::new();
    vault.insert("docs", vec![note("Third.md", "three", &[])]);
    let run3 = Publisher::new(
        vault,
        CmarkRenderer::new(),
        AcceptAllUploader::new(),
        FsManifestStore::new(dir.path()),
    )
    .with_session_id(SessionId::new("session-two"));
    let summary = match run3.publish(&config).await.unwrap() {
        PublishOutcome::Done(summary) => summary,
        other => panic!("expected Done, got {other:?}"),
    };
    let manifest = &summary.targets[0].manifest;
    assert_eq!(manifest.session_id, SessionId::new("session-two"));
    assert_eq!(manifest.pages.len(), 1);
    assert_eq!(manifest.pages[0].route, "/docs/third");
}

fn publisher_batches(
    publisher: &Publisher<MemoryVault, CmarkRenderer, AcceptAllUploader, FsManifestStore>,
) -> Vec<UploadBatch> {
    publisher
        .uploader()
        .batches
        .lock()
        .expect("uploader mutex poisoned")
        .clone()
}
