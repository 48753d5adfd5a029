//! # mica-core
//!
//! Core library for the mica note publication pipeline.
//!
//! This crate turns a vault of markdown notes into routed, rendered,
//! cross-linked pages and pushes them to configured targets. Vault access,
//! markdown rendering, uploading and manifest persistence are collaborator
//! traits; everything between them is pure transformation over note values.

pub mod assets;
pub mod config;
pub mod expressions;
pub mod frontmatter;
pub mod ignore;
pub mod manifest;
pub mod models;
pub mod publisher;
pub mod render;
pub mod routing;
pub mod sanitize;
pub mod site_index;
pub mod slug;
pub mod upload;
pub mod vault;
pub mod wikilinks;

pub use config::{FolderConfig, PublishConfig, VpsConfig};
pub use frontmatter::DomainFrontmatter;
pub use manifest::{FsManifestStore, Manifest, ManifestPage, ManifestStore, MemoryManifestStore};
pub use models::{NoteCore, PublishableNote, RawNote};
pub use publisher::{
    PublishOutcome, PublishPhase, PublishProgress, PublishSummary, Publisher, TargetResult,
};
pub use render::{CmarkRenderer, MarkdownRenderer};
pub use slug::slugify;
pub use upload::{ChunkTransport, ChunkedUpload, NoteUploader, RetryPolicy, UploadBatch};
pub use vault::{MemoryVault, VaultReader};
