//! Vault-reader collaborator seam. The core never reads vault files
//! directly.

use crate::config::FolderConfig;
use crate::models::RawNote;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Failed to collect notes from folder '{folder}': {message}")]
    Collect { folder: String, message: String },
}

/// Host-side adapter that physically reads notes for a configured folder.
#[async_trait]
pub trait VaultReader: Send + Sync {
    async fn collect_from_folder(&self, folder: &FolderConfig) -> Result<Vec<RawNote>, VaultError>;
}

/// In-memory vault keyed by folder name, for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryVault {
    folders: HashMap<String, Vec<RawNote>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, folder_name: impl Into<String>, notes: Vec<RawNote>) {
        self.folders.insert(folder_name.into(), notes);
    }
}

#[async_trait]
impl VaultReader for MemoryVault {
    async fn collect_from_folder(&self, folder: &FolderConfig) -> Result<Vec<RawNote>, VaultError> {
        Ok(self.folders.get(&folder.name).cloned().unwrap_or_default())
    }
}
