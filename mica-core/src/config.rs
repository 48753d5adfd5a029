//! Publish target and folder configuration.

use crate::ignore::IgnoreRule;
use crate::sanitize::SanitizationRule;
use mica_types::VpsId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Duplicate VPS name: {0}")]
    DuplicateVpsName(String),

    #[error("Duplicate VPS URL: {0}")]
    DuplicateVpsUrl(String),

    #[error("VPS '{0}' has no folders configured")]
    VpsWithoutFolders(String),
}

/// A named upload destination with its own API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpsConfig {
    pub id: VpsId,
    pub name: String,
    pub base_url: String,
    pub api_key: String,
}

/// One published vault folder and the pipeline settings that apply to its
/// notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderConfig {
    pub name: String,
    /// Vault location the reader collects from.
    pub source_path: String,
    #[serde(default = "default_route_base")]
    pub route_base: String,
    pub vps_id: VpsId,
    #[serde(default)]
    pub ignore_rules: Vec<IgnoreRule>,
    #[serde(default)]
    pub sanitization_rules: Vec<SanitizationRule>,
    /// Frontmatter properties whose values declare assets.
    #[serde(default)]
    pub asset_properties: Vec<String>,
    /// Allow vault-wide asset lookup when a folder-relative lookup misses.
    #[serde(default)]
    pub vault_asset_fallback: bool,
}

fn default_route_base() -> String {
    String::from("/")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub vps: Vec<VpsConfig>,
    #[serde(default)]
    pub folders: Vec<FolderConfig>,
}

impl PublishConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn vps_by_id(&self, id: &VpsId) -> Option<&VpsConfig> {
        self.vps.iter().find(|v| &v.id == id)
    }

    /// Validate domain invariants. Violations block the run before any note
    /// is collected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        let mut urls = HashSet::new();
        for vps in &self.vps {
            if !names.insert(vps.name.as_str()) {
                return Err(ConfigError::DuplicateVpsName(vps.name.clone()));
            }
            if !urls.insert(vps.base_url.as_str()) {
                return Err(ConfigError::DuplicateVpsUrl(vps.base_url.clone()));
            }
        }
        for vps in &self.vps {
            if !self.folders.iter().any(|f| f.vps_id == vps.id) {
                return Err(ConfigError::VpsWithoutFolders(vps.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vps(id: &str, name: &str, url: &str) -> VpsConfig {
        VpsConfig {
            id: VpsId::new(id),
            name: name.to_string(),
            base_url: url.to_string(),
            api_key: "key".to_string(),
        }
    }

    fn folder(name: &str, vps_id: &str) -> FolderConfig {
        FolderConfig {
            name: name.to_string(),
            source_path: format!("/vault/{name}"),
            route_base: "/".to_string(),
            vps_id: VpsId::new(vps_id),
            ignore_rules: Vec::new(),
            sanitization_rules: Vec::new(),
            asset_properties: Vec::new(),
            vault_asset_fallback: false,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = PublishConfig {
            vps: vec![vps("v1", "main", "https://a.example")],
            folders: vec![folder("docs", "v1")],
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_vps_name() {
        let config = PublishConfig {
            vps: vec![
                vps("v1", "main", "https://a.example"),
                vps("v2", "main", "https://b.example"),
            ],
            folders: vec![folder("a", "v1"), folder("b", "v2")],
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateVpsName(name)) if name == "main"
        ));
    }

    #[test]
    fn test_duplicate_vps_url() {
        let config = PublishConfig {
            vps: vec![
                vps("v1", "main", "https://a.example"),
                vps("v2", "other", "https://a.example"),
            ],
            folders: vec![folder("a", "v1"), folder("b", "v2")],
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateVpsUrl(_))
        ));
    }

    #[test]
    fn test_vps_without_folders() {
        let config = PublishConfig {
            vps: vec![vps("v1", "main", "https://a.example")],
            folders: Vec::new(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::VpsWithoutFolders(name)) if name == "main"
        ));
    }

    #[test]
    fn test_yaml_parsing_with_defaults() {
        let yaml = r#"
vps:
  - id: v1
    name: main
    base_url: https://a.example
    api_key: secret
folders:
  - name: docs
    source_path: /vault/docs
    vps_id: v1
"#;
        let config = PublishConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.folders[0].route_base, "/");
        assert!(config.folders[0].ignore_rules.is_empty());
        assert!(!config.folders[0].vault_asset_fallback);
        assert!(config.validate().is_ok());
    }
}
