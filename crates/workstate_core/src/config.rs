//! Configuration for the artifact and session stores.

use crate::error::{Result, WorkstateError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file inside the workspace base.
pub const CONFIG_FILE: &str = "workstate.toml";

/// Comprehensive configuration for a workstate workspace.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Workspace base directory. Every path the stores touch lives under it.
    #[serde(skip)]
    pub base_path: PathBuf,

    /// Artifact collection configuration.
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Session store configuration.
    #[serde(default)]
    pub sessions: SessionsConfig,
}

impl Config {
    /// Default configuration rooted at `base`.
    pub fn with_base(base: impl AsRef<Path>) -> Self {
        Self {
            base_path: base.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Load configuration from `<base>/workstate.toml`.
    ///
    /// A missing file yields the defaults.
    pub fn load(base: &Path) -> Result<Self> {
        let path = base.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                WorkstateError::Configuration(format!("failed to read config: {}", e))
            })?;
            toml::from_str::<Config>(&content).map_err(|e| {
                WorkstateError::Configuration(format!("failed to parse config: {}", e))
            })?
        } else {
            Config::default()
        };
        config.base_path = base.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `<base>/workstate.toml`.
    pub fn save(&self, base: &Path) -> Result<()> {
        let path = base.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self).map_err(|e| {
            WorkstateError::Configuration(format!("failed to serialize config: {}", e))
        })?;
        fs::write(&path, content).map_err(|e| {
            WorkstateError::Configuration(format!("failed to write config: {}", e))
        })?;
        Ok(())
    }

    /// Checks invariants that the stores rely on.
    pub fn validate(&self) -> Result<()> {
        let artifacts = &self.artifacts;
        if !artifacts.collections.contains_key(&artifacts.primary_type) {
            return Err(WorkstateError::Configuration(format!(
                "primary type '{}' has no collection",
                artifacts.primary_type
            )));
        }

        let mut prefixes = HashSet::new();
        for (type_name, collection) in &artifacts.collections {
            if collection.directory.trim().is_empty() {
                return Err(WorkstateError::Configuration(format!(
                    "collection '{}' has an empty directory",
                    type_name
                )));
            }
            let prefix = collection.prefix_for(type_name);
            if prefix.is_empty() {
                return Err(WorkstateError::Configuration(format!(
                    "collection '{}' has an empty id prefix",
                    type_name
                )));
            }
            if !prefixes.insert(prefix.clone()) {
                return Err(WorkstateError::Configuration(format!(
                    "id prefix '{}' is used by more than one collection",
                    prefix
                )));
            }
        }

        if self.sessions.directory.trim().is_empty() {
            return Err(WorkstateError::Configuration(
                "sessions directory is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Artifact store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Type used when a create request names none (default: "issue").
    pub primary_type: String,

    /// How new artifact files are named (default: counter).
    pub naming: NamingStrategy,

    /// Type name to collection binding.
    pub collections: BTreeMap<String, CollectionConfig>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        let mut collections = BTreeMap::new();
        collections.insert("issue".to_string(), CollectionConfig::new("issues", "ISS"));
        collections.insert(
            "specification".to_string(),
            CollectionConfig::new("specifications", "SPEC"),
        );
        collections.insert("idea".to_string(), CollectionConfig::new("ideas", "IDEA"));

        Self {
            primary_type: "issue".to_string(),
            naming: NamingStrategy::default(),
            collections,
        }
    }
}

/// One `type -> directory` binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Directory relative to the workspace base (absolute paths are allowed
    /// but must still resolve inside it).
    pub directory: String,

    /// Identifier prefix. Derived from the type name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl CollectionConfig {
    /// Creates a binding with an explicit prefix.
    pub fn new(directory: &str, prefix: &str) -> Self {
        Self {
            directory: directory.to_string(),
            prefix: Some(prefix.to_string()),
        }
    }

    /// Returns the configured prefix, or the upper-cased first four
    /// characters of the type name.
    pub fn prefix_for(&self, type_name: &str) -> String {
        match &self.prefix {
            Some(prefix) => prefix.trim().to_string(),
            None => type_name.chars().take(4).collect::<String>().to_uppercase(),
        }
    }
}

/// Filename scheme for new artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    /// `{id}-{slug}.md`
    #[default]
    Counter,
    /// `{slug}-{id}.md`
    Slug,
    /// `{epochMillis}-{slug}.md`
    Timestamp,
}

/// Session store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Directory relative to the workspace base (default: "sessions").
    pub directory: String,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            directory: "sessions".to_string(),
        }
    }
}
