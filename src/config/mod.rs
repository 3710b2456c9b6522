//! Configuration system for rowver.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RowverError, RowverResult};

/// Per-entity-table versioning policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityPolicy {
    /// Record a version entry on entity creation. Off by default.
    pub version_on_create: bool,
    /// Allow-list of fields captured in snapshots; `None` captures every
    /// writable field.
    pub versionable: Option<Vec<String>>,
}

/// Main versioning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    /// Path to the versioning database (`:memory:` accepted). May equal the
    /// primary database path.
    pub database_path: PathBuf,
    /// Enforce the cascading foreign key from log rows to entity rows.
    /// Requires the entity tables to live in the same database as the log;
    /// turn off when the versioning store is a separate file.
    pub enforce_cascade: bool,
    /// Policies keyed by entity table name.
    pub entities: HashMap<String, EntityPolicy>,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        let rowver_dir = dirs::home_dir()
            .map(|h| h.join(".rowver"))
            .unwrap_or_else(|| PathBuf::from(".rowver"));

        Self {
            database_path: rowver_dir.join("versions.db"),
            enforce_cascade: true,
            entities: HashMap::new(),
        }
    }
}

impl VersioningConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> RowverResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| RowverError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| RowverError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| RowverError::Configuration(e.to_string())),
            _ => Err(RowverError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("ROWVER_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> VersioningConfigBuilder {
        VersioningConfigBuilder::default()
    }

    /// Policy for an entity table; tables never configured get the defaults.
    pub fn policy_for(&self, table: &str) -> EntityPolicy {
        self.entities.get(table).cloned().unwrap_or_default()
    }
}

/// Builder for VersioningConfig.
#[derive(Default)]
pub struct VersioningConfigBuilder {
    config: VersioningConfig,
}

impl VersioningConfigBuilder {
    /// Set the versioning database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Enable or disable cascade enforcement.
    pub fn enforce_cascade(mut self, on: bool) -> Self {
        self.config.enforce_cascade = on;
        self
    }

    /// Record create events for an entity table.
    pub fn version_on_create(mut self, table: impl Into<String>) -> Self {
        self.config
            .entities
            .entry(table.into())
            .or_default()
            .version_on_create = true;
        self
    }

    /// Declare the snapshot allow-list for an entity table.
    pub fn versionable<I, S>(mut self, table: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.entities.entry(table.into()).or_default().versionable =
            Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> VersioningConfig {
        self.config
    }
}
