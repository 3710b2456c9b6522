//! Version log entry types.
//!
//! Each lifecycle event appends one immutable entry to the entity's
//! `<table>_versions` side table; entries are never updated in place
//! except for soft-delete tombstoning.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle action that produced a version entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionAction {
    /// Entity was created.
    Create,
    /// Entity fields were updated (including restores).
    Update,
    /// Entity was soft-deleted.
    Delete,
}

impl VersionAction {
    /// Convert to string for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parse from the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Acting-user metadata captured alongside a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Acting authenticated-user identifier, if any.
    pub user_id: Option<String>,
    /// Client network address, if known.
    pub ip_address: Option<String>,
}

/// One row of a `<table>_versions` log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionLogEntry {
    /// Surrogate key, unique and monotonic within the side table.
    pub version_id: i64,
    /// Primary key of the entity this entry belongs to.
    pub original_id: i64,
    /// Sequential version number within this entity (1, 2, 3...).
    pub version_number: u32,
    /// What lifecycle event produced this entry.
    pub action: VersionAction,
    /// Snapshot of the versionable fields at event time.
    pub data: BTreeMap<String, Value>,
    /// Acting user and client address, if captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VersionMetadata>,
    /// When this entry was inserted.
    pub created_at: DateTime<Utc>,
    /// Set at insert; equals `created_at` unless the schema evolves.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl VersionLogEntry {
    /// Whether this entry has been tombstoned.
    pub fn is_tombstoned(&self) -> bool {
        self.deleted_at.is_some()
    }
}
