//! rowver - automatic revision history for SQLite-backed entities.
//!
//! Every create/update/delete notification appends an immutable snapshot of
//! the entity's versionable fields, plus acting-user metadata and a
//! sequential version number, to a lazily created `<table>_versions` side
//! table. Past snapshots can be restored in place or as brand-new entities.
//!
//! # Example
//!
//! ```ignore
//! use rowver::{RequestContext, Versioner, VersioningConfig};
//!
//! let config = VersioningConfig::builder()
//!     .database_path("app.db")
//!     .versionable("articles", ["title", "body"])
//!     .build();
//! let versioner = Versioner::open(config)?;
//!
//! // After the host persists an update:
//! versioner.on_entity_updated(&article, &RequestContext::anonymous().with_user("u1"))?;
//!
//! // History, newest first:
//! let versions = versioner.versions::<Article>(article_id)?;
//!
//! // Roll the entity back to a recorded snapshot:
//! versioner.restore_version(&mut article, versions[1].version_id, false, &repo, &ctx)?;
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod versioning;

// Re-export commonly used types
pub use config::{EntityPolicy, VersioningConfig, VersioningConfigBuilder};
pub use entity::{DeleteKind, EntityRepository, RequestContext, VersionedEntity};
pub use error::{RowverError, RowverResult};
pub use versioning::{
    version_table_name, RestoreOutcome, VersionAction, VersionLogEntry, VersionMetadata,
    VersionStore, Versioner,
};
