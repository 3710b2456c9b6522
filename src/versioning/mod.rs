//! Per-entity version logs: lazy side-table creation, append-only
//! recording, and snapshot restore.
//!
//! Each lifecycle event appends an immutable snapshot row to
//! `<table>_versions`, enabling history queries and restoring an entity to
//! any recorded state.

mod entry;
mod recorder;
mod schema;
mod store;

pub use entry::{VersionAction, VersionLogEntry, VersionMetadata};
pub use recorder::{RestoreOutcome, Versioner};
pub use schema::version_table_name;
pub use store::VersionStore;
