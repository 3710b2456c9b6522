//! SQLite-backed persistence for the version log.
//!
//! One [`VersionStore`] owns the versioning connection for the whole
//! process; it may point at the same database file as the primary store or
//! at a separate one.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;

use crate::error::{RowverError, RowverResult};
use crate::versioning::entry::{VersionAction, VersionLogEntry, VersionMetadata};
use crate::versioning::schema::{self, version_table_name};

const ENTRY_COLUMNS: &str = "version_id, original_id, version_number, action, data, metadata, \
                             created_at, updated_at, deleted_at";

/// SQLite-backed version log store.
pub struct VersionStore {
    conn: Mutex<Connection>,
    enforce_cascade: bool,
}

impl VersionStore {
    /// Open a store at the given path (`:memory:` accepted).
    pub fn open(path: impl AsRef<Path>, enforce_cascade: bool) -> RowverResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = if path.as_ref().to_str() == Some(":memory:") {
            Connection::open_in_memory()
        } else {
            Connection::open(path.as_ref())
        }?;

        Self::with_connection(conn, enforce_cascade)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> RowverResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, true)
    }

    /// Wrap a caller-supplied connection, e.g. one sharing the primary
    /// database file.
    pub fn with_connection(conn: Connection, enforce_cascade: bool) -> RowverResult<Self> {
        if enforce_cascade {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
            enforce_cascade,
        })
    }

    /// Ensure the `<entity_table>_versions` side table exists. Idempotent.
    pub fn ensure_table(&self, entity_table: &str) -> RowverResult<()> {
        let conn = self.conn.lock().unwrap();
        schema::ensure_version_table(&conn, entity_table, self.enforce_cascade)
    }

    /// Append one log row, assigning the next sequential version number for
    /// the entity.
    ///
    /// The max-read and the insert run inside a single immediate transaction,
    /// so concurrent writers against the same store cannot assign duplicate
    /// version numbers; `UNIQUE(original_id, version_number)` backs this at
    /// the schema level.
    pub fn append(
        &self,
        entity_table: &str,
        original_id: i64,
        action: VersionAction,
        data: &BTreeMap<String, Value>,
        metadata: Option<&VersionMetadata>,
    ) -> RowverResult<VersionLogEntry> {
        schema::check_identifier(entity_table)?;
        let table = version_table_name(entity_table);
        let data_json = serde_json::to_string(data)?;
        let metadata_json = metadata.map(serde_json::to_string).transpose()?;
        let now = Utc::now();

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let max: Option<u32> = tx.query_row(
            &format!(r#"SELECT MAX(version_number) FROM "{table}" WHERE original_id = ?1"#),
            params![original_id],
            |row| row.get(0),
        )?;
        let version_number = max.unwrap_or(0) + 1;

        tx.execute(
            &format!(
                r#"INSERT INTO "{table}"
                   (original_id, version_number, action, data, metadata, created_at, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#
            ),
            params![
                original_id,
                version_number,
                action.as_str(),
                data_json,
                metadata_json,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;
        let version_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(VersionLogEntry {
            version_id,
            original_id,
            version_number,
            action,
            data: data.clone(),
            metadata: metadata.cloned(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// All live entries for an entity, newest first.
    ///
    /// An entity with no history (including one whose side table was never
    /// created) yields an empty vector, never an error.
    pub fn list(&self, entity_table: &str, original_id: i64) -> RowverResult<Vec<VersionLogEntry>> {
        schema::check_identifier(entity_table)?;
        let table = version_table_name(entity_table);
        let conn = self.conn.lock().unwrap();
        if !schema::table_exists(&conn, &table)? {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {ENTRY_COLUMNS}
               FROM "{table}"
               WHERE original_id = ?1 AND deleted_at IS NULL
               ORDER BY version_number DESC"#
        ))?;

        let results = stmt.query_map(params![original_id], |row| Ok(Self::row_to_entry(row)))?;

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }

    /// Look up a single live entry by its version id.
    pub fn get(&self, entity_table: &str, version_id: i64) -> RowverResult<Option<VersionLogEntry>> {
        schema::check_identifier(entity_table)?;
        let table = version_table_name(entity_table);
        let conn = self.conn.lock().unwrap();
        if !schema::table_exists(&conn, &table)? {
            return Ok(None);
        }

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {ENTRY_COLUMNS}
               FROM "{table}"
               WHERE version_id = ?1 AND deleted_at IS NULL"#
        ))?;

        stmt.query_row(params![version_id], |row| Ok(Self::row_to_entry(row)))
            .optional()?
            .transpose()
    }

    /// Tombstone one entry without physically removing it.
    ///
    /// Returns whether a live entry was marked.
    pub fn tombstone(&self, entity_table: &str, version_id: i64) -> RowverResult<bool> {
        schema::check_identifier(entity_table)?;
        let table = version_table_name(entity_table);
        let conn = self.conn.lock().unwrap();
        if !schema::table_exists(&conn, &table)? {
            return Ok(false);
        }

        let marked = conn.execute(
            &format!(
                r#"UPDATE "{table}" SET deleted_at = ?1
                   WHERE version_id = ?2 AND deleted_at IS NULL"#
            ),
            params![Utc::now().to_rfc3339(), version_id],
        )?;
        Ok(marked > 0)
    }

    /// Total entries in an entity's side table, tombstoned included.
    pub fn count(&self, entity_table: &str) -> RowverResult<usize> {
        schema::check_identifier(entity_table)?;
        let table = version_table_name(entity_table);
        let conn = self.conn.lock().unwrap();
        if !schema::table_exists(&conn, &table)? {
            return Ok(0);
        }

        let count: i64 =
            conn.query_row(&format!(r#"SELECT COUNT(*) FROM "{table}""#), [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }

    fn row_to_entry(row: &rusqlite::Row<'_>) -> RowverResult<VersionLogEntry> {
        let version_id: i64 = row.get(0)?;
        let original_id: i64 = row.get(1)?;
        let version_number: u32 = row.get(2)?;
        let action: String = row.get(3)?;
        let data: String = row.get(4)?;
        let metadata: Option<String> = row.get(5)?;
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;
        let deleted_at: Option<String> = row.get(8)?;

        Ok(VersionLogEntry {
            version_id,
            original_id,
            version_number,
            action: VersionAction::parse(&action)
                .ok_or_else(|| RowverError::database(format!("unknown action {action:?}")))?,
            data: serde_json::from_str(&data)?,
            metadata: metadata.as_deref().map(serde_json::from_str).transpose()?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            deleted_at: deleted_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

fn parse_timestamp(s: &str) -> RowverResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RowverError::database(format!("bad timestamp {s:?}: {e}")))
}
