//! Lazy creation of per-entity version tables.

use rusqlite::Connection;

use crate::error::{RowverError, RowverResult};

/// Derive the side-table name for an entity table.
pub fn version_table_name(entity_table: &str) -> String {
    format!("{entity_table}_versions")
}

/// Reject identifiers that cannot be spliced into DDL safely.
pub(crate) fn check_identifier(name: &str) -> RowverResult<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(RowverError::validation(format!(
            "invalid table name: {name:?}"
        )))
    }
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> RowverResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Create `<entity_table>_versions` if it does not exist yet. Idempotent.
///
/// With `enforce_cascade`, `original_id` carries a cascading foreign key to
/// the entity table, so hard-deleting the entity removes its log rows. SQLite
/// can only enforce that when the entity table lives in the same database as
/// the version log.
pub(crate) fn ensure_version_table(
    conn: &Connection,
    entity_table: &str,
    enforce_cascade: bool,
) -> RowverResult<()> {
    check_identifier(entity_table)?;
    let table = version_table_name(entity_table);
    if table_exists(conn, &table)? {
        return Ok(());
    }

    let original_id = if enforce_cascade {
        format!(r#"original_id INTEGER NOT NULL REFERENCES "{entity_table}"(id) ON DELETE CASCADE"#)
    } else {
        "original_id INTEGER NOT NULL".to_string()
    };

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS "{table}" (
            version_id     INTEGER PRIMARY KEY AUTOINCREMENT,
            {original_id},
            version_number INTEGER NOT NULL,
            action         TEXT NOT NULL,
            data           TEXT NOT NULL,
            metadata       TEXT,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL,
            deleted_at     TEXT,
            UNIQUE(original_id, version_number)
        );

        CREATE INDEX IF NOT EXISTS "idx_{table}_original_num"
            ON "{table}"(original_id, version_number DESC);
        "#
    ))
    .map_err(|e| RowverError::Schema {
        message: format!("creating {table}: {e}"),
        source: Some(Box::new(e)),
    })?;

    Ok(())
}
