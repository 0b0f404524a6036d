//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

const MIGRATIONS: &[(u32, &str)] = &[(1, include_str!("0001_init.sql"))];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |&(version, _)| version)
}

/// Applies all pending migrations on the provided connection.
///
/// Refuses to touch a database whose schema version is newer than this
/// binary understands.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let db_version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let latest = latest_version();

    if db_version > latest {
        return Err(DbError::SchemaFromNewerBuild {
            found: db_version,
            supported: latest,
        });
    }
    if db_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for &(version, sql) in MIGRATIONS.iter().filter(|&&(version, _)| version > db_version) {
        tx.execute_batch(sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
    }
    tx.commit()?;

    Ok(())
}
