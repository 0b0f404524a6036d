//! Directory name repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist the uniqueness-constrained set of location/company names.
//!
//! # Invariants
//! - Name uniqueness is enforced by the table's primary key; a duplicate
//!   add is a normal negative outcome, not an error.
//! - Directory names are display tags, not foreign keys: deleting one
//!   never touches inventory items referencing it.

use crate::repo::{ensure_connection_ready, RepoResult};
use rusqlite::Connection;

/// Durable-layer interface for directory names.
pub trait DirectoryRepository {
    /// Adds a name. Returns `false` when the name already exists.
    fn add(&self, name: &str) -> RepoResult<bool>;
    /// Deletes a name. Returns `false` when the name was not present.
    fn delete(&self, name: &str) -> RepoResult<bool>;
    /// Returns all names sorted alphabetically.
    fn list(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed directory repository.
pub struct SqliteDirectoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDirectoryRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "directory")?;
        Ok(Self { conn })
    }
}

impl DirectoryRepository for SqliteDirectoryRepository<'_> {
    fn add(&self, name: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("INSERT OR IGNORE INTO directory (name) VALUES (?1);", [name])?;
        Ok(changed > 0)
    }

    fn delete(&self, name: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM directory WHERE name = ?1;", [name])?;
        Ok(changed > 0)
    }

    fn list(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM directory ORDER BY name ASC;")?;

        let mut rows = stmt.query([])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }

        Ok(names)
    }
}
