//! Core domain logic for the Inventa equipment inventory.
//! This crate is the single source of truth for business invariants.

pub mod access;
pub mod backup;
pub mod db;
pub mod directory;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use access::authorized_actor;
pub use backup::{
    backup_file, backup_string, export_file, export_string, restore_file, restore_from_str,
    BackupError, BackupResult, RestoreReport, SkippedRow,
};
pub use directory::DirectoryRegistry;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::audit::{ActionKind, AuditEntry};
pub use model::item::{InventoryItem, ItemId, ItemValidationError, FIELD_SENTINEL};
pub use repo::directory_repo::{DirectoryRepository, SqliteDirectoryRepository};
pub use repo::inventory_repo::{InventoryRepository, SqliteInventoryRepository};
pub use repo::{RepoError, RepoResult};
pub use store::{InventoryStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
