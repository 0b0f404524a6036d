//! Domain model for the inventory core.
//!
//! # Responsibility
//! - Define the canonical inventory record and the audit trail entry.
//! - Keep validation rules next to the data they guard.
//!
//! # Invariants
//! - Every inventory item is identified by a stable `ItemId`.
//! - Deletion is represented by soft-delete tombstones, not hard delete.
//! - Audit entries are immutable once created.

pub mod audit;
pub mod item;
