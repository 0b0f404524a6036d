//! Inventory item domain model.
//!
//! # Responsibility
//! - Define the canonical equipment record tracked by the store.
//! - Provide lifecycle helpers for soft-delete semantics.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another item.
//! - `is_deleted` is the source of truth for tombstone state.
//! - Descriptive fields are never empty: blanks are stored as the
//!   `FIELD_SENTINEL` placeholder.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every inventory item.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type ItemId = Uuid;

/// Placeholder stored in descriptive fields the operator left blank.
pub const FIELD_SENTINEL: &str = "N/A";

/// Validation failure for inventory item required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemValidationError {
    /// The equipment tag is blank.
    MissingTag,
    /// The assigned user is blank.
    MissingAssignedUser,
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTag => write!(f, "item tag must not be blank"),
            Self::MissingAssignedUser => write!(f, "assigned user must not be blank"),
        }
    }
}

impl Error for ItemValidationError {}

/// Canonical equipment record.
///
/// Identity (`uuid`) is assigned at creation and preserved across edits; the
/// tag is the human-facing label and is intentionally not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Stable global ID used for edits, trash recovery and auditing.
    pub uuid: ItemId,
    /// Equipment tag (e.g. `TI001`). Required, not unique.
    pub tag: String,
    /// Machine hostname.
    pub hostname: String,
    /// Person the equipment is assigned to. Required.
    pub assigned_user: String,
    /// Free-text location label; matched case-insensitively for filtering.
    pub location: String,
    /// Department/sector label.
    pub sector: String,
    /// Hardware model.
    pub model: String,
    /// Hardware brand.
    pub brand: String,
    /// Condition/state label (e.g. in use, in repair).
    pub state: String,
    /// Manufacturer serial number.
    pub serial_number: String,
    /// Operating system version.
    pub os_version: String,
    /// Office suite version.
    pub office_version: String,
    /// Purchase date as free text; not calendar-validated at this layer.
    pub purchase_date: String,
    /// Asset/patrimony code.
    pub patrimony: String,
    /// Free-form observation note.
    pub observation: String,
    /// Soft delete tombstone; deleted items stay recoverable in the trash.
    pub is_deleted: bool,
}

impl InventoryItem {
    /// Creates a new item with a generated stable ID.
    ///
    /// Descriptive fields start as the sentinel placeholder and
    /// `is_deleted` starts as `false`.
    pub fn new(
        tag: impl Into<String>,
        assigned_user: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), tag, assigned_user, location)
    }

    /// Creates a new item with a caller-provided stable ID.
    ///
    /// Used by restore/import paths where identity already exists externally.
    pub fn with_id(
        uuid: ItemId,
        tag: impl Into<String>,
        assigned_user: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            uuid,
            tag: tag.into(),
            hostname: FIELD_SENTINEL.to_string(),
            assigned_user: assigned_user.into(),
            location: location.into(),
            sector: FIELD_SENTINEL.to_string(),
            model: FIELD_SENTINEL.to_string(),
            brand: FIELD_SENTINEL.to_string(),
            state: FIELD_SENTINEL.to_string(),
            serial_number: FIELD_SENTINEL.to_string(),
            os_version: FIELD_SENTINEL.to_string(),
            office_version: FIELD_SENTINEL.to_string(),
            purchase_date: FIELD_SENTINEL.to_string(),
            patrimony: FIELD_SENTINEL.to_string(),
            observation: FIELD_SENTINEL.to_string(),
            is_deleted: false,
        }
    }

    /// Checks required fields; called by repositories before every write.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.tag.trim().is_empty() {
            return Err(ItemValidationError::MissingTag);
        }
        if self.assigned_user.trim().is_empty() {
            return Err(ItemValidationError::MissingAssignedUser);
        }
        Ok(())
    }

    /// Replaces blank descriptive fields with the sentinel placeholder.
    ///
    /// Required fields (`tag`, `assigned_user`) are left alone so that
    /// `validate()` still rejects them when blank.
    pub fn fill_blank_fields(&mut self) {
        for field in [
            &mut self.hostname,
            &mut self.location,
            &mut self.sector,
            &mut self.model,
            &mut self.brand,
            &mut self.state,
            &mut self.serial_number,
            &mut self.os_version,
            &mut self.office_version,
            &mut self.purchase_date,
            &mut self.patrimony,
            &mut self.observation,
        ] {
            if field.trim().is_empty() {
                *field = FIELD_SENTINEL.to_string();
            }
        }
    }

    /// Marks this item as softly deleted (moved to the trash view).
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    /// Clears the soft delete flag.
    pub fn restore(&mut self) {
        self.is_deleted = false;
    }

    /// Returns whether this item belongs to the active view.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}
