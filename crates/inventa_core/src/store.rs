//! Inventory store: CRUD-plus-audit over the durable layer.
//!
//! # Responsibility
//! - Own the in-memory active and trash views of the inventory.
//! - Gate every mutation on the access guard and record exactly one
//!   audit entry per successful mutation.
//! - Serve read paths (list/search/filter) without touching storage.
//!
//! # Invariants
//! - Item identity never changes across an edit.
//! - A soft-deleted item is absent from the active view and present only
//!   in the trash view.
//! - Rejected mutations (authorization/validation) have zero side effects.
//! - A durable write failure leaves both the durable tables and the
//!   in-memory views unchanged: the item write and its audit entry
//!   commit together or not at all.
//! - Audit timestamps are monotonically non-decreasing within a process;
//!   already-recorded stamps are never renumbered.

use crate::access::authorized_actor;
use crate::model::audit::{ActionKind, AuditEntry};
use crate::model::item::{InventoryItem, ItemId, ItemValidationError};
use crate::repo::inventory_repo::InventoryRepository;
use crate::repo::RepoError;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error taxonomy.
#[derive(Debug)]
pub enum StoreError {
    /// The mutating call carried a blank actor.
    Unauthorized,
    /// A required item field is missing or invalid.
    Validation(ItemValidationError),
    /// The durable layer failed; in-memory state was left unchanged.
    Persistence(RepoError),
    /// The edit/delete/restore target is absent from the expected view.
    NotFound(ItemId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "mutation requires a non-blank actor"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemValidationError> for StoreError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Persistence(other),
        }
    }
}

/// Entity store facade over the durable layer.
///
/// Assumes a single logical writer per process; mutations take `&mut self`
/// and are serialized by the borrow checker. Cross-session consumers must
/// call [`InventoryStore::reload`] before trusting the in-memory views.
pub struct InventoryStore<R: InventoryRepository> {
    repo: R,
    active: Vec<InventoryItem>,
    trash: Vec<InventoryItem>,
    last_stamp: Option<DateTime<Utc>>,
}

impl<R: InventoryRepository> InventoryStore<R> {
    /// Builds the store and loads both views from the durable layer.
    ///
    /// The monotonic audit clock is seeded from the latest stored stamp so
    /// a restart never issues stamps older than recorded history.
    pub fn try_new(repo: R) -> StoreResult<Self> {
        let active = repo.load_active()?;
        let trash = repo.load_deleted()?;
        let last_stamp = repo.latest_audit_timestamp()?;
        Ok(Self {
            repo,
            active,
            trash,
            last_stamp,
        })
    }

    /// Adds a new item and records an ADD audit entry.
    ///
    /// Blank descriptive fields are replaced by the sentinel before
    /// persistence; the stored identity is returned.
    pub fn add(&mut self, mut item: InventoryItem, actor: &str) -> StoreResult<ItemId> {
        let actor = self.guard(actor, "item_add")?;
        item.validate()?;
        item.fill_blank_fields();
        item.is_deleted = false;

        let entry = self.stamp_entry(
            ActionKind::Add,
            &actor,
            format!("added item `{}` assigned to {}", item.tag, item.assigned_user),
        );
        if let Err(err) = self.repo.insert(&item, &entry) {
            error!(
                "event=item_add module=store status=error item={} error={err}",
                item.uuid
            );
            return Err(err.into());
        }

        info!(
            "event=item_add module=store status=ok item={} actor={actor}",
            item.uuid
        );
        let id = item.uuid;
        self.active.push(item);
        Ok(id)
    }

    /// Replaces an item in place, preserving its original identity.
    ///
    /// When the original is absent from the active in-memory view the store
    /// reloads both views from the durable layer as recovery and reports
    /// `NotFound`; the next read observes the reloaded state.
    pub fn edit(
        &mut self,
        original_id: ItemId,
        mut replacement: InventoryItem,
        actor: &str,
    ) -> StoreResult<ItemId> {
        let actor = self.guard(actor, "item_edit")?;
        replacement.uuid = original_id;
        replacement.is_deleted = false;
        replacement.validate()?;
        replacement.fill_blank_fields();

        let Some(position) = self.active_position(original_id) else {
            warn!(
                "event=item_edit module=store status=error item={original_id} error_code=stale_view recovery=reload"
            );
            self.reload()?;
            return Err(StoreError::NotFound(original_id));
        };

        let entry = self.stamp_entry(
            ActionKind::Edit,
            &actor,
            format!("edited item `{}`", replacement.tag),
        );
        if let Err(err) = self.repo.update(&replacement, &entry) {
            error!("event=item_edit module=store status=error item={original_id} error={err}");
            return Err(err.into());
        }

        info!("event=item_edit module=store status=ok item={original_id} actor={actor}");
        self.active[position] = replacement;
        Ok(original_id)
    }

    /// Moves an item from the active view to the trash.
    pub fn soft_delete(&mut self, id: ItemId, actor: &str) -> StoreResult<()> {
        let actor = self.guard(actor, "item_delete")?;

        let Some(position) = self.active_position(id) else {
            return Err(StoreError::NotFound(id));
        };

        let entry = self.stamp_entry(
            ActionKind::Delete,
            &actor,
            format!("moved item `{}` to trash", self.active[position].tag),
        );
        if let Err(err) = self.repo.set_deleted(id, true, &entry) {
            error!("event=item_delete module=store status=error item={id} error={err}");
            return Err(err.into());
        }

        info!("event=item_delete module=store status=ok item={id} actor={actor}");
        let mut item = self.active.remove(position);
        item.soft_delete();
        self.trash.push(item);
        Ok(())
    }

    /// Moves an item from the trash back to the active view.
    ///
    /// Recorded under the EDIT action kind: restoring is modeled as an
    /// edit event, not a distinct kind.
    pub fn restore(&mut self, id: ItemId, actor: &str) -> StoreResult<()> {
        let actor = self.guard(actor, "item_restore")?;

        let Some(position) = self.trash.iter().position(|item| item.uuid == id) else {
            return Err(StoreError::NotFound(id));
        };

        let entry = self.stamp_entry(
            ActionKind::Edit,
            &actor,
            format!("restored item `{}` from trash", self.trash[position].tag),
        );
        if let Err(err) = self.repo.set_deleted(id, false, &entry) {
            error!("event=item_restore module=store status=error item={id} error={err}");
            return Err(err.into());
        }

        info!("event=item_restore module=store status=ok item={id} actor={actor}");
        let mut item = self.trash.remove(position);
        item.restore();
        self.active.push(item);
        Ok(())
    }

    /// Active (non-deleted) items in insertion order.
    pub fn list_active(&self) -> &[InventoryItem] {
        &self.active
    }

    /// Trashed items awaiting restore or permanent expiry.
    pub fn list_deleted(&self) -> &[InventoryItem] {
        &self.trash
    }

    /// Case-insensitive substring search over tag, model, brand and
    /// assigned user. A blank query returns the full active view.
    pub fn search(&self, query: &str) -> Vec<InventoryItem> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.active.clone();
        }

        self.active
            .iter()
            .filter(|item| {
                [
                    item.tag.as_str(),
                    item.model.as_str(),
                    item.brand.as_str(),
                    item.assigned_user.as_str(),
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    /// Exact, case-insensitive, trimmed match against location.
    /// A blank location returns the full active view.
    pub fn find_by_location(&self, location: &str) -> Vec<InventoryItem> {
        let needle = location.trim().to_lowercase();
        if needle.is_empty() {
            return self.active.clone();
        }

        self.active
            .iter()
            .filter(|item| item.location.trim().to_lowercase() == needle)
            .cloned()
            .collect()
    }

    /// Full audit trail in insertion order, read from the durable layer.
    pub fn audit_entries(&self) -> StoreResult<Vec<AuditEntry>> {
        Ok(self.repo.load_audit()?)
    }

    /// Reloads both views from the durable layer (source of truth).
    ///
    /// The audit clock keeps the newer of the stored and in-process stamps
    /// so monotonicity within this process is preserved.
    pub fn reload(&mut self) -> StoreResult<()> {
        self.active = self.repo.load_active()?;
        self.trash = self.repo.load_deleted()?;
        if let Some(stored) = self.repo.latest_audit_timestamp()? {
            if self.last_stamp.map_or(true, |current| stored > current) {
                self.last_stamp = Some(stored);
            }
        }
        info!(
            "event=store_reload module=store status=ok active={} trash={}",
            self.active.len(),
            self.trash.len()
        );
        Ok(())
    }

    /// Replaces both collections and the audit trail with a parsed backup
    /// snapshot. Destructive reset used by the restore flow; the durable
    /// swap is one transaction, and the in-memory views are exchanged only
    /// after it commits, so a failure leaves everything as it was.
    pub(crate) fn apply_snapshot(
        &mut self,
        items: Vec<InventoryItem>,
        entries: Vec<AuditEntry>,
    ) -> StoreResult<()> {
        self.repo.replace_snapshot(&items, &entries)?;

        let (trash, active): (Vec<_>, Vec<_>) =
            items.into_iter().partition(|item| item.is_deleted);
        if let Some(latest) = entries.iter().map(|entry| entry.timestamp).max() {
            if self.last_stamp.map_or(true, |current| latest > current) {
                self.last_stamp = Some(latest);
            }
        }
        self.active = active;
        self.trash = trash;
        Ok(())
    }

    fn guard(&self, actor: &str, event: &str) -> StoreResult<String> {
        match authorized_actor(actor) {
            Some(actor) => Ok(actor.to_string()),
            None => {
                warn!("event={event} module=store status=error error_code=blank_actor");
                Err(StoreError::Unauthorized)
            }
        }
    }

    /// Builds the audit entry for a mutation, stamped by the monotonic
    /// clock. The clock advances even when the write later fails; that
    /// only widens the gap to the next stamp, never reorders history.
    fn stamp_entry(&mut self, action: ActionKind, actor: &str, description: String) -> AuditEntry {
        AuditEntry {
            action,
            actor: actor.to_string(),
            timestamp: self.next_stamp(),
            description,
        }
    }

    /// Issues the next audit stamp, clamped to never go backwards.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let mut stamp = Utc::now();
        if let Some(last) = self.last_stamp {
            if stamp < last {
                stamp = last;
            }
        }
        self.last_stamp = Some(stamp);
        stamp
    }

    fn active_position(&self, id: ItemId) -> Option<usize> {
        self.active.iter().position(|item| item.uuid == id)
    }
}
