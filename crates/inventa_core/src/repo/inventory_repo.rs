//! Inventory repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide durable primitives for items and the audit trail behind one
//!   contract, so every mutation commits together with the audit entry
//!   attributing it.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `InventoryItem::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - Each mutating method is a single transaction: either the item write
//!   and its audit entry both commit, or neither does.
//! - `replace_snapshot` swaps both tables inside one transaction.

use crate::model::audit::{ActionKind, AuditEntry};
use crate::model::item::{InventoryItem, ItemId};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    tag,
    hostname,
    assigned_user,
    location,
    sector,
    model,
    brand,
    state,
    serial_number,
    os_version,
    office_version,
    purchase_date,
    patrimony,
    observation,
    is_deleted
FROM items";

const ITEM_INSERT_SQL: &str = "INSERT INTO items (
    uuid,
    tag,
    hostname,
    assigned_user,
    location,
    sector,
    model,
    brand,
    state,
    serial_number,
    os_version,
    office_version,
    purchase_date,
    patrimony,
    observation,
    is_deleted
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);";

const AUDIT_INSERT_SQL: &str =
    "INSERT INTO audit_log (action, actor, timestamp, description) VALUES (?1, ?2, ?3, ?4);";

/// Durable-layer interface for inventory items and their audit trail.
///
/// Mutations take the audit entry that attributes them, so the durable
/// layer can commit both or neither; there is no unaudited write path.
pub trait InventoryRepository {
    fn insert(&self, item: &InventoryItem, entry: &AuditEntry) -> RepoResult<ItemId>;
    fn update(&self, item: &InventoryItem, entry: &AuditEntry) -> RepoResult<()>;
    fn set_deleted(&self, id: ItemId, deleted: bool, entry: &AuditEntry) -> RepoResult<()>;
    fn load_active(&self) -> RepoResult<Vec<InventoryItem>>;
    fn load_deleted(&self) -> RepoResult<Vec<InventoryItem>>;
    /// Full audit trail in insertion (rowid) order.
    fn load_audit(&self) -> RepoResult<Vec<AuditEntry>>;
    /// Latest stored stamp, used to seed the monotonic clock.
    fn latest_audit_timestamp(&self) -> RepoResult<Option<DateTime<Utc>>>;
    /// Replaces both tables with the snapshot in a single transaction
    /// (backup-restore only).
    fn replace_snapshot(
        &self,
        items: &[InventoryItem],
        entries: &[AuditEntry],
    ) -> RepoResult<()>;
}

/// SQLite-backed inventory repository.
pub struct SqliteInventoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInventoryRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "items")?;
        ensure_connection_ready(conn, "audit_log")?;
        Ok(Self { conn })
    }
}

impl InventoryRepository for SqliteInventoryRepository<'_> {
    fn insert(&self, item: &InventoryItem, entry: &AuditEntry) -> RepoResult<ItemId> {
        item.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(ITEM_INSERT_SQL, item_params(item))?;
        insert_audit(&tx, entry)?;
        tx.commit()?;

        Ok(item.uuid)
    }

    fn update(&self, item: &InventoryItem, entry: &AuditEntry) -> RepoResult<()> {
        item.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE items
             SET
                tag = ?2,
                hostname = ?3,
                assigned_user = ?4,
                location = ?5,
                sector = ?6,
                model = ?7,
                brand = ?8,
                state = ?9,
                serial_number = ?10,
                os_version = ?11,
                office_version = ?12,
                purchase_date = ?13,
                patrimony = ?14,
                observation = ?15,
                is_deleted = ?16,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            item_params(item),
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(item.uuid));
        }
        insert_audit(&tx, entry)?;
        tx.commit()?;

        Ok(())
    }

    fn set_deleted(&self, id: ItemId, deleted: bool, entry: &AuditEntry) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE items
             SET
                is_deleted = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), bool_to_int(deleted)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        insert_audit(&tx, entry)?;
        tx.commit()?;

        Ok(())
    }

    fn load_active(&self) -> RepoResult<Vec<InventoryItem>> {
        self.load_where(false)
    }

    fn load_deleted(&self) -> RepoResult<Vec<InventoryItem>> {
        self.load_where(true)
    }

    fn load_audit(&self) -> RepoResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT action, actor, timestamp, description
             FROM audit_log
             ORDER BY id ASC;",
        )?;

        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_audit_row(row)?);
        }

        Ok(entries)
    }

    fn latest_audit_timestamp(&self) -> RepoResult<Option<DateTime<Utc>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT timestamp FROM audit_log ORDER BY id DESC LIMIT 1;")?;

        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            return Ok(Some(parse_timestamp(&text)?));
        }

        Ok(None)
    }

    fn replace_snapshot(
        &self,
        items: &[InventoryItem],
        entries: &[AuditEntry],
    ) -> RepoResult<()> {
        for item in items {
            item.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM items;", [])?;
        tx.execute("DELETE FROM audit_log;", [])?;
        {
            let mut stmt = tx.prepare(ITEM_INSERT_SQL)?;
            for item in items {
                stmt.execute(item_params(item))?;
            }
        }
        for entry in entries {
            insert_audit(&tx, entry)?;
        }
        tx.commit()?;

        Ok(())
    }
}

impl SqliteInventoryRepository<'_> {
    fn load_where(&self, deleted: bool) -> RepoResult<Vec<InventoryItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE is_deleted = ?1
             ORDER BY created_at ASC, uuid ASC;"
        ))?;

        let mut rows = stmt.query([bool_to_int(deleted)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }
}

fn insert_audit(tx: &Transaction<'_>, entry: &AuditEntry) -> RepoResult<()> {
    tx.execute(
        AUDIT_INSERT_SQL,
        params![
            entry.action.as_str(),
            entry.actor.as_str(),
            entry.timestamp.to_rfc3339(),
            entry.description.as_str(),
        ],
    )?;
    Ok(())
}

fn item_params(item: &InventoryItem) -> [rusqlite::types::Value; 16] {
    use rusqlite::types::Value;
    [
        Value::Text(item.uuid.to_string()),
        Value::Text(item.tag.clone()),
        Value::Text(item.hostname.clone()),
        Value::Text(item.assigned_user.clone()),
        Value::Text(item.location.clone()),
        Value::Text(item.sector.clone()),
        Value::Text(item.model.clone()),
        Value::Text(item.brand.clone()),
        Value::Text(item.state.clone()),
        Value::Text(item.serial_number.clone()),
        Value::Text(item.os_version.clone()),
        Value::Text(item.office_version.clone()),
        Value::Text(item.purchase_date.clone()),
        Value::Text(item.patrimony.clone()),
        Value::Text(item.observation.clone()),
        Value::Integer(bool_to_int(item.is_deleted)),
    ]
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<InventoryItem> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in items.uuid"))
    })?;

    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in items.is_deleted"
            )));
        }
    };

    let item = InventoryItem {
        uuid,
        tag: row.get("tag")?,
        hostname: row.get("hostname")?,
        assigned_user: row.get("assigned_user")?,
        location: row.get("location")?,
        sector: row.get("sector")?,
        model: row.get("model")?,
        brand: row.get("brand")?,
        state: row.get("state")?,
        serial_number: row.get("serial_number")?,
        os_version: row.get("os_version")?,
        office_version: row.get("office_version")?,
        purchase_date: row.get("purchase_date")?,
        patrimony: row.get("patrimony")?,
        observation: row.get("observation")?,
        is_deleted,
    };
    item.validate()?;
    Ok(item)
}

fn parse_audit_row(row: &Row<'_>) -> RepoResult<AuditEntry> {
    let action_text: String = row.get("action")?;
    let action = ActionKind::parse(&action_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid action kind `{action_text}` in audit_log.action"
        ))
    })?;

    let timestamp_text: String = row.get("timestamp")?;
    let timestamp = parse_timestamp(&timestamp_text)?;

    Ok(AuditEntry {
        action,
        actor: row.get("actor")?,
        timestamp,
        description: row.get("description")?,
    })
}

fn parse_timestamp(text: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid timestamp `{text}` in audit_log.timestamp"
            ))
        })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
