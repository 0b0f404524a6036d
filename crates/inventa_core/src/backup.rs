//! Export / backup / restore serializer.
//!
//! # Responsibility
//! - Serialize store snapshots to the delimited interchange format and
//!   parse them back for the destructive restore flow.
//!
//! # Invariants
//! - Export and backup never mutate the store.
//! - Restore is a full replacement of both the active collection and the
//!   audit trail: the file is parsed into buffers first and swapped into
//!   place only when every durable write succeeded.
//! - Row layout is selected by field count through explicit per-layout
//!   index maps; rows matching neither layout are skipped and reported,
//!   never silently dropped.

use crate::model::audit::{ActionKind, AuditEntry};
use crate::model::item::InventoryItem;
use crate::repo::inventory_repo::InventoryRepository;
use crate::store::{InventoryStore, StoreError};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use uuid::Uuid;

const SEPARATOR: char = ';';
const ITEMS_MARKER: &str = "INVENTARIO";
const AUDIT_MARKER: &str = "HISTORICO";
const ITEMS_HEADER: &str = "ETIQUETA TI;NOME DO PC;USUÁRIO;LOCALIZAÇÃO;SETOR;VERSÃO DO WINDOWS;VERSÃO DO OFFICE;MODELO;NÚMERO DE SÉRIE;DATA DE COMPRA;PATRIMÔNIO;OBSERVAÇÕES";
const AUDIT_HEADER: &str = "Action;User;Timestamp;Description";
// First field of a header row, used to skip headers during restore.
const ITEMS_HEADER_TOKEN: &str = "ETIQUETA TI";
const AUDIT_HEADER_TOKEN: &str = "Action";
const AUDIT_FIELD_COUNT: usize = 4;

pub type BackupResult<T> = Result<T, BackupError>;

/// Serializer error taxonomy.
#[derive(Debug)]
pub enum BackupError {
    /// File read/write failure.
    Io(std::io::Error),
    /// Structurally malformed input, e.g. an unterminated quoted field.
    /// Aborts the whole restore; per-row layout mismatches are reported
    /// via [`RestoreReport::skipped`] instead.
    Parse { line: usize, reason: String },
    /// Store/durable-layer failure while swapping the parsed snapshot in.
    Store(StoreError),
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Parse { line, reason } => write!(f, "parse error at line {line}: {reason}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse { .. } => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for BackupError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<StoreError> for BackupError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Item columns addressable by the layout index maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemColumn {
    Tag,
    Hostname,
    AssignedUser,
    Location,
    Sector,
    OsVersion,
    OfficeVersion,
    Model,
    SerialNumber,
    PurchaseDate,
    Patrimony,
    Observation,
}

/// Current 12-field row: full export layout.
const CURRENT_LAYOUT: &[(ItemColumn, usize)] = &[
    (ItemColumn::Tag, 0),
    (ItemColumn::Hostname, 1),
    (ItemColumn::AssignedUser, 2),
    (ItemColumn::Location, 3),
    (ItemColumn::Sector, 4),
    (ItemColumn::OsVersion, 5),
    (ItemColumn::OfficeVersion, 6),
    (ItemColumn::Model, 7),
    (ItemColumn::SerialNumber, 8),
    (ItemColumn::PurchaseDate, 9),
    (ItemColumn::Patrimony, 10),
    (ItemColumn::Observation, 11),
];

/// Legacy 10-field row: written before patrimony/observation existed.
/// Missing columns keep their sentinel default.
const LEGACY_LAYOUT: &[(ItemColumn, usize)] = &[
    (ItemColumn::Tag, 0),
    (ItemColumn::Hostname, 1),
    (ItemColumn::AssignedUser, 2),
    (ItemColumn::Location, 3),
    (ItemColumn::Sector, 4),
    (ItemColumn::OsVersion, 5),
    (ItemColumn::OfficeVersion, 6),
    (ItemColumn::Model, 7),
    (ItemColumn::SerialNumber, 8),
    (ItemColumn::PurchaseDate, 9),
];

/// Known historical row layouts, selected by field count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowLayout {
    Current,
    Legacy,
}

impl RowLayout {
    fn from_field_count(count: usize) -> Option<Self> {
        match count {
            count if count == CURRENT_LAYOUT.len() => Some(Self::Current),
            count if count == LEGACY_LAYOUT.len() => Some(Self::Legacy),
            _ => None,
        }
    }

    fn index_map(self) -> &'static [(ItemColumn, usize)] {
        match self {
            Self::Current => CURRENT_LAYOUT,
            Self::Legacy => LEGACY_LAYOUT,
        }
    }
}

/// One input row that matched no known layout or failed field validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the input.
    pub line: usize,
    /// Field count observed on the row.
    pub field_count: usize,
    /// Human-readable reason for skipping.
    pub reason: String,
}

/// Outcome of a completed restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Inventory items loaded into the store.
    pub items_loaded: usize,
    /// Audit entries loaded into the trail.
    pub audit_entries_loaded: usize,
    /// Rows skipped under the skip-and-continue policy.
    pub skipped: Vec<SkippedRow>,
}

/// Renders the active collection as the 12-column export table.
pub fn export_string<R: InventoryRepository>(
    store: &InventoryStore<R>,
) -> String {
    let mut out = String::new();
    out.push_str(ITEMS_HEADER);
    out.push('\n');
    for item in store.list_active() {
        out.push_str(&item_row(item));
        out.push('\n');
    }
    out
}

/// Writes the export table to `path` as UTF-8 text.
pub fn export_file<R: InventoryRepository>(
    store: &InventoryStore<R>,
    path: impl AsRef<Path>,
) -> BackupResult<()> {
    std::fs::write(path.as_ref(), export_string(store))?;
    info!(
        "event=export module=backup status=ok items={}",
        store.list_active().len()
    );
    Ok(())
}

/// Renders a full backup: export table plus the audit trail section.
pub fn backup_string<R: InventoryRepository>(
    store: &InventoryStore<R>,
) -> BackupResult<String> {
    let entries = store.audit_entries()?;

    let mut out = String::new();
    out.push_str(ITEMS_MARKER);
    out.push('\n');
    out.push_str(&export_string(store));
    out.push_str(AUDIT_MARKER);
    out.push('\n');
    out.push_str(AUDIT_HEADER);
    out.push('\n');
    for entry in &entries {
        out.push_str(&audit_row(entry));
        out.push('\n');
    }
    Ok(out)
}

/// Writes a full backup to `path` as UTF-8 text.
pub fn backup_file<R: InventoryRepository>(
    store: &InventoryStore<R>,
    path: impl AsRef<Path>,
) -> BackupResult<()> {
    let rendered = backup_string(store)?;
    std::fs::write(path.as_ref(), rendered)?;
    info!(
        "event=backup module=backup status=ok items={}",
        store.list_active().len()
    );
    Ok(())
}

/// Restores the store from a backup or export file at `path`.
///
/// Destructive full replacement, never a merge. See [`restore_from_str`].
pub fn restore_file<R: InventoryRepository>(
    store: &mut InventoryStore<R>,
    path: impl AsRef<Path>,
) -> BackupResult<RestoreReport> {
    let text = std::fs::read_to_string(path.as_ref())?;
    restore_from_str(store, &text)
}

/// Restores the store from backup/export text.
///
/// The input is parsed into buffers first; only when parsing succeeds are
/// the durable tables and the in-memory views replaced, so a failed
/// restore never leaves the collections partially overwritten. Rows
/// matching no known layout are skipped and reported.
pub fn restore_from_str<R: InventoryRepository>(
    store: &mut InventoryStore<R>,
    text: &str,
) -> BackupResult<RestoreReport> {
    let parsed = parse_snapshot(text)?;

    let items_loaded = parsed.items.len();
    let audit_entries_loaded = parsed.entries.len();
    store.apply_snapshot(parsed.items, parsed.entries)?;

    if parsed.skipped.is_empty() {
        info!(
            "event=restore module=backup status=ok items={items_loaded} audit_entries={audit_entries_loaded}"
        );
    } else {
        warn!(
            "event=restore module=backup status=ok items={items_loaded} audit_entries={audit_entries_loaded} skipped_rows={}",
            parsed.skipped.len()
        );
    }

    Ok(RestoreReport {
        items_loaded,
        audit_entries_loaded,
        skipped: parsed.skipped,
    })
}

struct ParsedSnapshot {
    items: Vec<InventoryItem>,
    entries: Vec<AuditEntry>,
    skipped: Vec<SkippedRow>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Items,
    Audit,
}

fn parse_snapshot(text: &str) -> BackupResult<ParsedSnapshot> {
    let mut items = Vec::new();
    let mut entries = Vec::new();
    let mut skipped = Vec::new();
    let mut section = Section::Items;

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if line == ITEMS_MARKER {
            section = Section::Items;
            continue;
        }
        if line == AUDIT_MARKER {
            section = Section::Audit;
            continue;
        }

        let fields = split_fields(line).map_err(|reason| BackupError::Parse {
            line: line_number,
            reason,
        })?;

        match section {
            Section::Items => {
                if fields.first().map(String::as_str) == Some(ITEMS_HEADER_TOKEN) {
                    continue;
                }
                match parse_item_fields(&fields) {
                    Ok(item) => items.push(item),
                    Err(reason) => skipped.push(SkippedRow {
                        line: line_number,
                        field_count: fields.len(),
                        reason,
                    }),
                }
            }
            Section::Audit => {
                if fields.first().map(String::as_str) == Some(AUDIT_HEADER_TOKEN) {
                    continue;
                }
                match parse_audit_fields(&fields) {
                    Ok(entry) => entries.push(entry),
                    Err(reason) => skipped.push(SkippedRow {
                        line: line_number,
                        field_count: fields.len(),
                        reason,
                    }),
                }
            }
        }
    }

    Ok(ParsedSnapshot {
        items,
        entries,
        skipped,
    })
}

fn parse_item_fields(fields: &[String]) -> Result<InventoryItem, String> {
    let Some(layout) = RowLayout::from_field_count(fields.len()) else {
        return Err(format!(
            "unknown item row layout: {} fields (expected {} or {})",
            fields.len(),
            CURRENT_LAYOUT.len(),
            LEGACY_LAYOUT.len()
        ));
    };

    let mut item = InventoryItem::with_id(Uuid::new_v4(), "", "", "");
    for &(column, index) in layout.index_map() {
        let value = fields[index].clone();
        match column {
            ItemColumn::Tag => item.tag = value,
            ItemColumn::Hostname => item.hostname = value,
            ItemColumn::AssignedUser => item.assigned_user = value,
            ItemColumn::Location => item.location = value,
            ItemColumn::Sector => item.sector = value,
            ItemColumn::OsVersion => item.os_version = value,
            ItemColumn::OfficeVersion => item.office_version = value,
            ItemColumn::Model => item.model = value,
            ItemColumn::SerialNumber => item.serial_number = value,
            ItemColumn::PurchaseDate => item.purchase_date = value,
            ItemColumn::Patrimony => item.patrimony = value,
            ItemColumn::Observation => item.observation = value,
        }
    }

    item.fill_blank_fields();
    item.validate().map_err(|err| err.to_string())?;
    Ok(item)
}

fn parse_audit_fields(fields: &[String]) -> Result<AuditEntry, String> {
    if fields.len() != AUDIT_FIELD_COUNT {
        return Err(format!(
            "unknown audit row layout: {} fields (expected {AUDIT_FIELD_COUNT})",
            fields.len()
        ));
    }

    let action = ActionKind::parse(&fields[0])
        .ok_or_else(|| format!("unknown action kind `{}`", fields[0]))?;
    let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&fields[2])
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| format!("invalid timestamp `{}`", fields[2]))?;

    Ok(AuditEntry {
        action,
        actor: fields[1].clone(),
        timestamp,
        description: fields[3].clone(),
    })
}

fn item_row(item: &InventoryItem) -> String {
    let fields = [
        item.tag.as_str(),
        item.hostname.as_str(),
        item.assigned_user.as_str(),
        item.location.as_str(),
        item.sector.as_str(),
        item.os_version.as_str(),
        item.office_version.as_str(),
        item.model.as_str(),
        item.serial_number.as_str(),
        item.purchase_date.as_str(),
        item.patrimony.as_str(),
        item.observation.as_str(),
    ];
    join_quoted(&fields)
}

fn audit_row(entry: &AuditEntry) -> String {
    let timestamp = entry.timestamp.to_rfc3339();
    let fields = [
        entry.action.as_str(),
        entry.actor.as_str(),
        timestamp.as_str(),
        entry.description.as_str(),
    ];
    join_quoted(&fields)
}

fn join_quoted(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| quote(field))
        .collect::<Vec<_>>()
        .join(&SEPARATOR.to_string())
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Splits one delimited line into fields, honoring double-quoted fields
/// with doubled-quote escapes. Bare (unquoted) fields are accepted so
/// header rows parse too.
fn split_fields(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                c if c == SEPARATOR => {
                    fields.push(std::mem::take(&mut current));
                }
                other => current.push(other),
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }

    fields.push(current);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::{parse_item_fields, quote, split_fields, RowLayout};
    use crate::model::item::FIELD_SENTINEL;

    fn owned(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|field| field.to_string()).collect()
    }

    #[test]
    fn split_fields_handles_quotes_and_escapes() {
        let fields = split_fields("\"a\";\"b;c\";\"say \"\"hi\"\"\"").unwrap();
        assert_eq!(fields, vec!["a", "b;c", "say \"hi\""]);
    }

    #[test]
    fn split_fields_accepts_bare_header_rows() {
        let fields = split_fields("Action;User;Timestamp;Description").unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], "Action");
    }

    #[test]
    fn split_fields_rejects_unterminated_quote() {
        let err = split_fields("\"open").unwrap_err();
        assert!(err.contains("unterminated"));
    }

    #[test]
    fn quote_doubles_embedded_quotes() {
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn layout_is_selected_by_field_count() {
        assert_eq!(RowLayout::from_field_count(12), Some(RowLayout::Current));
        assert_eq!(RowLayout::from_field_count(10), Some(RowLayout::Legacy));
        assert_eq!(RowLayout::from_field_count(11), None);
        assert_eq!(RowLayout::from_field_count(0), None);
    }

    #[test]
    fn legacy_rows_default_missing_columns_to_sentinel() {
        let fields = owned(&[
            "TI001", "host-01", "Alice", "HQ", "Finance", "Win10", "2019", "Latitude", "SN1",
            "2021-03-01",
        ]);
        let item = parse_item_fields(&fields).unwrap();
        assert_eq!(item.tag, "TI001");
        assert_eq!(item.purchase_date, "2021-03-01");
        assert_eq!(item.patrimony, FIELD_SENTINEL);
        assert_eq!(item.observation, FIELD_SENTINEL);
    }

    #[test]
    fn rows_with_unknown_field_count_are_rejected() {
        let fields = owned(&["TI001", "host-01", "Alice"]);
        let reason = parse_item_fields(&fields).unwrap_err();
        assert!(reason.contains("unknown item row layout"));
    }

    #[test]
    fn rows_with_blank_required_fields_are_rejected() {
        let fields = owned(&[
            "", "host-01", "Alice", "HQ", "Finance", "Win10", "2019", "Latitude", "SN1",
            "2021-03-01",
        ]);
        assert!(parse_item_fields(&fields).is_err());
    }
}
