use inventa_core::db::open_db_in_memory;
use inventa_core::{
    ActionKind, InventoryItem, InventoryStore, SqliteInventoryRepository, StoreError,
    FIELD_SENTINEL,
};
use rusqlite::Connection;

type Store<'conn> = InventoryStore<SqliteInventoryRepository<'conn>>;

fn new_store(conn: &Connection) -> Store<'_> {
    InventoryStore::try_new(SqliteInventoryRepository::try_new(conn).unwrap()).unwrap()
}

#[test]
fn add_then_list_active_contains_item() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    let id = store
        .add(InventoryItem::new("TI001", "Alice", "HQ"), "bob")
        .unwrap();

    let active = store.list_active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].uuid, id);
    assert_eq!(active[0].tag, "TI001");
    assert!(store.list_deleted().is_empty());
}

#[test]
fn lifecycle_scenario_records_expected_audit_trail() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    let id = store
        .add(InventoryItem::new("TI001", "Alice", "HQ"), "bob")
        .unwrap();
    let trail = store.audit_entries().unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, ActionKind::Add);
    assert_eq!(trail[0].actor, "bob");

    store.soft_delete(id, "bob").unwrap();
    assert!(store.list_active().is_empty());
    assert_eq!(store.list_deleted().len(), 1);
    let trail = store.audit_entries().unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[1].action, ActionKind::Delete);

    store.restore(id, "carol").unwrap();
    assert_eq!(store.list_active().len(), 1);
    assert!(store.list_deleted().is_empty());
    let trail = store.audit_entries().unwrap();
    assert_eq!(trail.len(), 3);
    // Restore is recorded as an EDIT event, not a dedicated kind.
    assert_eq!(trail[2].action, ActionKind::Edit);
    assert_eq!(trail[2].actor, "carol");
}

#[test]
fn audit_timestamps_never_decrease() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    let id = store
        .add(InventoryItem::new("TI001", "Alice", "HQ"), "bob")
        .unwrap();
    store.soft_delete(id, "bob").unwrap();
    store.restore(id, "bob").unwrap();

    let trail = store.audit_entries().unwrap();
    assert_eq!(trail.len(), 3);
    for pair in trail.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[test]
fn blank_actor_mutations_fail_with_zero_side_effects() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    let id = store
        .add(InventoryItem::new("TI001", "Alice", "HQ"), "bob")
        .unwrap();

    let add = store.add(InventoryItem::new("TI002", "Dana", "Annex"), "   ");
    assert!(matches!(add, Err(StoreError::Unauthorized)));

    let edit = store.edit(id, InventoryItem::new("TI001", "Eve", "HQ"), "");
    assert!(matches!(edit, Err(StoreError::Unauthorized)));

    let delete = store.soft_delete(id, "\t");
    assert!(matches!(delete, Err(StoreError::Unauthorized)));

    assert_eq!(store.list_active().len(), 1);
    assert_eq!(store.list_active()[0].assigned_user, "Alice");
    assert!(store.list_deleted().is_empty());
    assert_eq!(store.audit_entries().unwrap().len(), 1);
}

#[test]
fn add_rejects_blank_required_fields_before_any_mutation() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    let missing_tag = store.add(InventoryItem::new("  ", "Alice", "HQ"), "bob");
    assert!(matches!(missing_tag, Err(StoreError::Validation(_))));

    let missing_user = store.add(InventoryItem::new("TI001", "", "HQ"), "bob");
    assert!(matches!(missing_user, Err(StoreError::Validation(_))));

    assert!(store.list_active().is_empty());
    assert!(store.audit_entries().unwrap().is_empty());
}

#[test]
fn add_defaults_blank_descriptive_fields_to_sentinel() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    let mut item = InventoryItem::new("TI001", "Alice", "HQ");
    item.model = "   ".to_string();
    item.observation = String::new();
    let id = store.add(item, "bob").unwrap();

    let stored = store
        .list_active()
        .iter()
        .find(|item| item.uuid == id)
        .cloned()
        .unwrap();
    assert_eq!(stored.model, FIELD_SENTINEL);
    assert_eq!(stored.observation, FIELD_SENTINEL);
}

#[test]
fn edit_preserves_identity_and_replaces_payload() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    let id = store
        .add(InventoryItem::new("TI001", "Alice", "HQ"), "bob")
        .unwrap();

    let mut replacement = InventoryItem::new("TI001", "Dana", "Annex");
    replacement.model = "Latitude 5420".to_string();
    let edited_id = store.edit(id, replacement, "bob").unwrap();

    assert_eq!(edited_id, id);
    let active = store.list_active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].uuid, id);
    assert_eq!(active[0].assigned_user, "Dana");
    assert_eq!(active[0].model, "Latitude 5420");

    let trail = store.audit_entries().unwrap();
    assert_eq!(trail.last().unwrap().action, ActionKind::Edit);
}

#[test]
fn edit_of_stale_view_reloads_from_durable_layer() {
    let conn = open_db_in_memory().unwrap();
    let mut stale = new_store(&conn);
    let mut writer = new_store(&conn);

    // Another session writes an item the stale view has never seen.
    let id = writer
        .add(InventoryItem::new("TI001", "Alice", "HQ"), "bob")
        .unwrap();
    assert!(stale.list_active().is_empty());

    let result = stale.edit(id, InventoryItem::new("TI001", "Dana", "HQ"), "bob");
    assert!(matches!(result, Err(StoreError::NotFound(missing)) if missing == id));

    // Recovery reload: the next read observes the durable state.
    assert_eq!(stale.list_active().len(), 1);
    assert_eq!(stale.list_active()[0].uuid, id);
}

#[test]
fn durable_write_failure_leaves_memory_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    let id = store
        .add(InventoryItem::new("TI001", "Alice", "HQ"), "bob")
        .unwrap();

    conn.execute_batch("DROP TABLE items;").unwrap();

    let result = store.soft_delete(id, "bob");
    assert!(matches!(result, Err(StoreError::Persistence(_))));
    assert_eq!(store.list_active().len(), 1);
    assert!(store.list_deleted().is_empty());
}

#[test]
fn failed_audit_append_rolls_back_the_item_write() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    // The item insert itself would succeed; only the audit append fails.
    conn.execute_batch("DROP TABLE audit_log;").unwrap();

    let result = store.add(InventoryItem::new("TI001", "Alice", "HQ"), "bob");
    assert!(matches!(result, Err(StoreError::Persistence(_))));

    // The item write and its audit entry commit together or not at all:
    // no unaudited item may survive in the durable layer.
    let durable_items: i64 = conn
        .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
        .unwrap();
    assert_eq!(durable_items, 0);
    assert!(store.list_active().is_empty());
}

#[test]
fn search_blank_query_returns_full_active_set() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    store
        .add(InventoryItem::new("TI001", "Alice", "HQ"), "bob")
        .unwrap();
    store
        .add(InventoryItem::new("TI002", "Dana", "Annex"), "bob")
        .unwrap();

    assert_eq!(store.search(""), store.list_active().to_vec());
    assert_eq!(store.search("   ").len(), 2);
}

#[test]
fn search_matches_substring_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    let mut laptop = InventoryItem::new("TI001", "Alice", "HQ");
    laptop.model = "Latitude 5420".to_string();
    laptop.brand = "Dell".to_string();
    let laptop_id = store.add(laptop, "bob").unwrap();

    let mut desktop = InventoryItem::new("TI002", "Dana", "Annex");
    desktop.model = "OptiPlex".to_string();
    desktop.brand = "Dell".to_string();
    store.add(desktop, "bob").unwrap();

    let by_tag = store.search("ti001");
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].uuid, laptop_id);

    let by_model = store.search("LATITUDE");
    assert_eq!(by_model.len(), 1);
    assert_eq!(by_model[0].uuid, laptop_id);

    assert_eq!(store.search("dell").len(), 2);
    assert!(store.search("thinkpad").is_empty());
}

#[test]
fn search_excludes_trashed_items() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    let id = store
        .add(InventoryItem::new("TI001", "Alice", "HQ"), "bob")
        .unwrap();
    store.soft_delete(id, "bob").unwrap();

    assert!(store.search("TI001").is_empty());
    assert!(store.search("").is_empty());
}

#[test]
fn find_by_location_is_exact_trimmed_and_case_insensitive() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    store
        .add(InventoryItem::new("TI001", "Alice", "Head Office"), "bob")
        .unwrap();
    store
        .add(InventoryItem::new("TI002", "Dana", "Annex"), "bob")
        .unwrap();

    let hits = store.find_by_location("  head office ");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].tag, "TI001");

    // Substrings do not match: the filter is an exact comparison.
    assert!(store.find_by_location("head").is_empty());

    assert_eq!(store.find_by_location("").len(), 2);
}

#[test]
fn soft_delete_survives_reload() {
    let conn = open_db_in_memory().unwrap();
    let mut store = new_store(&conn);

    let id = store
        .add(InventoryItem::new("TI001", "Alice", "HQ"), "bob")
        .unwrap();
    store.soft_delete(id, "bob").unwrap();

    let reopened = new_store(&conn);
    assert!(reopened.list_active().is_empty());
    assert_eq!(reopened.list_deleted().len(), 1);
    assert_eq!(reopened.list_deleted()[0].uuid, id);
}

#[test]
fn item_snapshot_serializes_to_json_for_presentation() {
    let item = InventoryItem::new("TI001", "Alice", "HQ");
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["tag"], "TI001");
    assert_eq!(json["assigned_user"], "Alice");
    assert_eq!(json["is_deleted"], false);

    let round_tripped: InventoryItem = serde_json::from_value(json).unwrap();
    assert_eq!(round_tripped, item);
}
