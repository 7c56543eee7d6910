//! Storage and flat-file export of a generated dataset.

use std::fs;
use stockradar_core::{
    config::SimConfig,
    dataset::Dataset,
    engine::SimEngine,
    export::{write_table, CsvExporter},
    store::{SimStore, Table},
};

fn dataset(seed: u64) -> Dataset {
    SimEngine::new(SimConfig::default_test().with_seed(seed).with_merchant_count(300))
        .unwrap()
        .run()
}

fn stored(ds: &Dataset) -> SimStore {
    let mut store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.write_dataset(ds).expect("write dataset");
    store
}

#[test]
fn store_row_counts_match_the_dataset() {
    let ds = dataset(42);
    let store = stored(&ds);
    let counts = ds.row_counts();

    assert_eq!(store.row_count(Table::Merchants).unwrap() as usize, counts.merchants);
    assert_eq!(store.row_count(Table::SubscriptionEvents).unwrap() as usize, counts.subscription_events);
    assert_eq!(store.row_count(Table::AppEvents).unwrap() as usize, counts.app_events);
    assert_eq!(store.row_count(Table::Revenue).unwrap() as usize, counts.revenue);

    let per_merchant: usize = ds.outcomes.iter().map(|o| o.app_event_count).sum();
    assert_eq!(store.row_count(Table::AppEvents).unwrap() as usize, per_merchant);
}

#[test]
fn stored_data_respects_cancellation() {
    let ds = dataset(43);
    let store = stored(&ds);
    assert_eq!(store.rows_after_cancel().unwrap(), 0);

    let churned = ds.outcomes.iter().filter(|o| o.churned()).count();
    assert_eq!(store.churned_merchant_count().unwrap() as usize, churned);
}

#[test]
fn lowercased_event_types_collapse_to_canonical_names() {
    let ds = dataset(44);
    let store = stored(&ds);

    let sub_types: Vec<String> = store
        .event_type_counts(Table::SubscriptionEvents)
        .unwrap()
        .into_iter()
        .map(|(t, _)| t)
        .collect();
    assert!(sub_types.contains(&"trial_start".to_string()));
    assert!(sub_types.contains(&"upgrade_pro".to_string()));

    // Case folding alone merges most variants; the camelCase aliases
    // (smsSent, smsFail, integrationError) survive as separate buckets.
    let app = store.event_type_counts(Table::AppEvents).unwrap();
    let names: Vec<&str> = app.iter().map(|(t, _)| t.as_str()).collect();
    assert!(names.contains(&"dashboard_view"));
    assert!(names.iter().all(|n| *n == n.to_lowercase()));
    let total: i64 = app.iter().map(|(_, n)| n).sum();
    assert_eq!(total as usize, ds.app_events.len());

    assert!(store.event_type_counts(Table::Revenue).unwrap().is_empty());
}

#[test]
fn migrate_drops_a_previous_run() {
    let ds = dataset(45);
    let mut store = stored(&ds);
    store.migrate().unwrap();
    for table in Table::ALL {
        assert_eq!(store.row_count(table).unwrap(), 0, "{} not cleared", table.name());
    }
    store.write_dataset(&ds).unwrap();
    assert_eq!(store.row_count(Table::Merchants).unwrap(), 300);
}

#[test]
fn writing_without_a_schema_fails_cleanly() {
    let ds = dataset(46);
    let mut store = SimStore::in_memory().unwrap();
    assert!(store.write_dataset(&ds).is_err());
}

#[test]
fn csv_export_writes_one_file_per_table() {
    let ds = dataset(47);
    let dir = std::env::temp_dir().join(format!("stockradar-export-{}", std::process::id()));
    let exporter = CsvExporter::new(&dir);
    exporter.export(&ds).expect("export");

    for table in Table::ALL {
        let path = exporter.path_for(table);
        let on_disk = fs::read(&path).expect("read exported file");
        let mut in_memory = Vec::new();
        write_table(&mut in_memory, table, &ds).unwrap();
        assert_eq!(on_disk, in_memory, "{} differs on disk", path.display());

        let text = String::from_utf8(on_disk).unwrap();
        let lines = text.lines().count();
        let expected_rows = match table {
            Table::Merchants => ds.merchants.len(),
            Table::SubscriptionEvents => ds.subscription_events.len(),
            Table::AppEvents => ds.app_events.len(),
            Table::Revenue => ds.revenue.len(),
        };
        assert_eq!(lines, expected_rows + 1, "{} header + rows", table.name());
    }

    let subs = fs::read_to_string(exporter.path_for(Table::SubscriptionEvents)).unwrap();
    let mut lines = subs.lines();
    assert_eq!(
        lines.next(),
        Some("event_id,merchant_id,event_timestamp,event_type,monthly_price,plan_code_raw")
    );
    let first = lines.next().unwrap();
    assert!(first.starts_with("1,1,"), "first row: {first}");
    assert!(first.ends_with(",trial_start,0.0,free"), "first row: {first}");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn failed_export_leaves_the_previous_tables_in_place() {
    let first = dataset(48);
    let mut store = stored(&first);

    // A regular file where the export directory should be.
    let blocker = std::env::temp_dir().join(format!("stockradar-blocker-{}", std::process::id()));
    fs::write(&blocker, b"not a directory").unwrap();
    let exporter = CsvExporter::new(blocker.join("raw"));

    let second = dataset(49);
    assert!(store.publish(&second, &exporter).is_err());
    assert_eq!(store.row_count(Table::Merchants).unwrap(), 300);
    assert_eq!(
        store.row_count(Table::AppEvents).unwrap() as usize,
        first.app_events.len(),
        "tables were rewritten despite the failed export"
    );

    fs::remove_file(&blocker).ok();
}

#[test]
fn publish_writes_files_and_tables() {
    let ds = dataset(50);
    let dir = std::env::temp_dir().join(format!("stockradar-publish-{}", std::process::id()));
    let exporter = CsvExporter::new(&dir);
    let mut store = SimStore::in_memory().unwrap();

    store.publish(&ds, &exporter).expect("publish");
    assert_eq!(store.row_count(Table::Revenue).unwrap() as usize, ds.revenue.len());
    assert!(exporter.path_for(Table::Revenue).exists());

    fs::remove_dir_all(&dir).ok();
}
