use chrono::{TimeZone, Utc};
use cognition_model::{LogRecord, Record};
use cognition_storage::{
    BatchWriter, BatchWriterConfig, CellCursor, CellScan, CellStore, EventStorageConfig,
    EventWriter, MemoryStore, RowCodec, StorageError, StorageResult, WholeRowFormat,
};
use cognition_types::{Cell, RowKeyLayout, RowRange, Visibility};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn row(id: &str, cells: usize) -> Vec<Cell> {
    (0..cells)
        .map(|i| Cell::new(id, "f", format!("q{i}"), "value"))
        .collect()
}

fn rows_in(store: &MemoryStore) -> Vec<String> {
    let mut ids: Vec<String> = store.cells().unwrap().into_iter().map(|c| c.row).collect();
    ids.dedup();
    ids
}

fn log(uuid: &str, user: &str) -> LogRecord {
    let mut record = LogRecord::with_uuid(uuid);
    record.set_date(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap());
    record.set_value("user", user);
    record
}

/// Accepts a fixed number of batches, then fails every write.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    healthy_batches: usize,
    calls: AtomicUsize,
}

impl FlakyStore {
    fn failing_after(healthy_batches: usize) -> Self {
        Self {
            healthy_batches,
            ..Self::default()
        }
    }
}

impl CellStore for FlakyStore {
    fn scan(&self, range: &RowRange) -> StorageResult<CellScan<'_>> {
        self.inner.scan(range)
    }

    fn batch_write(&self, rows: Vec<Vec<Cell>>) -> StorageResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.healthy_batches {
            return Err(StorageError::StoreIo("write rejected".to_string()));
        }
        self.inner.batch_write(rows)
    }
}

// ── MemoryStore ──────────────────────────────────────────────────

#[test]
fn scan_returns_sorted_cells_in_range() {
    let store = MemoryStore::new();
    store
        .batch_write(vec![row("b", 2), row("a", 1), row("c", 1), row("ba", 1)])
        .unwrap();
    assert_eq!(store.len().unwrap(), 5);

    let all: Vec<Cell> = store
        .scan(&RowRange::all())
        .unwrap()
        .collect::<StorageResult<_>>()
        .unwrap();
    assert!(all.windows(2).all(|w| w[0] <= w[1]));

    let ids = |range: RowRange| -> Vec<String> {
        let mut ids: Vec<String> = store
            .scan(&range)
            .unwrap()
            .map(|c| c.unwrap().row)
            .collect();
        ids.dedup();
        ids
    };
    assert_eq!(ids(RowRange::exact("b")), vec!["b"]);
    assert_eq!(ids(RowRange::prefix("b")), vec!["b", "ba"]);
    assert_eq!(ids(RowRange::span("a", "c")), vec!["a", "b", "ba"]);
}

#[test]
fn later_write_replaces_cell() {
    let store = MemoryStore::new();
    store.batch_write(vec![vec![Cell::new("r", "f", "q", "1")]]).unwrap();
    store.batch_write(vec![vec![Cell::new("r", "f", "q", "2")]]).unwrap();
    assert_eq!(store.cells().unwrap(), vec![Cell::new("r", "f", "q", "2")]);
}

#[test]
fn visibility_is_part_of_cell_address() {
    let store = MemoryStore::with_cells(vec![
        Cell::new("r", "f", "q", "open"),
        Cell::new("r", "f", "q", "secret").with_visibility(Visibility::new("S")),
    ]);
    assert_eq!(store.len().unwrap(), 2);
}

#[test]
fn scan_aggregated_folds_rows() {
    let codec = RowCodec::builtin(RowKeyLayout::default());
    let record: Record = log("u-1", "alice").into();
    let store = MemoryStore::with_cells(codec.encode(&record).unwrap());
    let rows = store.scan_aggregated(&RowRange::all()).unwrap();
    assert_eq!(rows.len(), 1);
    let (key, value) = &rows[0];
    assert_eq!(codec.decode_aggregated(&WholeRowFormat, key, value).unwrap(), record);
}

#[test]
fn read_back_through_codec() {
    let codec = RowCodec::builtin(RowKeyLayout::default());
    let store = MemoryStore::new();
    let records: Vec<Record> = vec![log("u-1", "alice").into(), log("u-2", "bob").into()];
    store
        .batch_write(records.iter().map(|r| codec.encode(r).unwrap()).collect())
        .unwrap();
    let scan = store.scan(&RowRange::all()).unwrap();
    let mut read: Vec<Record> = codec
        .records(CellCursor::new(scan), false)
        .collect::<StorageResult<_>>()
        .unwrap();
    read.sort_by_key(|r| r.field("user").map(str::to_string));
    assert_eq!(read, records);
}

// ── BatchWriter ──────────────────────────────────────────────────

#[test]
fn batch_writer_buffers_until_flush() {
    let store = MemoryStore::new();
    let mut writer = BatchWriter::new(&store, BatchWriterConfig::default());
    writer.add_row(row("a", 2)).unwrap();
    writer.add_row(Vec::new()).unwrap();
    assert_eq!(writer.pending_rows(), 1);
    assert!(store.is_empty().unwrap());

    writer.flush().unwrap();
    assert_eq!(writer.pending_rows(), 0);
    assert_eq!(writer.pending_bytes(), 0);
    assert_eq!(writer.rows_written(), 1);
    assert_eq!(rows_in(&store), vec!["a"]);
}

#[test]
fn batch_writer_flushes_at_memory_limit() {
    let store = MemoryStore::new();
    let config = BatchWriterConfig {
        max_memory_bytes: 40,
        ..BatchWriterConfig::default()
    };
    let mut writer = BatchWriter::new(&store, config);
    // One cell is 1 + 1 + 2 + 0 + 5 = 9 bytes.
    writer.add_row(row("a", 2)).unwrap();
    assert_eq!(writer.pending_bytes(), 18);
    writer.add_row(row("b", 2)).unwrap();
    assert_eq!(writer.pending_rows(), 2);
    writer.add_row(row("c", 1)).unwrap();
    assert_eq!(writer.pending_rows(), 0);
    assert_eq!(rows_in(&store), vec!["a", "b", "c"]);
}

#[test]
fn batch_writer_flushes_on_latency() {
    let store = MemoryStore::new();
    let config = BatchWriterConfig {
        max_latency_ms: 0,
        ..BatchWriterConfig::default()
    };
    let mut writer = BatchWriter::new(&store, config);
    writer.add_row(row("a", 1)).unwrap();
    assert_eq!(writer.pending_rows(), 0);
    assert_eq!(rows_in(&store), vec!["a"]);
}

#[test]
fn idle_writer_flushes_when_stale() {
    let store = MemoryStore::new();
    let config = BatchWriterConfig {
        max_latency_ms: 20,
        ..BatchWriterConfig::default()
    };
    let mut writer = BatchWriter::new(&store, config);
    assert!(!writer.flush_if_stale().unwrap());

    writer.add_row(row("a", 1)).unwrap();
    assert!(!writer.flush_if_stale().unwrap());
    assert_eq!(writer.pending_rows(), 1);

    std::thread::sleep(Duration::from_millis(40));
    assert!(writer.flush_if_stale().unwrap());
    assert_eq!(writer.pending_rows(), 0);
    assert_eq!(rows_in(&store), vec!["a"]);
    assert!(!writer.flush_if_stale().unwrap());
}

#[test]
fn stale_flush_is_not_due_under_default_latency() {
    let store = MemoryStore::new();
    let mut writer = BatchWriter::new(&store, BatchWriterConfig::default());
    writer.add_row(row("a", 1)).unwrap();
    assert!(!writer.flush_if_stale().unwrap());
    assert_eq!(writer.pending_rows(), 1);
    assert!(store.is_empty().unwrap());
}

#[test]
fn close_and_drop_flush() {
    let store = MemoryStore::new();
    let mut writer = BatchWriter::new(&store, BatchWriterConfig::default());
    writer.add_row(row("a", 1)).unwrap();
    writer.close().unwrap();
    assert_eq!(rows_in(&store), vec!["a"]);

    {
        let mut writer = BatchWriter::new(&store, BatchWriterConfig::default());
        writer.add_row(row("b", 1)).unwrap();
    }
    assert_eq!(rows_in(&store), vec!["a", "b"]);
}

#[test]
fn failed_flush_drops_batch() {
    let store = FlakyStore::failing_after(0);
    let mut writer = BatchWriter::new(&store, BatchWriterConfig::default());
    writer.add_row(row("a", 1)).unwrap();
    assert!(matches!(writer.flush(), Err(StorageError::StoreIo(_))));
    assert_eq!(writer.pending_rows(), 0);
    assert_eq!(writer.rows_written(), 0);
    assert!(writer.flush().is_ok());
}

#[test]
fn batch_writer_over_shared_store() {
    let store = Arc::new(MemoryStore::new());
    let mut writer = BatchWriter::new(Arc::clone(&store), BatchWriterConfig::default());
    writer.add_row(row("a", 1)).unwrap();
    writer.close().unwrap();
    assert_eq!(store.len().unwrap(), 1);
}

// ── EventStorageConfig ───────────────────────────────────────────

#[test]
fn config_defaults() {
    let config = EventStorageConfig::default();
    assert_eq!(config.shard_count, 36);
    assert_eq!(config.uuid_prefix, "");
    assert!(config.visibility.is_none());
    assert_eq!(config.batch, BatchWriterConfig::default());
}

#[test]
fn config_requires_table() {
    assert!(matches!(
        EventStorageConfig::default().validate(),
        Err(StorageError::Config(_))
    ));
    assert!(EventStorageConfig::for_table("  ").validate().is_err());
    assert!(EventStorageConfig::for_table("events").validate().is_ok());
    assert!(EventWriter::new(MemoryStore::new(), &EventStorageConfig::default()).is_err());
}

#[test]
fn config_rejects_zero_shards() {
    let config = EventStorageConfig {
        shard_count: 0,
        ..EventStorageConfig::for_table("events")
    };
    assert!(matches!(config.validate(), Err(StorageError::Config(_))));
}

#[test]
fn config_from_json() {
    let config = EventStorageConfig::from_json(
        r#"{"event_table":"events","uuid_prefix":"evt_","splits":18,"visibility_by_field":"level",
            "batch":{"max_memory_bytes":1024}}"#,
    )
    .unwrap();
    assert_eq!(config.event_table, "events");
    assert_eq!(config.shard_count, 18);
    assert_eq!(config.batch.max_memory_bytes, 1024);
    assert_eq!(config.batch.max_latency_ms, 120_000);
    assert_eq!(config.key_layout().unwrap().prefix(), "evt_");

    assert!(matches!(
        EventStorageConfig::from_json("{"),
        Err(StorageError::Serialization(_))
    ));
    assert!(matches!(
        EventStorageConfig::from_json("{}"),
        Err(StorageError::Config(_))
    ));
}

#[test]
fn config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(&path, r#"{"event_table":"events"}"#).unwrap();
    assert_eq!(
        EventStorageConfig::load(&path).unwrap(),
        EventStorageConfig::for_table("events")
    );
    assert!(matches!(
        EventStorageConfig::load(dir.path().join("missing.json")),
        Err(StorageError::Io(_))
    ));
}

// ── EventWriter ──────────────────────────────────────────────────

#[test]
fn event_writer_writes_log_records() {
    let store = MemoryStore::new();
    let config = EventStorageConfig {
        uuid_prefix: "evt_".to_string(),
        ..EventStorageConfig::for_table("events")
    };
    let mut writer = EventWriter::new(&store, &config).unwrap();
    assert_eq!(writer.table(), "events");
    let record = log("u-1", "alice");
    let row_id = writer.process(&record).unwrap();
    assert_eq!(
        row_id,
        config.key_layout().unwrap().derive_at("u-1", record.date())
    );
    assert_eq!(writer.processed(), 1);
    assert_eq!(writer.pending_rows(), 1);
    writer.close().unwrap();

    let codec = config.codec().unwrap();
    let scan = store.scan(&RowRange::exact(row_id)).unwrap();
    let read: Vec<Record> = codec
        .records(CellCursor::new(scan), false)
        .collect::<StorageResult<_>>()
        .unwrap();
    assert_eq!(read, vec![Record::from(record)]);
}

#[test]
fn event_writer_flushes_stale_rows() {
    let store = MemoryStore::new();
    let mut config = EventStorageConfig::for_table("events");
    config.batch.max_latency_ms = 20;
    let mut writer = EventWriter::new(&store, &config).unwrap();
    writer.process(&log("u-1", "alice")).unwrap();
    assert_eq!(writer.pending_rows(), 1);

    std::thread::sleep(Duration::from_millis(40));
    assert!(writer.flush_if_stale().unwrap());
    assert_eq!(writer.pending_rows(), 0);
    assert!(!store.is_empty().unwrap());
}

#[test]
fn event_writer_static_visibility_wins() {
    let store = MemoryStore::new();
    let config = EventStorageConfig {
        visibility: Some("PUBLIC_SAFE".to_string()),
        visibility_by_field: Some("user".to_string()),
        ..EventStorageConfig::for_table("events")
    };
    let mut writer = EventWriter::new(&store, &config).unwrap();
    writer.process(&log("u-1", "alice")).unwrap();
    writer.close().unwrap();
    let cells = store.cells().unwrap();
    assert!(cells[0].visibility.is_public());
    assert!(cells[1..].iter().all(|c| c.visibility == Visibility::new("PUBLIC_SAFE")));
}

#[test]
fn event_writer_field_visibility() {
    let store = MemoryStore::new();
    let config = EventStorageConfig {
        visibility_by_field: Some("user".to_string()),
        ..EventStorageConfig::for_table("events")
    };
    let mut writer = EventWriter::new(&store, &config).unwrap();
    writer.process(&log("u-1", "alice")).unwrap();
    writer.close().unwrap();
    let cells = store.cells().unwrap();
    assert!(cells[1..].iter().all(|c| c.visibility == Visibility::new("alice")));
}

#[test]
fn event_writer_rejects_record_without_uuid() {
    let config = EventStorageConfig::for_table("t");
    let mut writer = EventWriter::new(MemoryStore::new(), &config).unwrap();
    let err = writer.process(&LogRecord::with_uuid("")).unwrap_err();
    assert!(matches!(err, StorageError::InvalidRecord(_)));
    assert_eq!(writer.processed(), 0);
}

#[test]
fn event_writer_resets_after_store_failure() {
    let store = FlakyStore::failing_after(1);
    let config = EventStorageConfig {
        batch: BatchWriterConfig {
            max_memory_bytes: 1,
            ..BatchWriterConfig::default()
        },
        ..EventStorageConfig::for_table("events")
    };
    let mut writer = EventWriter::new(&store, &config).unwrap();
    writer.process(&log("u-1", "alice")).unwrap();
    let err = writer.process(&log("u-2", "bob")).unwrap_err();
    assert!(matches!(err, StorageError::StoreIo(_)));
    assert_eq!(writer.processed(), 1);
    assert_eq!(writer.pending_rows(), 0);
    assert_eq!(writer.table(), "events");

    let users: Vec<String> = store
        .inner
        .cells()
        .unwrap()
        .into_iter()
        .filter(|c| c.qualifier == "user")
        .map(|c| c.value_lossy())
        .collect();
    assert_eq!(users, vec!["alice"]);
}
