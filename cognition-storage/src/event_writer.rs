//! Ingest path writing log records into an event table.

use crate::batch::{BatchWriter, BatchWriterConfig};
use crate::codec::RowCodec;
use crate::store::CellStore;
use crate::{StorageError, StorageResult};
use cognition_model::{LogRecord, VisibilityPolicy};
use cognition_types::{RowKeyLayout, DEFAULT_SHARD_COUNT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info};

/// Settings of an [`EventWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStorageConfig {
    /// Name of the event table. Required. The [`CellStore`] handed to the
    /// writer is already bound to its table, so this only labels the
    /// writer's log lines and identifies it to callers.
    pub event_table: String,
    /// Prepended to every row id.
    pub uuid_prefix: String,
    /// Number of shard prefixes row ids are spread over.
    #[serde(alias = "splits")]
    pub shard_count: u32,
    /// Static label applied to every row.
    pub visibility: Option<String>,
    /// Record field whose value is used as the row label.
    pub visibility_by_field: Option<String>,
    pub batch: BatchWriterConfig,
}

impl Default for EventStorageConfig {
    fn default() -> Self {
        Self {
            event_table: String::new(),
            uuid_prefix: String::new(),
            shard_count: DEFAULT_SHARD_COUNT,
            visibility: None,
            visibility_by_field: None,
            batch: BatchWriterConfig::default(),
        }
    }
}

impl EventStorageConfig {
    /// Config for `event_table` with every other setting at its default.
    #[must_use]
    pub fn for_table(event_table: impl Into<String>) -> Self {
        Self {
            event_table: event_table.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.event_table.trim().is_empty() {
            return Err(StorageError::Config(
                "event_table must be set to a non-blank table name".to_string(),
            ));
        }
        if self.shard_count == 0 {
            return Err(StorageError::Config(
                "shard_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn key_layout(&self) -> StorageResult<RowKeyLayout> {
        Ok(RowKeyLayout::new(self.uuid_prefix.clone(), self.shard_count)?)
    }

    /// A static label wins over a label field; with neither, rows are open.
    #[must_use]
    pub fn visibility_policy(&self) -> VisibilityPolicy {
        VisibilityPolicy::from_settings(
            self.visibility.as_deref(),
            self.visibility_by_field.as_deref(),
        )
    }

    /// Codec over the built-in variants with this config's layout and
    /// visibility.
    pub fn codec(&self) -> StorageResult<RowCodec> {
        Ok(RowCodec::builtin(self.key_layout()?).with_visibility(self.visibility_policy()))
    }
}

/// Encodes log records and writes them through a [`BatchWriter`].
#[derive(Debug)]
pub struct EventWriter<S: CellStore> {
    table: String,
    codec: RowCodec,
    writer: BatchWriter<S>,
    processed: u64,
}

impl<S: CellStore> EventWriter<S> {
    /// Validates `config` and opens a writer on `store`.
    pub fn new(store: S, config: &EventStorageConfig) -> StorageResult<Self> {
        config.validate()?;
        let codec = config.codec()?;
        info!(
            table = %config.event_table,
            shards = config.shard_count,
            "Event writer opened"
        );
        Ok(Self {
            table: config.event_table.clone(),
            codec,
            writer: BatchWriter::new(store, config.batch.clone()),
            processed: 0,
        })
    }

    /// Encodes `record` and queues its row, returning the row id.
    ///
    /// On a store failure the buffered rows are dropped, the writer starts
    /// over empty and the error is returned.
    pub fn process(&mut self, record: &LogRecord) -> StorageResult<String> {
        let cells = self.codec.encode_variant(record)?;
        let row_id = cells
            .first()
            .map(|cell| cell.row.clone())
            .unwrap_or_default();
        if let Err(e) = self.writer.add_row(cells) {
            error!(table = %self.table, row = %row_id, "Failed to write event: {}", e);
            self.reset();
            return Err(e);
        }
        self.processed += 1;
        Ok(row_id)
    }

    fn reset(&mut self) {
        let dropped = self.writer.discard();
        info!(table = %self.table, dropped, "Event writer reset");
    }

    /// Flushes if buffered rows have waited past the batch latency limit.
    pub fn flush_if_stale(&mut self) -> StorageResult<bool> {
        self.writer.flush_if_stale().inspect_err(|e| {
            error!(table = %self.table, "Failed to flush stale events: {}", e);
        })
    }

    /// Writes every buffered row.
    pub fn flush(&mut self) -> StorageResult<()> {
        self.writer.flush().inspect_err(|e| {
            error!(table = %self.table, "Failed to flush events: {}", e);
        })
    }

    /// Flushes and releases the writer.
    pub fn close(mut self) -> StorageResult<()> {
        self.flush()?;
        info!(table = %self.table, processed = self.processed, "Event writer closed");
        Ok(())
    }

    /// The configured event table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn codec(&self) -> &RowCodec {
        &self.codec
    }

    /// Records queued successfully so far.
    #[must_use]
    pub const fn processed(&self) -> u64 {
        self.processed
    }

    #[must_use]
    pub fn pending_rows(&self) -> usize {
        self.writer.pending_rows()
    }

    #[must_use]
    pub fn store(&self) -> &S {
        self.writer.store()
    }
}
