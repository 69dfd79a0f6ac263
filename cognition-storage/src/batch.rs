//! Buffered row writes.

use crate::store::CellStore;
use crate::StorageResult;
use cognition_types::Cell;
use serde::{Deserialize, Serialize};
use std::mem;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Limits on how much a [`BatchWriter`] buffers before flushing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchWriterConfig {
    /// Flush once the buffered rows hold at least this many bytes.
    pub max_memory_bytes: usize,
    /// Flush once the oldest buffered row is this old. Checked on every
    /// write and by [`BatchWriter::flush_if_stale`].
    pub max_latency_ms: u64,
}

impl Default for BatchWriterConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: 50 * 1024 * 1024,
            max_latency_ms: 120_000,
        }
    }
}

/// Buffers rows and hands them to a [`CellStore`] in batches.
///
/// Rows still buffered when the writer is dropped are flushed; a failure at
/// that point can only be logged, so call [`BatchWriter::close`] to see it.
#[derive(Debug)]
pub struct BatchWriter<S: CellStore> {
    store: S,
    config: BatchWriterConfig,
    pending: Vec<Vec<Cell>>,
    pending_bytes: usize,
    oldest: Option<Instant>,
    rows_written: u64,
}

impl<S: CellStore> BatchWriter<S> {
    pub fn new(store: S, config: BatchWriterConfig) -> Self {
        Self {
            store,
            config,
            pending: Vec::new(),
            pending_bytes: 0,
            oldest: None,
            rows_written: 0,
        }
    }

    /// Buffers one row, flushing if a limit is reached.
    pub fn add_row(&mut self, row: Vec<Cell>) -> StorageResult<()> {
        if row.is_empty() {
            return Ok(());
        }
        self.pending_bytes += row.iter().map(cell_size).sum::<usize>();
        self.pending.push(row);
        self.oldest.get_or_insert_with(Instant::now);
        if self.pending_bytes >= self.config.max_memory_bytes || self.latency_exceeded() {
            self.flush()?;
        }
        Ok(())
    }

    fn latency_exceeded(&self) -> bool {
        self.oldest.is_some_and(|since| {
            since.elapsed() >= Duration::from_millis(self.config.max_latency_ms)
        })
    }

    /// Flushes if the oldest buffered row has waited past `max_latency_ms`.
    ///
    /// Returns whether a flush happened. Idle writers call this from a timer
    /// so buffered rows do not wait for the next write.
    pub fn flush_if_stale(&mut self) -> StorageResult<bool> {
        if !self.latency_exceeded() {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    /// Writes every buffered row.
    ///
    /// The buffer is cleared whether or not the write succeeds; a failed batch
    /// is not retried.
    pub fn flush(&mut self) -> StorageResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = mem::take(&mut self.pending);
        let rows = batch.len();
        let bytes = mem::take(&mut self.pending_bytes);
        self.oldest = None;
        match self.store.batch_write(batch) {
            Ok(()) => {
                self.rows_written += rows as u64;
                debug!(rows, bytes, "Batch flushed");
                Ok(())
            }
            Err(e) => {
                warn!(rows, bytes, "Batch write failed, dropping batch: {}", e);
                Err(e)
            }
        }
    }

    /// Flushes and releases the writer.
    pub fn close(mut self) -> StorageResult<()> {
        self.flush()
    }

    /// Drops buffered rows without writing them.
    pub fn discard(&mut self) -> usize {
        let rows = self.pending.len();
        self.pending.clear();
        self.pending_bytes = 0;
        self.oldest = None;
        rows
    }

    #[must_use]
    pub fn pending_rows(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub const fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    /// Rows successfully handed to the store so far.
    #[must_use]
    pub const fn rows_written(&self) -> u64 {
        self.rows_written
    }

    #[must_use]
    pub const fn config(&self) -> &BatchWriterConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }
}

impl<S: CellStore> Drop for BatchWriter<S> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush batch writer on drop: {}", e);
        }
    }
}

fn cell_size(cell: &Cell) -> usize {
    cell.row.len()
        + cell.family.len()
        + cell.qualifier.len()
        + cell.visibility.as_str().len()
        + cell.value.len()
}
