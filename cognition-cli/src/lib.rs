//! Building blocks of the `cognition` command line tool.
//!
//! Cell dumps are JSON lines, one [`Cell`] per line; record dumps are JSON
//! lines of [`Record`].

use anyhow::{Context, Result};
use cognition_model::Record;
use cognition_storage::{CellCursor, CellStore, EventStorageConfig, MemoryStore, RowCodec};
use cognition_types::{Cell, RowRange};
use std::io::{BufRead, Write};
use std::ops::Bound;
use std::path::Path;
use tracing::{debug, info, warn};

/// Storage settings for the CLI: the config file if one is given, else the
/// defaults, with `prefix` and `shards` overriding either.
pub fn load_settings(
    config: Option<&Path>,
    prefix: Option<&str>,
    shards: Option<u32>,
) -> Result<EventStorageConfig> {
    let mut settings = match config {
        Some(path) => EventStorageConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EventStorageConfig::for_table("events"),
    };
    if let Some(prefix) = prefix {
        settings.uuid_prefix = prefix.to_string();
    }
    if let Some(shards) = shards {
        settings.shard_count = shards;
    }
    settings.validate()?;
    Ok(settings)
}

/// Renders a range as `[start, end)` style text.
#[must_use]
pub fn format_range(range: &RowRange) -> String {
    let start = match &range.start {
        Bound::Included(row) => format!("[{row}"),
        Bound::Excluded(row) => format!("({row}"),
        Bound::Unbounded => "(-inf".to_string(),
    };
    let end = match &range.end {
        Bound::Included(row) => format!("{row}]"),
        Bound::Excluded(row) => format!("{row})"),
        Bound::Unbounded => "+inf)".to_string(),
    };
    format!("{start}, {end}")
}

/// Reads JSON lines of records and writes their encoded cells as JSON lines.
///
/// Returns the number of records encoded.
pub fn encode_records<R: BufRead, W: Write>(
    codec: &RowCodec,
    input: R,
    mut out: W,
) -> Result<usize> {
    let mut count = 0;
    for (number, line) in input.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line)
            .with_context(|| format!("Line {}: not a record", number + 1))?;
        for cell in codec.encode(&record)? {
            serde_json::to_writer(&mut out, &cell)?;
            writeln!(out)?;
        }
        count += 1;
    }
    debug!(records = count, "Encoded records");
    Ok(count)
}

/// Reads JSON lines of cells and writes the decoded records as JSON lines.
///
/// Cells may appear in any order; they are sorted through a [`MemoryStore`]
/// before grouping. Returns the number of records decoded.
pub fn decode_cells<R: BufRead, W: Write>(
    codec: &RowCodec,
    input: R,
    mut out: W,
    skip_unrecognized_rows: bool,
) -> Result<usize> {
    let mut cells = Vec::new();
    for (number, line) in input.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let cell: Cell = serde_json::from_str(&line)
            .with_context(|| format!("Line {}: not a cell", number + 1))?;
        cells.push(cell);
    }
    info!(cells = cells.len(), "Loaded cell dump");

    let store = MemoryStore::with_cells(cells);
    let cursor = CellCursor::new(store.scan(&RowRange::all())?);
    let mut reader = codec.records(cursor, skip_unrecognized_rows);
    let mut count = 0;
    for record in reader.by_ref() {
        serde_json::to_writer(&mut out, &record?)?;
        writeln!(out)?;
        count += 1;
    }
    if let Some(cell) = reader.into_cursor().peek_next()? {
        warn!(row = %cell.row, "Stopped at an unrecognized row");
    }
    debug!(records = count, "Decoded records");
    Ok(count)
}
