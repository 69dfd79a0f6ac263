//! Grouping a sorted cell stream into rows and records.
//!
//! Row boundaries are only visible once the first cell of the next row has
//! been read. [`CellCursor`] keeps that cell in a one-element buffer so the
//! next call starts from it instead of losing it.

use crate::codec::RowCodec;
use crate::StorageResult;
use cognition_model::Record;
use cognition_types::{Cell, Row};
use tracing::debug;

/// A cell stream with one cell of lookahead.
#[derive(Debug)]
pub struct CellCursor<I> {
    inner: I,
    peeked: Option<Cell>,
}

impl<I> CellCursor<I>
where
    I: Iterator<Item = StorageResult<Cell>>,
{
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            peeked: None,
        }
    }

    /// The next cell, without consuming it.
    ///
    /// A store error is returned once and not buffered.
    pub fn peek_next(&mut self) -> StorageResult<Option<&Cell>> {
        if self.peeked.is_none() {
            if let Some(next) = self.inner.next() {
                self.peeked = Some(next?);
            }
        }
        Ok(self.peeked.as_ref())
    }

    /// Consumes the next cell.
    pub fn next_cell(&mut self) -> StorageResult<Option<Cell>> {
        match self.peeked.take() {
            Some(cell) => Ok(Some(cell)),
            None => self.inner.next().transpose(),
        }
    }

    /// True when no cells remain.
    pub fn is_exhausted(&mut self) -> StorageResult<bool> {
        Ok(self.peek_next()?.is_none())
    }
}

impl CellCursor<std::vec::IntoIter<StorageResult<Cell>>> {
    /// A cursor over cells already in memory.
    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Self {
        let cells: Vec<StorageResult<Cell>> = cells.into_iter().map(Ok).collect();
        Self::new(cells.into_iter())
    }
}

/// Consumes the cells of the next row.
///
/// Stops, without consuming, at the first cell of a different row. Returns
/// `None` once the cursor is exhausted.
pub fn group_next_row<I>(cursor: &mut CellCursor<I>) -> StorageResult<Option<Row>>
where
    I: Iterator<Item = StorageResult<Cell>>,
{
    let mut row: Option<Row> = None;
    loop {
        let same_row = match cursor.peek_next()? {
            Some(cell) => row.as_ref().is_none_or(|row| row.id == cell.row),
            None => false,
        };
        if !same_row {
            return Ok(row);
        }
        let Some(cell) = cursor.next_cell()? else {
            return Ok(row);
        };
        row.get_or_insert_with(|| Row::new(cell.row.clone()))
            .insert_cell(cell);
    }
}

impl RowCodec {
    /// Decodes the record at the head of `cursor`.
    ///
    /// The first cell of the next row is inspected without consuming it. A
    /// row without a discriminator, or with an unknown tag, is consumed and
    /// skipped when `skip_unrecognized_rows` is set; otherwise the cursor is
    /// left on it and `None` is returned. Store errors propagate in both
    /// modes.
    pub fn decode_next_record<I>(
        &self,
        cursor: &mut CellCursor<I>,
        skip_unrecognized_rows: bool,
    ) -> StorageResult<Option<Record>>
    where
        I: Iterator<Item = StorageResult<Cell>>,
    {
        loop {
            let dispatched = match cursor.peek_next()? {
                Some(first) => self.dispatch(first).map(|_| ()),
                None => return Ok(None),
            };
            match dispatched {
                Ok(()) => {
                    return match group_next_row(cursor)? {
                        Some(row) => self.decode(row).map(Some),
                        None => Ok(None),
                    };
                }
                Err(err) if err.is_unrecognized_row() => {
                    if !skip_unrecognized_rows {
                        debug!("Stopping at unrecognized row: {}", err);
                        return Ok(None);
                    }
                    if let Some(row) = group_next_row(cursor)? {
                        debug!(row = %row.id, cells = row.len(), "Skipping unrecognized row: {}", err);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Iterates the records of `cursor`.
    pub fn records<I>(&self, cursor: CellCursor<I>, skip_unrecognized_rows: bool) -> RecordReader<'_, I>
    where
        I: Iterator<Item = StorageResult<Cell>>,
    {
        RecordReader {
            codec: self,
            cursor,
            skip_unrecognized_rows,
            failed: false,
        }
    }
}

/// Iterator over the records of a cell stream.
///
/// Stops after the first error.
#[derive(Debug)]
pub struct RecordReader<'a, I> {
    codec: &'a RowCodec,
    cursor: CellCursor<I>,
    skip_unrecognized_rows: bool,
    failed: bool,
}

impl<I> RecordReader<'_, I> {
    /// Gives back the cursor, positioned after the last record read.
    pub fn into_cursor(self) -> CellCursor<I> {
        self.cursor
    }
}

impl<I> Iterator for RecordReader<'_, I>
where
    I: Iterator<Item = StorageResult<Cell>>,
{
    type Item = StorageResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self
            .codec
            .decode_next_record(&mut self.cursor, self.skip_unrecognized_rows)
        {
            Ok(record) => record.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
