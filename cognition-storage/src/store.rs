//! The boundary to a sorted cell store.

use crate::aggregate::{RowAggregateFormat, WholeRowFormat};
use crate::grouper::{group_next_row, CellCursor};
use crate::StorageResult;
use cognition_types::{Cell, RowRange};
use std::sync::Arc;

/// Cells of a scan, in `(row, family, qualifier)` order.
pub type CellScan<'a> = Box<dyn Iterator<Item = StorageResult<Cell>> + Send + 'a>;

/// A sorted, cell-addressed store.
///
/// Implementations report their own failures as
/// [`StorageError::StoreIo`](crate::StorageError::StoreIo), either from the
/// call itself or from an item of the returned scan.
pub trait CellStore: Send + Sync {
    /// Scans every cell whose row id falls in `range`.
    fn scan(&self, range: &RowRange) -> StorageResult<CellScan<'_>>;

    /// Writes a batch of rows. The whole batch fails or succeeds.
    fn batch_write(&self, rows: Vec<Vec<Cell>>) -> StorageResult<()>;

    /// Scans `range` with every row folded into one [`WholeRowFormat`] value.
    fn scan_aggregated(&self, range: &RowRange) -> StorageResult<Vec<(String, Vec<u8>)>> {
        let mut cursor = CellCursor::new(self.scan(range)?);
        let mut rows = Vec::new();
        while let Some(row) = group_next_row(&mut cursor)? {
            let value = WholeRowFormat.encode_row(&row)?;
            rows.push((row.id, value));
        }
        Ok(rows)
    }
}

impl<S: CellStore + ?Sized> CellStore for &S {
    fn scan(&self, range: &RowRange) -> StorageResult<CellScan<'_>> {
        (**self).scan(range)
    }

    fn batch_write(&self, rows: Vec<Vec<Cell>>) -> StorageResult<()> {
        (**self).batch_write(rows)
    }
}

impl<S: CellStore + ?Sized> CellStore for Arc<S> {
    fn scan(&self, range: &RowRange) -> StorageResult<CellScan<'_>> {
        (**self).scan(range)
    }

    fn batch_write(&self, rows: Vec<Vec<Cell>>) -> StorageResult<()> {
        (**self).batch_write(rows)
    }
}
