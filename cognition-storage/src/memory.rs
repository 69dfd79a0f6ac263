//! In-memory cell store.

use crate::store::{CellScan, CellStore};
use crate::{StorageError, StorageResult};
use cognition_types::{Cell, RowRange, Visibility};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

type CellKey = (String, String, String, Visibility);

/// A [`CellStore`] backed by a sorted map.
///
/// Scans take a snapshot of the matching cells, so writes made while a scan
/// is being consumed are not observed by it. A cell written twice under the
/// same key keeps the later value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cells: Mutex<BTreeMap<CellKey, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `cells`.
    #[must_use]
    pub fn with_cells(cells: impl IntoIterator<Item = Cell>) -> Self {
        let map = cells
            .into_iter()
            .map(|cell| ((cell.row, cell.family, cell.qualifier, cell.visibility), cell.value))
            .collect();
        Self {
            cells: Mutex::new(map),
        }
    }

    /// Number of stored cells.
    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Every stored cell, in scan order.
    pub fn cells(&self) -> StorageResult<Vec<Cell>> {
        Ok(self.lock()?.iter().map(to_cell).collect())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, BTreeMap<CellKey, Vec<u8>>>> {
        self.cells
            .lock()
            .map_err(|_| StorageError::StoreIo("memory store lock poisoned".to_string()))
    }
}

impl CellStore for MemoryStore {
    fn scan(&self, range: &RowRange) -> StorageResult<CellScan<'_>> {
        let cells = self.lock()?;
        let lower = match &range.start {
            Bound::Included(row) | Bound::Excluded(row) => Bound::Included((
                row.clone(),
                String::new(),
                String::new(),
                Visibility::public(),
            )),
            Bound::Unbounded => Bound::Unbounded,
        };
        let snapshot: Vec<Cell> = cells
            .range::<CellKey, _>((lower, Bound::Unbounded))
            .skip_while(|((row, ..), _)| !range.after_start(row))
            .take_while(|((row, ..), _)| range.before_end(row))
            .map(to_cell)
            .collect();
        debug!(cells = snapshot.len(), "Memory store scan");
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    fn batch_write(&self, rows: Vec<Vec<Cell>>) -> StorageResult<()> {
        let mut cells = self.lock()?;
        let row_count = rows.len();
        let mut cell_count = 0usize;
        for cell in rows.into_iter().flatten() {
            cells.insert(
                (cell.row, cell.family, cell.qualifier, cell.visibility),
                cell.value,
            );
            cell_count += 1;
        }
        debug!(rows = row_count, cells = cell_count, "Memory store batch written");
        Ok(())
    }
}

fn to_cell(((row, family, qualifier, visibility), value): (&CellKey, &Vec<u8>)) -> Cell {
    Cell::new(row.clone(), family.clone(), qualifier.clone(), value.clone())
        .with_visibility(visibility.clone())
}
