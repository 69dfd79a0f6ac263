//! The sorted cell model.
//!
//! A cell is addressed by `(row, family, qualifier, visibility)` and carries
//! an opaque byte value. Cells sort by row, then family, then qualifier; a
//! [`Row`] is every cell sharing one row id, keyed by [`Column`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

/// Access label expression attached to a cell.
///
/// The expression is threaded through untouched; an empty expression means
/// the cell is public.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Visibility(String);

impl Visibility {
    /// Creates a visibility from a label expression.
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    /// The open label.
    #[must_use]
    pub const fn public() -> Self {
        Self(String::new())
    }

    /// Returns true when no label is attached.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw expression.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Visibility {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Visibility {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Column address of a cell within its row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Column {
    pub family: String,
    pub qualifier: String,
}

impl Column {
    #[must_use]
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }
}

/// Labelled value stored under a [`Column`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellValue {
    pub visibility: Visibility,
    pub value: Vec<u8>,
}

impl CellValue {
    #[must_use]
    pub fn new(visibility: Visibility, value: impl Into<Vec<u8>>) -> Self {
        Self {
            visibility,
            value: value.into(),
        }
    }

    /// Value decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn value_lossy(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

/// The smallest addressable unit of the store.
///
/// Field order matters: the derived `Ord` sorts by row, family, qualifier,
/// then visibility and value, which is the scan order of the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: String,
    pub family: String,
    pub qualifier: String,
    #[serde(default)]
    pub visibility: Visibility,
    pub value: Vec<u8>,
}

impl Cell {
    /// Creates a public cell.
    #[must_use]
    pub fn new(
        row: impl Into<String>,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            visibility: Visibility::public(),
            value: value.into(),
        }
    }

    /// Attaches a visibility label.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Returns the column address of this cell.
    #[must_use]
    pub fn column(&self) -> Column {
        Column::new(self.family.clone(), self.qualifier.clone())
    }

    /// Value decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn value_lossy(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }

    /// Splits the cell into its row id, column and value.
    #[must_use]
    pub fn into_parts(self) -> (String, Column, CellValue) {
        (
            self.row,
            Column {
                family: self.family,
                qualifier: self.qualifier,
            },
            CellValue {
                visibility: self.visibility,
                value: self.value,
            },
        )
    }
}

/// All cells of one row, ordered by column.
///
/// Two cells that share a column but differ in visibility collapse onto one
/// entry; the one inserted last wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub id: String,
    pub cells: BTreeMap<Column, CellValue>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Builds a row from cells; returns `None` for an empty input.
    ///
    /// The row id is taken from the first cell. Cells belonging to other rows
    /// are not filtered out; callers pass cells of a single row.
    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Option<Self> {
        let mut cells = cells.into_iter();
        let first = cells.next()?;
        let mut row = Self::new(first.row.clone());
        row.insert_cell(first);
        for cell in cells {
            row.insert_cell(cell);
        }
        Some(row)
    }

    /// Inserts a cell, keeping this row's id.
    pub fn insert_cell(&mut self, cell: Cell) {
        let (_, column, value) = cell.into_parts();
        self.cells.insert(column, value);
    }

    /// Inserts a value under `column`.
    pub fn insert(&mut self, column: Column, value: CellValue) {
        self.cells.insert(column, value);
    }

    /// Number of cells in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the row has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The lowest-sorting cell of the row.
    #[must_use]
    pub fn first(&self) -> Option<(&Column, &CellValue)> {
        self.cells.first_key_value()
    }

    /// Removes and returns the lowest-sorting cell of the row.
    pub fn pop_first(&mut self) -> Option<(Column, CellValue)> {
        self.cells.pop_first()
    }

    /// Reads every qualifier/value pair of `family` without removing it.
    #[must_use]
    pub fn read_family(&self, family: &str) -> BTreeMap<String, String> {
        self.family_range(family)
            .map(|(column, value)| (column.qualifier.clone(), decode_text(column, value)))
            .collect()
    }

    /// Removes every cell of `family` and returns its qualifier/value pairs.
    pub fn take_family(&mut self, family: &str) -> BTreeMap<String, String> {
        let columns: Vec<Column> = self.family_range(family).map(|(c, _)| c.clone()).collect();
        columns
            .into_iter()
            .filter_map(|column| {
                let value = self.cells.remove(&column)?;
                let text = decode_text(&column, &value);
                Some((column.qualifier, text))
            })
            .collect()
    }

    /// Distinct families still present in the row.
    #[must_use]
    pub fn families(&self) -> Vec<&str> {
        let mut families: Vec<&str> = self.cells.keys().map(|c| c.family.as_str()).collect();
        families.dedup();
        families
    }

    /// Flattens the row back into sorted cells.
    #[must_use]
    pub fn into_cells(self) -> Vec<Cell> {
        let id = self.id;
        self.cells
            .into_iter()
            .map(|(column, value)| Cell {
                row: id.clone(),
                family: column.family,
                qualifier: column.qualifier,
                visibility: value.visibility,
                value: value.value,
            })
            .collect()
    }

    fn family_range<'a>(
        &'a self,
        family: &'a str,
    ) -> impl Iterator<Item = (&'a Column, &'a CellValue)> + 'a {
        self.cells
            .range(Column::new(family, "")..)
            .take_while(move |(column, _)| column.family == family)
    }
}

fn decode_text(column: &Column, value: &CellValue) -> String {
    match String::from_utf8_lossy(&value.value) {
        Cow::Borrowed(text) => text.to_string(),
        Cow::Owned(text) => {
            debug!(
                family = %column.family,
                qualifier = %column.qualifier,
                "Replaced invalid UTF-8 in cell value"
            );
            text
        }
    }
}
