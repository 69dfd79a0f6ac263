//! Polymorphic row codec.
//!
//! Every persisted row starts with a discriminator cell naming the record
//! variant. The family begins with a NUL character, so the cell sorts before
//! every data column and is the first cell a scan sees for its row.

use crate::aggregate::RowAggregateFormat;
use crate::registry::{Registration, TypeRegistry};
use crate::{StorageError, StorageResult};
use cognition_model::{Record, RowRecord, VisibilityPolicy};
use cognition_types::{Cell, Row, RowKeyLayout};
use tracing::debug;

/// Family of the discriminator cell.
pub const DISCRIMINATOR_FAMILY: &str = "\0implementation";

/// Qualifier of the discriminator cell.
pub const DISCRIMINATOR_QUALIFIER: &str = "class";

/// Returns true if `family`/`qualifier` address the discriminator cell.
#[must_use]
pub fn is_discriminator(family: &str, qualifier: &str) -> bool {
    family == DISCRIMINATOR_FAMILY && qualifier == DISCRIMINATOR_QUALIFIER
}

/// The discriminator cell for `row_id`. Always written public.
#[must_use]
pub fn discriminator_cell(row_id: &str, tag: &str) -> Cell {
    Cell::new(row_id, DISCRIMINATOR_FAMILY, DISCRIMINATOR_QUALIFIER, tag.as_bytes())
}

/// Maps records to sorted cell lists and back.
#[derive(Debug, Clone)]
pub struct RowCodec {
    registry: TypeRegistry,
    keys: RowKeyLayout,
    visibility: VisibilityPolicy,
}

impl RowCodec {
    /// Creates a codec writing public rows.
    #[must_use]
    pub fn new(registry: TypeRegistry, keys: RowKeyLayout) -> Self {
        Self {
            registry,
            keys,
            visibility: VisibilityPolicy::Public,
        }
    }

    /// Codec over the built-in variants with the given key layout.
    #[must_use]
    pub fn builtin(keys: RowKeyLayout) -> Self {
        Self::new(TypeRegistry::builtin(), keys)
    }

    #[must_use]
    pub fn with_visibility(mut self, policy: VisibilityPolicy) -> Self {
        self.visibility = policy;
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn keys(&self) -> &RowKeyLayout {
        &self.keys
    }

    #[must_use]
    pub const fn visibility_policy(&self) -> &VisibilityPolicy {
        &self.visibility
    }

    /// Row id `record` is written under.
    pub fn row_id(&self, record: &Record) -> StorageResult<String> {
        let (_, registration) = self.primary(record)?;
        registration.row_id(record, &self.keys)
    }

    /// Encodes `record` as a sorted cell list led by the discriminator.
    pub fn encode(&self, record: &Record) -> StorageResult<Vec<Cell>> {
        let (tag, registration) = self.primary(record)?;
        let row_id = registration.row_id(record, &self.keys)?;
        let visibility = self.visibility.resolve(record);
        let cells = registration.encode(record, &row_id, &visibility)?;
        Ok(assemble(&row_id, tag, cells))
    }

    /// Encodes a borrowed variant without wrapping it in a [`Record`].
    pub fn encode_variant<R: RowRecord>(&self, record: &R) -> StorageResult<Vec<Cell>> {
        let tag = self
            .registry
            .tag_for(R::KIND)
            .ok_or(StorageError::UnregisteredVariant(R::KIND))?;
        let row_id = record.row_id(&self.keys)?;
        let visibility = self.visibility.resolve(record);
        let cells = record.to_cells(&row_id, &visibility);
        Ok(assemble(&row_id, tag, cells))
    }

    fn primary(&self, record: &Record) -> StorageResult<(&str, &Registration)> {
        self.registry
            .primary(record.kind())
            .ok_or(StorageError::UnregisteredVariant(record.kind()))
    }

    /// Registration selected by a row's first cell.
    ///
    /// Fails with [`StorageError::MissingDiscriminator`] when the cell is not
    /// the discriminator and [`StorageError::UnknownType`] when its tag is not
    /// registered. Nothing is consumed either way.
    pub fn dispatch(&self, first: &Cell) -> StorageResult<&Registration> {
        if !is_discriminator(&first.family, &first.qualifier) {
            return Err(StorageError::MissingDiscriminator {
                row: first.row.clone(),
            });
        }
        self.lookup_tag(&first.row, &first.value)
    }

    fn lookup_tag(&self, row_id: &str, raw_tag: &[u8]) -> StorageResult<&Registration> {
        let tag = String::from_utf8_lossy(raw_tag);
        self.registry
            .lookup(&tag)
            .ok_or_else(|| StorageError::UnknownType {
                row: row_id.to_string(),
                tag: tag.into_owned(),
            })
    }

    /// Decodes a grouped row into a fresh record.
    ///
    /// Cells the variant does not consume are logged and dropped.
    pub fn decode(&self, row: Row) -> StorageResult<Record> {
        let (record, leftovers) = self.decode_with_leftovers(row)?;
        if !leftovers.is_empty() {
            debug!(
                row = %leftovers.id,
                cells = leftovers.len(),
                families = ?leftovers.families(),
                "Ignoring unrecognized cells"
            );
        }
        Ok(record)
    }

    /// Decodes a grouped row, returning the cells the variant did not consume.
    pub fn decode_with_leftovers(&self, mut row: Row) -> StorageResult<(Record, Row)> {
        let registration = match row.first() {
            Some((column, value)) if is_discriminator(&column.family, &column.qualifier) => {
                *self.lookup_tag(&row.id, &value.value)?
            }
            _ => {
                return Err(StorageError::MissingDiscriminator {
                    row: row.id.clone(),
                });
            }
        };
        row.pop_first();
        let record = registration.decode(&mut row, &self.keys)?;
        Ok((record, row))
    }

    /// Decodes one pre-aggregated row value read under `key`.
    pub fn decode_aggregated<F: RowAggregateFormat + ?Sized>(
        &self,
        format: &F,
        key: &str,
        value: &[u8],
    ) -> StorageResult<Record> {
        self.decode(format.decode_row(key, value)?)
    }
}

fn assemble(row_id: &str, tag: &str, mut cells: Vec<Cell>) -> Vec<Cell> {
    cells.sort();
    cells.insert(0, discriminator_cell(row_id, tag));
    cells
}
