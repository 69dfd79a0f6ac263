use crate::{Entity, LogRecord, ModelError, ModelResult};
use cognition_types::{Cell, Row, RowKeyLayout, Visibility};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The persisted record variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Entity,
    LogRecord,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => f.write_str("entity"),
            Self::LogRecord => f.write_str("log record"),
        }
    }
}

/// Named string fields a visibility policy can read a label from.
pub trait FieldSource {
    /// Value of the named field, if present.
    fn field(&self, name: &str) -> Option<&str>;
}

/// Contract every persisted variant implements.
///
/// A variant owns its cell layout: which families it writes, how it picks its
/// row id, and how it reads itself back. The codec adds the discriminator
/// cell and the visibility; the variant never sees either.
pub trait RowRecord: FieldSource + Sized {
    /// Variant identity within [`Record`].
    const KIND: RecordKind;

    /// Tag written to the discriminator cell unless the registry overrides it.
    const DEFAULT_TAG: &'static str;

    /// Row id this record is written under.
    ///
    /// Fails with [`ModelError::InvalidRecord`] when the identity field is
    /// unset.
    fn row_id(&self, keys: &RowKeyLayout) -> ModelResult<String>;

    /// Cells for this record under `row_id`, all labelled `visibility`.
    fn to_cells(&self, row_id: &str, visibility: &Visibility) -> Vec<Cell>;

    /// Builds a fresh record from `row`, removing the cells it consumed.
    ///
    /// Cells of families the variant does not know stay in `row`. On error
    /// `row` is left untouched.
    fn from_row(row: &mut Row, keys: &RowKeyLayout) -> ModelResult<Self>;

    /// Borrows this variant out of a [`Record`].
    fn from_record(record: &Record) -> ModelResult<&Self>;

    /// Wraps this variant into a [`Record`].
    fn into_record(self) -> Record;
}

/// A decoded record of any persisted variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Entity(Entity),
    LogRecord(LogRecord),
}

impl Record {
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Entity(_) => RecordKind::Entity,
            Self::LogRecord(_) => RecordKind::LogRecord,
        }
    }

    /// Value of a named field of the wrapped variant.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Self::Entity(entity) => entity.field(name),
            Self::LogRecord(record) => record.field(name),
        }
    }

    #[must_use]
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            Self::LogRecord(_) => None,
        }
    }

    #[must_use]
    pub fn as_log_record(&self) -> Option<&LogRecord> {
        match self {
            Self::LogRecord(record) => Some(record),
            Self::Entity(_) => None,
        }
    }

    #[must_use]
    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            Self::LogRecord(_) => None,
        }
    }

    #[must_use]
    pub fn into_log_record(self) -> Option<LogRecord> {
        match self {
            Self::LogRecord(record) => Some(record),
            Self::Entity(_) => None,
        }
    }
}

impl FieldSource for Record {
    fn field(&self, name: &str) -> Option<&str> {
        Record::field(self, name)
    }
}

impl From<Entity> for Record {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

impl From<LogRecord> for Record {
    fn from(record: LogRecord) -> Self {
        Self::LogRecord(record)
    }
}

pub(crate) fn mismatch(expected: RecordKind, record: &Record) -> ModelError {
    ModelError::VariantMismatch {
        expected,
        actual: record.kind(),
    }
}

/// Emits one cell per map entry under `family`.
pub(crate) fn write_family<'a>(
    cells: &mut Vec<Cell>,
    row_id: &str,
    family: &str,
    entries: impl IntoIterator<Item = (&'a String, &'a String)>,
    visibility: &Visibility,
) {
    cells.extend(entries.into_iter().map(|(qualifier, value)| {
        Cell::new(row_id, family, qualifier.as_str(), value.as_bytes())
            .with_visibility(visibility.clone())
    }));
}
