//! The closed table of type tags a row codec can read and write.

use crate::{StorageError, StorageResult};
use cognition_model::{Entity, LogRecord, ModelResult, Record, RecordKind, RowRecord};
use cognition_types::{Cell, Row, RowKeyLayout, Visibility};
use std::collections::{BTreeMap, HashMap};

type RowIdFn = fn(&Record, &RowKeyLayout) -> ModelResult<String>;
type EncodeFn = fn(&Record, &str, &Visibility) -> ModelResult<Vec<Cell>>;
type DecodeFn = fn(&mut Row, &RowKeyLayout) -> ModelResult<Record>;

/// Encode, decode and row-id functions of one record variant.
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    kind: RecordKind,
    row_id: RowIdFn,
    encode: EncodeFn,
    decode: DecodeFn,
}

impl Registration {
    /// The registration for variant `R`.
    #[must_use]
    pub fn of<R: RowRecord>() -> Self {
        Self {
            kind: R::KIND,
            row_id: row_id_of::<R>,
            encode: encode_as::<R>,
            decode: decode_as::<R>,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Row id `record` is written under.
    pub fn row_id(&self, record: &Record, keys: &RowKeyLayout) -> StorageResult<String> {
        Ok((self.row_id)(record, keys)?)
    }

    /// Variant cells of `record`, without the discriminator.
    pub fn encode(
        &self,
        record: &Record,
        row_id: &str,
        visibility: &Visibility,
    ) -> StorageResult<Vec<Cell>> {
        Ok((self.encode)(record, row_id, visibility)?)
    }

    /// Builds a fresh record from `row`, consuming the cells it recognizes.
    pub fn decode(&self, row: &mut Row, keys: &RowKeyLayout) -> StorageResult<Record> {
        Ok((self.decode)(row, keys)?)
    }
}

fn row_id_of<R: RowRecord>(record: &Record, keys: &RowKeyLayout) -> ModelResult<String> {
    R::from_record(record)?.row_id(keys)
}

fn encode_as<R: RowRecord>(
    record: &Record,
    row_id: &str,
    visibility: &Visibility,
) -> ModelResult<Vec<Cell>> {
    Ok(R::from_record(record)?.to_cells(row_id, visibility))
}

fn decode_as<R: RowRecord>(row: &mut Row, keys: &RowKeyLayout) -> ModelResult<Record> {
    R::from_row(row, keys).map(R::into_record)
}

/// Maps discriminator tags to variant registrations.
///
/// The first tag registered for a variant is the one written on encode.
/// Further tags for the same variant are read-only aliases, which lets rows
/// written under an older tag keep decoding.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    by_tag: HashMap<String, Registration>,
    primary: BTreeMap<RecordKind, String>,
}

impl TypeRegistry {
    /// An empty registry. Nothing encodes or decodes until variants are added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in variant under its default tag.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(Entity::DEFAULT_TAG, Registration::of::<Entity>());
        registry.insert(LogRecord::DEFAULT_TAG, Registration::of::<LogRecord>());
        registry
    }

    /// Registers `registration` under `tag`.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        registration: Registration,
    ) -> StorageResult<()> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(StorageError::Config("type tag cannot be empty".to_string()));
        }
        if self.by_tag.contains_key(&tag) {
            return Err(StorageError::DuplicateTag(tag));
        }
        self.insert(&tag, registration);
        Ok(())
    }

    /// Registers variant `R` under its default tag.
    pub fn register_variant<R: RowRecord>(&mut self) -> StorageResult<()> {
        self.register(R::DEFAULT_TAG, Registration::of::<R>())
    }

    fn insert(&mut self, tag: &str, registration: Registration) {
        self.primary
            .entry(registration.kind())
            .or_insert_with(|| tag.to_string());
        self.by_tag.insert(tag.to_string(), registration);
    }

    /// Registration for a discriminator value.
    #[must_use]
    pub fn lookup(&self, tag: &str) -> Option<&Registration> {
        self.by_tag.get(tag)
    }

    /// Tag written when encoding `kind`.
    #[must_use]
    pub fn tag_for(&self, kind: RecordKind) -> Option<&str> {
        self.primary.get(&kind).map(String::as_str)
    }

    /// Encoding tag and registration for `kind`.
    #[must_use]
    pub fn primary(&self, kind: RecordKind) -> Option<(&str, &Registration)> {
        let tag = self.tag_for(kind)?;
        self.lookup(tag).map(|registration| (tag, registration))
    }

    /// Every registered tag, sorted.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.by_tag.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}
