use crate::record::{mismatch, write_family};
use crate::{FieldSource, ModelError, ModelResult, Record, RecordKind, RowRecord};
use cognition_types::{Cell, Row, RowKeyLayout, Visibility};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Family holding an entity's meta properties.
pub const META_FAMILY: &str = "meta";

/// Family holding an entity's item properties.
pub const ITEM_FAMILY: &str = "item";

/// An extracted entity.
///
/// The id doubles as the row id. Meta properties describe the extraction
/// (source, confidence, ...); properties describe the entity itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub id: Option<String>,
    #[serde(default)]
    pub meta_props: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Entity {
    /// Creates a blank entity with no id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty entity with the given id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Creates an entity from all of its parts.
    #[must_use]
    pub fn from_parts(
        id: impl Into<String>,
        meta_props: BTreeMap<String, String>,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            meta_props,
            properties,
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Puts a single meta property, replacing any previous value.
    pub fn put_meta_prop(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.meta_props.insert(key.into(), value.into());
    }

    /// Puts a single property, replacing any previous value.
    pub fn put_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }
}

impl FieldSource for Entity {
    fn field(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

impl RowRecord for Entity {
    const KIND: RecordKind = RecordKind::Entity;
    const DEFAULT_TAG: &'static str = "entity";

    fn row_id(&self, _keys: &RowKeyLayout) -> ModelResult<String> {
        self.id
            .clone()
            .ok_or_else(|| ModelError::InvalidRecord("entity id cannot be empty".to_string()))
    }

    fn to_cells(&self, row_id: &str, visibility: &Visibility) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(self.meta_props.len() + self.properties.len());
        write_family(&mut cells, row_id, META_FAMILY, &self.meta_props, visibility);
        write_family(&mut cells, row_id, ITEM_FAMILY, &self.properties, visibility);
        cells
    }

    fn from_row(row: &mut Row, _keys: &RowKeyLayout) -> ModelResult<Self> {
        Ok(Self {
            id: Some(row.id.clone()),
            meta_props: row.take_family(META_FAMILY),
            properties: row.take_family(ITEM_FAMILY),
        })
    }

    fn from_record(record: &Record) -> ModelResult<&Self> {
        record.as_entity().ok_or_else(|| mismatch(Self::KIND, record))
    }

    fn into_record(self) -> Record {
        Record::Entity(self)
    }
}
