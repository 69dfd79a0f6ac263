use crate::record::{mismatch, write_family};
use crate::{FieldSource, ModelError, ModelResult, Record, RecordKind, RowRecord};
use chrono::{DateTime, Utc};
use cognition_types::{Cell, Row, RowKeyLayout, Visibility};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Family holding a log record's parsed fields.
pub const DATA_FAMILY: &str = "data";

/// Family holding a log record's pipeline metadata.
pub const METADATA_FAMILY: &str = "metadata";

/// An ingested event: parsed fields plus pipeline metadata.
///
/// The uuid is fixed at construction. The persisted row id is derived from
/// the uuid and the record date through a [`RowKeyLayout`], so both are
/// recovered from the row id on read. Dates carry millisecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogRecord {
    uuid: String,
    #[serde(default)]
    fields: BTreeMap<String, String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(deserialize_with = "deserialize_millis")]
    date: DateTime<Utc>,
}

impl LogRecord {
    /// Creates an empty record with a random v4 uuid, dated now.
    #[must_use]
    pub fn new() -> Self {
        Self::with_uuid(Uuid::new_v4().to_string())
    }

    /// Creates an empty record with the given uuid, dated now.
    #[must_use]
    pub fn with_uuid(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            fields: BTreeMap::new(),
            metadata: BTreeMap::new(),
            date: truncate_to_millis(Utc::now()),
        }
    }

    /// Creates a record with a random uuid holding `fields`.
    #[must_use]
    pub fn from_fields(fields: BTreeMap<String, String>) -> Self {
        let mut record = Self::new();
        record.fields = fields;
        record
    }

    /// Copies `other` under a new uuid.
    #[must_use]
    pub fn derived(uuid: impl Into<String>, other: &Self) -> Self {
        Self {
            uuid: uuid.into(),
            fields: other.fields.clone(),
            metadata: other.metadata.clone(),
            date: other.date,
        }
    }

    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    #[must_use]
    pub const fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Sets the record date, dropping sub-millisecond precision.
    pub fn set_date(&mut self, date: DateTime<Utc>) {
        self.date = truncate_to_millis(date);
    }

    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn metadata_names(&self) -> impl Iterator<Item = &str> {
        self.metadata.keys().map(String::as_str)
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove_field(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[must_use]
    pub fn metadata_value(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).map(String::as_str)
    }

    pub fn add_metadata_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(name.into(), value.into());
    }

    pub fn remove_metadata_field(&mut self, name: &str) -> Option<String> {
        self.metadata.remove(name)
    }
}

impl Default for LogRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSource for LogRecord {
    fn field(&self, name: &str) -> Option<&str> {
        self.value(name)
    }
}

impl RowRecord for LogRecord {
    const KIND: RecordKind = RecordKind::LogRecord;
    const DEFAULT_TAG: &'static str = "log_record";

    fn row_id(&self, keys: &RowKeyLayout) -> ModelResult<String> {
        if self.uuid.is_empty() {
            return Err(ModelError::InvalidRecord(
                "log record uuid cannot be empty".to_string(),
            ));
        }
        Ok(keys.derive_at(&self.uuid, self.date))
    }

    fn to_cells(&self, row_id: &str, visibility: &Visibility) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(self.fields.len() + self.metadata.len());
        write_family(&mut cells, row_id, DATA_FAMILY, &self.fields, visibility);
        write_family(&mut cells, row_id, METADATA_FAMILY, &self.metadata, visibility);
        cells
    }

    fn from_row(row: &mut Row, keys: &RowKeyLayout) -> ModelResult<Self> {
        let parsed = keys
            .parse(&row.id)
            .ok_or_else(|| ModelError::MalformedRowKey(row.id.clone()))?;
        let date = DateTime::from_timestamp_millis(parsed.timestamp_millis)
            .ok_or_else(|| ModelError::MalformedRowKey(row.id.clone()))?;
        let uuid = parsed.source_id.to_string();
        Ok(Self {
            uuid,
            fields: row.take_family(DATA_FAMILY),
            metadata: row.take_family(METADATA_FAMILY),
            date,
        })
    }

    fn from_record(record: &Record) -> ModelResult<&Self> {
        record.as_log_record().ok_or_else(|| mismatch(Self::KIND, record))
    }

    fn into_record(self) -> Record {
        Record::LogRecord(self)
    }
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    DateTime::<Utc>::deserialize(deserializer).map(truncate_to_millis)
}

fn truncate_to_millis(date: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(date.timestamp_millis()).unwrap_or(date)
}
