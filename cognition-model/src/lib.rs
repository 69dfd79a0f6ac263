//! Record model for cognition row persistence.
//!
//! Defines the record shapes that the row codec knows how to persist:
//! - [`Entity`] — an extracted entity with meta and item properties
//! - [`LogRecord`] — an ingested event with fields and metadata
//! - [`Record`] — the closed set of persisted variants
//! - [`RowRecord`] — the contract each variant implements to map itself onto
//!   cells and back
//! - [`VisibilityPolicy`] — how a row's access label is chosen
//!
//! The crate knows nothing about type tags or the discriminator cell; that
//! is the codec's business in `cognition-storage`.

mod entity;
mod log_record;
mod record;
mod visibility;

pub use entity::{Entity, ITEM_FAMILY, META_FAMILY};
pub use log_record::{LogRecord, DATA_FAMILY, METADATA_FAMILY};
pub use record::{FieldSource, Record, RecordKind, RowRecord};
pub use visibility::VisibilityPolicy;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while mapping records to and from rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A required identity field is unset.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A row id does not follow the expected key layout.
    #[error("malformed row key: {0}")]
    MalformedRowKey(String),

    /// A handler was asked to work on the wrong variant.
    #[error("expected a {expected} record, got {actual}")]
    VariantMismatch {
        expected: RecordKind,
        actual: RecordKind,
    },
}
