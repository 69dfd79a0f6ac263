//! Error types for the storage layer.

use cognition_model::{ModelError, RecordKind};
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while encoding, grouping, decoding or writing rows.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A record is missing the field its row id is built from.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The first cell of a row is not the type discriminator.
    #[error("row {row} has no type discriminator")]
    MissingDiscriminator { row: String },

    /// The discriminator names a tag the registry does not know.
    #[error("row {row} has unknown type tag {tag:?}")]
    UnknownType { row: String, tag: String },

    /// The record's variant has no registered tag.
    #[error("no type tag registered for {0}")]
    UnregisteredVariant(RecordKind),

    /// A tag was registered twice.
    #[error("type tag already registered: {0}")]
    DuplicateTag(String),

    /// A row cannot be read back into its variant.
    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: String, reason: String },

    /// A pre-aggregated row value does not follow its framing.
    #[error("malformed aggregated row: {0}")]
    MalformedAggregate(String),

    /// The underlying store failed a scan or a write.
    #[error("store error: {0}")]
    StoreIo(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// True for the two kinds a reader may skip over: rows without a
    /// discriminator and rows with an unknown tag.
    #[must_use]
    pub const fn is_unrecognized_row(&self) -> bool {
        matches!(
            self,
            Self::MissingDiscriminator { .. } | Self::UnknownType { .. }
        )
    }
}

impl From<ModelError> for StorageError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidRecord(reason) => Self::InvalidRecord(reason),
            ModelError::MalformedRowKey(row) => Self::MalformedRow {
                row,
                reason: "row id does not match the key layout".to_string(),
            },
            err @ ModelError::VariantMismatch { .. } => Self::InvalidRecord(err.to_string()),
        }
    }
}

impl From<cognition_types::Error> for StorageError {
    fn from(err: cognition_types::Error) -> Self {
        Self::Config(err.to_string())
    }
}
