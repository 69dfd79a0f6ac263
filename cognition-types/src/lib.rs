//! Core type definitions for cognition row persistence.
//!
//! This crate defines the store-agnostic building blocks shared by every
//! other crate in the workspace:
//! - [`Cell`], [`Column`], [`CellValue`] and [`Row`]: the sorted cell model
//! - [`Visibility`]: the opaque per-cell access label
//! - Row key derivation ([`derive_key`], [`RowKeyLayout`]) that spreads
//!   time-ordered records over shard prefixes
//! - [`RowRange`]: row id bounds used by scans
//!
//! Record shapes and the codec that maps them onto cells live in
//! `cognition-model` and `cognition-storage`.

mod cell;
mod range;
mod row_key;

pub use cell::{Cell, CellValue, Column, Row, Visibility};
pub use range::RowRange;
pub use row_key::{
    derive_key, shard_for_hash, source_hash, to_base36, ParsedRowKey, RowKeyLayout,
    DEFAULT_SHARD_COUNT, SHARD_RADIX,
};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid shard count: {0} (must be at least 1)")]
    InvalidShardCount(u32),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
