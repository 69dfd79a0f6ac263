//! Row persistence for cognition records.
//!
//! Records of several variants share one sorted cell store. Each row leads
//! with a discriminator cell naming its variant, so a reader can tell rows
//! apart without knowing in advance what a range holds.
//!
//! # Architecture
//!
//! - [`TypeRegistry`] is the closed table of type tags built at startup
//! - [`RowCodec`] encodes records into sorted cells and decodes grouped rows
//! - [`CellCursor`] and [`group_next_row`] cut a sorted cell stream into rows;
//!   [`RecordReader`] decodes them, optionally skipping unrecognized rows
//! - [`WholeRowFormat`] reads rows folded into one value by the store
//! - [`CellStore`] is the store boundary; [`MemoryStore`] implements it in
//!   memory, [`BatchWriter`] buffers writes to it
//! - [`EventWriter`] is the ingest path for log records

mod aggregate;
mod batch;
mod codec;
mod error;
mod event_writer;
mod grouper;
mod memory;
mod registry;
mod store;

pub use aggregate::{RowAggregateFormat, WholeRowFormat};
pub use batch::{BatchWriter, BatchWriterConfig};
pub use codec::{
    discriminator_cell, is_discriminator, RowCodec, DISCRIMINATOR_FAMILY, DISCRIMINATOR_QUALIFIER,
};
pub use error::{StorageError, StorageResult};
pub use event_writer::{EventStorageConfig, EventWriter};
pub use grouper::{group_next_row, CellCursor, RecordReader};
pub use memory::MemoryStore;
pub use registry::{Registration, TypeRegistry};
pub use store::{CellScan, CellStore};
