//! Pre-aggregated row values.
//!
//! A store may fold every cell of a row into a single opaque value server
//! side, so a scan returns one `(row id, value)` pair per row instead of a
//! cell stream. [`RowAggregateFormat`] turns such a value back into a [`Row`].

use crate::{StorageError, StorageResult};
use cognition_types::{Cell, Row, Visibility};

/// Encoding of a whole row into one value.
pub trait RowAggregateFormat {
    /// Folds the cells of `row` into one value.
    fn encode_row(&self, row: &Row) -> StorageResult<Vec<u8>>;

    /// Rebuilds the row stored under `row_id` from `value`.
    fn decode_row(&self, row_id: &str, value: &[u8]) -> StorageResult<Row>;
}

/// Big-endian framing of the store's whole-row scan transform.
///
/// ```text
/// i32 count
/// count * ( i32 len, family
///           i32 len, qualifier
///           i32 len, visibility
///           i64 timestamp
///           u8  deleted
///           i32 len, value )
/// ```
///
/// Timestamps are not tracked by the cell model; they encode as zero and are
/// ignored on decode. Cells flagged deleted are dropped on decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WholeRowFormat;

impl RowAggregateFormat for WholeRowFormat {
    fn encode_row(&self, row: &Row) -> StorageResult<Vec<u8>> {
        let mut out = Vec::new();
        put_len(&mut out, row.len())?;
        for (column, value) in &row.cells {
            put_bytes(&mut out, column.family.as_bytes())?;
            put_bytes(&mut out, column.qualifier.as_bytes())?;
            put_bytes(&mut out, value.visibility.as_str().as_bytes())?;
            out.extend_from_slice(&0i64.to_be_bytes());
            out.push(0);
            put_bytes(&mut out, &value.value)?;
        }
        Ok(out)
    }

    fn decode_row(&self, row_id: &str, value: &[u8]) -> StorageResult<Row> {
        let mut reader = FrameReader::new(value);
        let count = reader.read_len("cell count")?;
        let mut row = Row::new(row_id);
        for _ in 0..count {
            let family = reader.read_string("family")?;
            let qualifier = reader.read_string("qualifier")?;
            let visibility = reader.read_string("visibility")?;
            reader.read_i64("timestamp")?;
            let deleted = reader.read_u8("deleted flag")? != 0;
            let len = reader.read_len("value length")?;
            let bytes = reader.take(len, "value")?;
            if deleted {
                continue;
            }
            row.insert_cell(
                Cell::new(row_id, family, qualifier, bytes)
                    .with_visibility(Visibility::new(visibility)),
            );
        }
        if reader.remaining() > 0 {
            return Err(StorageError::MalformedAggregate(format!(
                "{} trailing bytes after {count} cells",
                reader.remaining()
            )));
        }
        Ok(row)
    }
}

fn put_len(out: &mut Vec<u8>, len: usize) -> StorageResult<()> {
    let len = i32::try_from(len)
        .map_err(|_| StorageError::MalformedAggregate(format!("length {len} exceeds i32")))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> StorageResult<()> {
    put_len(out, bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(())
}

struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> StorageResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(StorageError::MalformedAggregate(format!(
                "truncated {what}: need {len} bytes at offset {}, have {}",
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self, what: &str) -> StorageResult<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N, what)?);
        Ok(array)
    }

    fn read_u8(&mut self, what: &str) -> StorageResult<u8> {
        Ok(self.take_array::<1>(what)?[0])
    }

    fn read_i64(&mut self, what: &str) -> StorageResult<i64> {
        Ok(i64::from_be_bytes(self.take_array(what)?))
    }

    fn read_len(&mut self, what: &str) -> StorageResult<usize> {
        let len = i32::from_be_bytes(self.take_array(what)?);
        usize::try_from(len)
            .map_err(|_| StorageError::MalformedAggregate(format!("negative {what}: {len}")))
    }

    fn read_string(&mut self, what: &str) -> StorageResult<String> {
        let len = self.read_len(what)?;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| StorageError::MalformedAggregate(format!("{what} is not valid UTF-8")))
    }
}
