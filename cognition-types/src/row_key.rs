//! Shard-distributed row keys for time-ordered records.
//!
//! Row ids of the form `<prefix><shard>_<epochMillis>_<sourceId>` keep
//! entries of one shard in time order while spreading concurrent writes over
//! `shard_count` disjoint key ranges. The shard is derived from the source id
//! alone, so a key can always be re-derived from record contents.
//!
//! The hash is the 32-bit polynomial string hash over UTF-16 code units
//! (`h = 31 * h + unit`, wrapping). Keys written by earlier ingest
//! deployments use the same hash, so derived keys match them byte for byte.

use crate::{Error, Result, RowRange};
use chrono::{DateTime, Utc};

/// Radix used to render shard numbers.
pub const SHARD_RADIX: u32 = 36;

/// Default number of shards; one base-36 digit covers `0..36`.
pub const DEFAULT_SHARD_COUNT: u32 = 36;

/// Milliseconds added to the end of a time window so the exclusive upper
/// bound still covers entries stamped in the final second.
const WINDOW_END_PAD_MILLIS: i64 = 1000;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 32-bit polynomial hash of `source_id`.
#[must_use]
pub fn source_hash(source_id: &str) -> i32 {
    source_id
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Renders `value` in lowercase base 36.
#[must_use]
pub fn to_base36(mut value: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % SHARD_RADIX) as usize]);
        value /= SHARD_RADIX;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Maps a hash onto a shard digit string.
///
/// The remainder is taken before the absolute value, so every hash
/// (including `i32::MIN`) lands in `0..shard_count`.
pub fn shard_for_hash(hash: i32, shard_count: u32) -> Result<String> {
    if shard_count == 0 {
        return Err(Error::InvalidShardCount(shard_count));
    }
    Ok(to_base36(shard_index(hash, shard_count)))
}

// Caller guarantees `shard_count > 0`.
fn shard_index(hash: i32, shard_count: u32) -> u32 {
    (i64::from(hash) % i64::from(shard_count)).unsigned_abs() as u32
}

/// Derives the row id for a record from its source id and timestamp.
///
/// ```
/// use cognition_types::derive_key;
///
/// let key = derive_key("abc123", 1_000_000, 1, "PREFIX_").unwrap();
/// assert_eq!(key, "PREFIX_0_1000000_abc123");
/// ```
pub fn derive_key(
    source_id: &str,
    timestamp_millis: i64,
    shard_count: u32,
    prefix: &str,
) -> Result<String> {
    let shard = shard_for_hash(source_hash(source_id), shard_count)?;
    Ok(format!("{prefix}{shard}_{timestamp_millis}_{source_id}"))
}

/// A row id split back into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRowKey<'a> {
    pub shard: &'a str,
    pub timestamp_millis: i64,
    pub source_id: &'a str,
}

/// The deployment constants that shape row keys: a table prefix and a
/// shard count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKeyLayout {
    prefix: String,
    shard_count: u32,
}

impl RowKeyLayout {
    /// Creates a layout, rejecting a zero shard count.
    pub fn new(prefix: impl Into<String>, shard_count: u32) -> Result<Self> {
        if shard_count == 0 {
            return Err(Error::InvalidShardCount(shard_count));
        }
        Ok(Self {
            prefix: prefix.into(),
            shard_count,
        })
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub const fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// Derives the row id for `source_id` at `timestamp_millis`.
    #[must_use]
    pub fn derive(&self, source_id: &str, timestamp_millis: i64) -> String {
        let shard = shard_index(source_hash(source_id), self.shard_count);
        format!(
            "{}{}_{}_{}",
            self.prefix,
            to_base36(shard),
            timestamp_millis,
            source_id
        )
    }

    /// Derives the row id for `source_id` at `timestamp`.
    #[must_use]
    pub fn derive_at(&self, source_id: &str, timestamp: DateTime<Utc>) -> String {
        self.derive(source_id, timestamp.timestamp_millis())
    }

    /// Every shard digit string of this layout, in shard order.
    #[must_use]
    pub fn shards(&self) -> Vec<String> {
        (0..self.shard_count).map(to_base36).collect()
    }

    /// Splits a row id produced by [`derive`](Self::derive).
    ///
    /// Returns `None` when the id lacks this layout's prefix, the shard is not
    /// a base-36 number, or the timestamp is not an integer. The source id is
    /// everything after the second separator and may itself contain `_`.
    #[must_use]
    pub fn parse<'a>(&self, row_id: &'a str) -> Option<ParsedRowKey<'a>> {
        let rest = row_id.strip_prefix(self.prefix.as_str())?;
        let (shard, rest) = rest.split_once('_')?;
        if shard.is_empty() || !shard.bytes().all(|b| DIGITS.contains(&b)) {
            return None;
        }
        let (millis, source_id) = rest.split_once('_')?;
        let timestamp_millis = millis.parse().ok()?;
        Some(ParsedRowKey {
            shard,
            timestamp_millis,
            source_id,
        })
    }

    /// One scan range per shard covering `[begin, end]`.
    ///
    /// Each range starts inclusively at `<prefix><shard>_<begin>` and ends
    /// exclusively at `<prefix><shard>_<end + 1000>`. Bounds compare as text,
    /// so both timestamps should have the same number of digits.
    pub fn time_window(&self, begin: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<RowRange>> {
        if end < begin {
            return Err(Error::InvalidTimestamp(format!(
                "window end {end} precedes begin {begin}"
            )));
        }
        let begin = begin.timestamp_millis();
        let end = end.timestamp_millis() + WINDOW_END_PAD_MILLIS;
        Ok(self
            .shards()
            .into_iter()
            .map(|shard| {
                RowRange::span(
                    format!("{}{shard}_{begin}", self.prefix),
                    format!("{}{shard}_{end}", self.prefix),
                )
            })
            .collect())
    }
}

impl Default for RowKeyLayout {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }
}
