//! Row id ranges for scans.

use serde::{Deserialize, Serialize};
use std::ops::Bound;

/// A contiguous range of row ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: Bound<String>,
    pub end: Bound<String>,
}

impl RowRange {
    /// Every row.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        }
    }

    /// Exactly one row.
    #[must_use]
    pub fn exact(row: impl Into<String>) -> Self {
        let row = row.into();
        Self {
            start: Bound::Included(row.clone()),
            end: Bound::Included(row),
        }
    }

    /// `[start, end)`.
    #[must_use]
    pub fn span(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Bound::Included(start.into()),
            end: Bound::Excluded(end.into()),
        }
    }

    /// Every row whose id starts with `prefix`.
    #[must_use]
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let end = match prefix_successor(&prefix) {
            Some(next) => Bound::Excluded(next),
            None => Bound::Unbounded,
        };
        Self {
            start: Bound::Included(prefix),
            end,
        }
    }

    /// Returns true if `row` sorts at or after the start bound.
    #[must_use]
    pub fn after_start(&self, row: &str) -> bool {
        match &self.start {
            Bound::Included(start) => row >= start.as_str(),
            Bound::Excluded(start) => row > start.as_str(),
            Bound::Unbounded => true,
        }
    }

    /// Returns true if `row` sorts at or before the end bound.
    #[must_use]
    pub fn before_end(&self, row: &str) -> bool {
        match &self.end {
            Bound::Included(end) => row <= end.as_str(),
            Bound::Excluded(end) => row < end.as_str(),
            Bound::Unbounded => true,
        }
    }

    /// Returns true if `row` lies inside the range.
    #[must_use]
    pub fn contains(&self, row: &str) -> bool {
        self.after_start(row) && self.before_end(row)
    }
}

impl Default for RowRange {
    fn default() -> Self {
        Self::all()
    }
}

/// Smallest string greater than every string starting with `prefix`, or
/// `None` if no such string exists.
fn prefix_successor(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let next = match last {
            '\u{D7FF}' => Some('\u{E000}'),
            char::MAX => None,
            c => char::from_u32(c as u32 + 1),
        };
        if let Some(next) = next {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_excludes_siblings() {
        let range = RowRange::prefix("ab");
        assert!(range.contains("ab"));
        assert!(range.contains("ab_123"));
        assert!(!range.contains("ac"));
        assert!(!range.contains("aa~"));
    }

    #[test]
    fn empty_prefix_is_unbounded() {
        assert_eq!(RowRange::prefix(""), RowRange {
            start: Bound::Included(String::new()),
            end: Bound::Unbounded,
        });
    }

    #[test]
    fn span_is_half_open() {
        let range = RowRange::span("b", "d");
        assert!(!range.contains("a"));
        assert!(range.contains("b"));
        assert!(range.contains("c"));
        assert!(!range.contains("d"));
    }
}
