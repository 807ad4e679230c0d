//! Core data model: keys, values, entries and scan ranges.
//!
//! Keys follow the usual sorted-store layout (row, column family, column qualifier, visibility,
//! timestamp) and sort with the newest timestamp first within a column.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

/// A structured, totally ordered key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    row: Vec<u8>,
    column_family: Vec<u8>,
    column_qualifier: Vec<u8>,
    column_visibility: Vec<u8>,
    timestamp: i64,
    deleted: bool,
}

/// Which leading portion of a [`Key`] takes part in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialKey {
    Row,
    RowColfam,
    RowColfamColqual,
    RowColfamColqualColvis,
    RowColfamColqualColvisTime,
}

impl Key {
    /// Create a key with an empty visibility and the newest possible timestamp.
    pub fn new(
        row: impl Into<Vec<u8>>,
        column_family: impl Into<Vec<u8>>,
        column_qualifier: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            row: row.into(),
            column_family: column_family.into(),
            column_qualifier: column_qualifier.into(),
            column_visibility: Vec::new(),
            timestamp: i64::MAX,
            deleted: false,
        }
    }

    /// The smallest key that can appear in `row`.
    pub fn row_start(row: impl Into<Vec<u8>>) -> Self {
        Self {
            deleted: true,
            ..Self::new(row, Vec::new(), Vec::new())
        }
    }

    pub fn with_visibility(mut self, visibility: impl Into<Vec<u8>>) -> Self {
        self.column_visibility = visibility.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn column_family(&self) -> &[u8] {
        &self.column_family
    }

    pub fn column_qualifier(&self) -> &[u8] {
        &self.column_qualifier
    }

    pub fn column_visibility(&self) -> &[u8] {
        &self.column_visibility
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Row as text (lossy for non UTF-8 rows).
    pub fn row_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.row)
    }

    /// Compare only the leading components selected by `part`.
    pub fn compare_partial(&self, other: &Self, part: PartialKey) -> Ordering {
        let ord = self.row.cmp(&other.row);
        if ord != Ordering::Equal || part == PartialKey::Row {
            return ord;
        }
        let ord = self.column_family.cmp(&other.column_family);
        if ord != Ordering::Equal || part == PartialKey::RowColfam {
            return ord;
        }
        let ord = self.column_qualifier.cmp(&other.column_qualifier);
        if ord != Ordering::Equal || part == PartialKey::RowColfamColqual {
            return ord;
        }
        let ord = self.column_visibility.cmp(&other.column_visibility);
        if ord != Ordering::Equal || part == PartialKey::RowColfamColqualColvis {
            return ord;
        }
        // Newest first.
        other.timestamp.cmp(&self.timestamp)
    }

    pub fn equals_partial(&self, other: &Self, part: PartialKey) -> bool {
        self.compare_partial(other, part) == Ordering::Equal
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_partial(other, PartialKey::RowColfamColqualColvisTime)
            // Deletes shadow live entries at the same coordinates, so they come first.
            .then_with(|| other.deleted.cmp(&self.deleted))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} [{}] {} {}",
            String::from_utf8_lossy(&self.row),
            String::from_utf8_lossy(&self.column_family),
            String::from_utf8_lossy(&self.column_qualifier),
            String::from_utf8_lossy(&self.column_visibility),
            self.timestamp,
            self.deleted
        )
    }
}

/// An opaque byte payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Value(Vec<u8>);

impl Value {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn get(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Payload as text (lossy for non UTF-8 payloads).
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str_lossy())
    }
}

/// A single key/value pair from a sorted stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: Key,
    pub value: Value,
}

impl Entry {
    pub fn new(key: Key, value: impl Into<Value>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// A contiguous span of keys to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    start: Bound<Key>,
    end: Bound<Key>,
}

impl Range {
    /// Every key.
    pub fn all() -> Self {
        Self {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        }
    }

    /// Every key in `row`.
    pub fn exact_row(row: impl Into<Vec<u8>>) -> Self {
        let row = row.into();
        let mut next_row = row.clone();
        next_row.push(0);
        Self {
            start: Bound::Included(Key::row_start(row)),
            end: Bound::Excluded(Key::row_start(next_row)),
        }
    }

    /// A range between two optional keys.
    pub fn new(
        start: Option<Key>,
        start_inclusive: bool,
        end: Option<Key>,
        end_inclusive: bool,
    ) -> Self {
        let bound = |key: Option<Key>, inclusive: bool| match key {
            None => Bound::Unbounded,
            Some(k) if inclusive => Bound::Included(k),
            Some(k) => Bound::Excluded(k),
        };
        Self {
            start: bound(start, start_inclusive),
            end: bound(end, end_inclusive),
        }
    }

    pub fn start(&self) -> Bound<&Key> {
        self.start.as_ref()
    }

    pub fn end(&self) -> Bound<&Key> {
        self.end.as_ref()
    }

    /// True if `key` sorts before the start of this range.
    pub fn before_start(&self, key: &Key) -> bool {
        match &self.start {
            Bound::Unbounded => false,
            Bound::Included(start) => key < start,
            Bound::Excluded(start) => key <= start,
        }
    }

    /// True if `key` sorts after the end of this range.
    pub fn after_end(&self, key: &Key) -> bool {
        match &self.end {
            Bound::Unbounded => false,
            Bound::Included(end) => key > end,
            Bound::Excluded(end) => key >= end,
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        !self.before_start(key) && !self.after_end(key)
    }

    /// Copy of this range whose start is moved back to the newest timestamp of the start
    /// key's column, so a group straddling the start is seen whole.
    pub(crate) fn widened_to_column_start(&self) -> Self {
        let start = match &self.start {
            Bound::Unbounded => Bound::Unbounded,
            Bound::Included(k) | Bound::Excluded(k) => Bound::Included(
                k.clone().with_timestamp(i64::MAX).with_deleted(true),
            ),
        };
        Self {
            start,
            end: self.end.clone(),
        }
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::all()
    }
}
