use crate::error::ScanResult;
use crate::types::{Entry, Key, Range, Value};

use super::SortedKeyValueIterator;

/// In-memory sorted entry source.
///
/// Sits at the bottom of an iterator stack in tests, benchmarks and parallel scans. Entries are
/// sorted on construction; duplicate keys keep their relative order.
#[derive(Debug, Clone, Default)]
pub struct SortedMapIterator {
    entries: Vec<Entry>,
    pos: usize,
    range: Range,
    column_families: Vec<Vec<u8>>,
    inclusive: bool,
}

impl SortedMapIterator {
    /// Create a source positioned on the first entry.
    pub fn new(mut entries: Vec<Entry>) -> Self {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            entries,
            pos: 0,
            range: Range::all(),
            column_families: Vec::new(),
            inclusive: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn family_selected(&self, key: &Key) -> bool {
        let listed = self
            .column_families
            .iter()
            .any(|cf| cf.as_slice() == key.column_family());
        listed == self.inclusive
    }

    fn skip_unselected(&mut self) {
        while let Some(entry) = self.entries.get(self.pos) {
            if self.range.after_end(&entry.key) || self.family_selected(&entry.key) {
                break;
            }
            self.pos += 1;
        }
    }

    fn current(&self) -> Option<&Entry> {
        self.entries
            .get(self.pos)
            .filter(|e| !self.range.after_end(&e.key))
    }
}

impl SortedKeyValueIterator for SortedMapIterator {
    fn has_top(&self) -> bool {
        self.current().is_some()
    }

    fn top_key(&mut self) -> ScanResult<Option<&Key>> {
        Ok(self.current().map(|e| &e.key))
    }

    fn top_value(&mut self) -> ScanResult<Option<&Value>> {
        Ok(self.current().map(|e| &e.value))
    }

    fn next(&mut self) -> ScanResult<()> {
        if self.pos < self.entries.len() {
            self.pos += 1;
        }
        self.skip_unselected();
        Ok(())
    }

    fn seek(&mut self, range: &Range, column_families: &[Vec<u8>], inclusive: bool) -> ScanResult<()> {
        self.range = range.clone();
        self.column_families = column_families.to_vec();
        self.inclusive = inclusive;
        self.pos = self.entries.partition_point(|e| range.before_start(&e.key));
        self.skip_unselected();
        Ok(())
    }
}
