//! Host-side iterator interfaces.
//!
//! The scripted operators consume and implement [`SortedKeyValueIterator`], the pull interface a
//! tablet server uses to drive a stack of iterators. Each operator wraps the next one down as its
//! source; the bottom of the stack is a sorted entry source such as [`SortedMapIterator`].

mod source;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ScanResult;
use crate::types::{Entry, Key, Range, Value};

pub use source::SortedMapIterator;

/// Flat string options handed to an iterator at initialization.
pub type OptionMap = BTreeMap<String, String>;

/// An owned iterator, as stacked by the host.
pub type BoxedIterator = Box<dyn SortedKeyValueIterator>;

/// A sorted stream of entries, pulled one position at a time.
///
/// `top_key`/`top_value` may be called any number of times per position. They take `&mut self`
/// so that implementations can compute the current entry lazily.
pub trait SortedKeyValueIterator: Send {
    /// True if the iterator is positioned on an entry.
    fn has_top(&self) -> bool;

    /// Key at the current position, or `None` when exhausted.
    fn top_key(&mut self) -> ScanResult<Option<&Key>>;

    /// Value at the current position, or `None` when exhausted.
    fn top_value(&mut self) -> ScanResult<Option<&Value>>;

    /// Advance to the next entry.
    fn next(&mut self) -> ScanResult<()>;

    /// Reposition at the first entry of `range`, restricted to (or, when `inclusive` is false,
    /// excluding) the given column families.
    fn seek(&mut self, range: &Range, column_families: &[Vec<u8>], inclusive: bool) -> ScanResult<()>;
}

impl<T: SortedKeyValueIterator + ?Sized> SortedKeyValueIterator for Box<T> {
    fn has_top(&self) -> bool {
        (**self).has_top()
    }

    fn top_key(&mut self) -> ScanResult<Option<&Key>> {
        (**self).top_key()
    }

    fn top_value(&mut self) -> ScanResult<Option<&Value>> {
        (**self).top_value()
    }

    fn next(&mut self) -> ScanResult<()> {
        (**self).next()
    }

    fn seek(&mut self, range: &Range, column_families: &[Vec<u8>], inclusive: bool) -> ScanResult<()> {
        (**self).seek(range, column_families, inclusive)
    }
}

/// Read the current entry of `iter`, if any.
pub fn top_entry<I>(iter: &mut I) -> ScanResult<Option<Entry>>
where
    I: SortedKeyValueIterator + ?Sized,
{
    let Some(key) = iter.top_key()?.cloned() else {
        return Ok(None);
    };
    let Some(value) = iter.top_value()?.cloned() else {
        return Ok(None);
    };
    Ok(Some(Entry { key, value }))
}

/// Seek `iter` to `range` (all column families) and drain it.
pub fn scan<I>(iter: &mut I, range: &Range) -> ScanResult<Vec<Entry>>
where
    I: SortedKeyValueIterator + ?Sized,
{
    iter.seek(range, &[], false)?;
    let mut out = Vec::new();
    while iter.has_top() {
        if let Some(entry) = top_entry(iter)? {
            out.push(entry);
        }
        iter.next()?;
    }
    Ok(out)
}

/// Description of an iterator's options, consumed by host tooling when validating iterator setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IteratorOptions {
    pub name: String,
    pub description: String,
    /// Option name to help text.
    pub named_options: BTreeMap<String, String>,
    pub unnamed_option_descriptions: Vec<String>,
}

impl IteratorOptions {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            named_options: BTreeMap::new(),
            unnamed_option_descriptions: Vec::new(),
        }
    }

    pub fn with_named_option(mut self, name: impl Into<String>, help: impl Into<String>) -> Self {
        self.named_options.insert(name.into(), help.into());
        self
    }

    pub fn with_unnamed_option(mut self, help: impl Into<String>) -> Self {
        self.unnamed_option_descriptions.push(help.into());
        self
    }
}

/// Implemented by iterators that can describe and cheaply pre-validate their options.
pub trait OptionDescriber {
    fn describe_options() -> IteratorOptions;

    /// Cheap check run by host tooling before the iterator is instantiated.
    fn validate_options(_options: &OptionMap) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{scan, top_entry, IteratorOptions, SortedKeyValueIterator, SortedMapIterator};
    use crate::types::{Entry, Key, Range};

    #[test]
    fn scan_drains_from_range_start() {
        let mut iter = SortedMapIterator::new(vec![
            Entry::new(Key::new("b", "f", "q"), "2"),
            Entry::new(Key::new("a", "f", "q"), "1"),
            Entry::new(Key::new("c", "f", "q"), "3"),
        ]);

        let out = scan(&mut iter, &Range::exact_row("b")).unwrap();
        assert_eq!(out, vec![Entry::new(Key::new("b", "f", "q"), "2")]);
        assert!(!iter.has_top());
        assert!(top_entry(&mut iter).unwrap().is_none());
    }

    #[test]
    fn options_description_serializes() {
        let io = IteratorOptions::new("x", "does x").with_named_option("f", "function");
        let json = serde_json::to_value(&io).unwrap();
        assert_eq!(json["name"], "x");
        assert_eq!(json["named_options"]["f"], "function");
    }
}
