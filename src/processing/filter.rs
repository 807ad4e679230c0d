//! Predicate filtering of a sorted entry stream.

use crate::error::{ScanError, ScanResult};
use crate::iterator::{top_entry, BoxedIterator, IteratorOptions, OptionDescriber, OptionMap, SortedKeyValueIterator};
use crate::script::{Predicate, ScriptEngine};
use crate::types::{Entry, Key, Range, Value};

use super::required_callable;

/// Server-side `filter` over a sorted stream of entries.
///
/// `pred` is a function of one argument, the entry. The entry is kept when the result is truthy:
/// anything except `false` and `()`. With `negate=true` the decision is inverted.
pub struct EntryFilter {
    source: BoxedIterator,
    predicate: Predicate,
    negate: bool,
}

impl EntryFilter {
    pub const PREDICATE_OPTION: &'static str = "pred";
    pub const NEGATE_OPTION: &'static str = "negate";

    pub fn init(source: BoxedIterator, options: &OptionMap, engine: &ScriptEngine) -> ScanResult<Self> {
        let predicate = Predicate::new(required_callable(
            engine,
            options,
            Self::PREDICATE_OPTION,
            "EntryFilter",
        )?);
        let negate = parse_negate(options)?;
        Ok(Self {
            source,
            predicate,
            negate,
        })
    }

    /// Run the predicate on `entry`. Errors raised by the script are returned unchanged.
    pub fn accept(&self, entry: Entry) -> ScanResult<bool> {
        self.predicate.test(entry)
    }

    fn find_top(&mut self) -> ScanResult<()> {
        while let Some(entry) = top_entry(&mut self.source)? {
            if self.accept(entry)? != self.negate {
                break;
            }
            self.source.next()?;
        }
        Ok(())
    }
}

fn parse_negate(options: &OptionMap) -> ScanResult<bool> {
    match options.get(EntryFilter::NEGATE_OPTION).map(|s| s.trim()) {
        None => Ok(false),
        Some(raw) => raw.parse::<bool>().map_err(|_| {
            ScanError::configuration(format!(
                "{} must be true or false, got '{raw}'",
                EntryFilter::NEGATE_OPTION
            ))
        }),
    }
}

impl SortedKeyValueIterator for EntryFilter {
    fn has_top(&self) -> bool {
        self.source.has_top()
    }

    fn top_key(&mut self) -> ScanResult<Option<&Key>> {
        self.source.top_key()
    }

    fn top_value(&mut self) -> ScanResult<Option<&Value>> {
        self.source.top_value()
    }

    fn next(&mut self) -> ScanResult<()> {
        self.source.next()?;
        self.find_top()
    }

    fn seek(&mut self, range: &Range, column_families: &[Vec<u8>], inclusive: bool) -> ScanResult<()> {
        self.source.seek(range, column_families, inclusive)?;
        self.find_top()
    }
}

impl OptionDescriber for EntryFilter {
    fn describe_options() -> IteratorOptions {
        IteratorOptions::new(
            "scriptfilter",
            "EntryFilter allows a Rhai function to be passed in and invoked as the filter's accept method",
        )
        .with_named_option(Self::PREDICATE_OPTION, "String containing filter predicate function")
        .with_named_option(Self::NEGATE_OPTION, "default false keeps k/v that pass accept method, true rejects k/v that pass accept method")
    }

    fn validate_options(options: &OptionMap) -> bool {
        parse_negate(options).is_ok()
    }
}
