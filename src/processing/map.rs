//! Per-entry mapping of a sorted entry stream.

use tracing::trace;

use crate::error::ScanResult;
use crate::iterator::{top_entry, BoxedIterator, IteratorOptions, OptionDescriber, OptionMap, SortedKeyValueIterator};
use crate::script::{MapOutcome, Mapper, ScriptEngine};
use crate::types::{Key, Range, Value};

use super::required_callable;

/// Server-side `map` over a sorted stream of entries.
///
/// If `f` returns a two-element array whose first element is a `Key`, that key replaces the
/// entry's key and the second element becomes the value. Otherwise the original key is kept and
/// the whole return value becomes the value.
///
/// ```text
/// |kv| [key(kv.key.row.to_upper(), kv.key.column_family, kv.key.column_qualifier), kv.value]
/// ```
///
/// upper-cases every row, while
///
/// ```text
/// |kv| 1
/// ```
///
/// keeps every key and sets each value to `1`.
///
/// The mapped entry is computed on first access to the current key or value and cached until
/// the source moves, so `f` runs at most once per source position.
pub struct EntryMapper {
    source: BoxedIterator,
    mapper: Mapper,
    current: Option<(Key, Value)>,
}

impl EntryMapper {
    pub const FUNCTION_OPTION: &'static str = "f";

    pub fn init(source: BoxedIterator, options: &OptionMap, engine: &ScriptEngine) -> ScanResult<Self> {
        let mapper = Mapper::new(required_callable(
            engine,
            options,
            Self::FUNCTION_OPTION,
            "EntryMapper",
        )?);
        Ok(Self {
            source,
            mapper,
            current: None,
        })
    }

    fn compute_if_absent(&mut self) -> ScanResult<()> {
        if self.current.is_some() {
            return Ok(());
        }
        let Some(entry) = top_entry(&mut self.source)? else {
            return Ok(());
        };

        let source_key = entry.key.clone();
        let mapped = match self.mapper.map(entry)? {
            MapOutcome::KeyValueRewrite(key, value) => (key, value),
            MapOutcome::ValueOnly(value) => (source_key, value),
        };
        trace!(key = %mapped.0, "mapped entry");
        self.current = Some(mapped);
        Ok(())
    }
}

impl SortedKeyValueIterator for EntryMapper {
    fn has_top(&self) -> bool {
        self.source.has_top()
    }

    fn top_key(&mut self) -> ScanResult<Option<&Key>> {
        self.compute_if_absent()?;
        Ok(self.current.as_ref().map(|(key, _)| key))
    }

    fn top_value(&mut self) -> ScanResult<Option<&Value>> {
        self.compute_if_absent()?;
        Ok(self.current.as_ref().map(|(_, value)| value))
    }

    fn next(&mut self) -> ScanResult<()> {
        self.source.next()?;
        self.current = None;
        Ok(())
    }

    fn seek(&mut self, range: &Range, column_families: &[Vec<u8>], inclusive: bool) -> ScanResult<()> {
        self.source.seek(range, column_families, inclusive)?;
        self.current = None;
        Ok(())
    }
}

impl OptionDescriber for EntryMapper {
    fn describe_options() -> IteratorOptions {
        IteratorOptions::new(
            "scriptmapper",
            "EntryMapper allows a Rhai function to be passed in and invoked on every key-value pair",
        )
        .with_named_option(Self::FUNCTION_OPTION, "String containing mapper map function")
    }

    /// Only checks that `f` is present; compiling it is left to [`EntryMapper::init`].
    fn validate_options(options: &OptionMap) -> bool {
        options.contains_key(Self::FUNCTION_OPTION)
    }
}
