//! Folding groups of versions of a column into one value.
//!
//! A group is a run of consecutive entries equal on row, column family, column qualifier and
//! visibility; timestamps differ. The host delivers a group newest first. The combined entry
//! carries the group's first (newest) key.

use rhai::Dynamic;
use tracing::trace;

use crate::error::{ScanError, ScanResult};
use crate::iterator::{BoxedIterator, IteratorOptions, OptionDescriber, OptionMap, SortedKeyValueIterator};
use crate::script::{Reducer, ScriptEngine};
use crate::types::{Entry, Key, PartialKey, Range, Value};

use super::required_callable;

/// A column named in the `columns` option: a family, optionally narrowed to one qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub family: Vec<u8>,
    pub qualifier: Option<Vec<u8>>,
}

impl Column {
    /// Parse `family` or `family:qualifier`.
    pub fn parse(raw: &str) -> ScanResult<Self> {
        let raw = raw.trim();
        let (family, qualifier) = match raw.split_once(':') {
            Some((family, qualifier)) => (family, Some(qualifier)),
            None => (raw, None),
        };
        if family.is_empty() || qualifier.is_some_and(str::is_empty) {
            return Err(ScanError::configuration(format!("invalid column '{raw}'")));
        }
        Ok(Self {
            family: family.as_bytes().to_vec(),
            qualifier: qualifier.map(|q| q.as_bytes().to_vec()),
        })
    }

    pub fn matches(&self, key: &Key) -> bool {
        key.column_family() == self.family.as_slice()
            && self
                .qualifier
                .as_deref()
                .is_none_or(|q| key.column_qualifier() == q)
    }
}

/// Which columns are combined. Entries outside the scope pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombineScope {
    All,
    Columns(Vec<Column>),
}

impl CombineScope {
    /// Read `all` / `columns`. With neither set every column is combined.
    pub fn from_options(options: &OptionMap) -> ScanResult<Self> {
        let all = match options.get(EntryReducer::ALL_OPTION).map(|s| s.trim()) {
            None => false,
            Some(raw) => raw.parse::<bool>().map_err(|_| {
                ScanError::configuration(format!(
                    "{} must be true or false, got '{raw}'",
                    EntryReducer::ALL_OPTION
                ))
            })?,
        };
        if all {
            return Ok(Self::All);
        }
        match options.get(EntryReducer::COLUMNS_OPTION) {
            None => Ok(Self::All),
            Some(raw) => {
                let columns = raw
                    .split(',')
                    .map(Column::parse)
                    .collect::<ScanResult<Vec<_>>>()?;
                Ok(Self::Columns(columns))
            }
        }
    }

    pub fn covers(&self, key: &Key) -> bool {
        match self {
            Self::All => true,
            Self::Columns(columns) => columns.iter().any(|c| c.matches(key)),
        }
    }
}

/// The reduce function plus its optional seed.
#[derive(Debug, Clone)]
pub struct GroupReducer {
    reducer: Reducer,
    seed: Option<Dynamic>,
}

impl GroupReducer {
    pub fn new(reducer: Reducer, seed: Option<Dynamic>) -> Self {
        Self { reducer, seed }
    }

    /// Fold `values` (in arrival order) into one value.
    ///
    /// - with a seed: `acc = f(acc, entry)` for every value, starting from the seed
    /// - without: a single value is returned as is; otherwise `acc = f(entry2, entry1)` and then
    ///   `acc = f(acc, entry)` for the rest
    /// - without a seed or values: `f()`
    ///
    /// Every result except the single-value pass-through goes through
    /// [`ScriptEngine::serialize`].
    pub fn reduce<I>(&self, key: &Key, values: I) -> ScanResult<Value>
    where
        I: IntoIterator<Item = ScanResult<Value>>,
    {
        let mut values = values.into_iter();
        let entry = |value: Value| {
            Dynamic::from(Entry {
                key: key.clone(),
                value,
            })
        };

        let mut folded = 0usize;
        let mut acc = match &self.seed {
            Some(seed) => seed.clone(),
            None => {
                let Some(first) = values.next().transpose()? else {
                    return Ok(ScriptEngine::serialize(self.reducer.empty()?));
                };
                let Some(second) = values.next().transpose()? else {
                    return Ok(first);
                };
                folded = 2;
                self.reducer.step(entry(second), entry(first))?
            }
        };
        for value in values {
            acc = self.reducer.step(acc, entry(value?))?;
            folded += 1;
        }

        trace!(key = %key, folded, seeded = self.seed.is_some(), "reduced group");
        Ok(ScriptEngine::serialize(acc))
    }
}

/// Values of the group starting at the source's current key. Pulling a value advances the
/// source.
struct GroupValues<'a> {
    source: &'a mut BoxedIterator,
    key: &'a Key,
    done: bool,
}

impl<'a> GroupValues<'a> {
    fn new(source: &'a mut BoxedIterator, key: &'a Key) -> Self {
        Self {
            source,
            key,
            done: false,
        }
    }

    fn pull(&mut self) -> ScanResult<Option<Value>> {
        let in_group = match self.source.top_key()? {
            Some(top) => !top.is_deleted() && top.equals_partial(self.key, PartialKey::RowColfamColqualColvis),
            None => false,
        };
        if !in_group {
            return Ok(None);
        }
        let value = self.source.top_value()?.cloned();
        self.source.next()?;
        Ok(value)
    }
}

impl Iterator for GroupValues<'_> {
    type Item = ScanResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.pull() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Server-side `reduce` over each group of versions of a column.
///
/// Takes `f`, the reduce function, and optionally `val`, a script whose value seeds every fold.
/// `all` and `columns` select which columns are combined; deleted keys always pass through.
pub struct EntryReducer {
    source: BoxedIterator,
    group_reducer: GroupReducer,
    scope: CombineScope,
    top: Option<(Key, Value)>,
}

impl EntryReducer {
    pub const FUNCTION_OPTION: &'static str = "f";
    pub const SEED_OPTION: &'static str = "val";
    pub const ALL_OPTION: &'static str = "all";
    pub const COLUMNS_OPTION: &'static str = "columns";

    pub fn init(source: BoxedIterator, options: &OptionMap, engine: &ScriptEngine) -> ScanResult<Self> {
        let reducer = Reducer::new(required_callable(
            engine,
            options,
            Self::FUNCTION_OPTION,
            "EntryReducer",
        )?);
        let seed = options
            .get(Self::SEED_OPTION)
            .map(|source| engine.eval(source))
            .transpose()?;
        let scope = CombineScope::from_options(options)?;

        Ok(Self {
            source,
            group_reducer: GroupReducer::new(reducer, seed),
            scope,
            top: None,
        })
    }

    /// Fold one group's values; see [`GroupReducer::reduce`].
    pub fn reduce<I>(&self, key: &Key, values: I) -> ScanResult<Value>
    where
        I: IntoIterator<Item = ScanResult<Value>>,
    {
        self.group_reducer.reduce(key, values)
    }

    fn find_top(&mut self) -> ScanResult<()> {
        self.top = None;
        let Some(key) = self.source.top_key()?.cloned() else {
            return Ok(());
        };
        if key.is_deleted() || !self.scope.covers(&key) {
            return Ok(());
        }

        let mut group = GroupValues::new(&mut self.source, &key);
        let value = self.group_reducer.reduce(&key, &mut group)?;
        for rest in group {
            rest?;
        }
        self.top = Some((key, value));
        Ok(())
    }
}

impl SortedKeyValueIterator for EntryReducer {
    fn has_top(&self) -> bool {
        self.top.is_some() || self.source.has_top()
    }

    fn top_key(&mut self) -> ScanResult<Option<&Key>> {
        if let Some((key, _)) = &self.top {
            return Ok(Some(key));
        }
        self.source.top_key()
    }

    fn top_value(&mut self) -> ScanResult<Option<&Value>> {
        if let Some((_, value)) = &self.top {
            return Ok(Some(value));
        }
        self.source.top_value()
    }

    fn next(&mut self) -> ScanResult<()> {
        // A combined top already moved the source past its group.
        if self.top.take().is_none() {
            self.source.next()?;
        }
        self.find_top()
    }

    fn seek(&mut self, range: &Range, column_families: &[Vec<u8>], inclusive: bool) -> ScanResult<()> {
        self.source
            .seek(&range.widened_to_column_start(), column_families, inclusive)?;
        self.find_top()?;

        while let Some(key) = self.top_key()? {
            if !range.before_start(key) {
                break;
            }
            self.next()?;
        }
        Ok(())
    }
}

impl OptionDescriber for EntryReducer {
    fn describe_options() -> IteratorOptions {
        IteratorOptions::new(
            "scriptcombiner",
            "EntryReducer allows a Rhai function to be passed in and invoked as the combiner's reduce method",
        )
        .with_named_option(Self::FUNCTION_OPTION, "String containing combiner reduce function")
        .with_named_option(Self::SEED_OPTION, "Optional string containing initial reduce value")
        .with_named_option(Self::ALL_OPTION, "set to true to apply the combiner to every column")
        .with_named_option(Self::COLUMNS_OPTION, "<col fam>[:<col qual>]{,<col fam>[:<col qual>]} columns to combine")
    }

    fn validate_options(options: &OptionMap) -> bool {
        CombineScope::from_options(options).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{Column, CombineScope, EntryReducer, GroupReducer};
    use crate::error::{ScanError, ScanResult};
    use crate::iterator::{OptionDescriber, OptionMap, SortedMapIterator};
    use crate::script::{Reducer, ScriptEngine};
    use crate::types::{Key, Value};

    fn reducer(engine: &ScriptEngine, f: &str, seed: Option<&str>) -> GroupReducer {
        let f = engine.compile(f).unwrap().into_callable().unwrap();
        let seed = seed.map(|s| engine.eval(s).unwrap());
        GroupReducer::new(Reducer::new(f), seed)
    }

    fn values(raw: &[&str]) -> Vec<ScanResult<Value>> {
        raw.iter().map(|s| Ok(Value::from(*s))).collect()
    }

    fn counting_engine(calls: Arc<AtomicUsize>) -> ScriptEngine {
        ScriptEngine::builder()
            .configure(move |engine| {
                engine.register_fn("hit", move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                });
            })
            .build()
    }

    fn key() -> Key {
        Key::new("a", "1", "b")
    }

    #[test]
    fn singleton_group_passes_through_without_calling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = counting_engine(calls.clone());
        let r = reducer(&engine, "|a, b| { hit(); \"changed\" }", None);

        let raw = Value::new(vec![0xff, 0x00, 0x10]);
        let out = r.reduce(&key(), vec![Ok(raw.clone())]).unwrap();
        assert_eq!(out, raw);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn first_step_receives_second_value_first() {
        let engine = ScriptEngine::new();
        let r = reducer(
            &engine,
            r#"|acc, kv| {
                let left = if type_of(acc) == "Entry" { acc.value.text } else { acc };
                left + "," + kv.value.text
            }"#,
            None,
        );
        let out = r.reduce(&key(), values(&["v1", "v2", "v3"])).unwrap();
        assert_eq!(out.get(), b"\"v2,v1,v3\"");
    }

    #[test]
    fn seed_on_empty_group_is_returned_without_calling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = counting_engine(calls.clone());
        let r = reducer(&engine, "|x, kv| { hit(); x + 1 }", Some("0"));

        let out = r.reduce(&key(), Vec::new()).unwrap();
        assert_eq!(out.get(), b"0");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn seeded_fold_counts_values() {
        let engine = ScriptEngine::new();
        let r = reducer(&engine, "|x, kv| x + 1", Some("0"));
        assert_eq!(r.reduce(&key(), values(&["a", "b", "c"])).unwrap().get(), b"3");
        assert_eq!(r.reduce(&key(), values(&["a"])).unwrap().get(), b"1");
    }

    #[test]
    fn empty_unseeded_group_calls_with_no_arguments() {
        let engine = ScriptEngine::new();
        let f = engine
            .compile("fn pick(a, b) { a } fn pick() { \"nothing\" } Fn(\"pick\")")
            .unwrap()
            .into_callable()
            .unwrap();
        let r = GroupReducer::new(Reducer::new(f), None);
        assert_eq!(r.reduce(&key(), Vec::new()).unwrap().get(), b"\"nothing\"");
    }

    #[test]
    fn source_errors_stop_the_fold() {
        let engine = ScriptEngine::new();
        let r = reducer(&engine, "|x, kv| x + 1", Some("0"));
        let input: Vec<ScanResult<Value>> = vec![
            Ok(Value::from("a")),
            Err(ScanError::configuration("source failed")),
        ];
        assert!(r.reduce(&key(), input).is_err());
    }

    #[test]
    fn column_parsing_and_matching() {
        let fam = Column::parse("1").unwrap();
        assert!(fam.matches(&Key::new("r", "1", "anything")));
        assert!(!fam.matches(&Key::new("r", "2", "anything")));

        let col = Column::parse(" 1:b ").unwrap();
        assert!(col.matches(&Key::new("r", "1", "b")));
        assert!(!col.matches(&Key::new("r", "1", "c")));

        assert!(Column::parse("").is_err());
        assert!(Column::parse("1:").is_err());
    }

    #[test]
    fn scope_options() {
        let mut opts = OptionMap::new();
        assert_eq!(CombineScope::from_options(&opts).unwrap(), CombineScope::All);

        opts.insert("columns".into(), "1,2:x".into());
        let scope = CombineScope::from_options(&opts).unwrap();
        assert!(scope.covers(&Key::new("r", "2", "x")));
        assert!(!scope.covers(&Key::new("r", "2", "y")));

        opts.insert("all".into(), "true".into());
        assert_eq!(CombineScope::from_options(&opts).unwrap(), CombineScope::All);

        opts.insert("all".into(), "yes".into());
        assert!(!EntryReducer::validate_options(&opts));
    }

    #[test]
    fn init_errors() {
        let engine = ScriptEngine::new();
        let source = || Box::new(SortedMapIterator::default());

        let err = EntryReducer::init(source(), &OptionMap::new(), &engine).err().unwrap();
        assert!(matches!(err, ScanError::Configuration { .. }));

        let mut opts = OptionMap::new();
        opts.insert("f".into(), "\"not a function\"".into());
        let err = EntryReducer::init(source(), &opts, &engine).err().unwrap();
        assert!(matches!(err, ScanError::Configuration { .. }));

        opts.insert("f".into(), "|a, b| a".into());
        opts.insert("val".into(), "[1, 2".into());
        let err = EntryReducer::init(source(), &opts, &engine).err().unwrap();
        assert!(matches!(err, ScanError::Compile { .. }));

    }
}
