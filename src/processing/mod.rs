//! Scripted scan-time iterators.
//!
//! Each iterator wraps a source [`crate::iterator::SortedKeyValueIterator`] and compiles one user
//! function at initialization:
//!
//! - [`EntryFilter`]: keeps entries for which the `pred` function is truthy
//! - [`EntryReducer`]: folds each group of versions of a column into one value with `f`
//! - [`EntryMapper`]: rewrites each entry's value (and optionally key) with `f`
//!
//! ## Example: filter → map
//!
//! ```rust
//! use script_iterators::iterator::{scan, BoxedIterator, OptionMap, SortedMapIterator};
//! use script_iterators::processing::{EntryFilter, EntryMapper};
//! use script_iterators::script::ScriptEngine;
//! use script_iterators::types::{Entry, Key, Range};
//!
//! let engine = ScriptEngine::new();
//! let source = SortedMapIterator::new(vec![
//!     Entry::new(Key::new("a", "f", "q"), "keep"),
//!     Entry::new(Key::new("b", "f", "q"), "drop"),
//! ]);
//!
//! let mut opts = OptionMap::new();
//! opts.insert("pred".into(), r#"|kv| kv.key.row == "a""#.into());
//! let filter = EntryFilter::init(Box::new(source), &opts, &engine).unwrap();
//!
//! let mut opts = OptionMap::new();
//! opts.insert("f".into(), "|kv| value(kv.value.text.to_upper())".into());
//! let mut mapper = EntryMapper::init(Box::new(filter) as BoxedIterator, &opts, &engine).unwrap();
//!
//! let out = scan(&mut mapper, &Range::all()).unwrap();
//! assert_eq!(out, vec![Entry::new(Key::new("a", "f", "q"), "KEEP")]);
//! ```

pub mod filter;
pub mod map;
pub mod reduce;

pub use filter::EntryFilter;
pub use map::EntryMapper;
pub use reduce::{Column, CombineScope, EntryReducer, GroupReducer};

use tracing::debug;

use crate::error::{ScanError, ScanResult};
use crate::iterator::OptionMap;
use crate::script::{CompiledFn, ScriptEngine};

/// Compile the required function option `option` for `iterator`.
pub(crate) fn required_callable(
    engine: &ScriptEngine,
    options: &OptionMap,
    option: &str,
    iterator: &str,
) -> ScanResult<CompiledFn> {
    let source = options
        .get(option)
        .ok_or_else(|| ScanError::configuration(format!("{option} must be set for {iterator}")))?;

    let callable = engine.compile(source)?.into_callable().ok_or_else(|| {
        ScanError::configuration(format!("{option} must compile to a function for {iterator}"))
    })?;

    debug!(iterator, option, "initialized scripted iterator");
    Ok(callable)
}
