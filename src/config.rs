//! Iterator stack configuration.
//!
//! An [`IteratorSetting`] names one scripted iterator, its priority and its options. Settings can
//! be built in code or decoded from JSON:
//!
//! ```rust
//! use script_iterators::config::{IteratorKind, IteratorSetting};
//!
//! let settings = IteratorSetting::list_from_json(r#"[
//!     {"priority": 10, "name": "evens", "kind": "filter", "options": {"pred": "|kv| kv.value.len % 2 == 0"}},
//!     {"priority": 20, "name": "upper", "kind": "mapper", "options": {"f": "|kv| kv.value.text.to_upper()"}}
//! ]"#).unwrap();
//! assert_eq!(settings[0].kind, IteratorKind::Filter);
//! ```
//!
//! [`build_stack`] instantiates the settings over a source, lowest priority closest to the
//! source.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ScanResult;
use crate::iterator::{BoxedIterator, IteratorOptions, OptionDescriber, OptionMap};
use crate::processing::{EntryFilter, EntryMapper, EntryReducer};
use crate::script::ScriptEngine;

/// Which scripted iterator a setting instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IteratorKind {
    Filter,
    Combiner,
    Mapper,
}

impl IteratorKind {
    pub fn describe_options(self) -> IteratorOptions {
        match self {
            Self::Filter => EntryFilter::describe_options(),
            Self::Combiner => EntryReducer::describe_options(),
            Self::Mapper => EntryMapper::describe_options(),
        }
    }

    pub fn validate_options(self, options: &OptionMap) -> bool {
        match self {
            Self::Filter => EntryFilter::validate_options(options),
            Self::Combiner => EntryReducer::validate_options(options),
            Self::Mapper => EntryMapper::validate_options(options),
        }
    }
}

/// One iterator in a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IteratorSetting {
    pub priority: u32,
    pub name: String,
    pub kind: IteratorKind,
    #[serde(default)]
    pub options: OptionMap,
}

impl IteratorSetting {
    pub fn new(priority: u32, name: impl Into<String>, kind: IteratorKind) -> Self {
        Self {
            priority,
            name: name.into(),
            kind,
            options: OptionMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn from_json(json: &str) -> ScanResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn list_from_json(json: &str) -> ScanResult<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Instantiate this setting on top of `source`.
    pub fn instantiate(&self, source: BoxedIterator, engine: &ScriptEngine) -> ScanResult<BoxedIterator> {
        debug!(name = %self.name, priority = self.priority, kind = ?self.kind, "instantiating iterator");
        Ok(match self.kind {
            IteratorKind::Filter => Box::new(EntryFilter::init(source, &self.options, engine)?),
            IteratorKind::Combiner => Box::new(EntryReducer::init(source, &self.options, engine)?),
            IteratorKind::Mapper => Box::new(EntryMapper::init(source, &self.options, engine)?),
        })
    }
}

/// Stack `settings` over `source` in ascending priority order.
///
/// Every iterator compiles its own function; the first failing setting aborts the whole stack.
pub fn build_stack(
    source: BoxedIterator,
    settings: &[IteratorSetting],
    engine: &ScriptEngine,
) -> ScanResult<BoxedIterator> {
    let mut ordered: Vec<&IteratorSetting> = settings.iter().collect();
    ordered.sort_by_key(|s| s.priority);

    ordered
        .into_iter()
        .try_fold(source, |iter, setting| setting.instantiate(iter, engine))
}
