//! `script-iterators` provides scan-time iterators for sorted key-value stores whose behavior is
//! supplied as [Rhai](https://rhai.rs) source text when the iterator is configured.
//!
//! Entries are `(Key, Value)` pairs kept in [`types::Key`] order. Iterators stack on top of a
//! source (or of each other) through the [`iterator::SortedKeyValueIterator`] trait and are
//! configured with a plain string option map.
//!
//! ## What you can stack
//!
//! - [`processing::EntryFilter`] (`pred`, optional `negate`): keeps the entries the predicate
//!   accepts
//! - [`processing::EntryReducer`] (`f`, optional `val`, `all` / `columns`): folds all versions of a
//!   key into one entry
//! - [`processing::EntryMapper`] (`f`): rewrites each entry, either its value or its key and value
//!
//! Every option that holds a function is compiled once, at init, by a [`script::ScriptEngine`].
//! Scripts see entries as `Key` / `Value` / `Entry` objects and can build new ones with `key(..)`,
//! `value(..)` and `entry(..)`.
//!
//! ## Quick example: filter then map
//!
//! ```rust
//! use script_iterators::config::{build_stack, IteratorKind, IteratorSetting};
//! use script_iterators::iterator::{scan, SortedMapIterator};
//! use script_iterators::script::ScriptEngine;
//! use script_iterators::types::{Entry, Key, Range};
//!
//! # fn main() -> Result<(), script_iterators::ScanError> {
//! let engine = ScriptEngine::new();
//! let source = SortedMapIterator::new(vec![
//!     Entry::new(Key::new("r1", "cf", "a"), "1"),
//!     Entry::new(Key::new("r1", "cf", "b"), "22"),
//!     Entry::new(Key::new("r2", "cf", "a"), "333"),
//! ]);
//! let settings = vec![
//!     IteratorSetting::new(10, "long", IteratorKind::Filter).with_option("pred", "|kv| kv.value.len > 1"),
//!     IteratorSetting::new(20, "len", IteratorKind::Mapper).with_option("f", "|kv| kv.value.len"),
//! ];
//!
//! let mut stack = build_stack(Box::new(source), &settings, &engine)?;
//! let out = scan(&mut stack, &Range::all())?;
//! let values: Vec<String> = out.iter().map(|e| e.value.to_string()).collect();
//! assert_eq!(values, vec!["2", "3"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: keys, values, entries and ranges
//! - [`iterator`]: the iterator trait, option descriptions and an in-memory source
//! - [`script`]: the Rhai engine wrapper and the script-facing API
//! - [`processing`]: the scripted filter, combiner and mapper
//! - [`config`]: iterator settings and stack construction
//! - [`execution`]: parallel scans over independent partitions, with metrics + observers
//! - [`error`]: error types used across the crate

pub mod config;
pub mod error;
pub mod execution;
pub mod iterator;
pub mod processing;
pub mod script;
pub mod types;

pub use error::{ScanError, ScanResult};
