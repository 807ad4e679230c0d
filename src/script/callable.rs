use std::fmt;
use std::sync::Arc;

use rhai::{Array, Dynamic, Engine, FnPtr, AST};

use crate::error::ScanResult;
use crate::types::{Entry, Key, Value};

use super::render::serialize;

/// A compiled script function, callable with zero, one or two positional arguments.
///
/// Errors raised by the script are returned as [`crate::ScanError::Script`] and never retried.
#[derive(Clone)]
pub struct CompiledFn {
    engine: Arc<Engine>,
    ast: Arc<AST>,
    fn_ptr: FnPtr,
}

impl CompiledFn {
    pub(crate) fn new(engine: Arc<Engine>, ast: Arc<AST>, fn_ptr: FnPtr) -> Self {
        Self {
            engine,
            ast,
            fn_ptr,
        }
    }

    pub fn call0(&self) -> ScanResult<Dynamic> {
        Ok(self.fn_ptr.call::<Dynamic>(&self.engine, &self.ast, ())?)
    }

    pub fn call1(&self, a: Dynamic) -> ScanResult<Dynamic> {
        Ok(self.fn_ptr.call::<Dynamic>(&self.engine, &self.ast, (a,))?)
    }

    pub fn call2(&self, a: Dynamic, b: Dynamic) -> ScanResult<Dynamic> {
        Ok(self.fn_ptr.call::<Dynamic>(&self.engine, &self.ast, (a, b))?)
    }
}

impl fmt::Debug for CompiledFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFn")
            .field("fn_name", &self.fn_ptr.fn_name())
            .finish_non_exhaustive()
    }
}

/// Script truthiness: `false` and unit `()` are false, every other value is true.
///
/// `0`, `""` and empty arrays all count as true.
pub fn to_bool(value: &Dynamic) -> bool {
    if value.is::<()>() {
        return false;
    }
    value.as_bool().unwrap_or(true)
}

/// One-argument function coerced to a boolean.
#[derive(Debug, Clone)]
pub struct Predicate(CompiledFn);

impl Predicate {
    pub fn new(f: CompiledFn) -> Self {
        Self(f)
    }

    pub fn test(&self, entry: Entry) -> ScanResult<bool> {
        let ret = self.0.call1(Dynamic::from(entry))?;
        Ok(to_bool(&ret))
    }
}

/// Two-argument fold step; also callable with no arguments for an empty fold.
#[derive(Debug, Clone)]
pub struct Reducer(CompiledFn);

impl Reducer {
    pub fn new(f: CompiledFn) -> Self {
        Self(f)
    }

    pub fn empty(&self) -> ScanResult<Dynamic> {
        self.0.call0()
    }

    pub fn step(&self, acc: Dynamic, next: Dynamic) -> ScanResult<Dynamic> {
        self.0.call2(acc, next)
    }
}

/// What a map function did with an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapOutcome {
    /// The function returned `[key, value]` with a `Key` first: both are replaced.
    KeyValueRewrite(Key, Value),
    /// Any other return value: the original key is kept and this becomes the value.
    ValueOnly(Value),
}

/// One-argument function from an entry to a [`MapOutcome`].
#[derive(Debug, Clone)]
pub struct Mapper(CompiledFn);

impl Mapper {
    pub fn new(f: CompiledFn) -> Self {
        Self(f)
    }

    pub fn map(&self, entry: Entry) -> ScanResult<MapOutcome> {
        let ret = self.0.call1(Dynamic::from(entry))?;
        Ok(classify(ret))
    }
}

fn classify(ret: Dynamic) -> MapOutcome {
    let ret = ret.flatten();
    let is_rewrite = ret
        .read_lock::<Array>()
        .is_some_and(|pair| pair.len() == 2 && pair[0].is::<Key>());
    if !is_rewrite {
        return MapOutcome::ValueOnly(serialize(ret));
    }

    let mut pair = ret.cast::<Array>().into_iter();
    match (pair.next().and_then(|k| k.try_cast::<Key>()), pair.next()) {
        (Some(key), Some(value)) => MapOutcome::KeyValueRewrite(key, serialize(value)),
        _ => unreachable!("pair shape checked above"),
    }
}
