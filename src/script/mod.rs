//! Embedded Rhai scripting for the iterators.
//!
//! Every scripted iterator turns one option string into a callable exactly once, at
//! initialization, through [`ScriptEngine::compile`]. The snippet may contain any number of
//! statements (imports, helper `fn` definitions, `let` bindings); the value of the last one is
//! the result, and the iterators require it to be a function pointer or closure:
//!
//! ```rust
//! use script_iterators::script::ScriptEngine;
//!
//! let engine = ScriptEngine::new();
//! let script = engine
//!     .compile(r#"
//!         fn is_admin(row) { row.starts_with("admin/") }
//!         |kv| is_admin(kv.key.row)
//!     "#)
//!     .unwrap();
//! assert!(script.is_callable());
//! ```
//!
//! Scripts see entries as the registered `Entry`, `Key` and `Value` types (see [`api`]).
//! Results that are not already a `Value` are written back through [`ScriptEngine::serialize`].

pub mod api;
mod callable;
mod engine;
mod render;

pub use callable::{to_bool, CompiledFn, MapOutcome, Mapper, Predicate, Reducer};
pub use engine::{Script, ScriptEngine, ScriptEngineBuilder};
pub use render::render;
