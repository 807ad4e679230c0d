use std::fmt;
use std::sync::Arc;

use rhai::{Dynamic, Engine, FnPtr, Module, ModuleResolver, Scope, AST};
use tracing::debug;

use crate::error::{ScanError, ScanResult};
use crate::types::Value;

use super::api;
use super::callable::CompiledFn;
use super::render;

/// Compiles script snippets into values and callables.
///
/// The engine itself is cheap to clone and may be shared; each iterator instance still compiles
/// its own snippet, so no compiled function is ever shared between instances.
#[derive(Clone)]
pub struct ScriptEngine {
    engine: Arc<Engine>,
}

impl ScriptEngine {
    /// An engine with the standard Rhai packages and the entry API.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ScriptEngineBuilder {
        ScriptEngineBuilder::new()
    }

    /// Parse `source` and evaluate its top-level statements, keeping the value of the last one.
    ///
    /// Fails with [`ScanError::Compile`] if the snippet does not parse or a top-level statement
    /// raises an error.
    pub fn compile(&self, source: &str) -> ScanResult<Script> {
        let ast = self.engine.compile(source).map_err(ScanError::compile)?;
        let mut scope = Scope::new();
        let value = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
            .map_err(|err| ScanError::compile(*err))?;

        debug!(
            result_type = value.type_name(),
            functions = ast.iter_functions().count(),
            "compiled script"
        );

        Ok(Script {
            value,
            ast: Arc::new(ast),
            engine: Arc::clone(&self.engine),
        })
    }

    /// Evaluate `source` for its value alone.
    pub fn eval(&self, source: &str) -> ScanResult<Dynamic> {
        self.compile(source).map(Script::into_value)
    }

    /// True if `value` can be invoked as a function.
    pub fn validate_callable(value: &Dynamic) -> bool {
        value.is::<FnPtr>()
    }

    /// Convert a script result into a wire [`Value`].
    ///
    /// A `Value` is returned as is; anything else is rendered to its canonical text.
    pub fn serialize(value: Dynamic) -> Value {
        render::serialize(value)
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptEngine").finish_non_exhaustive()
    }
}

/// Builder for a [`ScriptEngine`] with host-provided modules.
pub struct ScriptEngineBuilder {
    engine: Engine,
}

impl ScriptEngineBuilder {
    fn new() -> Self {
        let mut engine = Engine::new();
        api::register(&mut engine);
        Self { engine }
    }

    /// Resolver used for `import` statements.
    pub fn module_resolver(mut self, resolver: impl ModuleResolver + 'static) -> Self {
        self.engine.set_module_resolver(resolver);
        self
    }

    /// Make `module` available to every script as `name::...` without an import.
    pub fn static_module(mut self, name: &str, module: Module) -> Self {
        self.engine.register_static_module(name, module.into());
        self
    }

    /// Arbitrary engine configuration (native functions, limits, ...).
    pub fn configure(mut self, f: impl FnOnce(&mut Engine)) -> Self {
        f(&mut self.engine);
        self
    }

    pub fn build(self) -> ScriptEngine {
        ScriptEngine {
            engine: Arc::new(self.engine),
        }
    }
}

/// A compiled snippet together with the value its last statement produced.
pub struct Script {
    value: Dynamic,
    ast: Arc<AST>,
    engine: Arc<Engine>,
}

impl Script {
    pub fn value(&self) -> &Dynamic {
        &self.value
    }

    pub fn into_value(self) -> Dynamic {
        self.value
    }

    pub fn is_callable(&self) -> bool {
        ScriptEngine::validate_callable(&self.value)
    }

    /// The callable this snippet evaluated to, or `None` if it is not invocable.
    pub fn into_callable(self) -> Option<CompiledFn> {
        let fn_ptr = self.value.try_cast::<FnPtr>()?;
        Some(CompiledFn::new(self.engine, self.ast, fn_ptr))
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("value_type", &self.value.type_name())
            .finish_non_exhaustive()
    }
}
