use rhai::module_resolvers::StaticModuleResolver;
use rhai::{Dynamic, Module};

use script_iterators::script::{render, ScriptEngine};
use script_iterators::types::Value;
use script_iterators::ScanError;

fn text_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("upper", |s: &str| Ok(s.to_uppercase()));
    module
}

#[test]
fn serialize_renders_script_values() {
    let engine = ScriptEngine::new();
    let value = ScriptEngine::serialize(engine.eval("[1, 2, 3]").unwrap());
    assert_eq!(value.get(), b"[1, 2, 3]");

    let value = ScriptEngine::serialize(engine.eval("#{a: 1, b: \"x\"}").unwrap());
    assert_eq!(value.as_str_lossy(), "#{\"a\": 1, \"b\": \"x\"}");
}

#[test]
fn serialize_passes_values_through() {
    let original = Value::new(vec![0xff, 0x00, 0x7f]);
    let out = ScriptEngine::serialize(Dynamic::from(original.clone()));
    assert_eq!(out, original);

    // Rendering is idempotent for text that was produced by rendering.
    let once = render(&Dynamic::from("q\"uote"));
    assert_eq!(ScriptEngine::serialize(Dynamic::from(Value::from(once.as_str()))).as_str_lossy(), once);
}

#[test]
fn imports_resolve_through_the_host_resolver() {
    let mut resolver = StaticModuleResolver::new();
    resolver.insert("text", text_module());
    let engine = ScriptEngine::builder().module_resolver(resolver).build();

    let out = engine.eval(r#"import "text" as t; t::upper("a")"#).unwrap();
    assert_eq!(out.into_string().unwrap(), "A");
}

#[test]
fn unknown_imports_fail_to_compile() {
    let engine = ScriptEngine::new();
    let err = engine.compile(r#"import "no_such_module" as m; |kv| kv"#).unwrap_err();
    assert!(matches!(err, ScanError::Compile { .. }));
}

#[test]
fn static_modules_need_no_import() {
    let engine = ScriptEngine::builder().static_module("text", text_module()).build();
    let f = engine.compile("|s| text::upper(s)").unwrap().into_callable().unwrap();
    assert_eq!(f.call1(Dynamic::from("a")).unwrap().into_string().unwrap(), "A");
}

#[test]
fn zero_argument_callables_are_invoked_directly() {
    let engine = ScriptEngine::new();
    let f = engine.compile("|| #{}").unwrap().into_callable().unwrap();
    let out = f.call0().unwrap();
    assert!(out.is_map());
    assert_eq!(render(&out), "#{}");
}

#[test]
fn non_callable_results_are_reported() {
    let engine = ScriptEngine::new();
    let script = engine.compile("let x = 1; x + 1").unwrap();
    assert!(!script.is_callable());
    assert!(script.into_callable().is_none());
}
