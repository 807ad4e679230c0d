use script_iterators::config::{build_stack, IteratorKind, IteratorSetting};
use script_iterators::iterator::{scan, SortedMapIterator};
use script_iterators::script::ScriptEngine;
use script_iterators::types::{Entry, Key, Range};
use script_iterators::ScanError;

fn table() -> SortedMapIterator {
    SortedMapIterator::new(vec![
        Entry::new(Key::new("a", "1", "b").with_timestamp(1), "a-b1"),
        Entry::new(Key::new("a", "1", "b").with_timestamp(2), "a-b2"),
        Entry::new(Key::new("a", "1", "b").with_timestamp(3), "a-b3"),
        Entry::new(Key::new("d", "1", "e").with_timestamp(1), "d-e"),
    ])
}

fn combine(range: &Range, setting: IteratorSetting) -> Result<Vec<String>, ScanError> {
    let engine = ScriptEngine::new();
    let mut stack = build_stack(Box::new(table()), &[setting.with_option("columns", "1")], &engine)?;
    Ok(scan(&mut stack, range)?
        .into_iter()
        .map(|e| e.value.to_string())
        .collect())
}

fn combiner(f: &str) -> IteratorSetting {
    IteratorSetting::new(10, "combiner", IteratorKind::Combiner).with_option("f", f)
}

#[test]
fn validation_requires_a_function() {
    let engine = ScriptEngine::new();
    let setting = IteratorSetting::new(10, "combiner", IteratorKind::Combiner);
    let err = build_stack(Box::new(table()), &[setting], &engine).err().unwrap();
    assert!(matches!(err, ScanError::Configuration { .. }));
}

#[test]
fn combine_many_joins_versions_in_chronological_order() {
    // Versions arrive newest first, so the first call sees (a-b2, a-b3) and later calls prepend.
    let f = r#"
        fn text(kv) { kv.value.text }
        |y, x| if type_of(y) == "Entry" { text(y) + "," + text(x) } else { text(x) + "," + y }
    "#;
    let out = combine(&Range::exact_row("a"), combiner(f)).unwrap();
    assert_eq!(out, vec!["\"a-b1,a-b2,a-b3\""]);
}

#[test]
fn combine_many_with_seed_counts_versions() {
    let out = combine(&Range::exact_row("a"), combiner("|x, kv| x + 1").with_option("val", "0")).unwrap();
    assert_eq!(out, vec!["3"]);
}

#[test]
fn combine_one_passes_the_value_through() {
    let out = combine(&Range::exact_row("d"), combiner("|acc, kv| { throw \"never called\"; }")).unwrap();
    assert_eq!(out, vec!["d-e"]);
}

#[test]
fn combine_one_with_seed_calls_the_function_once() {
    let out = combine(&Range::exact_row("d"), combiner("|x, kv| x + 1").with_option("val", "0")).unwrap();
    assert_eq!(out, vec!["1"]);
}

#[test]
fn combined_entry_keeps_the_newest_key() {
    let engine = ScriptEngine::new();
    let setting = combiner("|x, kv| x + 1").with_option("val", "0");
    let mut stack = build_stack(Box::new(table()), &[setting], &engine).unwrap();
    let out = scan(&mut stack, &Range::all()).unwrap();

    let keys: Vec<Key> = out.into_iter().map(|e| e.key).collect();
    assert_eq!(
        keys,
        vec![
            Key::new("a", "1", "b").with_timestamp(3),
            Key::new("d", "1", "e").with_timestamp(1),
        ]
    );
}

#[test]
fn columns_outside_the_scope_pass_through() {
    let engine = ScriptEngine::new();
    let source = SortedMapIterator::new(vec![
        Entry::new(Key::new("r", "count", "x").with_timestamp(2), "v2"),
        Entry::new(Key::new("r", "count", "x").with_timestamp(1), "v1"),
        Entry::new(Key::new("r", "raw", "x").with_timestamp(2), "w2"),
        Entry::new(Key::new("r", "raw", "x").with_timestamp(1), "w1"),
    ]);
    let setting = combiner("|x, kv| x + 1")
        .with_option("val", "0")
        .with_option("columns", "count:x");
    let mut stack = build_stack(Box::new(source), &[setting], &engine).unwrap();

    let values: Vec<String> = scan(&mut stack, &Range::all())
        .unwrap()
        .into_iter()
        .map(|e| e.value.to_string())
        .collect();
    assert_eq!(values, vec!["2", "w2", "w1"]);
}

#[test]
fn failing_function_fails_the_scan() {
    let err = combine(&Range::exact_row("a"), combiner("|acc, kv| { throw \"boom\"; }")).unwrap_err();
    assert!(matches!(err, ScanError::Script(_)));
}
