use std::sync::Arc;

use script_iterators::config::IteratorSetting;
use script_iterators::execution::{
    CompositeScanObserver, ParallelScanner, ScanObserver, ScanOptions, StdErrScanObserver, TracingScanObserver,
};
use script_iterators::script::ScriptEngine;
use script_iterators::types::{Entry, Key, Range};
use script_iterators::ScanError;

const STACK: &str = r#"[
    {"priority": 10, "name": "sum", "kind": "combiner", "options": {"f": "|acc, kv| acc + parse_int(kv.value.text)", "val": "0"}},
    {"priority": 20, "name": "big", "kind": "filter", "options": {"pred": "|kv| parse_int(kv.value.text) >= 10"}}
]"#;

/// `rows` rows per partition, each with `versions` versions valued 0..versions.
fn partitions(count: usize, rows: usize, versions: usize) -> Vec<Vec<Entry>> {
    (0..count)
        .map(|p| {
            (0..rows)
                .flat_map(|r| {
                    (0..versions).map(move |v| {
                        Entry::new(
                            Key::new(format!("p{p:03}-r{r:04}"), "m", "n").with_timestamp(v as i64),
                            v.to_string(),
                        )
                    })
                })
                .collect()
        })
        .collect()
}

fn scanner(threads: usize) -> ParallelScanner {
    let tracing: Arc<dyn ScanObserver> = Arc::new(TracingScanObserver);
    let stderr: Arc<dyn ScanObserver> = Arc::new(StdErrScanObserver);
    let observer: Arc<dyn ScanObserver> = Arc::new(CompositeScanObserver::new(vec![tracing, stderr]));
    ParallelScanner::new(ScanOptions { num_threads: Some(threads) }, ScriptEngine::new()).with_observer(observer)
}

#[test]
fn json_configured_stack_runs_per_partition() {
    let settings = IteratorSetting::list_from_json(STACK).unwrap();
    // Sums: 5 versions -> 0+1+2+3+4 = 10 (kept); 4 versions -> 6 (dropped).
    let mut input = partitions(2, 3, 5);
    input.push(partitions(1, 2, 4).remove(0));

    let out = scanner(3).scan(input, &settings, &Range::all()).unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(out[0].len(), 3);
    assert_eq!(out[1].len(), 3);
    assert!(out[2].is_empty());
    assert!(out[0].iter().all(|e| e.value.to_string() == "10"));
    assert_eq!(out[1][0].key.row_str(), "p001-r0000");
}

#[test]
fn invalid_stack_fails_every_partition_before_scanning() {
    let settings = IteratorSetting::list_from_json(
        r#"[{"priority": 1, "name": "bad", "kind": "mapper", "options": {"f": "not a fn"}}]"#,
    )
    .unwrap();
    let scanner = scanner(2);
    let err = scanner.scan(partitions(2, 1, 1), &settings, &Range::all()).unwrap_err();
    assert!(matches!(err, ScanError::Compile { .. }));
    assert_eq!(scanner.metrics().snapshot().entries_emitted, 0);
}

#[cfg(feature = "deep_tests")]
#[test]
fn many_partitions_match_a_sequential_scan() {
    use script_iterators::config::build_stack;
    use script_iterators::iterator::{scan, SortedMapIterator};

    let settings = IteratorSetting::list_from_json(STACK).unwrap();
    let input = partitions(64, 50, 7);
    let engine = ScriptEngine::new();

    let expected: Vec<Vec<Entry>> = input
        .iter()
        .map(|p| {
            let mut stack = build_stack(Box::new(SortedMapIterator::new(p.clone())), &settings, &engine).unwrap();
            scan(&mut stack, &Range::all()).unwrap()
        })
        .collect();

    let scanner = scanner(8);
    let actual = scanner.scan(input, &settings, &Range::all()).unwrap();
    assert_eq!(actual, expected);

    let snap = scanner.metrics().snapshot();
    assert_eq!(snap.partitions_finished, 64);
    assert_eq!(snap.entries_read, 64 * 50 * 7);
    assert_eq!(snap.entries_emitted, 64 * 50);
}
