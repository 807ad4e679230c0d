//! Types and functions every script can use.
//!
//! | Script item | Meaning |
//! |---|---|
//! | `Entry` | the key/value pair handed to predicates, reducers and mappers; `kv.key`, `kv.value`, `kv[0]`, `kv[1]` |
//! | `Key` | `row`, `column_family`, `column_qualifier`, `visibility` (strings), `timestamp` (int), `deleted` (bool) |
//! | `Value` | `text` (string), `bytes` (blob), `len` (int) |
//! | `key(row)`, `key(row, cf)`, `key(row, cf, cq)`, `key(row, cf, cq, vis, ts)` | build a key |
//! | `value(text)`, `value(blob)` | build a value that is written back byte for byte |
//! | `entry(key, value)` | build an entry |
//!
//! A mapper that returns `[key(...), v]` rewrites the entry's key.

use rhai::{Blob, Dynamic, Engine, EvalAltResult, INT};

use crate::types::{Entry, Key, Value};

pub(crate) fn register(engine: &mut Engine) {
    register_key(engine);
    register_value(engine);
    register_entry(engine);
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn register_key(engine: &mut Engine) {
    engine
        .register_type_with_name::<Key>("Key")
        .register_fn("key", |row: &str| Key::new(row, "", ""))
        .register_fn("key", |row: &str, cf: &str| Key::new(row, cf, ""))
        .register_fn("key", |row: &str, cf: &str, cq: &str| Key::new(row, cf, cq))
        .register_fn("key", |row: &str, cf: &str, cq: &str, vis: &str, ts: INT| {
            Key::new(row, cf, cq).with_visibility(vis).with_timestamp(ts)
        })
        .register_get("row", |k: &mut Key| text(k.row()))
        .register_get("column_family", |k: &mut Key| text(k.column_family()))
        .register_get("column_qualifier", |k: &mut Key| text(k.column_qualifier()))
        .register_get("visibility", |k: &mut Key| text(k.column_visibility()))
        .register_get("timestamp", |k: &mut Key| k.timestamp() as INT)
        .register_get("deleted", |k: &mut Key| k.is_deleted())
        .register_fn("==", |a: &mut Key, b: Key| *a == b)
        .register_fn("!=", |a: &mut Key, b: Key| *a != b)
        .register_fn("to_string", |k: &mut Key| k.to_string())
        .register_fn("to_debug", |k: &mut Key| format!("Key({k})"));
}

fn register_value(engine: &mut Engine) {
    engine
        .register_type_with_name::<Value>("Value")
        .register_fn("value", |s: &str| Value::from(s))
        .register_fn("value", |b: Blob| Value::new(b))
        .register_get("text", |v: &mut Value| text(v.get()))
        .register_get("bytes", |v: &mut Value| -> Blob { v.get().to_vec() })
        .register_get("len", |v: &mut Value| v.len() as INT)
        .register_fn("==", |a: &mut Value, b: Value| *a == b)
        .register_fn("!=", |a: &mut Value, b: Value| *a != b)
        .register_fn("to_string", |v: &mut Value| v.to_string())
        .register_fn("to_debug", |v: &mut Value| format!("Value({:?})", v.as_str_lossy()));
}

fn register_entry(engine: &mut Engine) {
    engine
        .register_type_with_name::<Entry>("Entry")
        .register_fn("entry", |key: Key, value: Value| Entry { key, value })
        .register_get("key", |e: &mut Entry| e.key.clone())
        .register_get("value", |e: &mut Entry| e.value.clone())
        .register_indexer_get(
            |e: &mut Entry, index: INT| -> Result<Dynamic, Box<EvalAltResult>> {
                match index {
                    0 => Ok(Dynamic::from(e.key.clone())),
                    1 => Ok(Dynamic::from(e.value.clone())),
                    _ => Err(format!("entry index {index} out of bounds (0 or 1)").into()),
                }
            },
        )
        .register_fn("to_string", |e: &mut Entry| format!("[{}, {}]", e.key, e.value))
        .register_fn("to_debug", |e: &mut Entry| {
            format!("Entry({}, {:?})", e.key, e.value.as_str_lossy())
        });
}
