use std::fmt::Write;

use rhai::{Array, Dynamic, ImmutableString, Map};

use crate::types::{Entry, Key, Value};

pub(crate) fn serialize(value: Dynamic) -> Value {
    let value = value.flatten();
    if value.is::<Value>() {
        return value.cast::<Value>();
    }
    Value::from(render(&value))
}

/// Canonical text of a script value.
///
/// Strings are quoted and escaped, arrays print as `[1, 2, 3]`, object maps as `#{"a": 1}` and
/// unit as `()`. Keys print through their `Display` form; a nested `Value` prints as its quoted
/// text.
pub fn render(value: &Dynamic) -> String {
    let mut out = String::new();
    render_into(value, &mut out);
    out
}

fn render_into(value: &Dynamic, out: &mut String) {
    if let Some(s) = value.read_lock::<ImmutableString>() {
        let _ = write!(out, "{:?}", s.as_str());
    } else if let Some(items) = value.read_lock::<Array>() {
        out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            render_into(item, out);
        }
        out.push(']');
    } else if let Some(map) = value.read_lock::<Map>() {
        out.push_str("#{");
        for (i, (k, v)) in map.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{:?}: ", k.as_str());
            render_into(v, out);
        }
        out.push('}');
    } else if let Some(key) = value.read_lock::<Key>() {
        let _ = write!(out, "{}", *key);
    } else if let Some(v) = value.read_lock::<Value>() {
        let _ = write!(out, "{:?}", v.as_str_lossy());
    } else if let Some(entry) = value.read_lock::<Entry>() {
        let _ = write!(out, "[{}, {:?}]", entry.key, entry.value.as_str_lossy());
    } else {
        let _ = write!(out, "{value:?}");
    }
}
