//! Array built-ins (§4.9): `asort`, `asorti`. `isarray` and
//! `length(arr)` are simple enough to live at the call site in the
//! evaluator.

use std::cmp::Ordering;

use indexmap::IndexMap;

use crate::value::{compare_values, Value};

/// Shared implementation for `asort`/`asorti`: sorts `entries` (already
/// chosen to be either the values or the keys of the source array) and
/// returns a freshly-indexed `1..n` array.
fn build_sorted(mut entries: Vec<Value>, convfmt: &str, ignorecase: bool) -> IndexMap<String, Value> {
    entries.sort_by(|a, b| compare_values(a, b, convfmt, ignorecase).then(Ordering::Equal));
    let mut out = IndexMap::new();
    for (i, v) in entries.into_iter().enumerate() {
        out.insert((i + 1).to_string(), v);
    }
    out
}

/// `asort(source[, dest])`: sorts the *values* of `source`.
pub fn asort(values: Vec<Value>, convfmt: &str, ignorecase: bool) -> IndexMap<String, Value> {
    build_sorted(values, convfmt, ignorecase)
}

/// `asorti(source[, dest])`: sorts the *indices* (keys, as strnums) of
/// `source`.
pub fn asorti(keys: Vec<String>, convfmt: &str, ignorecase: bool) -> IndexMap<String, Value> {
    let values = keys.into_iter().map(Value::strnum).collect();
    build_sorted(values, convfmt, ignorecase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asort_orders_numeric_values() {
        let vals = vec![Value::Number(3.0), Value::Number(1.0), Value::Number(2.0)];
        let sorted = asort(vals, "%.6g", false);
        let collected: Vec<&Value> = sorted.values().collect();
        assert_eq!(collected[0].to_number(), 1.0);
        assert_eq!(collected[2].to_number(), 3.0);
    }

    #[test]
    fn asorti_orders_keys() {
        let keys = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let sorted = asorti(keys, "%.6g", false);
        assert_eq!(sorted.get("1").unwrap().to_awk_string("%.6g"), "a");
        assert_eq!(sorted.get("3").unwrap().to_awk_string("%.6g"), "c");
    }
}
