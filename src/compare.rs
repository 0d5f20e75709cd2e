//! Structural equality over JSON values: exact, partial (subset-key), and
//! list coverage.

use serde_json::Value;

pub(crate) type CompareFn = fn(&Value, &Value) -> bool;

/// Deep structural equality. Order-sensitive for arrays; every key must
/// match on both sides.
pub(crate) fn exact_equals(a: &Value, b: &Value) -> bool {
    a == b
}

/// Subset-key structural equality: for every key present in `expected`, the
/// corresponding key in `actual` must exist and be exactly equal. Extra keys
/// in `actual` are ignored. Keys named by `expected` compare deeply, not
/// partially. Non-object `expected` values fall back to exact equality.
pub(crate) fn partial_equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(key, value)| actual.get(key).is_some_and(|a| exact_equals(a, value))),
        _ => exact_equals(actual, expected),
    }
}

/// Coverage check: true iff every element of `expected` has at least one
/// match somewhere in `actual` under `cmp`. Existential per expected
/// element — matches may coincide; this is not a bijection or an ordering
/// check.
pub(crate) fn covers(actual: &[Value], expected: &[Value], cmp: CompareFn) -> bool {
    expected
        .iter()
        .all(|e| actual.iter().any(|a| cmp(a, e)))
}
