//! Match evaluation over a history log.
//!
//! Decides whether (and where) an expectation holds against the live value
//! log of a store. The log is always re-read by the caller per evaluation,
//! never snapshotted, so pending eventual assertions observe fresh history.

use serde_json::Value;

use crate::compare::{self, CompareFn};

/// Which comparison semantics a predicate uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CompareMode {
    /// Deep structural equality.
    Exact,
    /// Subset-key equality: every expected key must hold, extras ignored.
    Partial,
}

impl CompareMode {
    pub(crate) fn compare(self) -> CompareFn {
        match self {
            CompareMode::Exact => compare::exact_equals,
            CompareMode::Partial => compare::partial_equals,
        }
    }
}

/// A normalized expectation: a single value, or a list that must be covered.
#[derive(Clone, Debug)]
pub(crate) enum Expected {
    One(Value),
    All(Vec<Value>),
}

impl Expected {
    pub(crate) fn to_json(&self) -> String {
        let rendered = match self {
            Expected::One(value) => serde_json::to_string(value),
            Expected::All(values) => serde_json::to_string(values),
        };
        rendered.unwrap_or_else(|_| "<unrenderable>".to_owned())
    }
}

/// Returns the index of the first element matching `expected`, if any.
pub(crate) fn first_match(values: &[Value], expected: &Value, cmp: CompareFn) -> Option<usize> {
    values.iter().position(|v| cmp(v, expected))
}

/// Evaluates an expectation against the log.
///
/// With `anchor: Some(i)` the query is ordered: only the element at exactly
/// index `i` is consulted (strict adjacency, not "any later record").
/// With `anchor: None` the query is existential over the whole log.
/// List expectations are always coverage queries; the anchor is never set
/// for them.
pub(crate) fn is_match(
    values: &[Value],
    expected: &Expected,
    cmp: CompareFn,
    anchor: Option<usize>,
) -> bool {
    match expected {
        Expected::One(exp) => match anchor {
            Some(index) => values.get(index).is_some_and(|v| cmp(v, exp)),
            None => values.iter().any(|v| cmp(v, exp)),
        },
        Expected::All(exps) => compare::covers(values, exps, cmp),
    }
}
