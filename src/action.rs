use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use crate::Result;

/// Reserved `type` discriminant of the synthetic record appended at store
/// creation, before any real dispatch.
pub const INIT_TYPE: &str = "@@INIT";

/// Contract for actions dispatched through an instrumented store.
///
/// Actions must be `Clone` (they are logged as well as forwarded through the
/// middleware chain), `Serialize` (matching works on their JSON form, so
/// partial equality applies uniformly to any action type), and `Debug` for
/// diagnostics. Any type meeting these bounds is an action; a tagged enum
/// with a `type` discriminant is the conventional shape:
///
/// ```rust
/// use serde::Serialize;
///
/// #[derive(Clone, Debug, Serialize)]
/// #[serde(tag = "type")]
/// enum CounterAction {
///     #[serde(rename = "INCREMENT")]
///     Increment,
///     #[serde(rename = "ADD")]
///     Add { amount: i64 },
/// }
/// ```
pub trait Action: Clone + fmt::Debug + Serialize + 'static {}

impl<T> Action for T where T: Clone + fmt::Debug + Serialize + 'static {}

/// One entry of the action log: either the synthetic initialization marker
/// or an action that was actually dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAction<A> {
    /// The store-creation record. Serializes as `{"type": "@@INIT"}` so it
    /// is matchable like any other action.
    Init,
    /// A real dispatch.
    Dispatched(A),
}

impl<A: Action> RecordedAction<A> {
    /// Returns true for the synthetic store-creation record.
    pub fn is_init(&self) -> bool {
        matches!(self, RecordedAction::Init)
    }

    /// Returns the dispatched action, if this is not the init record.
    pub fn dispatched(&self) -> Option<&A> {
        match self {
            RecordedAction::Init => None,
            RecordedAction::Dispatched(action) => Some(action),
        }
    }

    pub(crate) fn to_value(&self) -> Result<Value> {
        match self {
            RecordedAction::Init => Ok(json!({ "type": INIT_TYPE })),
            RecordedAction::Dispatched(action) => Ok(serde_json::to_value(action)?),
        }
    }
}

/// What a `dispatched` predicate is looking for.
///
/// Normalized once at predicate entry: a bare string is shorthand for
/// `{"type": <string>}` and matches any action carrying that discriminant,
/// while a JSON value matches partially (every given key must hold).
///
/// ```ignore
/// expect(&store).dispatched("TRIGGER")?;
/// expect(&store).dispatched(json!({ "type": "LOADED", "firstName": "Jane" }))?;
/// expect(&store).dispatched(ExpectedAction::of(&MyAction::Trigger)?)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedAction {
    /// Match on the `type` discriminant only.
    Type(String),
    /// Partial match against the action's JSON form.
    Value(Value),
}

impl ExpectedAction {
    /// Build an expectation from a typed action value.
    pub fn of(action: &impl Serialize) -> Result<Self> {
        Ok(ExpectedAction::Value(serde_json::to_value(action)?))
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            ExpectedAction::Type(name) => json!({ "type": name }),
            ExpectedAction::Value(value) => value,
        }
    }
}

// Allow &str to be used directly as a type-discriminant expectation
impl From<&str> for ExpectedAction {
    fn from(name: &str) -> Self {
        ExpectedAction::Type(name.to_owned())
    }
}

// Allow String to be used as a type-discriminant expectation
impl From<String> for ExpectedAction {
    fn from(name: String) -> Self {
        ExpectedAction::Type(name)
    }
}

// Allow a JSON value to be used as a partial (or full) action expectation
impl From<Value> for ExpectedAction {
    fn from(value: Value) -> Self {
        ExpectedAction::Value(value)
    }
}
