use serde_json::Value;

use crate::{Action, RecordedAction, Result, State};

/// One entry of a store's history: the action that was dispatched and the
/// state the reducer produced for it.
///
/// Records are appended atomically, one per dispatch, with index 0 holding
/// the synthetic initialization snapshot. The JSON forms of both halves are
/// captured at append time, so match evaluation never re-serializes and a
/// serialization failure surfaces from `dispatch`, not from inside a
/// pending wait.
#[derive(Debug, Clone)]
pub struct HistoryRecord<S: State, A: Action> {
    action: RecordedAction<A>,
    state: S,
    action_value: Value,
    state_value: Value,
}

impl<S: State, A: Action> HistoryRecord<S, A> {
    pub(crate) fn new(action: RecordedAction<A>, state: S) -> Result<Self> {
        let action_value = action.to_value()?;
        let state_value = serde_json::to_value(&state)?;
        Ok(Self {
            action,
            state,
            action_value,
            state_value,
        })
    }

    /// Returns the recorded action.
    #[inline]
    pub fn action(&self) -> &RecordedAction<A> {
        &self.action
    }

    /// Returns the state the reducer produced for this action.
    #[inline]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Returns the action's JSON form, as used for matching.
    #[inline]
    pub(crate) fn action_value(&self) -> &Value {
        &self.action_value
    }

    /// Returns the state's JSON form, as used for matching.
    #[inline]
    pub(crate) fn state_value(&self) -> &Value {
        &self.state_value
    }
}
