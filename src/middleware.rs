use crate::{Action, Result, State, Store};

/// A composable wrapper around dispatch.
///
/// Middleware see every action before the reducer runs and decide what to do
/// with it: forward it via [`Next::call`], transform it, swallow it, or fan
/// out extra dispatches through the store handle (thunk-style re-entrant
/// dispatch is allowed). Middleware run in registration order; the store's
/// internal history recorder always runs last, so it observes actions after
/// every user middleware has had its say.
///
/// ```ignore
/// struct Promote;
///
/// impl Middleware<AppState, AppAction> for Promote {
///     fn dispatch(
///         &self,
///         _store: &Store<AppState, AppAction>,
///         next: Next<'_, AppState, AppAction>,
///         action: AppAction,
///     ) -> Result<()> {
///         match action {
///             AppAction::Draft(text) => next.call(AppAction::Publish(text)),
///             other => next.call(other),
///         }
///     }
/// }
/// ```
pub trait Middleware<S: State, A: Action> {
    /// Handle one action. Call `next.call(action)` to forward it down the
    /// chain; not calling it swallows the action (nothing is reduced or
    /// recorded). Errors propagate to the `dispatch` caller unchanged.
    fn dispatch(&self, store: &Store<S, A>, next: Next<'_, S, A>, action: A) -> Result<()>;
}

/// Continuation handle for the rest of the dispatch chain.
///
/// Consumed by [`call`](Self::call); each middleware invocation gets exactly
/// one shot at forwarding.
pub struct Next<'a, S: State, A: Action> {
    store: &'a Store<S, A>,
    index: usize,
}

impl<'a, S: State, A: Action> Next<'a, S, A> {
    pub(crate) fn new(store: &'a Store<S, A>, index: usize) -> Self {
        Self { store, index }
    }

    /// Forward an action to the next stage of the chain (the following
    /// middleware, or the reducer at the end).
    pub fn call(self, action: A) -> Result<()> {
        self.store.dispatch_from(self.index, action)
    }
}

impl<S: State, A: Action> std::fmt::Debug for Next<'_, S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("index", &self.index).finish()
    }
}
