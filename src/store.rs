use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use serde_json::Value;

use crate::{
    Action, HistoryRecord, Middleware, Next, RecordedAction, Reducer, Result, State,
};

/// Builder for an instrumented [`Store`].
///
/// Recognized options: the reducer (a closure, a [`seeded`](crate::seeded)
/// reducer, or a [`CombinedReducer`](crate::CombinedReducer) over keyed
/// state), zero or more middleware (applied in the order given), and an
/// optional initial state overriding the reducer's own.
///
/// ```ignore
/// let store = StoreBuilder::new(profile_reducer)
///     .middleware(logger)
///     .initial_state(Profile::default())
///     .build()?;
/// ```
pub struct StoreBuilder<S: State, A: Action> {
    reducer: Rc<dyn Reducer<S, A>>,
    middleware: Vec<Rc<dyn Middleware<S, A>>>,
    initial_state: Option<S>,
}

impl<S: State, A: Action> StoreBuilder<S, A> {
    pub fn new(reducer: impl Reducer<S, A> + 'static) -> Self {
        Self {
            reducer: Rc::new(reducer),
            middleware: Vec::new(),
            initial_state: None,
        }
    }

    /// Append one middleware to the chain. May be called repeatedly; the
    /// history recorder is always appended after all of them.
    pub fn middleware(mut self, middleware: impl Middleware<S, A> + 'static) -> Self {
        self.middleware.push(Rc::new(middleware));
        self
    }

    /// Seed the store with an explicit initial state instead of the
    /// reducer's own.
    pub fn initial_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Build the store and seed its history with the initialization record,
    /// before any subscriber can exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialize`](crate::Error::Serialize) if the initial
    /// state cannot be serialized for matching.
    pub fn build(mut self) -> Result<Store<S, A>> {
        self.middleware.push(Rc::new(Recorder));
        let state = self
            .initial_state
            .unwrap_or_else(|| self.reducer.initial_state());
        let record = HistoryRecord::new(RecordedAction::Init, state.clone())?;
        Ok(Store {
            inner: Rc::new(RefCell::new(Inner {
                state,
                history: vec![record],
            })),
            reducer: self.reducer,
            middleware: Rc::from(self.middleware),
            subscribers: Rc::new(RefCell::new(SubscriberSet::default())),
        })
    }
}

impl<S: State, A: Action> fmt::Debug for StoreBuilder<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreBuilder")
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

struct Inner<S: State, A: Action> {
    state: S,
    history: Vec<HistoryRecord<S, A>>,
}

#[derive(Default)]
struct SubscriberSet {
    next_id: u64,
    entries: Vec<(u64, Rc<dyn Fn()>)>,
}

impl SubscriberSet {
    fn remove(&mut self, id: u64) {
        self.entries.retain(|(entry_id, _)| *entry_id != id);
    }
}

/// Which of the two parallel logs a query reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LogKind {
    Actions,
    States,
}

/// An instrumented store: a state container whose every dispatch is
/// recorded.
///
/// Each dispatch runs the middleware chain, applies the reducer, appends one
/// [`HistoryRecord`] (action and resulting state together), and then
/// notifies subscribers in registration order. The logs are append-only and
/// written only by the store itself; any number of pending assertion chains
/// read them concurrently.
///
/// `Store` is a cheap `Rc`-backed handle — clone it freely. Handles are
/// intentionally `!Send`: the store is designed for single-threaded test
/// contexts, with async interleaving driven by a current-thread runtime.
pub struct Store<S: State, A: Action> {
    inner: Rc<RefCell<Inner<S, A>>>,
    reducer: Rc<dyn Reducer<S, A>>,
    middleware: Rc<[Rc<dyn Middleware<S, A>>]>,
    subscribers: Rc<RefCell<SubscriberSet>>,
}

impl<S: State, A: Action> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            reducer: self.reducer.clone(),
            middleware: self.middleware.clone(),
            subscribers: self.subscribers.clone(),
        }
    }
}

impl<S: State, A: Action> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("history", &self.inner.borrow().history.len())
            .field("subscribers", &self.subscribers.borrow().entries.len())
            .finish_non_exhaustive()
    }
}

impl<S: State, A: Action> Store<S, A> {
    /// Returns a copy of the current state.
    pub fn get_state(&self) -> S {
        self.inner.borrow().state.clone()
    }

    /// Dispatch an action through the middleware chain and the reducer.
    ///
    /// # Errors
    ///
    /// Propagates middleware errors unchanged (after logging a diagnostic
    /// hint — the usual cause is a required middleware that was not
    /// installed), and [`Error::Serialize`](crate::Error::Serialize) if the
    /// action or the resulting state cannot be serialized for matching. On
    /// error nothing is appended to the history.
    pub fn dispatch(&self, action: A) -> Result<()> {
        self.dispatch_from(0, action).inspect_err(|e| {
            tracing::error!(error = %e, "dispatch failed; was a required middleware installed?");
        })
    }

    pub(crate) fn dispatch_from(&self, index: usize, action: A) -> Result<()> {
        match self.middleware.get(index).cloned() {
            Some(middleware) => middleware.dispatch(self, Next::new(self, index + 1), action),
            None => {
                let next_state = {
                    let inner = self.inner.borrow();
                    self.reducer.reduce(&inner.state, &action)
                };
                self.inner.borrow_mut().state = next_state;
                Ok(())
            }
        }
    }

    /// Register a callback invoked (with no arguments) after every recorded
    /// dispatch. Callbacks fire in registration order, only after the full
    /// history record is appended.
    pub fn subscribe(&self, callback: impl Fn() + 'static) -> Subscription {
        let mut set = self.subscribers.borrow_mut();
        let id = set.next_id;
        set.next_id += 1;
        set.entries.push((id, Rc::new(callback)));
        Subscription {
            set: Rc::downgrade(&self.subscribers),
            id,
        }
    }

    /// Returns the action log, index-aligned with [`states`](Self::states).
    /// Index 0 is the synthetic initialization record.
    pub fn actions(&self) -> Vec<RecordedAction<A>> {
        self.inner
            .borrow()
            .history
            .iter()
            .map(|record| record.action().clone())
            .collect()
    }

    /// Returns the state log, index-aligned with
    /// [`actions`](Self::actions). Index 0 is the initial state snapshot.
    pub fn states(&self) -> Vec<S> {
        self.inner
            .borrow()
            .history
            .iter()
            .map(|record| record.state().clone())
            .collect()
    }

    /// Returns the full history, one record per dispatch.
    pub fn history(&self) -> Vec<HistoryRecord<S, A>> {
        self.inner.borrow().history.clone()
    }

    /// Re-reads the requested log in its JSON form. Called per evaluation so
    /// pending eventual assertions always see fresh history.
    pub(crate) fn log_values(&self, log: LogKind) -> Vec<Value> {
        self.inner
            .borrow()
            .history
            .iter()
            .map(|record| match log {
                LogKind::Actions => record.action_value().clone(),
                LogKind::States => record.state_value().clone(),
            })
            .collect()
    }

    /// Append one history record and notify subscribers. Only the recorder
    /// middleware calls this, after the rest of the chain has finished.
    pub(crate) fn commit(&self, action: RecordedAction<A>) -> Result<()> {
        let record = HistoryRecord::new(action, self.get_state())?;
        self.inner.borrow_mut().history.push(record);
        self.notify_subscribers();
        Ok(())
    }

    fn notify_subscribers(&self) {
        // Snapshot first: a callback may unsubscribe (itself or others) or
        // dispatch re-entrantly while the list is being walked.
        let snapshot: Vec<Rc<dyn Fn()>> = self
            .subscribers
            .borrow()
            .entries
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in snapshot {
            callback();
        }
    }
}

/// Handle for removing a subscriber registered with
/// [`Store::subscribe`].
///
/// `unsubscribe` removes exactly that callback and is idempotent. Dropping
/// the handle without calling it leaves the callback registered. History is
/// never affected either way.
#[derive(Clone)]
pub struct Subscription {
    set: Weak<RefCell<SubscriberSet>>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(set) = self.set.upgrade() {
            set.borrow_mut().remove(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// The history-recording middleware, appended as the last link of every
/// chain so it observes the action after all user middleware and reads the
/// state after the reducer has run.
struct Recorder;

impl<S: State, A: Action> Middleware<S, A> for Recorder {
    fn dispatch(&self, store: &Store<S, A>, next: Next<'_, S, A>, action: A) -> Result<()> {
        let recorded = action.clone();
        next.call(action)?;
        store.commit(RecordedAction::Dispatched(recorded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde::Serialize;
    use std::cell::Cell;

    #[derive(Clone, Debug, Serialize, PartialEq)]
    #[serde(tag = "type")]
    enum CounterAction {
        #[serde(rename = "BUMP")]
        Bump,
        #[serde(rename = "ADD")]
        Add { amount: i64 },
        #[serde(rename = "POISON")]
        Poison,
    }

    #[derive(Clone, Debug, Serialize, PartialEq, Default)]
    struct Counter {
        count: i64,
    }

    fn counter(state: &Counter, action: &CounterAction) -> Counter {
        match action {
            CounterAction::Bump => Counter {
                count: state.count + 1,
            },
            CounterAction::Add { amount } => Counter {
                count: state.count + amount,
            },
            CounterAction::Poison => state.clone(),
        }
    }

    fn store() -> Store<Counter, CounterAction> {
        StoreBuilder::new(counter).build().unwrap()
    }

    #[test]
    fn build_seeds_the_init_record() {
        let store = store();
        assert_eq!(store.actions().len(), 1);
        assert!(store.actions()[0].is_init());
        assert_eq!(store.states()[0], Counter { count: 0 });
    }

    #[test]
    fn explicit_initial_state_overrides_the_reducer() {
        let store = StoreBuilder::new(counter)
            .initial_state(Counter { count: 10 })
            .build()
            .unwrap();
        assert_eq!(store.get_state(), Counter { count: 10 });
        store.dispatch(CounterAction::Bump).unwrap();
        assert_eq!(store.get_state(), Counter { count: 11 });
    }

    #[test]
    fn logs_stay_index_aligned() {
        let store = store();
        store.dispatch(CounterAction::Bump).unwrap();
        store.dispatch(CounterAction::Add { amount: 5 }).unwrap();

        let actions = store.actions();
        let states = store.states();
        assert_eq!(actions.len(), states.len());
        assert_eq!(states[1], Counter { count: 1 });
        assert_eq!(states[2], Counter { count: 6 });
        assert_eq!(
            actions[2].dispatched(),
            Some(&CounterAction::Add { amount: 5 })
        );
    }

    #[test]
    fn replaying_actions_reproduces_states() {
        let store = store();
        store.dispatch(CounterAction::Bump).unwrap();
        store.dispatch(CounterAction::Add { amount: 3 }).unwrap();
        store.dispatch(CounterAction::Bump).unwrap();

        let replay = StoreBuilder::new(counter).build().unwrap();
        for action in store.actions().iter().filter_map(|a| a.dispatched()) {
            replay.dispatch(action.clone()).unwrap();
        }
        assert_eq!(replay.states(), store.states());
    }

    #[test]
    fn subscribers_fire_in_registration_order_after_append() {
        let store = store();
        let order: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));

        let seen = Rc::new(Cell::new(0usize));
        let first = {
            let order = order.clone();
            let seen = seen.clone();
            let store = store.clone();
            move || {
                order.borrow_mut().push(1);
                // Both logs are already consistent when a subscriber runs.
                seen.set(store.actions().len());
                assert_eq!(store.actions().len(), store.states().len());
            }
        };
        let second = {
            let order = order.clone();
            move || order.borrow_mut().push(2)
        };
        let _sub1 = store.subscribe(first);
        let _sub2 = store.subscribe(second);

        store.dispatch(CounterAction::Bump).unwrap();
        assert_eq!(*order.borrow(), vec![1, 2]);
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn unsubscribe_removes_exactly_one_callback_idempotently() {
        let store = store();
        let hits = Rc::new(Cell::new(0));
        let sub = {
            let hits = hits.clone();
            store.subscribe(move || hits.set(hits.get() + 1))
        };
        store.dispatch(CounterAction::Bump).unwrap();
        assert_eq!(hits.get(), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        store.dispatch(CounterAction::Bump).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn unsubscribing_inside_a_notification_is_safe() {
        let store = store();
        let hits = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let sub = {
            let hits = hits.clone();
            let slot = slot.clone();
            store.subscribe(move || {
                hits.set(hits.get() + 1);
                if let Some(sub) = slot.borrow_mut().take() {
                    sub.unsubscribe();
                }
            })
        };
        *slot.borrow_mut() = Some(sub);

        store.dispatch(CounterAction::Bump).unwrap();
        store.dispatch(CounterAction::Bump).unwrap();
        assert_eq!(hits.get(), 1);
    }

    // ==================== middleware ====================

    struct Doubler;
    impl Middleware<Counter, CounterAction> for Doubler {
        fn dispatch(
            &self,
            _store: &Store<Counter, CounterAction>,
            next: Next<'_, Counter, CounterAction>,
            action: CounterAction,
        ) -> Result<()> {
            match action {
                CounterAction::Add { amount } => next.call(CounterAction::Add {
                    amount: amount * 2,
                }),
                other => next.call(other),
            }
        }
    }

    struct Swallow;
    impl Middleware<Counter, CounterAction> for Swallow {
        fn dispatch(
            &self,
            _store: &Store<Counter, CounterAction>,
            next: Next<'_, Counter, CounterAction>,
            action: CounterAction,
        ) -> Result<()> {
            match action {
                CounterAction::Poison => Ok(()),
                other => next.call(other),
            }
        }
    }

    struct Failing;
    impl Middleware<Counter, CounterAction> for Failing {
        fn dispatch(
            &self,
            _store: &Store<Counter, CounterAction>,
            next: Next<'_, Counter, CounterAction>,
            action: CounterAction,
        ) -> Result<()> {
            match action {
                CounterAction::Poison => Err(Error::external(std::io::Error::other("rejected"))),
                other => next.call(other),
            }
        }
    }

    /// Dispatches a follow-up action through the store handle, thunk-style.
    struct FanOut;
    impl Middleware<Counter, CounterAction> for FanOut {
        fn dispatch(
            &self,
            store: &Store<Counter, CounterAction>,
            next: Next<'_, Counter, CounterAction>,
            action: CounterAction,
        ) -> Result<()> {
            if matches!(action, CounterAction::Bump) {
                store.dispatch(CounterAction::Add { amount: 10 })?;
            }
            next.call(action)
        }
    }

    #[test]
    fn recorder_sees_the_action_after_user_middleware() {
        let store = StoreBuilder::new(counter).middleware(Doubler).build().unwrap();
        store.dispatch(CounterAction::Add { amount: 3 }).unwrap();
        assert_eq!(store.get_state(), Counter { count: 6 });
        // The recorded action is the transformed one.
        assert_eq!(
            store.actions()[1].dispatched(),
            Some(&CounterAction::Add { amount: 6 })
        );
    }

    #[test]
    fn swallowed_actions_are_not_recorded() {
        let store = StoreBuilder::new(counter).middleware(Swallow).build().unwrap();
        store.dispatch(CounterAction::Poison).unwrap();
        assert_eq!(store.actions().len(), 1);
        store.dispatch(CounterAction::Bump).unwrap();
        assert_eq!(store.actions().len(), 2);
    }

    #[test]
    fn middleware_errors_propagate_and_leave_history_untouched() {
        let store = StoreBuilder::new(counter).middleware(Failing).build().unwrap();
        let err = store.dispatch(CounterAction::Poison).unwrap_err();
        assert!(matches!(err, Error::External(_)));
        assert_eq!(store.actions().len(), 1);
        assert_eq!(store.states().len(), 1);
    }

    #[test]
    fn reentrant_dispatch_records_in_completion_order() {
        let store = StoreBuilder::new(counter).middleware(FanOut).build().unwrap();
        store.dispatch(CounterAction::Bump).unwrap();

        // The fanned-out Add completes (and records) before the outer Bump.
        let actions = store.actions();
        assert_eq!(
            actions[1].dispatched(),
            Some(&CounterAction::Add { amount: 10 })
        );
        assert_eq!(actions[2].dispatched(), Some(&CounterAction::Bump));
        assert_eq!(actions.len(), store.states().len());
        assert_eq!(store.get_state(), Counter { count: 11 });
    }

    #[test]
    fn log_values_reflect_live_history() {
        let store = store();
        assert_eq!(store.log_values(LogKind::Actions).len(), 1);
        store.dispatch(CounterAction::Bump).unwrap();
        assert_eq!(store.log_values(LogKind::Actions).len(), 2);
        assert_eq!(
            store.log_values(LogKind::States)[1],
            serde_json::json!({ "count": 1 })
        );
    }
}
