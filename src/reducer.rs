use std::rc::Rc;

use serde_json::Value;

/// A pure reduction over store state.
///
/// A reducer owns its initial state (the seed used when the store is built
/// without an explicit one) and computes the next state for each dispatched
/// action without side effects.
///
/// Plain closures are reducers whenever the state type has a `Default`:
///
/// ```rust
/// # use storespy::Reducer;
/// #[derive(Clone, Debug, Default, serde::Serialize)]
/// struct Counter { count: i64 }
///
/// let bump = |state: &Counter, _action: &()| Counter { count: state.count + 1 };
/// # fn takes_reducer(_r: impl Reducer<Counter, ()>) {}
/// # takes_reducer(bump);
/// ```
pub trait Reducer<S, A> {
    /// The state the store starts from when none is supplied explicitly.
    fn initial_state(&self) -> S;

    /// Compute the next state. Must be pure: no dispatching, no mutation of
    /// anything but the returned value.
    fn reduce(&self, state: &S, action: &A) -> S;
}

impl<S, A, F> Reducer<S, A> for F
where
    S: Default,
    F: Fn(&S, &A) -> S,
{
    fn initial_state(&self) -> S {
        S::default()
    }

    fn reduce(&self, state: &S, action: &A) -> S {
        self(state, action)
    }
}

/// Pairs a reduction closure with an explicit initial state, for state types
/// whose starting point is not (or is not the same as) their `Default`.
pub struct Seeded<S, F> {
    initial: S,
    reduce: F,
}

/// Build a reducer from an initial state and a reduction closure.
pub fn seeded<S, F>(initial: S, reduce: F) -> Seeded<S, F> {
    Seeded { initial, reduce }
}

impl<S, A, F> Reducer<S, A> for Seeded<S, F>
where
    S: Clone,
    F: Fn(&S, &A) -> S,
{
    fn initial_state(&self) -> S {
        self.initial.clone()
    }

    fn reduce(&self, state: &S, action: &A) -> S {
        (self.reduce)(state, action)
    }
}

/// Combines named sub-reducers into one reducer over a keyed JSON state.
///
/// The top-level state is an object whose fields are reduced independently:
/// each slice sees only its own field and every action. The combined initial
/// state is assembled from the slices' initial states.
///
/// ```ignore
/// let root = CombinedReducer::new()
///     .slice("profile", seeded(json!({ "loaded": false }), profile_reducer))
///     .slice("session", seeded(json!({ "user": null }), session_reducer));
/// let store = StoreBuilder::new(root).build()?;
/// ```
pub struct CombinedReducer<A> {
    slices: Vec<(String, Rc<dyn Reducer<Value, A>>)>,
}

impl<A> CombinedReducer<A> {
    pub fn new() -> Self {
        Self { slices: Vec::new() }
    }

    /// Add a named slice. Slices are reduced in insertion order.
    pub fn slice(
        mut self,
        name: impl Into<String>,
        reducer: impl Reducer<Value, A> + 'static,
    ) -> Self {
        self.slices.push((name.into(), Rc::new(reducer)));
        self
    }
}

impl<A> Default for CombinedReducer<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Reducer<Value, A> for CombinedReducer<A> {
    fn initial_state(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (name, reducer) in &self.slices {
            map.insert(name.clone(), reducer.initial_state());
        }
        Value::Object(map)
    }

    fn reduce(&self, state: &Value, action: &A) -> Value {
        let mut map = serde_json::Map::new();
        for (name, reducer) in &self.slices {
            // A slice that has no field yet (e.g. a partial explicit seed)
            // starts from its own initial state.
            let current = state
                .get(name)
                .cloned()
                .unwrap_or_else(|| reducer.initial_state());
            map.insert(name.clone(), reducer.reduce(&current, action));
        }
        Value::Object(map)
    }
}
