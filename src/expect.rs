//! The fluent assertion surface over an instrumented store.
//!
//! `expect(&store)` opens a chain; predicates (`state`, `states`,
//! `dispatched`, and their partial variants) each add one assertion to it,
//! and the connectives (`eventually`, `then`/`next`, `not`) adjust how the
//! following predicates resolve. Synchronous predicates fail immediately
//! with a descriptive error; eventual ones resolve later, signalled through
//! [`notify`](Expect::notify) or by awaiting the chain.

use std::{
    cell::RefCell,
    fmt,
    future::{Future, IntoFuture},
    pin::Pin,
    rc::Rc,
};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::{
    Action, ExpectedAction, Result, State, Store,
    assert::Messages,
    chain::{self, ChainContext, Query},
    matcher::{CompareMode, Expected},
    store::LogKind,
};

/// Open an assertion chain over a store's history.
///
/// Each call creates an independent chain: concurrent pending chains on the
/// same store never share cursors or results.
///
/// ```ignore
/// expect(&store)
///     .dispatched("TRIGGER")?
///     .next()
///     .dispatched(json!({ "type": "LOADED", "firstName": "Jane" }))?;
/// ```
pub fn expect<S: State, A: Action>(store: &Store<S, A>) -> Expect<S, A> {
    Expect {
        store: store.clone(),
        ctx: Rc::new(RefCell::new(ChainContext::default())),
    }
}

/// One assertion chain. See [`expect`].
pub struct Expect<S: State, A: Action> {
    store: Store<S, A>,
    ctx: Rc<RefCell<ChainContext>>,
}

const STATE_MESSAGES: Messages = Messages {
    positive: "expected state history to contain the state",
    negative: "expected state history not to contain the state",
};

const STATE_LIKE_MESSAGES: Messages = Messages {
    positive: "expected state history to contain the partial state",
    negative: "expected state history not to contain the partial state",
};

const STATES_MESSAGES: Messages = Messages {
    positive: "expected state history to include all given states",
    negative: "expected state history not to include all given states",
};

const DISPATCHED_MESSAGES: Messages = Messages {
    positive: "expected action history to contain the action",
    negative: "expected action history not to contain the action",
};

const DISPATCHED_ALL_MESSAGES: Messages = Messages {
    positive: "expected action history to include all given actions",
    negative: "expected action history not to include all given actions",
};

impl<S: State, A: Action> Expect<S, A> {
    // ==================== Connectives ====================

    /// Switch the chain to asynchronous wait mode: predicates no longer
    /// fail for "not yet true" — they resolve on a later dispatch, and
    /// completion is observed via [`notify`](Self::notify) or `.await`.
    ///
    /// There is no built-in timeout: a condition that never becomes true
    /// leaves the chain pending. Wrap the awaited chain in
    /// `tokio::time::timeout` when a bound is needed.
    pub fn eventually(self) -> Self {
        self.ctx.borrow_mut().eventually = true;
        self
    }

    /// Mark the following predicate as cursor-relative: it must match the
    /// record immediately after the previous match — strict adjacency, not
    /// "anywhere later". Applies to exactly one predicate.
    pub fn then(self) -> Self {
        self.ctx.borrow_mut().ordered = true;
        self
    }

    /// Alias for [`then`](Self::then).
    pub fn next(self) -> Self {
        self.then()
    }

    /// Negate the following synchronous predicate. Combining with
    /// [`eventually`](Self::eventually) is a usage error — a wait for
    /// "never" cannot resolve.
    pub fn not(self) -> Self {
        self.ctx.borrow_mut().negate = true;
        self
    }

    // ==================== Predicates ====================

    /// Assert the state history contains `expected`, by deep equality.
    pub fn state(self, expected: impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(expected)?;
        self.verify(Query {
            log: LogKind::States,
            expected: Expected::One(value),
            mode: CompareMode::Exact,
            messages: STATE_MESSAGES,
        })
    }

    /// Assert the state history contains a state matching `expected`
    /// partially: every given key must hold, extra keys are ignored.
    pub fn state_like(self, expected: impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(expected)?;
        self.verify(Query {
            log: LogKind::States,
            expected: Expected::One(value),
            mode: CompareMode::Partial,
            messages: STATE_LIKE_MESSAGES,
        })
    }

    /// Assert every element of `expected` appears somewhere in the state
    /// history, by deep equality. Coverage is existential and unordered.
    pub fn states<I>(self, expected: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let values = collect_values(expected)?;
        self.verify(Query {
            log: LogKind::States,
            expected: Expected::All(values),
            mode: CompareMode::Exact,
            messages: STATES_MESSAGES,
        })
    }

    /// Like [`states`](Self::states), with partial equality per element.
    pub fn states_like<I>(self, expected: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let values = collect_values(expected)?;
        self.verify(Query {
            log: LogKind::States,
            expected: Expected::All(values),
            mode: CompareMode::Partial,
            messages: STATES_MESSAGES,
        })
    }

    /// Assert the action history contains a matching action. A bare string
    /// is shorthand for `{"type": <string>}`; matching is partial, so an
    /// expectation only needs to name the keys it cares about.
    pub fn dispatched(self, expected: impl Into<ExpectedAction>) -> Result<Self> {
        self.verify(Query {
            log: LogKind::Actions,
            expected: Expected::One(expected.into().into_value()),
            mode: CompareMode::Partial,
            messages: DISPATCHED_MESSAGES,
        })
    }

    /// Assert every given action appears somewhere in the action history
    /// (partial equality per element, unordered).
    pub fn dispatched_all<I>(self, expected: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<ExpectedAction>,
    {
        let values = expected
            .into_iter()
            .map(|item| item.into().into_value())
            .collect();
        self.verify(Query {
            log: LogKind::Actions,
            expected: Expected::All(values),
            mode: CompareMode::Partial,
            messages: DISPATCHED_ALL_MESSAGES,
        })
    }

    // ==================== Completion ====================

    /// Register a completion callback, fired exactly once when every
    /// predicate of the chain has passed — immediately if the chain is
    /// already satisfied. The conventional way to signal test completion
    /// from an eventual chain.
    pub fn notify(self, callback: impl FnOnce() + 'static) -> Self {
        chain::watch(&self.store, &self.ctx, callback);
        self
    }

    fn verify(self, query: Query) -> Result<Self> {
        chain::verify(&self.store, &self.ctx, query)?;
        Ok(self)
    }
}

fn collect_values<I>(expected: I) -> Result<Vec<Value>>
where
    I: IntoIterator,
    I::Item: Serialize,
{
    expected
        .into_iter()
        .map(|item| serde_json::to_value(item).map_err(Into::into))
        .collect()
}

/// Awaiting a chain resolves once every predicate has passed. Meant for
/// eventual chains; like [`notify`](Expect::notify), it never resolves for
/// a chain that never becomes satisfied.
impl<S: State, A: Action> IntoFuture for Expect<S, A> {
    type Output = ();
    type IntoFuture = Pin<Box<dyn Future<Output = ()>>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();
            chain::watch(&self.store, &self.ctx, move || {
                let _ = tx.send(());
            });
            let _ = rx.await;
        })
    }
}

impl<S: State, A: Action> fmt::Debug for Expect<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.ctx.borrow();
        f.debug_struct("Expect")
            .field("assertions", &ctx.assertions)
            .field("cursor", &ctx.cursor)
            .field("eventually", &ctx.eventually)
            .finish_non_exhaustive()
    }
}
