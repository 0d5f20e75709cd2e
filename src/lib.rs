//! # storespy
//!
//! An instrumented state-container for tests: every dispatch is recorded as
//! a `(action, state)` history record, and a fluent assertion engine lets
//! you declare what that history must look like — synchronously, eventually
//! (waiting for a future dispatch), or in causal order.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::Serialize;
//! use serde_json::json;
//! use storespy::{StoreBuilder, expect};
//!
//! #[derive(Clone, Debug, Serialize, Default)]
//! struct Counter { count: i64 }
//!
//! #[derive(Clone, Debug, Serialize)]
//! #[serde(tag = "type")]
//! enum CounterAction {
//!     #[serde(rename = "BUMP")]
//!     Bump,
//! }
//!
//! # fn main() -> storespy::Result {
//! let store = StoreBuilder::new(|state: &Counter, _action: &CounterAction| Counter {
//!     count: state.count + 1,
//! })
//! .build()?;
//!
//! store.dispatch(CounterAction::Bump)?;
//!
//! expect(&store)
//!     .dispatched("BUMP")?
//!     .state(json!({ "count": 1 }))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StoreBuilder`] | Configures reducer, middleware, and initial state |
//! | [`Store`] | The instrumented store: dispatch, state, history, subscribe |
//! | [`Reducer`] | Pure reduction `(state, action) -> state`, with its initial state |
//! | [`CombinedReducer`] | Named sub-reducers over a keyed JSON state |
//! | [`Middleware`] | Composable dispatch wrapper; sees every action first |
//! | [`HistoryRecord`] | One `(action, state)` pair per dispatch |
//! | [`Expect`] | A fluent assertion chain opened with [`expect`] |
//! | [`ExpectedAction`] | What a `dispatched` predicate looks for |
//!
//! ## Assertion vocabulary
//!
//! - `state(..)` / `state_like(..)` — the state history contains a state,
//!   by deep or subset-key equality.
//! - `states(..)` / `states_like(..)` — every listed state appears somewhere
//!   in the history (unordered coverage).
//! - `dispatched(..)` / `dispatched_all(..)` — same over the action history;
//!   a bare string matches the `type` discriminant.
//! - `eventually()` — resolve asynchronously instead of failing now:
//!
//! ```ignore
//! expect(&store)
//!     .eventually()
//!     .dispatched("LOADED")?
//!     .notify(done);
//! // or: expect(&store).eventually().dispatched("LOADED")?.await
//! ```
//!
//! - `then()` / `next()` — the following predicate must match the record
//!   immediately after the previous match (strict adjacency):
//!
//! ```ignore
//! expect(&store)
//!     .dispatched("TRIGGER")?
//!     .next()
//!     .dispatched("LOADED")?;
//! ```
//!
//! ## Note
//!
//! Store handles use `Rc` internally and are `!Send`. This is intentional —
//! they are designed for single-threaded test contexts; async interleaving
//! (delayed dispatches, awaited chains) runs on a current-thread runtime
//! with `tokio::task::LocalSet`.
//!
//! Eventual chains carry no built-in timeout: a condition that never becomes
//! true leaves its wait pending forever. Impose a bound externally when you
//! need one, e.g. `tokio::time::timeout(limit, chain)`.

mod action;
mod assert;
mod chain;
mod compare;
mod error;
mod expect;
mod matcher;
mod middleware;
mod record;
mod reducer;
mod state;
mod store;
mod wait;

pub use action::{Action, ExpectedAction, INIT_TYPE, RecordedAction};
pub use error::Error;
pub use expect::{Expect, expect};
pub use middleware::{Middleware, Next};
pub use record::HistoryRecord;
pub use reducer::{CombinedReducer, Reducer, Seeded, seeded};
pub use state::State;
pub use store::{Store, StoreBuilder, Subscription};

/// Convenience alias for `Result<T, storespy::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
