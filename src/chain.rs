//! Per-expression chain state and predicate evaluation.
//!
//! Every fluent expression owns one [`ChainContext`], shared by reference
//! among the closures its predicates register — never process-wide state.
//! A predicate reserves a slot, consumes the one-shot mode flags, evaluates
//! through the wait strategy and the match evaluator, and maintains the
//! cursor that anchors a later `then`/`next` query.

use std::{cell::RefCell, rc::Rc};

use crate::{
    Action, Error, Result, State, Store,
    assert::{self, Messages},
    matcher::{self, CompareMode, Expected},
    store::LogKind,
    wait,
};

/// Mutable state threaded through one assertion chain.
#[derive(Debug, Default)]
pub(crate) struct ChainContext {
    /// Index of the last matched record; `None` until a predicate matches.
    /// An ordered query against an unpositioned chain anchors at index 0.
    pub cursor: Option<usize>,
    /// One slot per declared predicate, `false` until it resolves. The
    /// chain is satisfied iff every slot is true.
    pub assertions: Vec<bool>,
    /// Resolve predicates asynchronously (sticky once set).
    pub eventually: bool,
    /// The next predicate is cursor-relative; cleared when consumed.
    pub ordered: bool,
    /// The next synchronous assertion is negated; cleared when consumed.
    pub negate: bool,
}

impl ChainContext {
    pub(crate) fn satisfied(&self) -> bool {
        self.assertions.iter().all(|slot| *slot)
    }

    fn anchor(&self) -> usize {
        self.cursor.map_or(0, |index| index + 1)
    }
}

/// One predicate's fully-normalized question.
pub(crate) struct Query {
    pub log: LogKind,
    pub expected: Expected,
    pub mode: CompareMode,
    pub messages: Messages,
}

/// Evaluate one predicate against the store, recording its outcome in the
/// chain.
///
/// Synchronous chains assert immediately: the slot records the (possibly
/// negated) outcome and a failure surfaces as
/// [`Error::AssertionFailed`]. Eventual chains never fail here — the slot
/// resolves later, on the store notification that first satisfies the
/// query. Either way the cursor is left at the first index matching this
/// predicate, ready to anchor a following `then`/`next`.
pub(crate) fn verify<S: State, A: Action>(
    store: &Store<S, A>,
    ctx: &Rc<RefCell<ChainContext>>,
    query: Query,
) -> Result<()> {
    let (slot, ordered, eventually, negate) = {
        let mut c = ctx.borrow_mut();
        let slot = c.assertions.len();
        c.assertions.push(false);
        let ordered = std::mem::take(&mut c.ordered);
        let negate = std::mem::take(&mut c.negate);
        (slot, ordered, c.eventually, negate)
    };
    if ordered && matches!(query.expected, Expected::All(_)) {
        return Err(Error::OrderedCoverage);
    }
    if eventually && negate {
        return Err(Error::NegatedEventually);
    }

    let Query {
        log,
        expected,
        mode,
        messages,
    } = query;
    let cmp = mode.compare();

    if eventually {
        let store_handle = store.clone();
        let ctx = ctx.clone();
        wait::subscribe_until(store, move || {
            let values = store_handle.log_values(log);
            // The anchor is re-read per check: an earlier predicate may
            // have moved the cursor since this one was declared.
            let anchor = if ordered { Some(ctx.borrow().anchor()) } else { None };
            if !matcher::is_match(&values, &expected, cmp, anchor) {
                return false;
            }
            let mut c = ctx.borrow_mut();
            c.assertions[slot] = true;
            if let Expected::One(exp) = &expected {
                c.cursor = matcher::first_match(&values, exp, cmp);
            }
            true
        });
        return Ok(());
    }

    let values = store.log_values(log);
    let anchor = if ordered { Some(ctx.borrow().anchor()) } else { None };
    let hit = matcher::is_match(&values, &expected, cmp, anchor);
    let all_pass = {
        let mut c = ctx.borrow_mut();
        c.assertions[slot] = hit != negate;
        c.satisfied()
    };
    assert::check(
        all_pass,
        negate,
        messages,
        expected.to_json(),
        serde_json::to_string(&values).unwrap_or_else(|_| "<unrenderable>".to_owned()),
    )?;
    if let Expected::One(exp) = &expected {
        ctx.borrow_mut().cursor = matcher::first_match(&values, exp, cmp);
    }
    Ok(())
}

/// Fire `on_satisfied` exactly once, as soon as every declared slot of the
/// chain is true — immediately if it already is, otherwise on the store
/// notification that completes the chain.
pub(crate) fn watch<S: State, A: Action>(
    store: &Store<S, A>,
    ctx: &Rc<RefCell<ChainContext>>,
    on_satisfied: impl FnOnce() + 'static,
) {
    let ctx = ctx.clone();
    let callback = RefCell::new(Some(on_satisfied));
    wait::subscribe_until(store, move || {
        if !ctx.borrow().satisfied() {
            return false;
        }
        if let Some(callback) = callback.borrow_mut().take() {
            callback();
        }
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreBuilder;
    use serde::Serialize;
    use serde_json::json;
    use std::cell::Cell;

    #[derive(Clone, Debug, Serialize)]
    #[serde(tag = "type")]
    enum TestAction {
        #[serde(rename = "PING")]
        Ping,
        #[serde(rename = "PONG")]
        Pong,
    }

    #[derive(Clone, Debug, Serialize, Default)]
    struct Log {
        last: Option<String>,
    }

    fn store() -> Store<Log, TestAction> {
        StoreBuilder::new(|_state: &Log, action: &TestAction| Log {
            last: Some(
                match action {
                    TestAction::Ping => "ping",
                    TestAction::Pong => "pong",
                }
                .to_owned(),
            ),
        })
        .build()
        .unwrap()
    }

    const MESSAGES: Messages = Messages {
        positive: "expected action history to contain the action",
        negative: "expected action history not to contain the action",
    };

    fn dispatched(name: &str) -> Query {
        Query {
            log: LogKind::Actions,
            expected: Expected::One(json!({ "type": name })),
            mode: CompareMode::Partial,
            messages: MESSAGES,
        }
    }

    #[test]
    fn empty_chain_is_vacuously_satisfied() {
        assert!(ChainContext::default().satisfied());
    }

    #[test]
    fn sync_pass_records_slot_and_cursor() {
        let store = store();
        store.dispatch(TestAction::Ping).unwrap();
        let ctx = Rc::new(RefCell::new(ChainContext::default()));

        verify(&store, &ctx, dispatched("PING")).unwrap();
        let c = ctx.borrow();
        assert_eq!(c.assertions, vec![true]);
        assert_eq!(c.cursor, Some(1));
    }

    #[test]
    fn sync_failure_still_fills_the_slot() {
        let store = store();
        let ctx = Rc::new(RefCell::new(ChainContext::default()));

        let err = verify(&store, &ctx, dispatched("PING")).unwrap_err();
        assert!(matches!(err, Error::AssertionFailed { .. }));
        assert_eq!(ctx.borrow().assertions, vec![false]);
    }

    #[test]
    fn ordered_flag_applies_to_one_predicate_only() {
        let store = store();
        store.dispatch(TestAction::Ping).unwrap();
        store.dispatch(TestAction::Pong).unwrap();
        let ctx = Rc::new(RefCell::new(ChainContext::default()));

        verify(&store, &ctx, dispatched("PING")).unwrap();
        ctx.borrow_mut().ordered = true;
        verify(&store, &ctx, dispatched("PONG")).unwrap();
        // Flag consumed: the next predicate is unordered again and matches
        // anywhere in the log.
        verify(&store, &ctx, dispatched("PING")).unwrap();

        assert!(!ctx.borrow().ordered);
        assert!(ctx.borrow().satisfied());
    }

    #[test]
    fn ordered_query_rejects_non_adjacent_matches() {
        let store = store();
        store.dispatch(TestAction::Ping).unwrap();
        store.dispatch(TestAction::Ping).unwrap();
        store.dispatch(TestAction::Pong).unwrap();
        let ctx = Rc::new(RefCell::new(ChainContext::default()));

        verify(&store, &ctx, dispatched("PING")).unwrap();
        // Cursor sits at the first PING (index 1); PONG is at 3, not 2.
        ctx.borrow_mut().ordered = true;
        let err = verify(&store, &ctx, dispatched("PONG")).unwrap_err();
        assert!(matches!(err, Error::AssertionFailed { .. }));
    }

    #[test]
    fn ordered_coverage_is_a_usage_error() {
        let store = store();
        let ctx = Rc::new(RefCell::new(ChainContext::default()));
        ctx.borrow_mut().ordered = true;
        let err = verify(
            &store,
            &ctx,
            Query {
                log: LogKind::Actions,
                expected: Expected::All(vec![json!({ "type": "PING" })]),
                mode: CompareMode::Partial,
                messages: MESSAGES,
            },
        )
        .unwrap_err();
        assert_eq!(err, Error::OrderedCoverage);
    }

    #[test]
    fn negated_eventual_is_a_usage_error() {
        let store = store();
        let ctx = Rc::new(RefCell::new(ChainContext::default()));
        {
            let mut c = ctx.borrow_mut();
            c.eventually = true;
            c.negate = true;
        }
        let err = verify(&store, &ctx, dispatched("PING")).unwrap_err();
        assert_eq!(err, Error::NegatedEventually);
    }

    #[test]
    fn eventual_slot_resolves_on_a_later_dispatch() {
        let store = store();
        let ctx = Rc::new(RefCell::new(ChainContext::default()));
        ctx.borrow_mut().eventually = true;

        verify(&store, &ctx, dispatched("PONG")).unwrap();
        assert!(!ctx.borrow().satisfied());

        store.dispatch(TestAction::Ping).unwrap();
        assert!(!ctx.borrow().satisfied());

        store.dispatch(TestAction::Pong).unwrap();
        assert!(ctx.borrow().satisfied());
        assert_eq!(ctx.borrow().cursor, Some(2));
    }

    #[test]
    fn watch_fires_immediately_when_already_satisfied() {
        let store = store();
        let ctx = Rc::new(RefCell::new(ChainContext::default()));
        let fired = Rc::new(Cell::new(0));
        {
            let fired = fired.clone();
            watch(&store, &ctx, move || fired.set(fired.get() + 1));
        }
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn watch_fires_exactly_once_when_the_chain_completes() {
        let store = store();
        let ctx = Rc::new(RefCell::new(ChainContext::default()));
        ctx.borrow_mut().eventually = true;
        verify(&store, &ctx, dispatched("PONG")).unwrap();

        let fired = Rc::new(Cell::new(0));
        {
            let fired = fired.clone();
            watch(&store, &ctx, move || fired.set(fired.get() + 1));
        }
        assert_eq!(fired.get(), 0);

        store.dispatch(TestAction::Pong).unwrap();
        assert_eq!(fired.get(), 1);
        store.dispatch(TestAction::Pong).unwrap();
        assert_eq!(fired.get(), 1);
    }
}
