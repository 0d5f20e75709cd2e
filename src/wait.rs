//! Resolution of "has this condition become true yet".
//!
//! Two modes: synchronous callers evaluate their condition once, now, against
//! the current logs. Eventual callers hand the condition to
//! [`subscribe_until`], which re-checks it on every store notification until
//! it first holds, then unsubscribes. There is no timeout and no cancellation
//! other than successful resolution; a condition that never becomes true
//! leaves the subscription pending — callers that need a bound must impose
//! their own (e.g. `tokio::time::timeout` around an awaited chain).

use std::{cell::RefCell, rc::Rc};

use crate::{Action, State, Store, store::Subscription};

/// Run `check` immediately; if it does not hold, re-run it after every store
/// notification until it first returns true, then unsubscribe.
///
/// `check` carries its own commit side effects (slot and cursor updates);
/// returning true means "resolved, stop watching".
pub(crate) fn subscribe_until<S: State, A: Action>(
    store: &Store<S, A>,
    check: impl Fn() -> bool + 'static,
) {
    if check() {
        return;
    }
    // The callback unsubscribes itself on success; the handle lands in the
    // shared slot before any dispatch can fire it (single-threaded).
    let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let callback = {
        let slot = slot.clone();
        move || {
            if check() {
                if let Some(subscription) = slot.borrow_mut().take() {
                    subscription.unsubscribe();
                }
            }
        }
    };
    let subscription = store.subscribe(callback);
    *slot.borrow_mut() = Some(subscription);
}
