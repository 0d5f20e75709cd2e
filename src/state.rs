use std::fmt;

use serde::Serialize;

/// Contract for states produced by a store's reducer.
///
/// States must be `Clone` (the log keeps a copy per dispatch and
/// [`Store::get_state`](crate::Store::get_state) hands copies out),
/// `Serialize` (matching works on their JSON form), and `Debug` for
/// diagnostics. Any type meeting these bounds is a state — a derived struct,
/// a `serde_json::Value` for keyed/combined stores, or anything in between.
pub trait State: Clone + fmt::Debug + Serialize + 'static {}

impl<T> State for T where T: Clone + fmt::Debug + Serialize + 'static {}
