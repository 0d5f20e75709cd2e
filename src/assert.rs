//! The assertion-reporting seam.
//!
//! Predicates funnel every pass/fail decision through [`check`], which turns
//! a failed condition into a descriptive [`Error::AssertionFailed`] carrying
//! the JSON forms of the expected value and the observed history. The negate
//! flag selects which message template describes the failure; the condition
//! it receives is the already-negation-applied outcome.

use crate::{Error, Result};

/// Message templates for one predicate, positive and negated.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Messages {
    pub positive: &'static str,
    pub negative: &'static str,
}

/// Fail with a descriptive error unless `pass` holds.
pub(crate) fn check(
    pass: bool,
    negate: bool,
    messages: Messages,
    expected: String,
    actual: String,
) -> Result<()> {
    if pass {
        return Ok(());
    }
    let message = if negate {
        messages.negative
    } else {
        messages.positive
    };
    Err(Error::AssertionFailed {
        message: message.to_owned(),
        expected,
        actual,
    })
}
