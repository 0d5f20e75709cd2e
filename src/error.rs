use std::sync::Arc;

/// The single error type for all storespy operations.
///
/// Every fallible storespy API returns `storespy::Result<T>` (alias for
/// `Result<T, storespy::Error>`). Errors from lower layers (serialization,
/// user middleware) are mapped into variants of this enum so callers only
/// need to handle one error type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A synchronous assertion did not hold. Carries the rendered message
    /// plus the JSON forms of the expected value and the observed history.
    #[error("{message} (expected: {expected}, actual: {actual})")]
    AssertionFailed {
        message: String,
        expected: String,
        actual: String,
    },

    /// `then`/`next` was combined with a list coverage assertion.
    /// Coverage is existential and unordered; adjacency does not apply to it.
    #[error("then/next cannot be combined with a list coverage assertion")]
    OrderedCoverage,

    /// `not` was combined with `eventually`. A negated wait can never
    /// resolve, so it is rejected up front.
    #[error("not cannot be combined with eventually")]
    NegatedEventually,

    /// An action or state could not be serialized for comparison.
    #[error("serialization error: {0}")]
    Serialize(#[source] Arc<serde_json::Error>),

    /// An error raised by user-supplied middleware during dispatch.
    #[error("middleware error: {0}")]
    External(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary error raised inside user middleware.
    pub fn external(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::External(Arc::new(e))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::AssertionFailed {
                    message: m1,
                    expected: e1,
                    actual: a1,
                },
                Self::AssertionFailed {
                    message: m2,
                    expected: e2,
                    actual: a2,
                },
            ) => m1 == m2 && e1 == e2 && a1 == a2,
            (Self::OrderedCoverage, Self::OrderedCoverage) => true,
            (Self::NegatedEventually, Self::NegatedEventually) => true,
            (Self::Serialize(a), Self::Serialize(b)) => Arc::ptr_eq(a, b),
            (Self::External(a), Self::External(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialize(Arc::new(e))
    }
}
