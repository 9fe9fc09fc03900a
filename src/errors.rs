use thiserror::Error;

/// Transport-level failure from the backing record store or blob store.
/// The engine propagates these verbatim except where an operation's
/// contract says to contain them into a result-level error list.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Caller-supplied data violates a precondition. Raised only by the
    /// validation helpers; the write coordinator assumes validated input.
    #[error("validation failed: {0}")]
    Validation(String),
    /// A required write step failed. The operation aborted at that step;
    /// steps already committed are not rolled back.
    #[error("{step} failed: {source}")]
    Persistence {
        step: &'static str,
        #[source]
        source: StoreError,
    },
    /// Undo attempted against a purchase id that already exists.
    #[error("restore conflict: purchase {0} already exists")]
    RestoreConflict(String),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Maps a store failure to [`LedgerError::Persistence`] tagged with the
    /// step that was running, for use with `map_err`.
    pub(crate) fn at_step(step: &'static str) -> impl FnOnce(StoreError) -> LedgerError {
        move |source| LedgerError::Persistence { step, source }
    }
}
