use thiserror::Error;

/// Failure kinds of a resolution attempt.
///
/// `Unlock`, `AttributeFetch` and `SessionClose` are non-fatal: the resolver
/// logs them and keeps going, so callers never see them as a final result.
/// Every other variant aborts the call that produced it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("session bus unavailable: {0}")]
    Transport(#[source] zbus::Error),

    #[error("secret service unavailable: {0}")]
    ServiceUnavailable(#[source] zbus::Error),

    #[error("session negotiation failed: {0}")]
    SessionNegotiation(#[source] zbus::Error),

    #[error("search failed: {0}")]
    Search(#[source] zbus::Error),

    #[error("failed to unlock item: {0}")]
    Unlock(String),

    #[error("secret retrieval failed: {0}")]
    SecretFetch(String),

    #[error("attribute retrieval failed: {0}")]
    AttributeFetch(String),

    #[error("no match found")]
    NoMatchFound,

    #[error("failed to close secret service session: {0}")]
    SessionClose(#[source] zbus::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
