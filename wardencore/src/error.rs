use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    #[cfg(feature = "sqlx")]
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    /// Denotes custom application invariant; generally informative.
    #[error("application invariant violated: {0}")]
    AppInvariantViolation(String),
}

#[non_exhaustive]
#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}
