use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid rating code: {0} (expected 1-4)")]
    InvalidRating(u8),
    #[error("invalid card state code: {0} (expected 0-3)")]
    InvalidState(u8),
    #[error("invalid input: {0}")]
    Invalid(&'static str),
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("storage error: {0}")]
    Storage(#[source] BoxError),
}

impl CoreError {
    pub fn storage(err: impl Into<BoxError>) -> Self {
        CoreError::Storage(err.into())
    }
}
