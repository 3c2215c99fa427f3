use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Operator input failed validation. Recovered locally by re-prompting.
    #[error("invalid settings value: {reason}")]
    Validation { reason: String },

    /// The persistence layer is unavailable. Surfaced to the caller, never
    /// silently retried.
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

impl Error {
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
