use thiserror::Error;

/// Non-fatal failures of the roll-call core. None of these change state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    EmptyCandidateSet(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
}

impl CoreError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::EmptyCandidateSet(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Stable IPC error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidState(_) => "invalid_state",
            Self::EmptyCandidateSet(_) => "empty_candidate_set",
            Self::InvalidArgument(_) => "bad_params",
            Self::NotFound(_) => "not_found",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
