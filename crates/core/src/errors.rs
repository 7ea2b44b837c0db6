use thiserror::Error;

/// Error taxonomy for the request-facing surface.
///
/// Upstream provider failures never appear here: the voice and LLM
/// clients absorb them into [`crate::sourced::Sourced::Degraded`] values
/// so user-facing flows still complete.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::NotFound(message)
            | Self::ServiceUnavailable(message) => message.clone(),
            Self::Internal(_) => "an internal error occurred".to_string(),
        }
    }
}
