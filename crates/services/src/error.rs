//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use tutor_core::SessionError;
use tutor_core::model::DraftDecodeError;

/// Errors emitted by `CourseworkApi` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("unexpected response payload: {0}")]
    InvalidPayload(String),
    #[error("base url cannot carry a path: {0}")]
    InvalidBaseUrl(String),
}

/// Errors emitted by `DraftService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DraftError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("draft could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("stored draft is not valid json: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("stored draft is invalid: {0}")]
    Invalid(#[from] DraftDecodeError),
}

/// Errors emitted by `QuizService` and the live runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Draft(#[from] DraftError),
}

impl QuizServiceError {
    /// Whether the user may simply call submit again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Api(_) | Self::Draft(_))
    }

    /// Whether the assignment can no longer be submitted at all.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Session(SessionError::Expired))
    }
}

/// Errors emitted while reading `ApiConfig`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid api url {raw:?}: {source}")]
    InvalidUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("api url {0:?} must be http or https")]
    UnsupportedScheme(String),
    #[error("invalid timeout {0:?}, expected whole seconds")]
    InvalidTimeout(String),
}
