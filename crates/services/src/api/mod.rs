//! Coursework backend: fetching assignments and submitting answers.

use async_trait::async_trait;

use tutor_core::model::{Assignment, AssignmentId, Score, Submission};

use crate::error::ApiError;

mod http;
mod wire;

pub use http::HttpCourseworkApi;

/// Backend operations the quiz flow depends on.
///
/// The backend owns grading; the score it returns is authoritative.
#[async_trait]
pub trait CourseworkApi: Send + Sync {
    /// Fetch an assignment for answering (no answer keys).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, a non-success status, a
    /// backend rejection or a malformed payload.
    async fn fetch_assignment(&self, id: &AssignmentId) -> Result<Assignment, ApiError>;

    /// Submit final answers and receive the score.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, a non-success status or a
    /// backend rejection.
    async fn submit(&self, submission: &Submission) -> Result<Score, ApiError>;
}
