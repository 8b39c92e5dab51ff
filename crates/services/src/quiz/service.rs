use std::sync::Arc;

use tutor_core::model::{Assignment, AssignmentId, QuizSession, Score, Submission};
use tutor_core::{Clock, SessionError};

use crate::api::CourseworkApi;
use crate::drafts::DraftService;
use crate::error::{ApiError, QuizServiceError};

/// Opens assignments, checkpoints drafts and delivers submissions.
///
/// Owns the clock; every `now` the session sees comes from here.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    api: Arc<dyn CourseworkApi>,
    drafts: DraftService,
}

impl QuizService {
    #[must_use]
    pub fn new(api: Arc<dyn CourseworkApi>, drafts: DraftService) -> Self {
        Self {
            clock: drafts.clock(),
            api,
            drafts,
        }
    }

    /// Replace the clock for this service and its draft store.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self.drafts = self.drafts.with_clock(clock);
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn drafts(&self) -> &DraftService {
        &self.drafts
    }

    /// Fetch an assignment and open a session on it, resuming any saved draft.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError` if the fetch fails, the draft store cannot be
    /// read, or the assignment has no questions.
    pub async fn open(&self, assignment_id: &AssignmentId) -> Result<QuizSession, QuizServiceError> {
        let assignment = self.api.fetch_assignment(assignment_id).await?;
        if assignment.id() != assignment_id {
            tracing::warn!(
                requested = %assignment_id,
                received = %assignment.id(),
                "backend returned a different assignment id"
            );
        }
        self.start(assignment).await
    }

    /// Open a session on an already fetched assignment.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError` if the draft store cannot be read or the
    /// assignment has no questions.
    pub async fn start(&self, assignment: Assignment) -> Result<QuizSession, QuizServiceError> {
        let restored = self.drafts.load(assignment.id()).await?;
        let session = QuizSession::start(assignment, restored, self.clock.now())?;
        tracing::info!(
            assignment = %session.assignment_id(),
            questions = session.assignment().len(),
            resumed = session.was_resumed(),
            timer = %session.timer(),
            "quiz opened"
        );
        Ok(session)
    }

    /// Persist the session's current state. Returns whether a draft was written.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Draft` if the draft cannot be written.
    pub async fn checkpoint(&self, session: &QuizSession) -> Result<bool, QuizServiceError> {
        Ok(self.drafts.checkpoint(session).await?)
    }

    /// Drop the saved draft for an assignment, if any.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Draft` if the store cannot be written.
    pub async fn discard_draft(&self, assignment_id: &AssignmentId) -> Result<bool, QuizServiceError> {
        Ok(self.drafts.clear(assignment_id).await?)
    }

    /// Checkpoint, then move the session into `Submitting`.
    ///
    /// The checkpoint comes first so a failed delivery still leaves a draft.
    /// A past-due assignment clears its draft and fails with `Expired`.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError` if the session refuses to submit or the
    /// checkpoint cannot be written.
    pub async fn prepare(&self, session: &mut QuizSession) -> Result<Submission, QuizServiceError> {
        let now = self.clock.now();
        if let Some(draft) = session.draft(now) {
            self.drafts.save(&draft).await?;
        }

        match session.begin_submission(now) {
            Ok(submission) => Ok(submission),
            Err(SessionError::Expired) => {
                tracing::warn!(assignment = %session.assignment_id(), "submission past due date");
                if let Err(err) = self.drafts.clear(session.assignment_id()).await {
                    tracing::warn!(error = %err, "failed to clear draft of expired assignment");
                }
                Err(SessionError::Expired.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Send a prepared submission to the backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected.
    pub async fn deliver(&self, submission: &Submission) -> Result<Score, ApiError> {
        self.api.submit(submission).await
    }

    /// Apply the outcome of [`QuizService::deliver`] to the session.
    ///
    /// Success clears the draft. Failure returns the session to `Active` and
    /// keeps the draft so the user can retry.
    ///
    /// # Errors
    ///
    /// Returns the delivery error, or `QuizServiceError::Session` if the
    /// session had no submission in flight.
    pub async fn settle(
        &self,
        session: &mut QuizSession,
        outcome: Result<Score, ApiError>,
    ) -> Result<Score, QuizServiceError> {
        match outcome {
            Ok(score) => {
                let score = *session.complete_submission(score)?;
                tracing::info!(
                    assignment = %session.assignment_id(),
                    score = score.scored_points,
                    total = score.total_points,
                    "submission accepted"
                );
                if let Err(err) = self.drafts.clear(session.assignment_id()).await {
                    tracing::warn!(error = %err, "submitted, but failed to clear draft");
                }
                Ok(score)
            }
            Err(err) => {
                session.abort_submission()?;
                tracing::warn!(
                    assignment = %session.assignment_id(),
                    error = %err,
                    "submission failed; draft kept for retry"
                );
                Err(err.into())
            }
        }
    }

    /// Prepare, deliver and settle in one call.
    ///
    /// # Errors
    ///
    /// See [`QuizService::prepare`] and [`QuizService::settle`].
    pub async fn submit(&self, session: &mut QuizSession) -> Result<Score, QuizServiceError> {
        let submission = self.prepare(session).await?;
        let outcome = self.deliver(&submission).await;
        self.settle(session, outcome).await
    }

    /// Checkpoint on leaving the assignment. Returns whether a draft was written.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Draft` if the draft cannot be written.
    pub async fn close(&self, session: &QuizSession) -> Result<bool, QuizServiceError> {
        let saved = self.checkpoint(session).await?;
        tracing::debug!(assignment = %session.assignment_id(), saved, "quiz closed");
        Ok(saved)
    }
}
