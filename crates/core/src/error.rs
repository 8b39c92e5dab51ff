use thiserror::Error;

use crate::model::QuestionKind;

/// Errors raised by `QuizSession` operations.
///
/// Every failing call leaves the session unchanged, except `Expired`, which
/// moves the session into its terminal expired state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("assignment has no questions")]
    InvalidAssignment,

    #[error("answer shape does not match a {} question", .0.label())]
    InvalidQuestionKind(QuestionKind),

    #[error("{option:?} is not a choice of question {index}")]
    UnknownChoice { index: usize, option: String },

    #[error("no question at index {0}")]
    NoSuchQuestion(usize),

    #[error("session is closed")]
    SessionClosed,

    #[error("a submission is already in flight")]
    AlreadySubmitting,

    #[error("time is up; answers can no longer change")]
    OutOfTime,

    #[error("no submission is in flight")]
    NotSubmitting,

    #[error("the due date for this assignment has passed")]
    Expired,
}
