mod answer;
mod assignment;
mod draft;
mod ids;
mod question;
mod session;
mod timer;

pub use ids::{AssignmentId, ParseIdError, QuestionId};

pub use answer::{AnswerSlot, AnswerValue, MULTI_SELECT_SEPARATOR};
pub use assignment::{Assignment, AssignmentError};
pub use draft::{DRAFT_KEY_PREFIX, DRAFT_TTL_HOURS, Draft, DraftDecodeError, DraftRecord, SlotRecord, draft_key};
pub use question::{Question, QuestionError, QuestionKind};
pub use session::{
    QuizProgress, QuizSession, Score, SessionPhase, Submission, SubmittedAnswer, TickEvent,
};
pub use timer::{Timer, TimerWarning};
