mod live;
mod service;
mod timer;

use tutor_core::model::{Score, Timer, TimerWarning};

pub use live::LiveQuiz;
pub use service::QuizService;
pub use timer::{AUTO_SUBMIT_RETRY, TimerSlot};

/// What a running quiz reports to whoever renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizEvent {
    Tick(Timer),
    Warning(TimerWarning),
    /// The countdown hit zero and an automatic submission started.
    TimeUp,
    Submitted(Score),
    SubmitFailed(String),
    /// The due date passed before the submission could be made.
    Expired,
}
