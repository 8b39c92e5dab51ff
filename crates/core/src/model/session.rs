use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::SessionError;
use crate::model::answer::{AnswerSlot, AnswerValue};
use crate::model::assignment::Assignment;
use crate::model::draft::Draft;
use crate::model::ids::{AssignmentId, QuestionId};
use crate::model::question::{Question, QuestionKind};
use crate::model::timer::{Timer, TimerWarning};
use crate::time::elapsed_secs;

//
// ─── PHASES & EVENTS ───────────────────────────────────────────────────────────
//

/// Lifecycle of a quiz session.
///
/// `Active → Submitting → Submitted | Active | Expired`. `Submitted` and
/// `Expired` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Submitting,
    Submitted,
    Expired,
}

impl SessionPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Submitted | Self::Expired)
    }
}

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    /// The timer advanced by one second.
    Ticked(Timer),
    /// The timer advanced and crossed a warning threshold for the first time.
    Warning(TimerWarning),
    /// The countdown reached zero; the session is now `Submitting` and waits
    /// for the caller to deliver the submission.
    TimeUp,
    /// A submission is pending; the timer holds still.
    Paused,
    /// The session is terminal; the ticker should stop for good.
    Closed,
}

/// Score returned by the backend for an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub scored_points: f64,
    pub total_points: f64,
    pub percentage: f64,
}

/// One answer as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub answer_text: String,
}

/// Payload built when a submission starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub assignment_id: AssignmentId,
    pub answers: Vec<SubmittedAnswer>,
    pub time_taken_secs: u64,
}

/// Aggregated view of answering progress, for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub cursor: usize,
    pub phase: SessionPhase,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One sitting of a test-taker answering an assignment.
///
/// Pure state: time comes in as `now` arguments and the one-second cadence is
/// driven from outside through [`QuizSession::tick`]. Always holds exactly one
/// answer slot per question.
pub struct QuizSession {
    assignment: Assignment,
    cursor: usize,
    answers: Vec<AnswerSlot>,
    timer: Timer,
    started_at: DateTime<Utc>,
    phase: SessionPhase,
    in_flight: bool,
    warned: Vec<TimerWarning>,
    resumed: bool,
    score: Option<Score>,
}

impl QuizSession {
    /// Open a session, resuming from `restored` when it is still valid.
    ///
    /// Expired drafts and drafts that no longer fit the assignment are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidAssignment` if the assignment has no questions.
    pub fn start(
        assignment: Assignment,
        restored: Option<Draft>,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if assignment.is_empty() {
            return Err(SessionError::InvalidAssignment);
        }

        let usable = restored.filter(|d| !d.is_expired(now) && d.fits(&assignment));
        let resumed = usable.is_some();
        let (answers, cursor, timer) = match usable {
            Some(draft) => (draft.answers, draft.cursor, draft.timer),
            None => (
                vec![AnswerSlot::Unset; assignment.len()],
                0,
                Timer::for_limit(assignment.time_limit_secs()),
            ),
        };

        Ok(Self {
            assignment,
            cursor,
            answers,
            timer,
            started_at: now,
            phase: SessionPhase::Active,
            in_flight: false,
            warned: Vec::new(),
            resumed,
            score: None,
        })
    }

    #[must_use]
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    #[must_use]
    pub fn assignment_id(&self) -> &AssignmentId {
        self.assignment.id()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.assignment.questions()[self.cursor]
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerSlot] {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&AnswerSlot> {
        self.answers.get(index)
    }

    #[must_use]
    pub fn timer(&self) -> Timer {
        self.timer
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.phase == SessionPhase::Submitted
    }

    /// Whether a submission request is currently out.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// Whether answers, cursor and timer came from a draft.
    #[must_use]
    pub fn was_resumed(&self) -> bool {
        self.resumed
    }

    #[must_use]
    pub fn score(&self) -> Option<&Score> {
        self.score.as_ref()
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.cursor + 1 == self.answers.len()
    }

    /// Number of unset slots, blank texts and empty selections.
    #[must_use]
    pub fn count_unanswered(&self) -> usize {
        self.answers.iter().filter(|slot| !slot.is_answered()).count()
    }

    /// Whether any slot has been written since the session started.
    #[must_use]
    pub fn has_answers(&self) -> bool {
        self.answers.iter().any(|slot| !slot.is_unset())
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let unanswered = self.count_unanswered();
        QuizProgress {
            total: self.answers.len(),
            answered: self.answers.len() - unanswered,
            unanswered,
            cursor: self.cursor,
            phase: self.phase,
        }
    }

    //
    // ─── NAVIGATION ──────────────────────────────────────────────────────────
    //

    /// Move to `index`; out-of-range indices are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionClosed` once the session is terminal.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_open()?;
        if index < self.answers.len() {
            self.cursor = index;
        }
        Ok(())
    }

    /// Advance one question; stays put on the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionClosed` once the session is terminal.
    pub fn next(&mut self) -> Result<(), SessionError> {
        self.go_to(self.cursor + 1)
    }

    /// Step back one question; stays put on the first one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionClosed` once the session is terminal.
    pub fn prev(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.cursor = self.cursor.saturating_sub(1);
        Ok(())
    }

    //
    // ─── ANSWERS ─────────────────────────────────────────────────────────────
    //

    /// Replace the answer for question `index`.
    ///
    /// Text fits single-choice, true/false and free-text questions; a
    /// selection replaces a multi-select slot wholesale.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed`, `AlreadySubmitting` while a submission is in
    /// flight, `OutOfTime` once a countdown has run out, `NoSuchQuestion`,
    /// `InvalidQuestionKind` on a shape mismatch, or `UnknownChoice` when a
    /// value is not among the choices.
    pub fn set_answer(&mut self, index: usize, value: AnswerValue) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let question = self.question_at(index)?;
        let kind = question.kind();

        match (&value, kind) {
            (AnswerValue::Text(_), QuestionKind::MultiSelect)
            | (
                AnswerValue::Selection(_),
                QuestionKind::SingleChoice | QuestionKind::TrueFalse | QuestionKind::FreeText,
            ) => return Err(SessionError::InvalidQuestionKind(kind)),
            (AnswerValue::Text(text), QuestionKind::SingleChoice | QuestionKind::TrueFalse) => {
                check_choice(question, index, text)?;
            }
            (AnswerValue::Selection(options), QuestionKind::MultiSelect) => {
                for option in options {
                    check_choice(question, index, option)?;
                }
            }
            (AnswerValue::Text(_), QuestionKind::FreeText) => {}
        }

        self.answers[index] = value.into_slot();
        Ok(())
    }

    /// Flip `option` in the multi-select slot for question `index`.
    ///
    /// # Errors
    ///
    /// Same as [`QuizSession::set_answer`]; `InvalidQuestionKind` for non
    /// multi-select questions.
    pub fn toggle(&mut self, index: usize, option: &str) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let question = self.question_at(index)?;
        if !question.kind().is_multi() {
            return Err(SessionError::InvalidQuestionKind(question.kind()));
        }
        check_choice(question, index, option)?;

        let slot = &mut self.answers[index];
        if let AnswerSlot::Selection(set) = slot {
            if !set.remove(option) {
                set.insert(option.to_owned());
            }
        } else {
            *slot = AnswerSlot::Selection([option.to_owned()].into());
        }
        Ok(())
    }

    //
    // ─── TIMER ───────────────────────────────────────────────────────────────
    //

    /// Advance the timer by one second.
    ///
    /// Only ticks while `Active`. When a countdown reaches 0 the session
    /// moves to `Submitting` on its own and reports [`TickEvent::TimeUp`]. An
    /// `Active` countdown already at 0 (a failed delivery, or a draft saved
    /// after time ran out) reports `TimeUp` again on its next tick.
    pub fn tick(&mut self) -> TickEvent {
        match self.phase {
            SessionPhase::Submitted | SessionPhase::Expired => return TickEvent::Closed,
            SessionPhase::Submitting => return TickEvent::Paused,
            SessionPhase::Active => {}
        }

        if self.is_out_of_time() {
            self.phase = SessionPhase::Submitting;
            return TickEvent::TimeUp;
        }
        let step = self.timer.step();
        if step.ran_out {
            self.phase = SessionPhase::Submitting;
            return TickEvent::TimeUp;
        }
        match step.crossed {
            Some(warning) if !self.warned.contains(&warning) => {
                self.warned.push(warning);
                TickEvent::Warning(warning)
            }
            _ => TickEvent::Ticked(self.timer),
        }
    }

    //
    // ─── DRAFTS ──────────────────────────────────────────────────────────────
    //

    /// Snapshot for checkpointing, or `None` when there is nothing to keep:
    /// the session is terminal or no answer was ever written.
    #[must_use]
    pub fn draft(&self, now: DateTime<Utc>) -> Option<Draft> {
        if self.is_terminal() || !self.has_answers() {
            return None;
        }
        Some(Draft {
            assignment_id: self.assignment.id().clone(),
            answers: self.answers.clone(),
            cursor: self.cursor,
            timer: self.timer,
            saved_at: now,
        })
    }

    //
    // ─── SUBMISSION ──────────────────────────────────────────────────────────
    //

    /// Start a submission and build its payload.
    ///
    /// Unanswered questions do not block; callers confirm with the user first
    /// using [`QuizSession::count_unanswered`].
    ///
    /// # Errors
    ///
    /// - `SessionClosed` if the session is terminal.
    /// - `AlreadySubmitting` if a submission is in flight.
    /// - `Expired` if the due date has passed; the session becomes `Expired`.
    pub fn begin_submission(&mut self, now: DateTime<Utc>) -> Result<Submission, SessionError> {
        self.ensure_open()?;
        if self.in_flight {
            return Err(SessionError::AlreadySubmitting);
        }
        if self.assignment.is_past_due(now) {
            self.phase = SessionPhase::Expired;
            return Err(SessionError::Expired);
        }

        let answers = self
            .assignment
            .questions()
            .iter()
            .zip(&self.answers)
            .map(|(question, slot)| SubmittedAnswer {
                question_id: question.id().clone(),
                answer_text: slot.submission_text(question),
            })
            .collect();

        self.phase = SessionPhase::Submitting;
        self.in_flight = true;

        Ok(Submission {
            assignment_id: self.assignment.id().clone(),
            answers,
            time_taken_secs: elapsed_secs(self.started_at, now),
        })
    }

    /// Record the backend's acceptance; the session becomes `Submitted`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitting` if no submission is in flight.
    pub fn complete_submission(&mut self, score: Score) -> Result<&Score, SessionError> {
        if !self.in_flight {
            return Err(SessionError::NotSubmitting);
        }
        self.in_flight = false;
        self.phase = SessionPhase::Submitted;
        Ok(self.score.insert(score))
    }

    /// Record a failed delivery; the session returns to `Active` and the timer
    /// resumes where it stopped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitting` if no submission is in flight.
    pub fn abort_submission(&mut self) -> Result<(), SessionError> {
        if !self.in_flight {
            return Err(SessionError::NotSubmitting);
        }
        self.in_flight = false;
        self.phase = SessionPhase::Active;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_terminal() {
            Err(SessionError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.in_flight {
            Err(SessionError::AlreadySubmitting)
        } else if self.is_out_of_time() {
            Err(SessionError::OutOfTime)
        } else {
            Ok(())
        }
    }

    fn is_out_of_time(&self) -> bool {
        self.timer.remaining_secs() == Some(0)
    }

    fn question_at(&self, index: usize) -> Result<&Question, SessionError> {
        self.assignment
            .question(index)
            .ok_or(SessionError::NoSuchQuestion(index))
    }
}

fn check_choice(question: &Question, index: usize, option: &str) -> Result<(), SessionError> {
    if question.has_choice(option) {
        Ok(())
    } else {
        Err(SessionError::UnknownChoice {
            index,
            option: option.to_owned(),
        })
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("assignment_id", self.assignment.id())
            .field("questions_len", &self.assignment.len())
            .field("cursor", &self.cursor)
            .field("timer", &self.timer)
            .field("phase", &self.phase)
            .field("in_flight", &self.in_flight)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
