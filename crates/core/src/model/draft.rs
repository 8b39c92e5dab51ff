use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::answer::AnswerSlot;
use crate::model::assignment::Assignment;
use crate::model::ids::{AssignmentId, ParseIdError};
use crate::model::timer::Timer;

/// Drafts older than this are discarded instead of restored.
pub const DRAFT_TTL_HOURS: i64 = 24;

/// Prefix shared by every draft key.
pub const DRAFT_KEY_PREFIX: &str = "quizState_";

/// Key a draft is stored under in the local key-value store.
#[must_use]
pub fn draft_key(assignment_id: &AssignmentId) -> String {
    format!("{DRAFT_KEY_PREFIX}{assignment_id}")
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DraftDecodeError {
    #[error(transparent)]
    Id(#[from] ParseIdError),

    #[error("savedAt {0} is not a valid timestamp")]
    InvalidTimestamp(i64),
}

/// Resumable snapshot of an in-progress session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub assignment_id: AssignmentId,
    pub answers: Vec<AnswerSlot>,
    pub cursor: usize,
    pub timer: Timer,
    pub saved_at: DateTime<Utc>,
}

impl Draft {
    /// Whether more than [`DRAFT_TTL_HOURS`] have passed since the draft was saved.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.saved_at > Duration::hours(DRAFT_TTL_HOURS)
    }

    /// Whether this draft can be restored onto `assignment`.
    ///
    /// Fails when the assignment changed shape since the draft was written.
    #[must_use]
    pub fn fits(&self, assignment: &Assignment) -> bool {
        if self.assignment_id != *assignment.id()
            || self.answers.len() != assignment.len()
            || self.cursor >= assignment.len()
        {
            return false;
        }
        if self.timer.is_countdown() != assignment.time_limit_secs().is_some() {
            return false;
        }
        self.answers
            .iter()
            .zip(assignment.questions())
            .all(|(slot, q)| slot.fits(q.kind()))
    }

    #[must_use]
    pub fn key(&self) -> String {
        draft_key(&self.assignment_id)
    }

    #[must_use]
    pub fn to_record(&self) -> DraftRecord {
        DraftRecord {
            coursework_id: self.assignment_id.to_string(),
            answers: self.answers.iter().map(SlotRecord::from_slot).collect(),
            current_question_index: self.cursor,
            time_remaining: self.timer.remaining_secs(),
            time_elapsed: self.timer.elapsed_secs(),
            saved_at: self.saved_at.timestamp_millis(),
        }
    }

    /// Rebuild a draft from its stored record.
    ///
    /// # Errors
    ///
    /// Returns `DraftDecodeError` for a blank id or an unrepresentable timestamp.
    pub fn from_record(record: DraftRecord) -> Result<Self, DraftDecodeError> {
        let assignment_id = AssignmentId::new(record.coursework_id)?;
        let saved_at = DateTime::<Utc>::from_timestamp_millis(record.saved_at)
            .ok_or(DraftDecodeError::InvalidTimestamp(record.saved_at))?;
        let timer = match record.time_remaining {
            Some(remaining_secs) => Timer::Countdown { remaining_secs },
            None => Timer::Countup {
                elapsed_secs: record.time_elapsed.unwrap_or(0),
            },
        };

        Ok(Self {
            assignment_id,
            answers: record.answers.into_iter().map(SlotRecord::into_slot).collect(),
            cursor: record.current_question_index,
            timer,
            saved_at,
        })
    }
}

/// Stored JSON shape of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub coursework_id: String,
    pub answers: Vec<SlotRecord>,
    pub current_question_index: usize,
    #[serde(default)]
    pub time_remaining: Option<u64>,
    #[serde(default)]
    pub time_elapsed: Option<u64>,
    /// Unix milliseconds.
    pub saved_at: i64,
}

/// `null`, a string, or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotRecord {
    Text(String),
    Selection(Vec<String>),
    Unset,
}

impl SlotRecord {
    fn from_slot(slot: &AnswerSlot) -> Self {
        match slot {
            AnswerSlot::Unset => Self::Unset,
            AnswerSlot::Text(text) => Self::Text(text.clone()),
            AnswerSlot::Selection(set) => Self::Selection(set.iter().cloned().collect()),
        }
    }

    fn into_slot(self) -> AnswerSlot {
        match self {
            Self::Unset => AnswerSlot::Unset,
            Self::Text(text) => AnswerSlot::Text(text),
            Self::Selection(options) => AnswerSlot::Selection(options.into_iter().collect()),
        }
    }
}
