use std::collections::BTreeSet;

use crate::model::question::{Question, QuestionKind};

/// Joins multi-select options into one submitted answer string.
///
/// Reserved: option text is not expected to contain it.
pub const MULTI_SELECT_SEPARATOR: &str = "|||";

/// Answer held for one question during a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnswerSlot {
    #[default]
    Unset,
    /// Single-choice, true/false or free-text answer.
    Text(String),
    /// Multi-select answer; may be empty after toggling everything off.
    Selection(BTreeSet<String>),
}

impl AnswerSlot {
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Whether the slot counts as answered for submission prompts.
    ///
    /// Blank text and empty selections are unanswered.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        match self {
            Self::Unset => false,
            Self::Text(text) => !text.trim().is_empty(),
            Self::Selection(set) => !set.is_empty(),
        }
    }

    /// Whether this slot's shape is valid for a question of `kind`.
    #[must_use]
    pub fn fits(&self, kind: QuestionKind) -> bool {
        match self {
            Self::Unset => true,
            Self::Text(_) => !kind.is_multi(),
            Self::Selection(_) => kind.is_multi(),
        }
    }

    #[must_use]
    pub fn contains(&self, option: &str) -> bool {
        match self {
            Self::Selection(set) => set.contains(option),
            Self::Text(text) => text == option,
            Self::Unset => false,
        }
    }

    /// Answer text sent to the backend for this slot.
    ///
    /// Selections follow the question's choice order and are joined with
    /// [`MULTI_SELECT_SEPARATOR`]; unset slots submit as empty text.
    #[must_use]
    pub fn submission_text(&self, question: &Question) -> String {
        match self {
            Self::Unset => String::new(),
            Self::Text(text) => text.clone(),
            Self::Selection(set) => {
                let mut picked: Vec<&String> = set.iter().collect();
                picked.sort_by_key(|opt| question.choice_index(opt).unwrap_or(usize::MAX));
                picked
                    .into_iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(MULTI_SELECT_SEPARATOR)
            }
        }
    }
}

/// Value handed in by the presentation layer for `QuizSession::set_answer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Text(String),
    Selection(Vec<String>),
}

impl AnswerValue {
    pub(crate) fn into_slot(self) -> AnswerSlot {
        match self {
            Self::Text(text) => AnswerSlot::Text(text),
            Self::Selection(options) => AnswerSlot::Selection(options.into_iter().collect()),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        Self::Selection(value)
    }
}
