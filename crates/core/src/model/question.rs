use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} must be worth a positive number of points, got {points}")]
    InvalidPoints { id: QuestionId, points: f64 },

    #[error("question {id} needs at least {min} choices")]
    TooFewChoices { id: QuestionId, min: usize },

    #[error("question {id} lists choice {choice:?} more than once")]
    DuplicateChoice { id: QuestionId, choice: String },

    #[error("free-text question {id} cannot carry choices")]
    UnexpectedChoices { id: QuestionId },
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// How a question is answered, which fixes the shape of its answer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    #[serde(alias = "single_choice", alias = "multiple-choice", alias = "mcq")]
    SingleChoice,
    #[serde(alias = "true_false", alias = "boolean")]
    TrueFalse,
    #[serde(alias = "multi_select", alias = "checkbox")]
    MultiSelect,
    #[serde(alias = "free_text", alias = "text", alias = "short-answer", alias = "essay")]
    FreeText,
}

impl QuestionKind {
    /// Whether answers are picked from the question's `choices`.
    #[must_use]
    pub fn has_choices(self) -> bool {
        !matches!(self, Self::FreeText)
    }

    /// Whether the answer slot holds a set of options.
    #[must_use]
    pub fn is_multi(self) -> bool {
        matches!(self, Self::MultiSelect)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SingleChoice => "single choice",
            Self::TrueFalse => "true/false",
            Self::MultiSelect => "multi-select",
            Self::FreeText => "free text",
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One question of an assignment.
///
/// `correct_answer` and `sample_answer` are only populated in grading views and
/// are never consulted while a session is answering.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    kind: QuestionKind,
    prompt: String,
    choices: Vec<String>,
    points: f64,
    correct_answer: Option<String>,
    sample_answer: Option<String>,
}

impl Question {
    /// Build a validated question.
    ///
    /// True/false questions without explicit choices get `["True", "False"]`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when points are not positive, a choice-based
    /// question has too few or duplicate choices, or a free-text question
    /// lists choices.
    pub fn new(
        id: QuestionId,
        kind: QuestionKind,
        prompt: impl Into<String>,
        choices: Vec<String>,
        points: f64,
    ) -> Result<Self, QuestionError> {
        if !(points.is_finite() && points > 0.0) {
            return Err(QuestionError::InvalidPoints { id, points });
        }

        let choices = match kind {
            QuestionKind::FreeText if !choices.is_empty() => {
                return Err(QuestionError::UnexpectedChoices { id });
            }
            QuestionKind::FreeText => choices,
            QuestionKind::TrueFalse if choices.is_empty() => {
                vec!["True".to_owned(), "False".to_owned()]
            }
            QuestionKind::SingleChoice | QuestionKind::TrueFalse | QuestionKind::MultiSelect => {
                validate_choices(&id, choices)?
            }
        };

        Ok(Self {
            id,
            kind,
            prompt: prompt.into(),
            choices,
            points,
            correct_answer: None,
            sample_answer: None,
        })
    }

    /// Attach grading-only fields.
    #[must_use]
    pub fn with_key(mut self, correct_answer: Option<String>, sample_answer: Option<String>) -> Self {
        self.correct_answer = correct_answer;
        self.sample_answer = sample_answer;
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn points(&self) -> f64 {
        self.points
    }

    #[must_use]
    pub fn correct_answer(&self) -> Option<&str> {
        self.correct_answer.as_deref()
    }

    #[must_use]
    pub fn sample_answer(&self) -> Option<&str> {
        self.sample_answer.as_deref()
    }

    #[must_use]
    pub fn has_choice(&self, option: &str) -> bool {
        self.choices.iter().any(|c| c == option)
    }

    /// Position of `option` among the choices, used to order selections.
    #[must_use]
    pub fn choice_index(&self, option: &str) -> Option<usize> {
        self.choices.iter().position(|c| c == option)
    }
}

fn validate_choices(id: &QuestionId, choices: Vec<String>) -> Result<Vec<String>, QuestionError> {
    const MIN_CHOICES: usize = 2;

    if choices.len() < MIN_CHOICES {
        return Err(QuestionError::TooFewChoices {
            id: id.clone(),
            min: MIN_CHOICES,
        });
    }
    for (i, choice) in choices.iter().enumerate() {
        if choices[..i].contains(choice) {
            return Err(QuestionError::DuplicateChoice {
                id: id.clone(),
                choice: choice.clone(),
            });
        }
    }
    Ok(choices)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn qid(raw: &str) -> QuestionId {
        QuestionId::new(raw).unwrap()
    }

    #[test]
    fn true_false_gets_default_choices() {
        let q = Question::new(qid("q1"), QuestionKind::TrueFalse, "Sky is blue?", vec![], 1.0)
            .unwrap();
        assert_eq!(q.choices(), ["True", "False"]);
    }

    #[test]
    fn rejects_non_positive_points() {
        let err = Question::new(qid("q1"), QuestionKind::FreeText, "Why?", vec![], 0.0)
            .unwrap_err();
        assert!(matches!(err, QuestionError::InvalidPoints { .. }));
    }

    #[test]
    fn free_text_cannot_have_choices() {
        let err = Question::new(
            qid("q1"),
            QuestionKind::FreeText,
            "Why?",
            vec!["A".into(), "B".into()],
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, QuestionError::UnexpectedChoices { .. }));
    }

    #[test]
    fn choice_questions_reject_duplicates() {
        let err = Question::new(
            qid("q1"),
            QuestionKind::MultiSelect,
            "Pick",
            vec!["A".into(), "B".into(), "A".into()],
            2.0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            QuestionError::DuplicateChoice {
                id: qid("q1"),
                choice: "A".into()
            }
        );
    }

    #[test]
    fn kind_accepts_backend_aliases() {
        let kind: QuestionKind = serde_json::from_str("\"multiple-choice\"").unwrap();
        assert_eq!(kind, QuestionKind::SingleChoice);
        let kind: QuestionKind = serde_json::from_str("\"checkbox\"").unwrap();
        assert_eq!(kind, QuestionKind::MultiSelect);
        let kind: QuestionKind = serde_json::from_str("\"free-text\"").unwrap();
        assert_eq!(kind, QuestionKind::FreeText);
    }
}
