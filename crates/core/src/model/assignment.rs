use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::AssignmentId;
use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssignmentError {
    #[error("question id {0} appears more than once")]
    DuplicateQuestion(String),
}

/// Coursework fetched from the backend; immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    id: AssignmentId,
    title: String,
    time_limit_minutes: Option<u32>,
    due_at: Option<DateTime<Utc>>,
    questions: Vec<Question>,
}

impl Assignment {
    /// Build an assignment from its questions.
    ///
    /// An empty question list is accepted here; a session refuses to start on it.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError::DuplicateQuestion` if two questions share an id.
    pub fn new(
        id: AssignmentId,
        title: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, AssignmentError> {
        for (i, q) in questions.iter().enumerate() {
            if questions[..i].iter().any(|other| other.id() == q.id()) {
                return Err(AssignmentError::DuplicateQuestion(q.id().to_string()));
            }
        }

        Ok(Self {
            id,
            title: title.into(),
            time_limit_minutes: None,
            due_at: None,
            questions,
        })
    }

    /// Set the time limit. `Some(0)` and `None` both mean untimed.
    #[must_use]
    pub fn with_time_limit(mut self, minutes: Option<u32>) -> Self {
        self.time_limit_minutes = minutes.filter(|m| *m > 0);
        self
    }

    #[must_use]
    pub fn with_due_at(mut self, due_at: Option<DateTime<Utc>>) -> Self {
        self.due_at = due_at;
        self
    }

    #[must_use]
    pub fn id(&self) -> &AssignmentId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> Option<u32> {
        self.time_limit_minutes
    }

    /// Time limit in seconds, if the assignment is timed.
    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u64> {
        self.time_limit_minutes.map(|m| u64::from(m) * 60)
    }

    #[must_use]
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due_at
    }

    #[must_use]
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at.is_some_and(|due| now > due)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn total_points(&self) -> f64 {
        self.questions.iter().map(Question::points).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionId, QuestionKind};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn free_text(id: &str, points: f64) -> Question {
        Question::new(QuestionId::new(id).unwrap(), QuestionKind::FreeText, "?", vec![], points)
            .unwrap()
    }

    #[test]
    fn zero_time_limit_means_untimed() {
        let a = Assignment::new(AssignmentId::new("a").unwrap(), "A", vec![free_text("q1", 1.0)])
            .unwrap()
            .with_time_limit(Some(0));
        assert_eq!(a.time_limit_secs(), None);

        let a = a.with_time_limit(Some(2));
        assert_eq!(a.time_limit_secs(), Some(120));
    }

    #[test]
    fn duplicate_question_ids_rejected() {
        let err = Assignment::new(
            AssignmentId::new("a").unwrap(),
            "A",
            vec![free_text("q1", 1.0), free_text("q1", 2.0)],
        )
        .unwrap_err();
        assert_eq!(err, AssignmentError::DuplicateQuestion("q1".into()));
    }

    #[test]
    fn past_due_is_strictly_after_deadline() {
        let now = fixed_now();
        let a = Assignment::new(AssignmentId::new("a").unwrap(), "A", vec![free_text("q1", 1.0)])
            .unwrap()
            .with_due_at(Some(now));
        assert!(!a.is_past_due(now));
        assert!(a.is_past_due(now + Duration::seconds(1)));
        assert!((a.total_points() - 1.0).abs() < f64::EPSILON);
    }
}
