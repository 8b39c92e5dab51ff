use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tutor_core::model::{
    Assignment, AssignmentId, Question, QuestionId, QuestionKind, Score, Submission,
};

use crate::error::ApiError;

/// Strip an optional `{ success, message, data }` envelope.
///
/// `success: false` becomes `ApiError::Rejected` carrying the backend message.
pub(super) fn open_envelope(value: Value) -> Result<Value, ApiError> {
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request was not successful");
        return Err(ApiError::Rejected(message.to_owned()));
    }
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

fn invalid(e: impl std::fmt::Display) -> ApiError {
    ApiError::InvalidPayload(e.to_string())
}

fn default_points() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AssignmentDto {
    #[serde(alias = "_id")]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "timeLimitMinutes")]
    time_limit: Option<u32>,
    #[serde(default, alias = "dueAt")]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    questions: Vec<QuestionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionDto {
    #[serde(alias = "_id")]
    id: String,
    #[serde(rename = "type", alias = "kind")]
    kind: QuestionKind,
    #[serde(default, alias = "text", alias = "prompt")]
    question: String,
    #[serde(default, alias = "choices")]
    options: Vec<String>,
    #[serde(default = "default_points")]
    points: f64,
    #[serde(default)]
    correct_answer: Option<String>,
    #[serde(default)]
    sample_answer: Option<String>,
}

impl TryFrom<AssignmentDto> for Assignment {
    type Error = ApiError;

    fn try_from(dto: AssignmentDto) -> Result<Self, Self::Error> {
        let id = AssignmentId::new(dto.id).map_err(invalid)?;
        let questions = dto
            .questions
            .into_iter()
            .map(|q| {
                let qid = QuestionId::new(q.id).map_err(invalid)?;
                Question::new(qid, q.kind, q.question, q.options, q.points)
                    .map(|question| question.with_key(q.correct_answer, q.sample_answer))
                    .map_err(invalid)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Assignment::new(id, dto.title, questions)
            .map_err(invalid)?
            .with_time_limit(dto.time_limit)
            .with_due_at(dto.due_date))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SubmitRequest<'a> {
    coursework_id: &'a str,
    answers: Vec<AnswerDto<'a>>,
    time_taken: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerDto<'a> {
    question_id: &'a str,
    answer: &'a str,
}

impl<'a> From<&'a Submission> for SubmitRequest<'a> {
    fn from(submission: &'a Submission) -> Self {
        Self {
            coursework_id: submission.assignment_id.as_str(),
            answers: submission
                .answers
                .iter()
                .map(|a| AnswerDto {
                    question_id: a.question_id.as_str(),
                    answer: &a.answer_text,
                })
                .collect(),
            time_taken: submission.time_taken_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SubmitResponse {
    score: f64,
    total_points: f64,
    #[serde(default)]
    percentage: Option<f64>,
}

impl From<SubmitResponse> for Score {
    fn from(res: SubmitResponse) -> Self {
        let percentage = res.percentage.unwrap_or_else(|| {
            if res.total_points > 0.0 {
                res.score / res.total_points * 100.0
            } else {
                0.0
            }
        });
        Score {
            scored_points: res.score,
            total_points: res.total_points,
            percentage,
        }
    }
}
