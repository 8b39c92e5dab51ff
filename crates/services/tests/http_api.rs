use mockito::{Matcher, Server};
use serde_json::json;

use services::{ApiConfig, ApiError, CourseworkApi, HttpCourseworkApi};
use tutor_core::model::{AssignmentId, QuestionId, QuestionKind, Submission, SubmittedAnswer};

fn client(server: &Server, token: Option<&str>) -> HttpCourseworkApi {
    let config = ApiConfig::new(&format!("{}/api", server.url()), token.map(str::to_owned))
        .expect("valid base url");
    HttpCourseworkApi::new(config).expect("client")
}

fn submission() -> Submission {
    Submission {
        assignment_id: AssignmentId::new("cw-1").unwrap(),
        answers: vec![
            SubmittedAnswer {
                question_id: QuestionId::new("q1").unwrap(),
                answer_text: "B".into(),
            },
            SubmittedAnswer {
                question_id: QuestionId::new("q2").unwrap(),
                answer_text: String::new(),
            },
        ],
        time_taken_secs: 95,
    }
}

#[tokio::test]
async fn fetch_unwraps_envelope_and_sends_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/coursework/cw-1")
        .match_header("authorization", "Bearer s3cret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "success": true,
                "data": {
                    "_id": "cw-1",
                    "title": "Photosynthesis",
                    "timeLimit": 15,
                    "questions": [
                        { "_id": "q1", "type": "multiple-choice", "question": "Where?",
                          "options": ["Leaf", "Root"] },
                        { "_id": "q2", "type": "text", "question": "Why?" }
                    ]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let api = client(&server, Some("s3cret"));
    let assignment = api
        .fetch_assignment(&AssignmentId::new("cw-1").unwrap())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(assignment.title(), "Photosynthesis");
    assert_eq!(assignment.time_limit_secs(), Some(900));
    assert_eq!(assignment.questions()[0].kind(), QuestionKind::SingleChoice);
    assert_eq!(assignment.questions()[1].kind(), QuestionKind::FreeText);
}

#[tokio::test]
async fn fetch_maps_error_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/coursework/missing")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;

    let err = client(&server, None)
        .fetch_assignment(&AssignmentId::new("missing").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::HttpStatus(status) if status.as_u16() == 404));
}

#[tokio::test]
async fn submit_posts_answers_and_reads_score() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/coursework/cw-1/submit")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({
            "courseworkId": "cw-1",
            "answers": [
                { "questionId": "q1", "answer": "B" },
                { "questionId": "q2", "answer": "" }
            ],
            "timeTaken": 95
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "success": true,
                "message": "Submitted",
                "score": 4,
                "totalPoints": 5,
                "percentage": 80
            })
            .to_string(),
        )
        .create_async()
        .await;

    let score = client(&server, None).submit(&submission()).await.unwrap();

    mock.assert_async().await;
    assert!((score.scored_points - 4.0).abs() < f64::EPSILON);
    assert!((score.total_points - 5.0).abs() < f64::EPSILON);
    assert!((score.percentage - 80.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn submit_surfaces_backend_rejection() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/coursework/cw-1/submit")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(json!({ "success": false, "message": "Deadline has passed" }).to_string())
        .create_async()
        .await;

    let err = client(&server, None).submit(&submission()).await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected(msg) if msg == "Deadline has passed"));
}

#[tokio::test]
async fn malformed_payload_is_reported() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/coursework/cw-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "title": "no id" }).to_string())
        .create_async()
        .await;

    let err = client(&server, None)
        .fetch_assignment(&AssignmentId::new("cw-1").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidPayload(_)));
}
