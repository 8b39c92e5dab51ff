use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use tutor_core::model::{Assignment, AssignmentId, Score, Submission};

use super::CourseworkApi;
use super::wire::{AssignmentDto, SubmitRequest, SubmitResponse, open_envelope};
use crate::config::ApiConfig;
use crate::error::ApiError;

/// `CourseworkApi` over HTTPS with an optional bearer token.
#[derive(Clone)]
pub struct HttpCourseworkApi {
    client: Client,
    config: ApiConfig,
}

impl HttpCourseworkApi {
    /// Build a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be constructed.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.config.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_json(response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        if !status.is_success() {
            // Error bodies often carry `{ success: false, message }`.
            if let Ok(body) = response.json::<Value>().await {
                if let Err(rejected @ ApiError::Rejected(_)) = open_envelope(body) {
                    tracing::warn!(%status, error = %rejected, "backend rejected request");
                    return Err(rejected);
                }
            }
            return Err(ApiError::HttpStatus(status));
        }
        let body: Value = response.json().await?;
        open_envelope(body)
    }
}

#[async_trait]
impl CourseworkApi for HttpCourseworkApi {
    async fn fetch_assignment(&self, id: &AssignmentId) -> Result<Assignment, ApiError> {
        let url = self.endpoint(&["coursework", id.as_str()])?;
        tracing::debug!(%url, "fetching assignment");

        let response = self.authorize(self.client.get(url)).send().await?;
        let body = Self::read_json(response).await?;
        let dto: AssignmentDto =
            serde_json::from_value(body).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
        Assignment::try_from(dto)
    }

    async fn submit(&self, submission: &Submission) -> Result<Score, ApiError> {
        let url = self.endpoint(&["coursework", submission.assignment_id.as_str(), "submit"])?;
        tracing::debug!(
            %url,
            answers = submission.answers.len(),
            time_taken_secs = submission.time_taken_secs,
            "submitting answers"
        );

        let response = self
            .authorize(self.client.post(url))
            .json(&SubmitRequest::from(submission))
            .send()
            .await?;
        let body = Self::read_json(response).await?;
        let parsed: SubmitResponse =
            serde_json::from_value(body).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
        Ok(parsed.into())
    }
}
