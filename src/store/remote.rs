use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{ClearOutcome, QueueRepository, StoreError, TriageOutcome, CLEAR_UNSUPPORTED_MESSAGE};
use crate::models::{CompleteResponse, PatientRecord, SessionStatus, SubmitRequest, SubmitResponse};
use crate::triage::Intake;

const CONNECT_TIMEOUT_SECS: u64 = 5;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client of the queue backend.
///
/// Any non-success status is reported as a generic network error; client
/// and server faults are not told apart.
pub struct RemoteQueueStore {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteQueueStore {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Navigation target that starts the backend login flow.
    pub fn login_url(&self) -> String {
        format!("{}/login", self.base_url)
    }

    /// Navigation target that ends the backend session.
    pub fn logout_url(&self) -> String {
        format!("{}/logout", self.base_url)
    }

    /// `GET /session`.
    pub async fn session_status(&self) -> Result<SessionStatus, StoreError> {
        let response = self.send(self.client.get(format!("{}/session", self.base_url))).await?;
        Self::decode(response).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
        response
            .json()
            .await
            .map_err(|e| StoreError::MalformedResponse(e.to_string()))
    }

    /// `{base}/api/complete/{id}` with `id` encoded as a single path segment.
    fn complete_url(&self, id: &str) -> Result<reqwest::Url, StoreError> {
        let invalid = || StoreError::Transport(format!("Invalid backend URL {}", self.base_url));
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["api", "complete", id]);
        Ok(url)
    }

    fn transport_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_connect() {
            StoreError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            StoreError::Transport(format!("Request timed out after {REQUEST_TIMEOUT_SECS}s"))
        } else {
            StoreError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl QueueRepository for RemoteQueueStore {
    async fn list(&self) -> Result<Vec<PatientRecord>, StoreError> {
        let url = format!("{}/api/queue", self.base_url);
        let response = self.send(self.client.get(url)).await?;
        Self::decode(response).await
    }

    async fn append(&self, intake: &Intake) -> Result<TriageOutcome, StoreError> {
        let url = format!("{}/api/submit", self.base_url);
        let body = SubmitRequest::from(intake);
        let response = self.send(self.client.post(url).json(&body)).await?;
        let parsed: SubmitResponse = Self::decode(response).await?;

        tracing::info!(esi = parsed.esi.get(), "Intake submitted to backend");
        Ok(TriageOutcome {
            esi: parsed.esi,
            analysis: parsed.analysis.filter(|a| !a.trim().is_empty()),
        })
    }

    async fn resolve(&self, id: &str) -> Result<bool, StoreError> {
        let url = self.complete_url(id)?;
        let response = self.send(self.client.post(url)).await?;
        // Older backends answer with an empty body; treat that as success.
        match response.json::<CompleteResponse>().await {
            Ok(parsed) => Ok(parsed.success),
            Err(_) => Ok(true),
        }
    }

    async fn clear(&self) -> Result<ClearOutcome, StoreError> {
        tracing::info!("Clear requested on remote store; backend has no clear endpoint");
        Ok(ClearOutcome::Unsupported(CLEAR_UNSUPPORTED_MESSAGE))
    }
}
