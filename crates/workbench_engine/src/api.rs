use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use url::Url;
use workbench_logging::wb_debug;

use crate::status::interpret_status;
use crate::types::CreateTaskResponse;
use crate::{ApiError, CreateTaskRequest, EngineEvent, FailureKind, StatusResponse, TaskId, TaskStatus};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Root of the generation service; `generate` and `status/{id}` are
    /// resolved below it.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// The external generation service.
#[async_trait::async_trait]
pub trait GenerationApi: Send + Sync {
    async fn create_task(&self, prompt: &str, aspect_ratio: &str) -> Result<TaskId, ApiError>;

    async fn check_status(&self, task_id: &str) -> Result<TaskStatus, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestGenerationApi {
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestGenerationApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { base_url, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::new(FailureKind::InvalidUrl, self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl GenerationApi for ReqwestGenerationApi {
    async fn create_task(&self, prompt: &str, aspect_ratio: &str) -> Result<TaskId, ApiError> {
        let url = self.endpoint(&["generate"])?;
        let body = serde_json::to_vec(&CreateTaskRequest {
            prompt: prompt.to_string(),
            aspect_ratio: aspect_ratio.to_string(),
        })
        .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(http_error(status));
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let parsed: CreateTaskResponse = serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;

        match parsed.task_id {
            Some(task_id) if !task_id.trim().is_empty() => Ok(task_id),
            _ => Err(ApiError::new(
                FailureKind::MissingTaskId,
                "creation response had no task_id",
            )),
        }
    }

    async fn check_status(&self, task_id: &str) -> Result<TaskStatus, ApiError> {
        let url = self.endpoint(&["status", task_id])?;
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        // A failed task may be reported with a 4xx, so a terminal status
        // document wins over the HTTP status. Anything else on an error
        // response is a failed check.
        match serde_json::from_slice::<StatusResponse>(&bytes) {
            Ok(document) if document.status.is_some() => {
                let interpreted = interpret_status(&document);
                wb_debug!("Status task_id={} http={} -> {:?}", task_id, status, interpreted);
                if !status.is_success() && !interpreted.is_terminal() {
                    return Err(http_error(status));
                }
                Ok(interpreted)
            }
            _ if !status.is_success() => Err(http_error(status)),
            Ok(_) => Err(ApiError::new(
                FailureKind::Decode,
                "status response had no status field",
            )),
            Err(err) => Err(ApiError::new(FailureKind::Decode, err.to_string())),
        }
    }
}

fn http_error(status: reqwest::StatusCode) -> ApiError {
    ApiError::new(FailureKind::HttpStatus(status.as_u16()), status.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
