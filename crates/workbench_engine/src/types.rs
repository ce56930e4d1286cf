use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use workbench_logging::wb_debug;

pub type TaskId = String;
pub type RequestId = u64;

/// Body of the creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTaskRequest {
    pub prompt: String,
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub(crate) struct CreateTaskResponse {
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Status document returned by `GET status/{task_id}`.
///
/// Link lists are read leniently: anything that is not an array is treated
/// as absent and non-string items are dropped, instead of failing the whole
/// document. A document without `status` is not a status document.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub extracted_links: Option<Vec<String>>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "string_list")]
    pub image_urls: Option<Vec<String>>,
    #[serde(default)]
    pub result: Option<Value>,
}

fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => {
            let total = items.len();
            let links: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text),
                    _ => None,
                })
                .collect();
            if links.len() < total {
                wb_debug!(
                    "Dropped {} non-string item(s) from a link list",
                    total - links.len()
                );
            }
            Some(links)
        }
        Some(Value::Null) | None => None,
        Some(other) => {
            wb_debug!("Ignoring non-array link list: {}", other);
            None
        }
    })
}

/// Interpreted task status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Not terminal yet; carries the raw status string for logging.
    Pending { status: String },
    Completed { result_urls: Vec<String> },
    Failed { error: Option<String> },
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A creation request finished.
    TaskCreated {
        request_id: RequestId,
        result: Result<TaskId, ApiError>,
    },
    /// A poller observed a terminal status. Emitted at most once per poller.
    TaskSettled { task_id: TaskId, status: TaskStatus },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    MissingTaskId,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "invalid response body"),
            FailureKind::MissingTaskId => write!(f, "missing task id"),
        }
    }
}
