//! Workbench engine: generation-service client, task polling and storage.
mod api;
mod engine;
mod persist;
mod poller;
mod registry;
mod status;
mod types;

pub use api::{ApiSettings, ChannelEventSink, EventSink, GenerationApi, ReqwestGenerationApi};
pub use engine::EngineHandle;
pub use persist::{ensure_dir, BlobStore, FileBlobStore, PersistError};
pub use poller::{PollPolicy, Poller};
pub use registry::{plan_polling, PollPlan, PollingRegistry};
pub use status::{extract_result_urls, interpret_status};
pub use types::{
    ApiError, CreateTaskRequest, EngineEvent, FailureKind, RequestId, StatusResponse, TaskId,
    TaskStatus,
};
