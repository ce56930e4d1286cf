use std::collections::BTreeSet;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use workbench_logging::{wb_error, wb_info};

use crate::api::{ChannelEventSink, EventSink, GenerationApi, ReqwestGenerationApi};
use crate::{ApiError, ApiSettings, EngineEvent, PollPolicy, Poller, RequestId, TaskId};

/// How long teardown waits for in-flight requests before dropping them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

enum EngineCommand {
    CreateTask {
        request_id: RequestId,
        prompt: String,
        aspect_ratio: String,
    },
    SyncPolling {
        pending: BTreeSet<TaskId>,
    },
    Shutdown,
}

/// Owns the I/O thread: a tokio runtime that executes creation requests and
/// hosts the pollers. Events come back through `try_recv`/`recv_timeout`.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn new(settings: ApiSettings, policy: PollPolicy) -> Result<Self, ApiError> {
        let api = ReqwestGenerationApi::new(settings)?;
        Ok(Self::with_api(Arc::new(api), policy))
    }

    pub fn with_api(api: Arc<dyn GenerationApi>, policy: PollPolicy) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));

        let worker = thread::spawn(move || run_worker(api, sink, policy, cmd_rx));

        Self {
            cmd_tx,
            event_rx,
            worker: Some(worker),
        }
    }

    pub fn create_task(
        &self,
        request_id: RequestId,
        prompt: impl Into<String>,
        aspect_ratio: impl Into<String>,
    ) {
        let _ = self.cmd_tx.send(EngineCommand::CreateTask {
            request_id,
            prompt: prompt.into(),
            aspect_ratio: aspect_ratio.into(),
        });
    }

    pub fn sync_polling(&self, pending: BTreeSet<TaskId>) {
        let _ = self.cmd_tx.send(EngineCommand::SyncPolling { pending });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// False once the I/O thread has exited, e.g. after `shutdown` or when
    /// its runtime could not start.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Cancels all pollers and stops the I/O thread. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if worker.join().is_err() {
            wb_error!("Engine worker thread panicked");
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    api: Arc<dyn GenerationApi>,
    sink: Arc<dyn EventSink>,
    policy: PollPolicy,
    cmd_rx: mpsc::Receiver<EngineCommand>,
) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            wb_error!("Failed to start engine runtime: {}", err);
            return;
        }
    };

    {
        let _guard = runtime.enter();
        let mut poller = Poller::new(api.clone(), sink.clone(), policy);

        while let Ok(command) = cmd_rx.recv() {
            match command {
                EngineCommand::CreateTask {
                    request_id,
                    prompt,
                    aspect_ratio,
                } => {
                    let api = api.clone();
                    let sink = sink.clone();
                    runtime.spawn(async move {
                        let result = api.create_task(&prompt, &aspect_ratio).await;
                        match &result {
                            Ok(task_id) => wb_info!(
                                "Task created request_id={} task_id={}",
                                request_id,
                                task_id
                            ),
                            Err(err) => wb_error!(
                                "Task creation failed request_id={} error={}",
                                request_id,
                                err
                            ),
                        }
                        sink.emit(EngineEvent::TaskCreated { request_id, result });
                    });
                }
                EngineCommand::SyncPolling { pending } => {
                    poller.sync(&pending);
                }
                EngineCommand::Shutdown => break,
            }
        }

        poller.shutdown();
    }

    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}
