use std::time::Duration;

use workbench_core::{Effect, Msg, TaskOutcome};
use workbench_engine::{BlobStore, EngineEvent, EngineHandle, TaskStatus};
use workbench_logging::{wb_debug, wb_info, wb_warn};

use crate::persistence::{clear_history, save_history};

/// Executes core effects against the engine and the history store, and
/// turns engine events back into core messages.
pub struct EffectRunner {
    engine: EngineHandle,
    store: Box<dyn BlobStore>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, store: Box<dyn BlobStore>) -> Self {
        Self { engine, store }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CreateTask {
                    request_id,
                    prompt,
                    aspect_ratio,
                } => {
                    wb_info!(
                        "CreateTask request_id={} aspect_ratio={} prompt_len={}",
                        request_id,
                        aspect_ratio,
                        prompt.len()
                    );
                    self.engine.create_task(request_id, prompt, aspect_ratio);
                }
                Effect::SyncPolling { pending } => {
                    wb_debug!("SyncPolling pending={}", pending.len());
                    self.engine.sync_polling(pending);
                }
                Effect::PersistHistory { entries } => {
                    save_history(self.store.as_ref(), &entries);
                }
                Effect::ClearPersistedHistory => {
                    clear_history(self.store.as_ref());
                }
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(event_to_msg)
    }

    pub fn engine_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Tears down every poller; no status check runs after this returns.
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }
}

pub(crate) fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::TaskCreated { request_id, result } => Msg::DispatchFinished {
            request_id,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::TaskSettled { task_id, status } => match map_status(status) {
            Some(outcome) => Msg::TaskSettled { task_id, outcome },
            None => {
                wb_warn!("Ignoring non-terminal settle event for task_id={}", task_id);
                Msg::NoOp
            }
        },
    }
}

fn map_status(status: TaskStatus) -> Option<TaskOutcome> {
    match status {
        TaskStatus::Completed { result_urls } => Some(TaskOutcome::Completed { result_urls }),
        TaskStatus::Failed { error } => Some(TaskOutcome::Failed { error }),
        TaskStatus::Pending { .. } => None,
    }
}
