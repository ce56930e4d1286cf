use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use workbench_logging::{wb_debug, wb_info, wb_warn};

use crate::registry::{plan_polling, PollPlan, PollingRegistry};
use crate::{EngineEvent, EventSink, GenerationApi, TaskId, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Give up on a task after this many consecutive failed status checks.
    /// `None` polls until a terminal status or teardown.
    pub max_consecutive_errors: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_consecutive_errors: None,
        }
    }
}

/// Runs one status-check loop per pending task.
///
/// `sync` spawns onto the ambient tokio runtime, so it must be called from
/// inside one.
pub struct Poller {
    api: Arc<dyn GenerationApi>,
    sink: Arc<dyn EventSink>,
    policy: PollPolicy,
    registry: PollingRegistry,
}

impl Poller {
    pub fn new(api: Arc<dyn GenerationApi>, sink: Arc<dyn EventSink>, policy: PollPolicy) -> Self {
        Self {
            api,
            sink,
            policy,
            registry: PollingRegistry::new(),
        }
    }

    /// Starts pollers for newly pending tasks and cancels pollers for tasks
    /// that are no longer pending.
    pub fn sync(&mut self, pending: &BTreeSet<TaskId>) -> PollPlan {
        let plan = plan_polling(pending, &self.registry.live());

        for task_id in &plan.stop {
            if self.registry.remove(task_id) {
                wb_debug!("Polling stopped task_id={}", task_id);
            }
        }

        for task_id in &plan.start {
            let token = CancellationToken::new();
            if !self.registry.insert(task_id.clone(), token.clone()) {
                continue;
            }
            wb_info!(
                "Polling started task_id={} interval={:?}",
                task_id,
                self.policy.interval
            );
            tokio::spawn(poll_task(
                task_id.clone(),
                self.api.clone(),
                self.sink.clone(),
                self.policy.clone(),
                token,
            ));
        }

        plan
    }

    /// Cancels every poller. Safe to call repeatedly.
    pub fn shutdown(&mut self) -> usize {
        let cancelled = self.registry.clear();
        if cancelled > 0 {
            wb_info!("Polling shut down, cancelled {} timer(s)", cancelled);
        }
        cancelled
    }

    pub fn live_tasks(&self) -> BTreeSet<TaskId> {
        self.registry.live()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn poll_task(
    task_id: TaskId,
    api: Arc<dyn GenerationApi>,
    sink: Arc<dyn EventSink>,
    policy: PollPolicy,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_errors: u32 = 0;

    loop {
        // The first tick completes immediately.
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let result = api.check_status(&task_id).await;
        if cancel.is_cancelled() {
            wb_debug!("Discarding status for cancelled task_id={}", task_id);
            return;
        }

        match result {
            Ok(TaskStatus::Pending { status }) => {
                consecutive_errors = 0;
                wb_debug!("Task still pending task_id={} status={:?}", task_id, status);
            }
            Ok(status) => {
                wb_info!("Task settled task_id={} status={:?}", task_id, status);
                sink.emit(EngineEvent::TaskSettled { task_id, status });
                return;
            }
            Err(err) => {
                consecutive_errors = consecutive_errors.saturating_add(1);
                wb_debug!(
                    "Status check failed task_id={} attempt={} error={}",
                    task_id,
                    consecutive_errors,
                    err
                );
                if let Some(limit) = policy.max_consecutive_errors {
                    if consecutive_errors >= limit {
                        wb_warn!(
                            "Giving up on task_id={} after {} failed status checks",
                            task_id,
                            consecutive_errors
                        );
                        sink.emit(EngineEvent::TaskSettled {
                            task_id,
                            status: TaskStatus::Failed {
                                error: Some(format!(
                                    "Status check failed {consecutive_errors} times in a row: {err}"
                                )),
                            },
                        });
                        return;
                    }
                }
            }
        }
    }
}
