use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use workbench_engine::{
    ApiError, EngineEvent, EventSink, FailureKind, GenerationApi, PollPolicy, Poller, TaskId,
    TaskStatus,
};

const INTERVAL: Duration = Duration::from_secs(60);

/// Scripted generation service: each status check pops the next scripted
/// reply for the task, and reports `pending` once the script runs out.
#[derive(Default)]
struct ScriptedApi {
    scripts: Mutex<HashMap<TaskId, VecDeque<Result<TaskStatus, ApiError>>>>,
    calls: Mutex<Vec<TaskId>>,
}

impl ScriptedApi {
    fn with_script(task_id: &str, replies: Vec<Result<TaskStatus, ApiError>>) -> Arc<Self> {
        let api = Self::default();
        api.scripts
            .lock()
            .unwrap()
            .insert(task_id.to_string(), replies.into());
        Arc::new(api)
    }

    fn calls_for(&self, task_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == task_id)
            .count()
    }
}

#[async_trait::async_trait]
impl GenerationApi for ScriptedApi {
    async fn create_task(&self, _prompt: &str, _aspect_ratio: &str) -> Result<TaskId, ApiError> {
        unreachable!("poller never creates tasks")
    }

    async fn check_status(&self, task_id: &str) -> Result<TaskStatus, ApiError> {
        self.calls.lock().unwrap().push(task_id.to_string());
        self.scripts
            .lock()
            .unwrap()
            .get_mut(task_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(pending()))
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn pending() -> TaskStatus {
    TaskStatus::Pending {
        status: "pending".to_string(),
    }
}

fn transport_error() -> ApiError {
    ApiError {
        kind: FailureKind::Network,
        message: "connection refused".to_string(),
    }
}

fn tasks(ids: &[&str]) -> BTreeSet<TaskId> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn poller(api: Arc<ScriptedApi>, sink: Arc<RecordingSink>) -> Poller {
    Poller::new(
        api,
        sink,
        PollPolicy {
            interval: INTERVAL,
            max_consecutive_errors: None,
        },
    )
}

/// Lets spawned pollers run, advancing the paused clock by `duration`.
async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[tokio::test(start_paused = true)]
async fn polls_immediately_then_every_interval_until_completed() {
    let api = ScriptedApi::with_script(
        "t1",
        vec![
            Ok(pending()),
            Ok(pending()),
            Ok(TaskStatus::Completed {
                result_urls: vec!["u1".to_string(), "u2".to_string()],
            }),
        ],
    );
    let sink = Arc::new(RecordingSink::default());
    let mut poller = poller(api.clone(), sink.clone());

    poller.sync(&tasks(&["t1"]));
    advance(Duration::from_secs(1)).await;
    assert_eq!(api.calls_for("t1"), 1);
    assert!(sink.take().is_empty());

    advance(INTERVAL).await;
    assert_eq!(api.calls_for("t1"), 2);

    advance(INTERVAL).await;
    assert_eq!(api.calls_for("t1"), 3);
    assert_eq!(
        sink.take(),
        vec![EngineEvent::TaskSettled {
            task_id: "t1".to_string(),
            status: TaskStatus::Completed {
                result_urls: vec!["u1".to_string(), "u2".to_string()],
            },
        }]
    );

    // The settled entry leaves the pending set; its timer is removed.
    let plan = poller.sync(&tasks(&[]));
    assert_eq!(plan.stop, vec!["t1".to_string()]);
    assert!(poller.live_tasks().is_empty());

    advance(INTERVAL * 5).await;
    assert_eq!(api.calls_for("t1"), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_task_stops_polling() {
    let api = ScriptedApi::with_script(
        "t1",
        vec![Ok(TaskStatus::Failed {
            error: Some("boom".to_string()),
        })],
    );
    let sink = Arc::new(RecordingSink::default());
    let mut poller = poller(api.clone(), sink.clone());

    poller.sync(&tasks(&["t1"]));
    advance(INTERVAL * 3).await;

    assert_eq!(api.calls_for("t1"), 1);
    assert_eq!(
        sink.take(),
        vec![EngineEvent::TaskSettled {
            task_id: "t1".to_string(),
            status: TaskStatus::Failed {
                error: Some("boom".to_string()),
            },
        }]
    );

    let plan = poller.sync(&tasks(&[]));
    assert_eq!(plan.stop, vec!["t1".to_string()]);
    assert_eq!(poller.sync(&tasks(&[])).stop, Vec::<TaskId>::new());
}

#[tokio::test(start_paused = true)]
async fn transport_error_keeps_task_pending() {
    let api = ScriptedApi::with_script("t1", vec![Err(transport_error()), Ok(pending())]);
    let sink = Arc::new(RecordingSink::default());
    let mut poller = poller(api.clone(), sink.clone());

    poller.sync(&tasks(&["t1"]));
    advance(Duration::from_secs(1)).await;
    assert_eq!(api.calls_for("t1"), 1);
    assert!(sink.take().is_empty());

    advance(INTERVAL).await;
    assert_eq!(api.calls_for("t1"), 2);
    assert!(sink.take().is_empty());
    assert_eq!(poller.live_tasks(), tasks(&["t1"]));

    advance(INTERVAL).await;
    assert_eq!(api.calls_for("t1"), 3);
}

#[tokio::test(start_paused = true)]
async fn repeated_sync_keeps_one_timer_per_task() {
    let api = Arc::new(ScriptedApi::default());
    let sink = Arc::new(RecordingSink::default());
    let mut poller = poller(api.clone(), sink.clone());

    let first = poller.sync(&tasks(&["t1"]));
    let second = poller.sync(&tasks(&["t1"]));
    let third = poller.sync(&tasks(&["t1", "t2"]));

    assert_eq!(first.start, vec!["t1".to_string()]);
    assert!(second.is_empty());
    assert_eq!(third.start, vec!["t2".to_string()]);

    advance(Duration::from_secs(1)).await;
    assert_eq!(api.calls_for("t1"), 1);
    assert_eq!(api.calls_for("t2"), 1);

    advance(INTERVAL).await;
    assert_eq!(api.calls_for("t1"), 2);
    assert_eq!(api.calls_for("t2"), 2);
}

#[tokio::test(start_paused = true)]
async fn removed_task_is_no_longer_polled() {
    let api = Arc::new(ScriptedApi::default());
    let sink = Arc::new(RecordingSink::default());
    let mut poller = poller(api.clone(), sink.clone());

    poller.sync(&tasks(&["t1", "t2"]));
    advance(Duration::from_secs(1)).await;
    poller.sync(&tasks(&["t2"]));
    advance(INTERVAL * 2).await;

    assert_eq!(api.calls_for("t1"), 1);
    assert_eq!(api.calls_for("t2"), 3);
    assert_eq!(poller.live_tasks(), tasks(&["t2"]));
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_idempotent_and_stops_all_polling() {
    let api = Arc::new(ScriptedApi::default());
    let sink = Arc::new(RecordingSink::default());
    let mut poller = poller(api.clone(), sink.clone());

    poller.sync(&tasks(&["t1", "t2"]));
    advance(Duration::from_secs(1)).await;

    assert_eq!(poller.shutdown(), 2);
    assert!(poller.live_tasks().is_empty());
    assert_eq!(poller.shutdown(), 0);
    assert!(poller.live_tasks().is_empty());

    advance(INTERVAL * 3).await;
    assert_eq!(api.calls_for("t1"), 1);
    assert_eq!(api.calls_for("t2"), 1);
    assert!(sink.take().is_empty());
}

#[tokio::test(start_paused = true)]
async fn error_cap_fails_task_when_configured() {
    let api = ScriptedApi::with_script(
        "t1",
        vec![
            Err(transport_error()),
            Err(transport_error()),
            Err(transport_error()),
        ],
    );
    let sink = Arc::new(RecordingSink::default());
    let mut poller = Poller::new(
        api.clone(),
        sink.clone(),
        PollPolicy {
            interval: INTERVAL,
            max_consecutive_errors: Some(3),
        },
    );

    poller.sync(&tasks(&["t1"]));
    advance(INTERVAL * 5).await;

    assert_eq!(api.calls_for("t1"), 3);
    let events = sink.take();
    assert_eq!(events.len(), 1);
    match &events[0] {
        EngineEvent::TaskSettled {
            task_id,
            status: TaskStatus::Failed { error: Some(error) },
        } => {
            assert_eq!(task_id, "t1");
            assert!(error.contains("3 times"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn dropping_poller_cancels_timers() {
    let api = Arc::new(ScriptedApi::default());
    let sink = Arc::new(RecordingSink::default());
    let mut poller = poller(api.clone(), sink.clone());

    poller.sync(&tasks(&["t1"]));
    advance(Duration::from_secs(1)).await;
    drop(poller);

    advance(INTERVAL * 3).await;
    assert_eq!(api.calls_for("t1"), 1);
}
