use std::collections::{BTreeSet, HashMap};

use tokio_util::sync::CancellationToken;

use crate::TaskId;

/// Pollers to start and stop so the live set matches the desired set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollPlan {
    pub start: Vec<TaskId>,
    pub stop: Vec<TaskId>,
}

impl PollPlan {
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.stop.is_empty()
    }
}

/// Diffs the tasks that should be polled against the tasks that are.
pub fn plan_polling(desired: &BTreeSet<TaskId>, live: &BTreeSet<TaskId>) -> PollPlan {
    PollPlan {
        start: desired.difference(live).cloned().collect(),
        stop: live.difference(desired).cloned().collect(),
    }
}

/// Live poll timers keyed by task id. At most one timer per task.
#[derive(Debug, Default)]
pub struct PollingRegistry {
    timers: HashMap<TaskId, CancellationToken>,
}

impl PollingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a timer; returns false and leaves the registry unchanged if
    /// the task already has one.
    pub fn insert(&mut self, task_id: TaskId, token: CancellationToken) -> bool {
        if self.timers.contains_key(&task_id) {
            return false;
        }
        self.timers.insert(task_id, token);
        true
    }

    /// Cancels and forgets the timer for `task_id`.
    pub fn remove(&mut self, task_id: &str) -> bool {
        match self.timers.remove(task_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every timer; returns how many were live.
    pub fn clear(&mut self) -> usize {
        let count = self.timers.len();
        for (_, token) in self.timers.drain() {
            token.cancel();
        }
        count
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.timers.contains_key(task_id)
    }

    pub fn live(&self) -> BTreeSet<TaskId> {
        self.timers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
