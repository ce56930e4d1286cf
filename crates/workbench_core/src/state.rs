use std::collections::{BTreeMap, BTreeSet};

use crate::view_model::{AppViewModel, EntryView};

pub type RequestId = u64;

/// Aspect ratios offered by the generation service, widest first.
pub const ASPECT_RATIOS: [&str; 8] = ["21:9", "16:9", "3:2", "4:3", "1:1", "3:4", "2:3", "9:16"];
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

/// Shown when the service reports a failure without an error text.
pub const UNKNOWN_TASK_ERROR: &str = "Unknown error occurred.";
pub const DISPATCH_ERROR_PREFIX: &str = "Failed to start generation for prompt: ";
const MISSING_TASK_ID: &str = "response did not contain a task id";
const INTERRUPTED_TASK: &str = "Generation was interrupted before a task id was assigned.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Assistant,
}

/// One unit of conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub origin: Origin,
    pub display_text: Option<String>,
    pub result_urls: Option<Vec<String>>,
    pub pending: bool,
    pub task_id: Option<String>,
    pub source_prompt: Option<String>,
    pub aspect_ratio: Option<String>,
}

impl ChatEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::User,
            display_text: Some(text.into()),
            result_urls: None,
            pending: false,
            task_id: None,
            source_prompt: None,
            aspect_ratio: None,
        }
    }

    pub fn pending_task(
        task_id: impl Into<String>,
        prompt: impl Into<String>,
        aspect_ratio: impl Into<String>,
    ) -> Self {
        Self {
            origin: Origin::Assistant,
            display_text: None,
            result_urls: None,
            pending: true,
            task_id: Some(task_id.into()),
            source_prompt: Some(prompt.into()),
            aspect_ratio: Some(aspect_ratio.into()),
        }
    }

    /// Assistant entry that carries only text, e.g. a dispatch failure.
    pub fn assistant_message(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Assistant,
            display_text: Some(text.into()),
            result_urls: None,
            pending: false,
            task_id: None,
            source_prompt: None,
            aspect_ratio: None,
        }
    }

    /// Task id of this entry while it still awaits a terminal status.
    pub fn pending_task_id(&self) -> Option<&str> {
        if !self.pending {
            return None;
        }
        self.task_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Terminal status of a generation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { result_urls: Vec<String> },
    Failed { error: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlightDispatch {
    prompt: String,
    aspect_ratio: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    input: String,
    aspect_ratio: String,
    entries: Vec<ChatEntry>,
    in_flight: BTreeMap<RequestId, InFlightDispatch>,
    next_request_id: RequestId,
    history_changed: bool,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            input: String::new(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            entries: Vec::new(),
            in_flight: BTreeMap::new(),
            next_request_id: 1,
            history_changed: false,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            entries: self.entries.iter().map(EntryView::from_entry).collect(),
            generating: self.is_generating(),
            input: self.input.clone(),
            aspect_ratio: self.aspect_ratio.clone(),
            pending_tasks: self.pending_task_ids().len(),
            dirty: self.dirty,
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn aspect_ratio(&self) -> &str {
        &self.aspect_ratio
    }

    /// True while any dispatch of the current batch awaits its response.
    pub fn is_generating(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Task ids that should currently have a live poller.
    pub fn pending_task_ids(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter_map(ChatEntry::pending_task_id)
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Returns whether a render is due and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn take_history_changed(&mut self) -> bool {
        std::mem::take(&mut self.history_changed)
    }

    pub(crate) fn set_input(&mut self, text: String) {
        if self.input != text {
            self.input = text;
            self.dirty = true;
        }
    }

    pub(crate) fn select_aspect_ratio(&mut self, ratio: &str) -> bool {
        if !ASPECT_RATIOS.contains(&ratio) {
            return false;
        }
        if self.aspect_ratio != ratio {
            self.aspect_ratio = ratio.to_string();
            self.dirty = true;
        }
        true
    }

    /// Starts a batch from the current input: clears the input, appends one
    /// user entry per prompt and records each dispatch as in flight.
    pub(crate) fn begin_batch(&mut self, prompts: Vec<String>) -> Vec<(RequestId, String, String)> {
        self.input.clear();
        let mut dispatches = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            let request_id = self.next_request_id;
            self.next_request_id += 1;
            self.entries.push(ChatEntry::user(prompt.clone()));
            self.in_flight.insert(
                request_id,
                InFlightDispatch {
                    prompt: prompt.clone(),
                    aspect_ratio: self.aspect_ratio.clone(),
                },
            );
            dispatches.push((request_id, prompt, self.aspect_ratio.clone()));
        }
        self.mark_history_changed();
        dispatches
    }

    pub(crate) fn finish_dispatch(&mut self, request_id: RequestId, result: Result<String, String>) {
        let Some(dispatch) = self.in_flight.remove(&request_id) else {
            return;
        };

        let result = result.and_then(|task_id| {
            if task_id.trim().is_empty() {
                Err(MISSING_TASK_ID.to_string())
            } else {
                Ok(task_id)
            }
        });

        let entry = match result {
            Ok(task_id) => ChatEntry::pending_task(task_id, dispatch.prompt, dispatch.aspect_ratio),
            Err(cause) => ChatEntry::assistant_message(format!(
                "{DISPATCH_ERROR_PREFIX}{} ({cause})",
                dispatch.prompt
            )),
        };
        self.entries.push(entry);
        self.mark_history_changed();
    }

    /// Moves every pending entry for `task_id` to its terminal state.
    /// Entries that already settled are left untouched.
    pub(crate) fn settle_task(&mut self, task_id: &str, outcome: &TaskOutcome) -> bool {
        let mut settled = false;
        for entry in self
            .entries
            .iter_mut()
            .filter(|entry| entry.pending_task_id() == Some(task_id))
        {
            entry.pending = false;
            match outcome {
                TaskOutcome::Completed { result_urls } => {
                    entry.result_urls = Some(result_urls.clone());
                    entry.display_text = None;
                }
                TaskOutcome::Failed { error } => {
                    let text = error
                        .as_deref()
                        .filter(|text| !text.trim().is_empty())
                        .unwrap_or(UNKNOWN_TASK_ERROR);
                    entry.display_text = Some(text.to_string());
                }
            }
            settled = true;
        }
        if settled {
            self.mark_history_changed();
        }
        settled
    }

    /// Replaces the history with restored entries. Pending entries that lost
    /// their task id can never be polled, so they are settled with a notice
    /// and the repaired history counts as changed. Returns whether any entry
    /// was repaired.
    pub(crate) fn restore_entries(&mut self, entries: Vec<ChatEntry>) -> bool {
        let mut repaired = false;
        self.entries = entries
            .into_iter()
            .map(|mut entry| {
                if entry.pending && entry.pending_task_id().is_none() {
                    entry.pending = false;
                    entry.task_id = None;
                    entry.display_text = Some(INTERRUPTED_TASK.to_string());
                    repaired = true;
                }
                entry
            })
            .collect();
        self.dirty = true;
        if repaired {
            self.mark_history_changed();
        }
        repaired
    }

    pub(crate) fn clear_history(&mut self) {
        self.entries.clear();
        self.dirty = true;
    }

    fn mark_history_changed(&mut self) {
        self.history_changed = true;
        self.dirty = true;
    }
}
