use chrono::Utc;
use serde::{Deserialize, Serialize};
use workbench_core::{ChatEntry, Origin};
use workbench_engine::BlobStore;
use workbench_logging::{wb_error, wb_info, wb_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum PersistedOrigin {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedEntry {
    origin: PersistedOrigin,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    result_urls: Option<Vec<String>>,
    #[serde(default)]
    pending: bool,
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    aspect_ratio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
struct PersistedHistory {
    #[serde(default)]
    saved_utc: Option<String>,
    entries: Vec<PersistedEntry>,
}

impl From<&ChatEntry> for PersistedEntry {
    fn from(entry: &ChatEntry) -> Self {
        Self {
            origin: match entry.origin {
                Origin::User => PersistedOrigin::User,
                Origin::Assistant => PersistedOrigin::Assistant,
            },
            text: entry.display_text.clone(),
            result_urls: entry.result_urls.clone(),
            pending: entry.pending,
            task_id: entry.task_id.clone(),
            prompt: entry.source_prompt.clone(),
            aspect_ratio: entry.aspect_ratio.clone(),
        }
    }
}

impl From<PersistedEntry> for ChatEntry {
    fn from(entry: PersistedEntry) -> Self {
        Self {
            origin: match entry.origin {
                PersistedOrigin::User => Origin::User,
                PersistedOrigin::Assistant => Origin::Assistant,
            },
            display_text: entry.text,
            result_urls: entry.result_urls,
            pending: entry.pending,
            task_id: entry.task_id,
            source_prompt: entry.prompt,
            aspect_ratio: entry.aspect_ratio,
        }
    }
}

/// Reads the stored history. Any failure is logged and yields an empty
/// history; the session keeps working in memory.
pub(crate) fn load_history(store: &dyn BlobStore) -> Vec<ChatEntry> {
    let content = match store.read() {
        Ok(Some(text)) => text,
        Ok(None) => return Vec::new(),
        Err(err) => {
            wb_warn!("Failed to read chat history: {}", err);
            return Vec::new();
        }
    };

    let history: PersistedHistory = match ron::from_str(&content) {
        Ok(history) => history,
        Err(err) => {
            wb_warn!("Failed to parse chat history: {}", err);
            return Vec::new();
        }
    };

    wb_info!("Loaded {} chat entries", history.entries.len());
    history.entries.into_iter().map(ChatEntry::from).collect()
}

pub(crate) fn save_history(store: &dyn BlobStore, entries: &[ChatEntry]) {
    let history = PersistedHistory {
        saved_utc: Some(Utc::now().to_rfc3339()),
        entries: entries.iter().map(PersistedEntry::from).collect(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&history, pretty) {
        Ok(text) => text,
        Err(err) => {
            wb_error!("Failed to serialize chat history: {}", err);
            return;
        }
    };

    if let Err(err) = store.write(&content) {
        wb_error!("Failed to write chat history: {}", err);
    }
}

pub(crate) fn clear_history(store: &dyn BlobStore) {
    match store.clear() {
        Ok(()) => wb_info!("Cleared chat history"),
        Err(err) => wb_error!("Failed to clear chat history: {}", err),
    }
}
