use crate::{ChatEntry, Origin};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub entries: Vec<EntryView>,
    pub generating: bool,
    pub input: String,
    pub aspect_ratio: String,
    pub pending_tasks: usize,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    pub origin: Origin,
    pub text: Option<String>,
    pub result_urls: Vec<String>,
    pub pending: bool,
    pub task_id: Option<String>,
    /// "prompt · ratio" caption shown above results.
    pub caption: Option<String>,
}

impl EntryView {
    pub(crate) fn from_entry(entry: &ChatEntry) -> Self {
        let caption = match (&entry.result_urls, &entry.source_prompt) {
            (Some(_), Some(prompt)) => Some(match &entry.aspect_ratio {
                Some(ratio) => format!("{prompt} · {ratio}"),
                None => prompt.clone(),
            }),
            _ => None,
        };
        Self {
            origin: entry.origin,
            text: entry.display_text.clone(),
            result_urls: entry.result_urls.clone().unwrap_or_default(),
            pending: entry.pending,
            task_id: entry.task_id.clone(),
            caption,
        }
    }
}
