use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Issue one creation request to the generation service.
    CreateTask {
        request_id: crate::RequestId,
        prompt: String,
        aspect_ratio: String,
    },
    /// Reconcile live pollers against the tasks that are still pending.
    SyncPolling { pending: BTreeSet<String> },
    /// Write the full history to the persistence sink.
    PersistHistory { entries: Vec<crate::ChatEntry> },
    /// Remove the stored history.
    ClearPersistedHistory,
}
