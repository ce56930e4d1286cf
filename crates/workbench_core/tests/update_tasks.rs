use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use workbench_core::{
    update, AppState, ChatEntry, Effect, Msg, TaskOutcome, UNKNOWN_TASK_ERROR,
};

fn state_with_tasks(task_ids: &[&str]) -> AppState {
    let mut entries = Vec::new();
    for task_id in task_ids {
        entries.push(ChatEntry::user(format!("prompt for {task_id}")));
        entries.push(ChatEntry::pending_task(
            *task_id,
            format!("prompt for {task_id}"),
            "1:1",
        ));
    }
    let (state, _) = update(AppState::new(), Msg::HistoryRestored(entries));
    state
}

fn entry_for<'a>(state: &'a AppState, task_id: &str) -> &'a ChatEntry {
    state
        .entries()
        .iter()
        .find(|entry| entry.task_id.as_deref() == Some(task_id))
        .expect("task entry")
}

#[test]
fn completed_task_stores_urls_and_clears_text() {
    let state = state_with_tasks(&["t1", "t2"]);

    let (state, effects) = update(
        state,
        Msg::TaskSettled {
            task_id: "t1".to_string(),
            outcome: TaskOutcome::Completed {
                result_urls: vec!["u1".to_string(), "u2".to_string()],
            },
        },
    );

    let entry = entry_for(&state, "t1");
    assert!(!entry.pending);
    assert_eq!(
        entry.result_urls,
        Some(vec!["u1".to_string(), "u2".to_string()])
    );
    assert_eq!(entry.display_text, None);
    assert!(entry_for(&state, "t2").pending);
    assert_eq!(
        effects,
        vec![
            Effect::PersistHistory {
                entries: state.entries().to_vec(),
            },
            Effect::SyncPolling {
                pending: BTreeSet::from(["t2".to_string()]),
            },
        ]
    );
}

#[test]
fn failed_task_uses_service_error_text() {
    let state = state_with_tasks(&["t1"]);

    let (state, effects) = update(
        state,
        Msg::TaskSettled {
            task_id: "t1".to_string(),
            outcome: TaskOutcome::Failed {
                error: Some("content policy".to_string()),
            },
        },
    );

    let entry = entry_for(&state, "t1");
    assert!(!entry.pending);
    assert_eq!(entry.display_text.as_deref(), Some("content policy"));
    assert_eq!(entry.result_urls, None);
    assert!(effects.contains(&Effect::SyncPolling {
        pending: BTreeSet::new(),
    }));
}

#[test]
fn failed_task_without_text_uses_fallback() {
    let state = state_with_tasks(&["t1"]);

    let (state, _) = update(
        state,
        Msg::TaskSettled {
            task_id: "t1".to_string(),
            outcome: TaskOutcome::Failed { error: None },
        },
    );

    assert_eq!(
        entry_for(&state, "t1").display_text.as_deref(),
        Some(UNKNOWN_TASK_ERROR)
    );
}

#[test]
fn terminal_state_is_not_reentered() {
    let state = state_with_tasks(&["t1"]);
    let (state, _) = update(
        state,
        Msg::TaskSettled {
            task_id: "t1".to_string(),
            outcome: TaskOutcome::Completed {
                result_urls: vec!["u1".to_string()],
            },
        },
    );
    let before = state.clone();

    let (state, effects) = update(
        state,
        Msg::TaskSettled {
            task_id: "t1".to_string(),
            outcome: TaskOutcome::Failed {
                error: Some("late".to_string()),
            },
        },
    );

    assert_eq!(state, before);
    assert!(effects.is_empty());
}

#[test]
fn settling_unknown_task_changes_nothing() {
    let state = state_with_tasks(&["t1"]);
    let before = state.clone();

    let (state, effects) = update(
        state,
        Msg::TaskSettled {
            task_id: "other".to_string(),
            outcome: TaskOutcome::Completed {
                result_urls: Vec::new(),
            },
        },
    );

    assert_eq!(state, before);
    assert!(effects.is_empty());
}

#[test]
fn restore_requests_polling_for_pending_tasks_only() {
    let mut settled = ChatEntry::pending_task("done", "p", "1:1");
    settled.pending = false;
    settled.result_urls = Some(vec!["u".to_string()]);
    let entries = vec![
        ChatEntry::user("p"),
        settled,
        ChatEntry::pending_task("live", "q", "4:3"),
    ];

    let (state, effects) = update(AppState::new(), Msg::HistoryRestored(entries.clone()));

    assert_eq!(state.entries(), entries.as_slice());
    assert_eq!(
        effects,
        vec![Effect::SyncPolling {
            pending: BTreeSet::from(["live".to_string()]),
        }]
    );
}

#[test]
fn restore_settles_pending_entries_without_task_id() {
    let mut orphan = ChatEntry::pending_task("", "p", "1:1");
    orphan.task_id = None;
    let mut blank = ChatEntry::pending_task("", "q", "1:1");
    blank.task_id = Some(String::new());

    let (state, effects) = update(
        AppState::new(),
        Msg::HistoryRestored(vec![ChatEntry::user("p"), orphan, blank]),
    );

    assert!(state.entries().iter().all(|entry| !entry.pending));
    assert!(state.entries()[1..]
        .iter()
        .all(|entry| entry.display_text.is_some() && entry.task_id.is_none()));
    assert_eq!(
        effects,
        vec![
            Effect::PersistHistory {
                entries: state.entries().to_vec(),
            },
            Effect::SyncPolling {
                pending: BTreeSet::new(),
            },
        ]
    );

    // Once stored, the repaired history restores without another write.
    let (_, effects) = update(
        AppState::new(),
        Msg::HistoryRestored(state.entries().to_vec()),
    );
    assert_eq!(
        effects,
        vec![Effect::SyncPolling {
            pending: BTreeSet::new(),
        }]
    );
}

#[test]
fn clear_history_drops_entries_and_stops_polling() {
    let state = state_with_tasks(&["t1", "t2"]);

    let (mut state, effects) = update(state, Msg::ClearHistoryConfirmed);

    assert!(state.entries().is_empty());
    assert!(state.consume_dirty());
    assert_eq!(
        effects,
        vec![
            Effect::ClearPersistedHistory,
            Effect::SyncPolling {
                pending: BTreeSet::new(),
            },
        ]
    );
}

#[test]
fn view_captions_completed_results() {
    let state = state_with_tasks(&["t1"]);
    let (state, _) = update(
        state,
        Msg::TaskSettled {
            task_id: "t1".to_string(),
            outcome: TaskOutcome::Completed {
                result_urls: vec!["u1".to_string()],
            },
        },
    );

    let view = state.view();
    let row = view
        .entries
        .iter()
        .find(|row| row.task_id.as_deref() == Some("t1"))
        .unwrap();
    assert_eq!(row.caption.as_deref(), Some("prompt for t1 · 1:1"));
    assert_eq!(row.result_urls, vec!["u1".to_string()]);
    assert_eq!(view.pending_tasks, 0);
}
