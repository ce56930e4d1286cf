use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// Every change to the chat history is followed by a `PersistHistory` and a
/// `SyncPolling` effect, so the sink and the poll registry always follow the
/// latest state.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let mut effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::AspectRatioSelected(ratio) => {
            state.select_aspect_ratio(&ratio);
            Vec::new()
        }
        Msg::SubmitClicked => {
            if state.is_generating() {
                return (state, Vec::new());
            }
            let prompts = parse_prompts(state.input());
            if prompts.is_empty() {
                return (state, Vec::new());
            }
            state
                .begin_batch(prompts)
                .into_iter()
                .map(|(request_id, prompt, aspect_ratio)| Effect::CreateTask {
                    request_id,
                    prompt,
                    aspect_ratio,
                })
                .collect()
        }
        Msg::DispatchFinished { request_id, result } => {
            state.finish_dispatch(request_id, result);
            Vec::new()
        }
        Msg::TaskSettled { task_id, outcome } => {
            state.settle_task(&task_id, &outcome);
            Vec::new()
        }
        Msg::HistoryRestored(entries) => {
            // A repaired history is persisted and synced below.
            if state.restore_entries(entries) {
                Vec::new()
            } else {
                vec![Effect::SyncPolling {
                    pending: state.pending_task_ids(),
                }]
            }
        }
        Msg::ClearHistoryConfirmed => {
            state.clear_history();
            vec![
                Effect::ClearPersistedHistory,
                Effect::SyncPolling {
                    pending: state.pending_task_ids(),
                },
            ]
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    if state.take_history_changed() {
        effects.push(Effect::PersistHistory {
            entries: state.entries().to_vec(),
        });
        effects.push(Effect::SyncPolling {
            pending: state.pending_task_ids(),
        });
    }

    (state, effects)
}

/// Splits raw input into trimmed, non-empty prompts.
pub fn parse_prompts(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
