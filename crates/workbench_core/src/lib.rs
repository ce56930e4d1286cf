//! Workbench core: pure chat-state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{
    AppState, ChatEntry, Origin, RequestId, TaskOutcome, ASPECT_RATIOS, DEFAULT_ASPECT_RATIO,
    DISPATCH_ERROR_PREFIX, UNKNOWN_TASK_ERROR,
};
pub use update::{parse_prompts, update};
pub use view_model::{AppViewModel, EntryView};
