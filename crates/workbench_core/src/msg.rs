#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the prompt input.
    InputChanged(String),
    /// User picked an aspect ratio for the next batch.
    AspectRatioSelected(String),
    /// User submitted the current input; one task per non-empty line.
    SubmitClicked,
    /// Chat history loaded from the persistence sink.
    HistoryRestored(Vec<crate::ChatEntry>),
    /// User confirmed clearing the chat history.
    ClearHistoryConfirmed,
    /// Creation request finished: the task id, or a failure description.
    DispatchFinished {
        request_id: crate::RequestId,
        result: Result<String, String>,
    },
    /// A poller observed a terminal status for a task.
    TaskSettled {
        task_id: String,
        outcome: crate::TaskOutcome,
    },
    /// Render tick.
    Tick,
    NoOp,
}
