use std::io::{self, BufRead, Read, Write};
use std::time::Duration;

use anyhow::{bail, Context};
use workbench_core::{update, AppState, AppViewModel, Msg, ASPECT_RATIOS};
use workbench_engine::{BlobStore, EngineHandle, FileBlobStore};
use workbench_logging::{wb_error, wb_info, wb_warn};

use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::effects::EffectRunner;
use crate::persistence::load_history;
use crate::render::{format_entry, Renderer};

/// How long the session waits for an engine event before re-checking.
const EVENT_WAIT: Duration = Duration::from_millis(250);

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::resolve(&cli.global)?;
    let store = FileBlobStore::new(config.history_path.clone());

    match cli.command {
        Command::History => {
            print_history(&store);
            Ok(())
        }
        Command::Clear { yes } => {
            if !yes && !confirm("Clear chat history? [y/N] ")? {
                println!("Aborted.");
                return Ok(());
            }
            let mut session = Session::start(&config, store, HistoryMode::Skip)?;
            session.dispatch(Msg::ClearHistoryConfirmed);
            session.shutdown();
            Ok(())
        }
        Command::Watch => {
            let mut session = Session::start(&config, store, HistoryMode::Show)?;
            if session.is_settled() {
                println!("No pending tasks.");
            }
            session.run_until_settled();
            session.shutdown();
            Ok(())
        }
        Command::Submit {
            aspect_ratio,
            prompts,
        } => {
            let aspect_ratio = aspect_ratio.unwrap_or_else(|| config.default_aspect_ratio.clone());
            if !ASPECT_RATIOS.contains(&aspect_ratio.as_str()) {
                bail!(
                    "unsupported aspect ratio {:?}; choose one of {}",
                    aspect_ratio,
                    ASPECT_RATIOS.join(", ")
                );
            }
            let input = if prompts.is_empty() {
                read_stdin()?
            } else {
                prompts.join("\n")
            };

            let mut session = Session::start(&config, store, HistoryMode::Silent)?;
            session.dispatch(Msg::AspectRatioSelected(aspect_ratio));
            session.dispatch(Msg::InputChanged(input));
            session.dispatch(Msg::SubmitClicked);
            if session.is_settled() {
                wb_warn!("Nothing to submit: input had no prompts");
            }
            session.run_until_settled();
            session.shutdown();
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryMode {
    /// Restore and print the stored history.
    Show,
    /// Restore without printing; only new activity is shown.
    Silent,
    /// Start from an empty history.
    Skip,
}

/// One workbench view: chat state, the effect runner and the renderer.
struct Session {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer<io::Stdout>,
}

impl Session {
    /// Restores the stored history per `mode` and resumes polling its
    /// pending tasks.
    fn start(config: &AppConfig, store: FileBlobStore, mode: HistoryMode) -> anyhow::Result<Self> {
        let engine = EngineHandle::new(config.api_settings(), config.poll_policy())
            .context("configuring the generation service client")?;
        let history = match mode {
            HistoryMode::Skip => Vec::new(),
            HistoryMode::Show | HistoryMode::Silent => load_history(&store),
        };

        let (mut state, effects) = update(AppState::new(), Msg::HistoryRestored(history));
        state.consume_dirty();
        let view = state.view();

        let mut session = Self {
            state,
            runner: EffectRunner::new(engine, Box::new(store)),
            renderer: Renderer::new(io::stdout()),
        };
        session.runner.run(effects);
        match mode {
            HistoryMode::Show => session.render(&view),
            HistoryMode::Silent | HistoryMode::Skip => session.renderer.mark_shown(&view),
        }
        Ok(session)
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let view = state.consume_dirty().then(|| state.view());
        self.state = state;
        self.runner.run(effects);

        if let Some(view) = view {
            self.render(&view);
        }
    }

    fn render(&mut self, view: &AppViewModel) {
        if let Err(err) = self.renderer.render(view) {
            wb_error!("Failed to render chat: {}", err);
        }
    }

    fn is_settled(&self) -> bool {
        !self.state.is_generating() && self.state.pending_task_ids().is_empty()
    }

    fn run_until_settled(&mut self) {
        while !self.is_settled() {
            match self.runner.next_msg(EVENT_WAIT) {
                Some(msg) => self.dispatch(msg),
                None if !self.runner.engine_running() => {
                    wb_error!("Engine stopped while tasks were still pending");
                    break;
                }
                None => {}
            }
        }
    }

    fn shutdown(&mut self) {
        self.runner.shutdown();
        wb_info!("Session closed");
    }
}

fn print_history(store: &dyn BlobStore) {
    let entries = load_history(store);
    if entries.is_empty() {
        println!("No chat history.");
        return;
    }
    let (state, _) = update(AppState::new(), Msg::HistoryRestored(entries));
    for row in state.view().entries {
        println!("{}", format_entry(&row));
    }
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question}");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}

fn read_stdin() -> anyhow::Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("reading prompts from stdin")?;
    Ok(input)
}
