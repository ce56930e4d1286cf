use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "workbench")]
#[command(about = "Submit image-generation prompts and follow their tasks")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand; each overrides the config file.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Config file (RON). Defaults to ./workbench.ron when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the generation service
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Chat history file
    #[arg(long, global = true)]
    pub history: Option<PathBuf>,

    /// Seconds between status checks of a pending task
    #[arg(long, global = true)]
    pub poll_interval_secs: Option<u64>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Submit prompts (one task per line) and wait for their results
    Submit {
        /// Aspect ratio of the generated images
        #[arg(short, long)]
        aspect_ratio: Option<String>,

        /// Prompts; read from stdin when omitted
        prompts: Vec<String>,
    },
    /// Resume polling for tasks still pending in the history
    Watch,
    /// Print the stored chat history
    History,
    /// Delete the stored chat history
    Clear {
        /// Skip the confirmation question
        #[arg(short, long)]
        yes: bool,
    },
}
