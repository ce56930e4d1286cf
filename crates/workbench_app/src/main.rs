mod app;
mod cli;
mod config;
mod effects;
mod persistence;
mod render;

use clap::Parser;
use workbench_logging::{LevelFilter, LogDestination};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let level = match cli.global.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let destination = match &cli.global.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    workbench_logging::initialize(destination, level);

    app::run(cli)
}
