//! Fraction calculator wired into the checkpoint harness.
//!
//! Every line typed at the prompt is either a harness command
//! (`test create <id>`, `test end`, `test <id> [true|false]`, `quit`) or an
//! expression for the calculator.

mod calc;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use harness::handler::StdoutObserver;
use harness::io::config::load_config;
use harness::repl::run_repl;
use harness::router::Router;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "fraccalc",
    version,
    about = "Fraction calculator with a scripted test harness"
)]
struct Cli {
    /// Harness config file (defaults apply when missing).
    #[arg(long, default_value = "fraccalc.toml")]
    config: PathBuf,
    /// Directory for checkpoint files, overriding the config.
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(dir) = cli.checkpoint_dir {
        config.checkpoint_dir = dir;
    }
    config.validate()?;
    harness::logging::init(&config.log_filter);
    debug!(checkpoint_dir = %config.checkpoint_dir.display(), "config loaded");

    let router = Router::new(
        Arc::new(calc::process_command),
        Arc::new(StdoutObserver),
        config,
    );
    run_repl(io::stdin().lock(), &router)
}
