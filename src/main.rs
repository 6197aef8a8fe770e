use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use secnav::config::Config;
use secnav::error::{NavError, NavResult};
use secnav::script::Script;
use secnav::telemetry;

#[derive(Debug, Parser)]
#[command(name = "secnav", version)]
#[command(about = "Replay navigation scripts against view-less section navigators")]
struct Cli {
    /// Configuration file (defaults to the per-user secnav config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a TOML navigation script and print every coordinator transition
    Run {
        script: PathBuf,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> NavResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    telemetry::init_tracing(&config.logging)?;

    match cli.command {
        Command::Run { script, json } => {
            let script = Script::load(&script)?;
            let lines = script.run(Arc::new(config.navigation)).await?;

            let mut out = io::stdout().lock();
            for line in &lines {
                let rendered = if json { line.to_json()? } else { line.to_string() };
                writeln!(out, "{rendered}")
                    .map_err(|source| NavError::io_with_context(source, "failed to write output"))?;
            }
            Ok(())
        }
    }
}
