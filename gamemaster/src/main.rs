//! Turn-based physics tutoring sessions with an LLM gamemaster.
//!
//! `gamemaster play` runs the interactive loop and writes the transcript when
//! the session ends. `gamemaster batch` sends several prompt files to the model
//! in parallel and prints the answers in argument order.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use gamemaster::batch::{read_prompts, render_entries, run_batch};
use gamemaster::core::session::SessionState;
use gamemaster::exit_codes;
use gamemaster::io::config::{DEFAULT_CONFIG_PATH, GamemasterConfig, load_config};
use gamemaster::io::invoker::GeminiInvoker;
use gamemaster::io::llm::LlmClient;
use gamemaster::io::transcript_store::JsonFileSink;
use gamemaster::logging;
use gamemaster::play::{TurnController, play_session};

#[derive(Parser)]
#[command(
    name = "gamemaster",
    version,
    about = "Turn-based physics tutoring with an LLM gamemaster"
)]
struct Cli {
    /// Path to the TOML config file. A missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the model identifier from the config.
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play an interactive session (default). Type `quit` to end it.
    Play {
        /// Where to write the transcript when the session ends.
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
    /// Send each prompt file to the model in parallel and print the answers as JSON.
    Batch {
        /// Prompt files, one prompt per file.
        #[arg(required = true)]
        prompts: Vec<PathBuf>,

        /// Worker threads (defaults to config, then available parallelism).
        #[arg(long)]
        workers: Option<usize>,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let mut cfg = load_config(&cli.config)?;
    if let Some(model) = cli.model {
        cfg.model = model;
    }

    match cli.command.unwrap_or(Command::Play { transcript: None }) {
        Command::Play { transcript } => {
            if let Some(path) = transcript {
                cfg.transcript_path = path;
            }
            cfg.validate()?;
            cmd_play(&cfg)
        }
        Command::Batch { prompts, workers } => {
            if workers.is_some() {
                cfg.batch_workers = workers;
            }
            cfg.validate()?;
            cmd_batch(&cfg, &prompts)
        }
    }
}

fn build_client(cfg: &GamemasterConfig) -> LlmClient<GeminiInvoker> {
    let client = LlmClient::new(GeminiInvoker::from_config(cfg));
    match cfg.batch_workers {
        Some(workers) => client.with_workers(workers),
        None => client,
    }
}

fn cmd_play(cfg: &GamemasterConfig) -> Result<i32> {
    info!(model = %cfg.model, "starting session");
    let mut controller = TurnController::new(
        SessionState::new(cfg.scenario.clone()),
        build_client(cfg),
        JsonFileSink::new(&cfg.transcript_path),
    )?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    play_session(&mut controller, stdin.lock(), stdout.lock())?;
    Ok(exit_codes::OK)
}

fn cmd_batch(cfg: &GamemasterConfig, paths: &[PathBuf]) -> Result<i32> {
    let prompts = read_prompts(paths)?;
    let client = build_client(cfg);
    match run_batch(&client, paths, &prompts) {
        Ok(entries) => {
            println!("{}", render_entries(&entries)?);
            Ok(exit_codes::OK)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(exit_codes::BATCH_FAILED)
        }
    }
}
