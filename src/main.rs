//! Gomoku bridge - terminal front-end for an external gomoku engine.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gomoku_bridge::config::{install_dir, BridgeConfig, ConfigError, ConfigLoader};
use gomoku_bridge::display;
use gomoku_bridge::engine::{EngineSupervisor, SpawnError};
use gomoku_bridge::protocol::Mode;
use gomoku_bridge::session::{
    session_queue, BoardMirror, Intent, SessionController, SessionRunner, Update,
};
use gomoku_bridge::stats::{StatsStore, Theme};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Pve,
    Pvp,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Pve => Mode::Pve,
            ModeArg::Pvp => Mode::Pvp,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "gomoku-bridge",
    about = "Play gomoku against an external engine process",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the engine and play in the terminal.
    Play {
        /// Game mode for the first game (defaults to the configured mode).
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,
        /// Engine executable, overriding the configured path.
        #[arg(long)]
        engine: Option<PathBuf>,
    },
    /// Show persisted stats.
    Stats,
}

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Cannot start engine: {0}")]
    Spawn(#[from] SpawnError),
}

/// One line typed by the player.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Intent(Intent),
    Board,
    Help,
    Quit,
}

const HELP: &str = "commands: move X Y | X,Y | reset [pve|pvp] | mode pve|pvp | \
theme light|dark | countdown NAME YYYY-MM-DD | board | quit";

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<BridgeConfig, ConfigError> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    loader.load()
}

fn parse_coords(args: &[&str]) -> Option<(u8, u8)> {
    let joined = args.join(",");
    let mut parts = joined.split(',').filter(|s| !s.is_empty());
    let x = parts.next()?.trim().parse().ok()?;
    let y = parts.next()?.trim().parse().ok()?;
    parts.next().is_none().then_some((x, y))
}

fn parse_input(line: &str, current_mode: Mode) -> Result<Input, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = words.split_first() else {
        return Err("empty command".to_string());
    };

    match command.to_ascii_lowercase().as_str() {
        "move" | "m" => parse_coords(args)
            .map(|(x, y)| Input::Intent(Intent::Move { x, y }))
            .ok_or_else(|| "usage: move X Y".to_string()),
        "reset" | "r" => {
            let mode = match args.first() {
                Some(mode) => mode.parse()?,
                None => current_mode,
            };
            Ok(Input::Intent(Intent::Reset(mode)))
        }
        "mode" => {
            let mode = args.first().ok_or("usage: mode pve|pvp")?.parse()?;
            Ok(Input::Intent(Intent::SwitchMode(mode)))
        }
        "theme" => match args.first().map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("light") => Ok(Input::Intent(Intent::SetTheme(Theme::Light))),
            Some("dark") => Ok(Input::Intent(Intent::SetTheme(Theme::Dark))),
            _ => Err("usage: theme light|dark".to_string()),
        },
        "countdown" => {
            let (date, name) = args.split_last().ok_or("usage: countdown NAME YYYY-MM-DD")?;
            let date = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| format!("bad date: {e}"))?;
            Ok(Input::Intent(Intent::SetCountdown {
                name: name.join(" "),
                date: Some(date),
            }))
        }
        "board" | "b" => Ok(Input::Board),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" | "q" => Ok(Input::Quit),
        _ => parse_coords(&words)
            .map(|(x, y)| Input::Intent(Intent::Move { x, y }))
            .ok_or_else(|| format!("unknown command '{command}' ({HELP})")),
    }
}

async fn play(
    config: BridgeConfig,
    mode: Option<Mode>,
    engine: Option<PathBuf>,
) -> Result<(), AppError> {
    let engine_path = engine.unwrap_or_else(|| config.engine.resolve_path(&install_dir()));
    let mut mode = mode.unwrap_or(config.session.default_mode);

    let (tx, rx) = session_queue();
    let supervisor =
        EngineSupervisor::start_with_args(&engine_path, &config.engine.args, tx.clone())?
            .with_grace_period(config.engine.terminate_timeout());

    let stats = StatsStore::open(config.stats.resolved_path());
    let controller = SessionController::new(supervisor.sender(), stats, config.session.rules());

    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let runner = SessionRunner::new(controller, tx, rx, updates_tx).with_cancellation(cancel.clone());
    let handle = runner.handle();
    let runner_task = tokio::spawn(runner.run());

    tracing::info!(engine = %engine_path.display(), %mode, "Starting session");
    println!("{HELP}");
    handle.post(Intent::Reset(mode));

    let mut board = BoardMirror::new();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            update = updates_rx.recv() => {
                let Some(update) = update else { break };
                match &update {
                    Update::SessionStarted { mode: started, .. } => {
                        board = BoardMirror::new();
                        mode = *started;
                    }
                    Update::StonePlaced { position, color } => {
                        let _ = board.place(*position, *color);
                    }
                    _ => {}
                }
                display::print_update(&update);
                if matches!(update, Update::StonePlaced { .. }) {
                    display::print_board(&board);
                }
            }
            line = stdin.next_line() => {
                let Ok(Some(line)) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_input(&line, mode) {
                    Ok(Input::Intent(intent)) => {
                        if !handle.post(intent) {
                            break;
                        }
                    }
                    Ok(Input::Board) => display::print_board(&board),
                    Ok(Input::Help) => println!("{HELP}"),
                    Ok(Input::Quit) => break,
                    Err(message) => display::print_error(&message),
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    cancel.cancel();
    match runner_task.await {
        Ok(controller) => {
            let counters = controller.counters();
            tracing::info!(
                events = counters.events,
                unknown = counters.unknown_events,
                stale = counters.stale_events,
                rejected = counters.rejected_moves,
                "Session finished"
            );
        }
        Err(e) => tracing::error!(error = %e, "Session runner failed"),
    }

    if let Err(e) = supervisor.stop().await {
        tracing::warn!(error = %e, "Failed to stop engine cleanly");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match load_config(cli.config) {
        Err(e) => Err(AppError::from(e)),
        Ok(config) => match cli.command {
            Commands::Play { mode, engine } => play(config, mode.map(Mode::from), engine).await,
            Commands::Stats => {
                let store = StatsStore::open(config.stats.resolved_path());
                display::print_stats(store.record());
                Ok(())
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
