//! Colored terminal rendering of session updates.
//!
//! This is the thin presentation adapter used by the `play` command: it
//! prints whatever the controller reports and never touches session state.

use std::io::{self, Write};

use chrono::{Local, Utc};
use owo_colors::OwoColorize;

use crate::protocol::{Color, BOARD_SIZE};
use crate::session::{BoardMirror, MoveRejection, Outcome, Update};
use crate::stats::StatsRecord;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Format a clock value as `m:ss`.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Render the board as plain text, `X` for black and `O` for white.
#[must_use]
pub fn render_board(board: &BoardMirror) -> String {
    let mut out = String::from("   ");
    for x in 0..BOARD_SIZE {
        out.push_str(&format!("{x:>3}"));
    }
    out.push('\n');

    for (y, row) in board.rows().enumerate() {
        out.push_str(&format!("{y:>3}"));
        for cell in row {
            let glyph = match cell {
                Some(Color::Black) => 'X',
                Some(Color::White) => 'O',
                None => '.',
            };
            out.push_str(&format!("{glyph:>3}"));
        }
        out.push('\n');
    }
    out
}

/// Print the board.
pub fn print_board(board: &BoardMirror) {
    print!("{}", render_board(board));
    let _ = io::stdout().flush();
}

/// Print one update from the controller.
pub fn print_update(update: &Update) {
    let ts = timestamp();
    match update {
        Update::SessionStarted { generation, mode } => println!(
            "{} {} mode={}, game={}",
            ts.dimmed(),
            "[SESSION]".blue().bold(),
            mode.cyan(),
            generation.dimmed()
        ),
        Update::StonePlaced { position, color } => println!(
            "{} {} {} at {}",
            ts.dimmed(),
            "[MOVE]".green().bold(),
            color.bold(),
            position
        ),
        Update::TurnChanged { turn, input_locked } => {
            let hint = if *input_locked { "waiting" } else { "your move" };
            println!(
                "{} {} {} to play ({})",
                ts.dimmed(),
                "[TURN]".cyan().bold(),
                turn,
                hint.dimmed()
            );
        }
        Update::Thinking => println!(
            "{} {} engine is thinking...",
            ts.dimmed(),
            "[AI]".magenta().bold()
        ),
        Update::Clock { remaining_seconds } => {
            // Only print every half minute and the final ten seconds.
            if remaining_seconds % 30 == 0 || *remaining_seconds <= 10 {
                println!(
                    "{} {} {}",
                    ts.dimmed(),
                    "[CLOCK]".yellow().bold(),
                    format_clock(*remaining_seconds)
                );
            }
        }
        Update::GameEnded { outcome } => println!(
            "{} {} {}",
            ts.dimmed(),
            "[GAME OVER]".red().bold(),
            describe_outcome(*outcome).bold()
        ),
        Update::StatsChanged(record) => print_stats(record),
        Update::MoveRejected { x, y, reason } => print_rejection(*x, *y, *reason),
        Update::EngineDisconnected => print_error("Engine disconnected; start a new session"),
    }
    let _ = io::stdout().flush();
}

#[must_use]
pub fn describe_outcome(outcome: Outcome) -> String {
    match outcome {
        Outcome::Winner(color) => format!("{color} wins"),
        Outcome::Draw => "draw".to_string(),
        Outcome::Timeout => "time is up".to_string(),
    }
}

fn print_rejection(x: u8, y: u8, reason: MoveRejection) {
    println!(
        "{} {},{} - {}",
        "[REJECTED]".yellow().bold(),
        x,
        y,
        reason.dimmed()
    );
}

/// Print the stats record.
pub fn print_stats(record: &StatsRecord) {
    println!(
        "{} PVE win={} lose={} | PVP games={} | theme={:?}",
        "[STATS]".blue().bold(),
        record.pve.win.green(),
        record.pve.lose.red(),
        record.pvp.games,
        record.theme
    );
    let today = Local::now().date_naive();
    if let Some(days) = record.countdown.days_until(today) {
        println!(
            "{} {} in {} days",
            "[COUNTDOWN]".magenta().bold(),
            record.countdown.name,
            days
        );
    }
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}
