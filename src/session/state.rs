//! Session state and counters.

use crate::protocol::{Color, Mode, Position, Verdict};
use crate::session::BoardMirror;

/// Seconds on the clock at the start of every game.
pub const DEFAULT_TURN_SECONDS: u32 = 480;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Idle,
    Active,
    Ended,
}

/// How a game finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(Color),
    Draw,
    /// The local clock ran out before the engine declared a result.
    Timeout,
}

impl From<Verdict> for Outcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Winner(color) => Self::Winner(color),
            Verdict::Draw => Self::Draw,
        }
    }
}

/// State of one game, replaced wholesale on every reset.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) generation: u64,
    pub(crate) mode: Mode,
    pub(crate) phase: SessionPhase,
    pub(crate) turn: Color,
    pub(crate) remaining_seconds: u32,
    pub(crate) outcome: Option<Outcome>,
    pub(crate) thinking: bool,
    pub(crate) pending_move: Option<Position>,
    pub(crate) last_move: Option<(Position, Color)>,
    pub(crate) board: BoardMirror,
}

impl Session {
    /// Session before the first reset.
    #[must_use]
    pub fn idle(mode: Mode, seconds: u32) -> Self {
        Self {
            generation: 0,
            mode,
            phase: SessionPhase::Idle,
            turn: Color::Black,
            remaining_seconds: seconds,
            outcome: None,
            thinking: false,
            pending_move: None,
            last_move: None,
            board: BoardMirror::new(),
        }
    }

    /// Fresh active session for `generation`.
    #[must_use]
    pub fn start(generation: u64, mode: Mode, seconds: u32) -> Self {
        Self {
            generation,
            phase: SessionPhase::Active,
            ..Self::idle(mode, seconds)
        }
    }

    pub(crate) fn transition(&mut self, phase: SessionPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, generation = self.generation, "State transition");
        self.phase = phase;
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    /// Colour expected to move next.
    #[must_use]
    pub fn turn(&self) -> Color {
        self.turn
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Winning colour, if the game ended with one.
    #[must_use]
    pub fn winner(&self) -> Option<Color> {
        match self.outcome {
            Some(Outcome::Winner(color)) => Some(color),
            _ => None,
        }
    }

    /// True between `AI_THINKING` and the next confirmed move.
    #[must_use]
    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    /// Move sent to the engine and not yet confirmed.
    #[must_use]
    pub fn pending_move(&self) -> Option<Position> {
        self.pending_move
    }

    #[must_use]
    pub fn last_move(&self) -> Option<(Position, Color)> {
        self.last_move
    }

    #[must_use]
    pub fn board(&self) -> &BoardMirror {
        &self.board
    }
}

/// Per-process diagnostic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    pub events: usize,
    pub unknown_events: usize,
    pub stale_events: usize,
    pub rejected_moves: usize,
    pub dropped_commands: usize,
}

impl SessionCounters {
    pub fn record_event(&mut self) {
        self.events = self.events.saturating_add(1);
    }

    pub fn record_unknown(&mut self) {
        self.unknown_events = self.unknown_events.saturating_add(1);
    }

    pub fn record_stale(&mut self) {
        self.stale_events = self.stale_events.saturating_add(1);
    }

    pub fn record_rejection(&mut self) {
        self.rejected_moves = self.rejected_moves.saturating_add(1);
    }

    pub fn record_dropped(&mut self) {
        self.dropped_commands = self.dropped_commands.saturating_add(1);
    }
}
