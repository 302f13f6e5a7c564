//! Outbound commands sent to the engine.

use std::fmt;

use super::{Mode, Position};

/// A command written to the engine's stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Select the game mode. Must precede the first move of a session.
    SetMode(Mode),
    /// Place a stone for the side to move.
    Move(Position),
    /// Reset the engine board (legacy engines answer with `GAME_STARTED`).
    Restart,
}

impl Command {
    /// Protocol keyword for this command.
    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::SetMode(_) => "SET_MODE",
            Self::Move(_) => "MOVE",
            Self::Restart => "RESTART",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetMode(mode) => write!(f, "{} {mode}", self.keyword()),
            Self::Move(pos) => write!(f, "{} {pos}", self.keyword()),
            Self::Restart => f.write_str(self.keyword()),
        }
    }
}
