//! Value types shared by commands and events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Width and height of the board.
pub const BOARD_SIZE: u8 = 15;

/// Stone colour. Black always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
}

impl Color {
    /// The other colour.
    #[must_use]
    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }

    /// Decode the numeric wire code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Black),
            2 => Some(Self::White),
            _ => None,
        }
    }

    /// Keyword used by `WINNER` lines.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Black => "BLACK",
            Self::White => "WHITE",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Game mode: player versus engine AI, or two local players.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Pve,
    Pvp,
}

impl Mode {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Pve => "PVE",
            Self::Pvp => "PVP",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pve" => Ok(Self::Pve),
            "pvp" => Ok(Self::Pvp),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

/// A zero-based board coordinate, always inside the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    x: u8,
    y: u8,
}

impl Position {
    /// Build a position, returning `None` when either coordinate is off the board.
    #[must_use]
    pub fn new(x: u8, y: u8) -> Option<Self> {
        (x < BOARD_SIZE && y < BOARD_SIZE).then_some(Self { x, y })
    }

    #[must_use]
    pub fn x(self) -> u8 {
        self.x
    }

    #[must_use]
    pub fn y(self) -> u8 {
        self.y
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}
