//! Persisted stats and preferences document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Win/lose tally for games against the engine AI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PveStats {
    pub win: u32,
    pub lose: u32,
}

impl PveStats {
    /// Number of completed games against the AI.
    #[must_use]
    pub fn completed(&self) -> u32 {
        self.win.saturating_add(self.lose)
    }
}

/// Tally for local two-player games.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PvpStats {
    pub games: u32,
}

/// A named date the front-end counts down to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Countdown {
    pub name: String,
    pub date: Option<NaiveDate>,
}

impl Countdown {
    /// Days from `today` until the event; negative once it has passed.
    #[must_use]
    pub fn days_until(&self, today: NaiveDate) -> Option<i64> {
        self.date.map(|date| (date - today).num_days())
    }
}

/// UI colour theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// The whole stats file. Missing fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsRecord {
    pub pve: PveStats,
    pub pvp: PvpStats,
    pub countdown: Countdown,
    pub theme: Theme,
}

impl StatsRecord {
    /// Count one finished game against the AI.
    pub fn record_pve(&mut self, human_won: bool) {
        if human_won {
            self.pve.win = self.pve.win.saturating_add(1);
        } else {
            self.pve.lose = self.pve.lose.saturating_add(1);
        }
    }

    /// Count one finished two-player game.
    pub fn record_pvp(&mut self) {
        self.pvp.games = self.pvp.games.saturating_add(1);
    }
}
