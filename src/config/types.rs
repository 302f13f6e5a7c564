//! Configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::{Color, Mode};
use crate::session::{SessionRules, DEFAULT_TURN_SECONDS};
use crate::stats::StatsStore;

/// Engine process settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable. Relative paths resolve against the install directory.
    pub path: PathBuf,
    /// Extra arguments passed to the engine.
    pub args: Vec<String>,
    /// Grace period before a stubborn engine is killed.
    pub terminate_timeout_ms: u64,
}

fn default_engine_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("gomoku_core.exe")
    } else {
        PathBuf::from("gomoku_core")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: default_engine_path(),
            args: Vec::new(),
            terminate_timeout_ms: 2000,
        }
    }
}

impl EngineConfig {
    /// Absolute engine path for the given install directory.
    #[must_use]
    pub fn resolve_path(&self, install_dir: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            install_dir.join(&self.path)
        }
    }

    #[must_use]
    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }
}

/// Game session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub turn_seconds: u32,
    pub human_color: Color,
    pub default_mode: Mode,
    /// Send `RESTART` before `SET_MODE` for engines that expect it.
    pub restart_handshake: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_seconds: DEFAULT_TURN_SECONDS,
            human_color: Color::White,
            default_mode: Mode::Pve,
            restart_handshake: false,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn rules(&self) -> SessionRules {
        SessionRules {
            turn_seconds: self.turn_seconds,
            human_color: self.human_color,
            restart_handshake: self.restart_handshake,
        }
    }
}

/// Stats file location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub path: Option<PathBuf>,
}

impl StatsConfig {
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(StatsStore::default_path)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub engine: EngineConfig,
    pub session: SessionConfig,
    pub stats: StatsConfig,
}

/// Directory holding the running binary, where the engine ships alongside it.
#[must_use]
pub fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
