//! Write-through JSON storage for the stats record.

use std::io;
use std::path::{Path, PathBuf};

use super::StatsRecord;

/// Errors from reading or writing the stats file.
#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to read stats file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to parse stats file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write stats file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to serialize stats: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Stats record bound to the file it is persisted in.
///
/// Every mutation goes through [`StatsStore::update`], which rewrites the
/// whole file before returning.
#[derive(Debug)]
pub struct StatsStore {
    path: PathBuf,
    record: StatsRecord,
}

impl StatsStore {
    /// Default location: `<data dir>/gomoku-bridge/stats.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gomoku-bridge")
            .join("stats.json")
    }

    /// Open the store, falling back to defaults if the file is unreadable.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let record = match Self::load(&path) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Using default stats");
                StatsRecord::default()
            }
        };
        Self { path, record }
    }

    /// Read a stats file. A missing file yields the default record.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<StatsRecord, PersistenceError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No stats file, using defaults");
                return Ok(StatsRecord::default());
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| PersistenceError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Current in-memory record.
    #[must_use]
    pub fn record(&self) -> &StatsRecord {
        &self.record
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply a mutation and persist the result immediately.
    ///
    /// The in-memory record keeps the mutation even when the write fails.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the file cannot be written.
    pub fn update(&mut self, mutate: impl FnOnce(&mut StatsRecord)) -> Result<(), PersistenceError> {
        mutate(&mut self.record);
        self.save()
    }

    /// Rewrite the stats file wholesale.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if serialization or the write fails.
    pub fn save(&self) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(&self.record)?;
        let write_err = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;

        tracing::debug!(path = %self.path.display(), "Stats saved");
        Ok(())
    }
}
