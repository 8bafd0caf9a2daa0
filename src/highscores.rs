//! High score record
//!
//! A single integer, stored as JSON. Values outside the plausible range are
//! treated as tampering and ignored.

use std::cell::Cell;
use std::fmt;
use std::path::PathBuf;

use crate::persistence::{self, PersistError};

/// Record reported when nothing valid is stored
pub const DEFAULT_HISCORE: u32 = 20000;

/// Accept only 19999 < value < 1000000
pub fn sanitize(value: u32) -> Option<u32> {
    (value > 19999 && value < 1_000_000).then_some(value)
}

/// Where the high score lives
pub trait ScoreStore: fmt::Debug {
    /// Stored record, or [`DEFAULT_HISCORE`] if missing or invalid
    fn load(&self) -> u32;
    fn save(&self, score: u32) -> Result<(), PersistError>;
}

#[derive(Debug, Clone)]
pub struct FileScoreStore {
    pub path: PathBuf,
}

impl FileScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScoreStore for FileScoreStore {
    fn load(&self) -> u32 {
        match persistence::load_json::<u32>(&self.path) {
            Ok(value) => sanitize(value).unwrap_or_else(|| {
                log::warn!("Ignoring implausible high score {value}");
                DEFAULT_HISCORE
            }),
            Err(PersistError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                DEFAULT_HISCORE
            }
            Err(e) => {
                log::warn!("Can't read high score from {}: {e}", self.path.display());
                DEFAULT_HISCORE
            }
        }
    }

    fn save(&self, score: u32) -> Result<(), PersistError> {
        persistence::save_json(&self.path, &score)?;
        log::info!("High score {score} saved");
        Ok(())
    }
}

/// In-process store for tests and the headless runner
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    value: Cell<Option<u32>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

}

impl ScoreStore for MemoryScoreStore {
    fn load(&self) -> u32 {
        self.value
            .get()
            .and_then(sanitize)
            .unwrap_or(DEFAULT_HISCORE)
    }

    fn save(&self, score: u32) -> Result<(), PersistError> {
        self.value.set(Some(score));
        Ok(())
    }
}
