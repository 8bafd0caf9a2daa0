//! Game settings and preferences
//!
//! Stored as JSON; every field has a default so partial files load fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{FRAME_MS, MAX_ACTIVE_ENEMIES};
use crate::persistence::{self, PersistError};
use crate::sim::KeyBindings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 1 or 2
    pub players: usize,
    /// Emit sound cues
    pub sound: bool,
    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
    /// Frame length in milliseconds
    pub frame_ms: u32,
    /// Enemies allowed on the field at once
    pub max_active_enemies: usize,
    /// Directory of numbered stage files; built-in map when absent
    pub levels_dir: Option<PathBuf>,
    pub hiscore_path: PathBuf,
    pub controls: [KeyBindings; 2],
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            players: 1,
            sound: true,
            seed: None,
            frame_ms: FRAME_MS,
            max_active_enemies: MAX_ACTIVE_ENEMIES,
            levels_dir: None,
            hiscore_path: PathBuf::from(".hiscore"),
            controls: [KeyBindings::PLAYER_ONE, KeyBindings::PLAYER_TWO],
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults if the file is missing or bad
    pub fn load(path: &Path) -> Self {
        match persistence::load_json::<Settings>(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings.clamped()
            }
            Err(PersistError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!("Can't load settings from {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        persistence::save_json(path, self)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Pull out-of-range values back to something playable
    pub fn clamped(mut self) -> Self {
        self.players = self.players.clamp(1, 2);
        self.frame_ms = self.frame_ms.max(1);
        self.max_active_enemies = self.max_active_enemies.max(1);
        self
    }
}
