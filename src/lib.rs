//! Tank City - A tile-based tank battle arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, collisions, AI, timers)
//! - `stages`: Stage maps and enemy quotas
//! - `persistence`: JSON load/save helpers
//! - `highscores`: High score record
//! - `settings`: Player configuration

pub mod highscores;
pub mod persistence;
pub mod settings;
pub mod sim;
pub mod stages;

pub use highscores::{FileScoreStore, MemoryScoreStore, ScoreStore};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed frame length (50 frames per second)
    pub const FRAME_MS: u32 = 20;

    /// Terrain tile size in pixels
    pub const TILE_SIZE: i32 = 16;
    /// Playfield is square, 26 tiles per side
    pub const FIELD_SIZE: i32 = 416;

    /// Tanks are 26x26, centred in a 32x32 cell
    pub const TANK_SIZE: i32 = 26;
    /// Offset that centres a tank in its cell
    pub const CELL_OFFSET: i32 = 3;
    /// Alignment grid used when a tank turns
    pub const ALIGN_GRID: i32 = 8;
    /// Snap only when the tank is closer than this to the grid
    pub const ALIGN_TOLERANCE: i32 = 5;

    /// Base (eagle) position and size
    pub const BASE_X: i32 = 12 * TILE_SIZE;
    pub const BASE_Y: i32 = 24 * TILE_SIZE;
    pub const BASE_SIZE: i32 = 32;

    /// Tank defaults
    pub const TANK_HEALTH: i32 = 100;
    pub const TANK_SPEED: i32 = 2;
    pub const MAX_TANK_SPEED: i32 = 5;
    pub const MAX_SUPERPOWERS: u8 = 3;
    pub const PLAYER_LIVES: u32 = 3;
    pub const PLAYER_MAX_BULLETS: usize = 10;

    /// Bullet defaults
    pub const BULLET_DAMAGE: i32 = 100;
    pub const BULLET_SPEED: i32 = 5;
    pub const BULLET_FAST_SPEED: i32 = 8;

    /// Enemy spawn cadence and cap
    pub const ENEMY_SPAWN_MS: u32 = 3000;
    pub const MAX_ACTIVE_ENEMIES: usize = 4;
    pub const ENEMY_FIRE_MS: u32 = 1000;
    /// One in this many enemies carries a bonus
    pub const CARRIER_ODDS: u32 = 5;

    /// Effect durations (ms)
    pub const SPAWN_MS: u32 = 1000;
    pub const RESPAWN_SHIELD_MS: u32 = 4000;
    pub const POWERUP_MS: u32 = 10000;
    pub const PARALYSIS_MS: u32 = 10000;
    pub const BONUS_LIFETIME_MS: u32 = 10000;
    pub const LABEL_MS: u32 = 500;
    pub const TALLY_DELAY_MS: u32 = 3000;

    /// Cosmetic cadences (ms)
    pub const BLINK_MS: u32 = 100;
    pub const CARRIER_FLASH_MS: u32 = 200;
    pub const BONUS_BLINK_MS: u32 = 500;
    pub const WATER_MS: u32 = 400;
    pub const EXPLOSION_FRAME_MS: u32 = 100;

    /// Points for picking up a bonus
    pub const BONUS_POINTS: u32 = 500;

    /// Game over banner rises from below the field to the centre
    pub const BANNER_START_Y: i32 = FIELD_SIZE + 40;
    pub const BANNER_STOP_Y: i32 = 188;
    pub const BANNER_STEP: i32 = 4;
}
