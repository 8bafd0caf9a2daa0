//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (entity lists are kept in insertion order)
//! - No rendering, audio or platform dependencies

pub mod ai;
pub mod collision;
pub mod combat;
pub mod draw;
pub mod effects;
pub mod entities;
pub mod geom;
pub mod input;
pub mod level;
pub mod state;
pub mod tank;
pub mod tick;
pub mod timer;

pub use ai::generate_path;
pub use collision::BulletHit;
pub use draw::{DrawItem, SidebarStats, draw_list};
pub use effects::{EffectError, ExplosionOwner, TimerAction};
pub use entities::{Base, BaseState, Bonus, BonusKind, Bullet, BulletState, Explosion, Label};
pub use geom::{Direction, Rect};
pub use input::{Control, InputEvent, InputState, KeyBindings, PlayerInput, TickInput};
pub use level::{FORTRESS, Level, Tile, TileKind};
pub use state::{Game, GameEvent, GamePhase, PLAYER_STARTS, SoundCue};
pub use tank::{EnemyKind, Impact, Role, Side, Tank, TankState, Trophies};
pub use tick::{move_player, tick};
pub use timer::{Fired, Repeat, Scheduler, TimerId};
