//! Tanks: one struct for both sides, with side-specific data in [`Role`]

use std::collections::VecDeque;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::entities::{Explosion, TANK_EXPLOSION_FRAMES};
use super::geom::{Direction, Rect, nearest};
use super::timer::TimerId;
use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Player,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TankState {
    /// Blinking in, not interactive
    Spawning,
    Alive,
    /// Playing its destruction animation, not interactive
    Exploding,
    /// Ready to be removed (enemies) or respawned (players)
    Dead,
}

/// Enemy subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Basic,
    Fast,
    Power,
    Armor,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 4] = [
        EnemyKind::Basic,
        EnemyKind::Fast,
        EnemyKind::Power,
        EnemyKind::Armor,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Score for destroying one
    pub fn points(self) -> u32 {
        (self.index() as u32 + 1) * 100
    }
}

/// Per-player tally of pickups and kills by enemy type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Trophies {
    pub bonus: u32,
    pub enemies: [u32; 4],
}

impl Trophies {
    pub fn kills(&self) -> u32 {
        self.enemies.iter().sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerData {
    /// 0 for player one, 1 for player two
    pub index: usize,
    pub lives: u32,
    pub score: u32,
    pub trophies: Trophies,
    /// Bonus touched this frame, applied by the frame update
    pub pending_bonus: Option<u32>,
    pub start_position: IVec2,
    pub start_direction: Direction,
    #[serde(skip)]
    pub paralysis_timer: Option<TimerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyData {
    pub kind: EnemyKind,
    /// Waypoints still to visit
    pub path: VecDeque<IVec2>,
    /// Drops a bonus when destroyed
    pub carrier: bool,
    #[serde(skip)]
    pub fire_timer: Option<TimerId>,
    #[serde(skip)]
    pub flash_timer: Option<TimerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Role {
    Player(PlayerData),
    Enemy(EnemyData),
}

/// Result of a bullet reaching a tank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impact {
    /// Shield soaked it up
    Absorbed,
    Damaged,
    /// Health dropped to zero
    Destroyed,
    /// Enemy fire passes through enemies
    PassThrough,
    /// Player fire stuns other players instead of hurting them
    Paralysed { fresh: bool },
}

impl Impact {
    /// Whether the bullet is used up
    pub fn consumed(self) -> bool {
        self != Impact::PassThrough
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tank {
    pub id: u32,
    pub rect: Rect,
    pub direction: Direction,
    pub state: TankState,
    pub health: i32,
    /// Pixels per frame
    pub speed: i32,
    pub max_active_bullets: usize,
    /// 0 plain, 1 fast bullets, 3 steel-breaking bullets
    pub superpowers: u8,
    /// Cannot move, can still turn and fire
    pub paralysed: bool,
    /// Frozen: no movement, no firing
    pub paused: bool,
    pub shielded: bool,
    /// Carrier blink phase
    pub flash: bool,
    pub spawn_frame: u8,
    pub shield_frame: u8,
    pub explosion: Option<Explosion>,
    #[serde(skip)]
    pub spawn_timer: Option<TimerId>,
    #[serde(skip)]
    pub shield_timer: Option<TimerId>,
    #[serde(skip)]
    pub shield_end_timer: Option<TimerId>,
    pub role: Role,
}

impl Tank {
    fn new(id: u32, pos: IVec2, direction: Direction, role: Role) -> Self {
        Self {
            id,
            rect: Rect::square(pos, TANK_SIZE),
            direction,
            state: TankState::Spawning,
            health: TANK_HEALTH,
            speed: TANK_SPEED,
            max_active_bullets: 1,
            superpowers: 0,
            paralysed: false,
            paused: false,
            shielded: false,
            flash: false,
            spawn_frame: 0,
            shield_frame: 0,
            explosion: None,
            spawn_timer: None,
            shield_timer: None,
            shield_end_timer: None,
            role,
        }
    }

    pub fn player(id: u32, index: usize, start_position: IVec2, start_direction: Direction) -> Self {
        Self::new(
            id,
            start_position,
            start_direction,
            Role::Player(PlayerData {
                index,
                lives: PLAYER_LIVES,
                score: 0,
                trophies: Trophies::default(),
                pending_bonus: None,
                start_position,
                start_direction,
                paralysis_timer: None,
            }),
        )
    }

    pub fn enemy(id: u32, kind: EnemyKind, pos: IVec2, direction: Direction, carrier: bool) -> Self {
        let mut tank = Self::new(
            id,
            pos,
            direction,
            Role::Enemy(EnemyData {
                kind,
                path: VecDeque::new(),
                carrier,
                fire_timer: None,
                flash_timer: None,
            }),
        );
        match kind {
            EnemyKind::Basic => tank.speed = 1,
            EnemyKind::Fast => tank.speed = 3,
            EnemyKind::Power => tank.superpowers = 1,
            EnemyKind::Armor => tank.health = 400,
        }
        tank
    }

    pub fn side(&self) -> Side {
        match self.role {
            Role::Player(_) => Side::Player,
            Role::Enemy(_) => Side::Enemy,
        }
    }

    pub fn as_player(&self) -> Option<&PlayerData> {
        match &self.role {
            Role::Player(p) => Some(p),
            Role::Enemy(_) => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerData> {
        match &mut self.role {
            Role::Player(p) => Some(p),
            Role::Enemy(_) => None,
        }
    }

    pub fn as_enemy(&self) -> Option<&EnemyData> {
        match &self.role {
            Role::Enemy(e) => Some(e),
            Role::Player(_) => None,
        }
    }

    pub fn as_enemy_mut(&mut self) -> Option<&mut EnemyData> {
        match &mut self.role {
            Role::Enemy(e) => Some(e),
            Role::Player(_) => None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == TankState::Alive
    }

    pub fn is_carrier(&self) -> bool {
        self.as_enemy().is_some_and(|e| e.carrier)
    }

    /// Face `direction`. With `fix_alignment` the off-axis coordinate snaps
    /// to the 8px grid when it is already within 5px of it.
    pub fn rotate(&mut self, direction: Direction, fix_alignment: bool) {
        self.direction = direction;
        if !fix_alignment {
            return;
        }
        if direction.is_vertical() {
            let snapped = nearest(self.rect.x, ALIGN_GRID) + CELL_OFFSET;
            if (self.rect.x - snapped).abs() < ALIGN_TOLERANCE {
                self.rect.x = snapped;
            }
        } else {
            let snapped = nearest(self.rect.y, ALIGN_GRID) + CELL_OFFSET;
            if (self.rect.y - snapped).abs() < ALIGN_TOLERANCE {
                self.rect.y = snapped;
            }
        }
    }

    pub fn turn_around(&mut self) {
        self.rotate(self.direction.opposite(), false);
    }

    /// Spawn blink is over
    pub fn end_spawning(&mut self) {
        if self.state == TankState::Spawning {
            self.state = TankState::Alive;
        }
    }

    /// Start the destruction animation. Returns false if the tank is
    /// already exploding or dead.
    pub fn explode(&mut self) -> bool {
        if matches!(self.state, TankState::Exploding | TankState::Dead) {
            return false;
        }
        self.state = TankState::Exploding;
        self.explosion = Some(Explosion::new(self.rect.topleft(), TANK_EXPLOSION_FRAMES));
        true
    }

    /// Explosion finished: the tank is dead
    pub fn update(&mut self) {
        if self.state == TankState::Exploding
            && self.explosion.as_ref().is_none_or(|e| !e.active)
        {
            self.state = TankState::Dead;
            self.explosion = None;
        }
    }

    pub fn bullet_speed(&self) -> i32 {
        if self.superpowers > 0 {
            BULLET_FAST_SPEED
        } else {
            BULLET_SPEED
        }
    }

    pub fn bullet_power(&self) -> u8 {
        if self.superpowers > 2 { 2 } else { 1 }
    }

    /// Apply a bullet hit. `friendly` means the shooter is on this tank's side.
    pub fn apply_hit(&mut self, friendly: bool, damage: i32) -> Impact {
        if self.shielded {
            return Impact::Absorbed;
        }
        if !friendly {
            self.health -= damage;
            return if self.health <= 0 {
                Impact::Destroyed
            } else {
                Impact::Damaged
            };
        }
        match self.side() {
            Side::Enemy => Impact::PassThrough,
            Side::Player => {
                let fresh = !self.paralysed;
                self.paralysed = true;
                Impact::Paralysed { fresh }
            }
        }
    }

    /// Back to the start position with baseline stats. Lives, score,
    /// trophies and speed carry over.
    pub fn reset(&mut self) {
        let Some((pos, dir)) = self
            .as_player()
            .map(|p| (p.start_position, p.start_direction))
        else {
            return;
        };
        self.rotate(dir, false);
        self.rect = self.rect.with_topleft(pos);
        self.superpowers = 1;
        self.max_active_bullets = PLAYER_MAX_BULLETS;
        self.health = TANK_HEALTH;
        self.paralysed = false;
        self.paused = false;
        self.explosion = None;
        self.state = TankState::Alive;
        if let Some(p) = self.as_player_mut() {
            p.pending_bonus = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_at(x: i32, y: i32) -> Tank {
        let mut t = Tank::player(1, 0, IVec2::new(x, y), Direction::Up);
        t.state = TankState::Alive;
        t
    }

    #[test]
    fn test_rotate_snaps_small_misalignment() {
        let mut t = player_at(133, 100);
        // 133/8 = 16.6 -> 136, +3 = 139, distance 6
        t.rotate(Direction::Up, true);
        assert_eq!(t.rect.x, 133);

        let mut t = player_at(130, 100);
        // 130/8 = 16.25 -> 128, +3 = 131, distance 1
        t.rotate(Direction::Down, true);
        assert_eq!(t.rect.x, 131);
        // On-axis coordinate untouched
        assert_eq!(t.rect.y, 100);
    }

    #[test]
    fn test_rotate_snaps_off_axis_only() {
        let mut t = player_at(130, 98);
        t.rotate(Direction::Left, true);
        // 98/8 = 12.25 -> 96, +3 = 99
        assert_eq!(t.rect.y, 99);
        assert_eq!(t.rect.x, 130);
    }

    #[test]
    fn test_rotate_without_fix_keeps_position() {
        let mut t = player_at(130, 98);
        t.rotate(Direction::Right, false);
        assert_eq!(t.rect.topleft(), IVec2::new(130, 98));
        assert_eq!(t.direction, Direction::Right);
    }

    #[test]
    fn test_enemy_kind_stats() {
        let pos = IVec2::new(3, 3);
        let basic = Tank::enemy(1, EnemyKind::Basic, pos, Direction::Down, false);
        assert_eq!((basic.speed, basic.health), (1, 100));
        let fast = Tank::enemy(2, EnemyKind::Fast, pos, Direction::Down, false);
        assert_eq!(fast.speed, 3);
        let power = Tank::enemy(3, EnemyKind::Power, pos, Direction::Down, false);
        assert_eq!(power.bullet_speed(), BULLET_FAST_SPEED);
        let armor = Tank::enemy(4, EnemyKind::Armor, pos, Direction::Down, true);
        assert_eq!(armor.health, 400);
        assert!(armor.is_carrier());
        assert_eq!(EnemyKind::Armor.points(), 400);
    }

    #[test]
    fn test_shield_absorbs_everything() {
        let mut t = player_at(0, 0);
        t.shielded = true;
        assert_eq!(t.apply_hit(false, 100), Impact::Absorbed);
        assert_eq!(t.apply_hit(true, 100), Impact::Absorbed);
        assert_eq!(t.health, 100);
    }

    #[test]
    fn test_friendly_fire_rules() {
        let mut enemy = Tank::enemy(1, EnemyKind::Basic, IVec2::ZERO, Direction::Down, false);
        assert_eq!(enemy.apply_hit(true, 100), Impact::PassThrough);
        assert!(!Impact::PassThrough.consumed());
        assert_eq!(enemy.health, 100);

        let mut player = player_at(0, 0);
        assert_eq!(player.apply_hit(true, 100), Impact::Paralysed { fresh: true });
        assert_eq!(player.apply_hit(true, 100), Impact::Paralysed { fresh: false });
        assert_eq!(player.health, 100);
        assert!(player.paralysed);
    }

    #[test]
    fn test_explode_is_monotonic() {
        let mut t = player_at(0, 0);
        assert_eq!(t.apply_hit(false, 100), Impact::Destroyed);
        assert!(t.explode());
        assert!(!t.explode());
        t.end_spawning();
        assert_eq!(t.state, TankState::Exploding);
        if let Some(e) = t.explosion.as_mut() {
            e.active = false;
        }
        t.update();
        assert_eq!(t.state, TankState::Dead);
        assert!(!t.explode());
    }

    #[test]
    fn test_reset_keeps_progress() {
        let mut t = player_at(131, 387);
        t.rect = t.rect.with_topleft(IVec2::new(40, 40));
        t.health = -20;
        t.paralysed = true;
        t.speed = 4;
        t.state = TankState::Dead;
        if let Some(p) = t.as_player_mut() {
            p.score = 1200;
            p.lives = 2;
            p.trophies.enemies[1] = 3;
        }
        t.reset();
        assert_eq!(t.state, TankState::Alive);
        assert_eq!(t.rect.topleft(), IVec2::new(131, 387));
        assert_eq!(t.health, 100);
        assert_eq!(t.superpowers, 1);
        assert_eq!(t.max_active_bullets, PLAYER_MAX_BULLETS);
        assert!(!t.paralysed);
        assert_eq!(t.speed, 4);
        let p = t.as_player().unwrap();
        assert_eq!((p.score, p.lives, p.trophies.enemies[1]), (1200, 2, 3));
    }
}
