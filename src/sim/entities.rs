//! Small self-contained entities: explosions, base, bullets, bonuses, labels

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::geom::{Direction, Rect};
use super::tank::Side;
use crate::consts::{BASE_SIZE, BASE_X, BASE_Y, BULLET_DAMAGE, FIELD_SIZE};

/// Frames in a tank or base explosion
pub const TANK_EXPLOSION_FRAMES: u8 = 3;
/// Frames in a bullet explosion
pub const BULLET_EXPLOSION_FRAMES: u8 = 2;

/// Finite explosion animation, advanced by a timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explosion {
    pub pos: IVec2,
    pub frame: u8,
    pub frames: u8,
    /// False once the last frame has been shown
    pub active: bool,
}

impl Explosion {
    /// `anchor` is the exploding object's top-left; the sprite is centred on it
    pub fn new(anchor: IVec2, frames: u8) -> Self {
        Self {
            pos: anchor - IVec2::splat(16),
            frame: 0,
            frames: frames.max(1),
            active: true,
        }
    }

    /// Number of timer firings needed to play out the animation
    pub fn ticks(&self) -> u32 {
        u32::from(self.frames)
    }

    pub fn advance(&mut self) {
        if self.frame + 1 < self.frames {
            self.frame += 1;
        } else {
            self.active = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseState {
    Standing,
    Exploding,
    Destroyed,
}

/// The player's base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Base {
    pub rect: Rect,
    pub state: BaseState,
    pub active: bool,
    pub explosion: Option<Explosion>,
}

impl Default for Base {
    fn default() -> Self {
        Self {
            rect: Rect::new(BASE_X, BASE_Y, BASE_SIZE, BASE_SIZE),
            state: BaseState::Standing,
            active: true,
            explosion: None,
        }
    }
}

impl Base {
    pub fn rebuild(&mut self) {
        self.state = BaseState::Standing;
        self.active = true;
        self.explosion = None;
    }

    /// Start the destruction animation; false if already hit
    pub fn destroy(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.state = BaseState::Exploding;
        self.explosion = Some(Explosion::new(self.rect.topleft(), TANK_EXPLOSION_FRAMES));
        self.active = false;
        true
    }

    pub fn update(&mut self) {
        if self.state == BaseState::Exploding
            && self.explosion.as_ref().is_none_or(|e| !e.active)
        {
            self.state = BaseState::Destroyed;
            self.explosion = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletState {
    Active,
    Exploding,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub id: u32,
    pub owner: Side,
    /// Id of the firing tank (may no longer exist)
    pub owner_id: u32,
    pub direction: Direction,
    pub rect: Rect,
    pub speed: i32,
    pub damage: i32,
    /// 1 = normal, 2 = breaks steel
    pub power: u8,
    pub state: BulletState,
    pub explosion: Option<Explosion>,
}

impl Bullet {
    /// Bullet leaving the muzzle of a tank whose top-left is `tank_pos`
    pub fn new(id: u32, tank_pos: IVec2, direction: Direction, owner: Side, owner_id: u32) -> Self {
        let IVec2 { x, y } = tank_pos;
        let rect = match direction {
            Direction::Up => Rect::new(x + 11, y - 8, 6, 8),
            Direction::Right => Rect::new(x + 26, y + 11, 8, 6),
            Direction::Down => Rect::new(x + 11, y + 26, 6, 8),
            Direction::Left => Rect::new(x - 8, y + 11, 8, 6),
        };
        Self {
            id,
            owner,
            owner_id,
            direction,
            rect,
            speed: crate::consts::BULLET_SPEED,
            damage: BULLET_DAMAGE,
            power: 1,
            state: BulletState::Active,
            explosion: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == BulletState::Active
    }

    /// Move one step; true if the bullet left the field
    pub fn advance(&mut self) -> bool {
        self.rect = self.rect.translated(self.direction.delta() * self.speed);
        match self.direction {
            Direction::Up => self.rect.y < 0,
            Direction::Right => self.rect.x > FIELD_SIZE - self.rect.w,
            Direction::Down => self.rect.y > FIELD_SIZE - self.rect.h,
            Direction::Left => self.rect.x < 0,
        }
    }

    /// Start exploding; false if already removed
    pub fn explode(&mut self) -> bool {
        if self.state == BulletState::Removed {
            return false;
        }
        self.state = BulletState::Exploding;
        let anchor = self.rect.topleft() - IVec2::splat(13);
        self.explosion = Some(Explosion::new(anchor, BULLET_EXPLOSION_FRAMES));
        true
    }

    pub fn remove(&mut self) {
        self.state = BulletState::Removed;
        self.explosion = None;
    }

    /// Explosion finished: the bullet is gone
    pub fn update(&mut self) {
        if self.state == BulletState::Exploding
            && self.explosion.as_ref().is_none_or(|e| !e.active)
        {
            self.remove();
        }
    }
}

/// Power-up kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BonusKind {
    /// Destroys every enemy on the field
    Grenade,
    /// Temporary invulnerability
    Helmet,
    /// Steel walls around the base
    Shovel,
    /// Faster tank, stronger bullets
    Star,
    /// Extra life
    Tank,
    /// Freezes every enemy
    Clock,
}

impl BonusKind {
    pub const ALL: [BonusKind; 6] = [
        BonusKind::Grenade,
        BonusKind::Helmet,
        BonusKind::Shovel,
        BonusKind::Star,
        BonusKind::Tank,
        BonusKind::Clock,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bonus {
    pub id: u32,
    pub kind: BonusKind,
    pub rect: Rect,
    pub visible: bool,
    pub active: bool,
}

impl Bonus {
    pub fn new(id: u32, kind: BonusKind, pos: IVec2) -> Self {
        Self {
            id,
            kind,
            rect: Rect::square(pos, 32),
            visible: true,
            active: true,
        }
    }
}

/// Floating score text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: u32,
    pub pos: IVec2,
    pub text: String,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explosion_runs_out_after_frames_ticks() {
        let mut e = Explosion::new(IVec2::new(100, 100), TANK_EXPLOSION_FRAMES);
        assert_eq!(e.pos, IVec2::new(84, 84));
        for _ in 0..e.ticks() - 1 {
            e.advance();
            assert!(e.active);
        }
        assert_eq!(e.frame, 2);
        e.advance();
        assert!(!e.active);
    }

    #[test]
    fn test_bullet_leaves_field() {
        let mut b = Bullet::new(1, IVec2::new(100, 4), Direction::Up, Side::Player, 9);
        assert_eq!(b.rect, Rect::new(111, -4, 6, 8));
        assert!(b.advance());

        let mut b = Bullet::new(2, IVec2::new(200, 200), Direction::Right, Side::Enemy, 9);
        assert!(!b.advance());
        assert_eq!(b.rect.x, 231);
    }

    #[test]
    fn test_bullet_explosion_then_removed() {
        let mut b = Bullet::new(1, IVec2::new(100, 100), Direction::Down, Side::Enemy, 3);
        assert!(b.explode());
        assert_eq!(b.state, BulletState::Exploding);
        if let Some(e) = b.explosion.as_mut() {
            e.advance();
            e.advance();
        }
        b.update();
        assert_eq!(b.state, BulletState::Removed);
        assert!(!b.explode());
    }

    #[test]
    fn test_base_destroy_is_one_shot() {
        let mut base = Base::default();
        assert!(base.destroy());
        assert!(!base.destroy());
        assert_eq!(base.state, BaseState::Exploding);
        if let Some(e) = base.explosion.as_mut() {
            e.active = false;
        }
        base.update();
        assert_eq!(base.state, BaseState::Destroyed);
        base.rebuild();
        assert!(base.active);
    }
}
