//! Bullet collision resolution
//!
//! Each frame an active bullet moves once and then checks, in order: field
//! bounds, terrain, opposing bullets, player tanks, enemy tanks, the base.
//! The first hit decides the outcome.

use super::level::TileKind;
use super::state::{Game, SoundCue};
use super::tank::{Side, TankState};

/// What stopped a bullet this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletHit {
    Bounds,
    Terrain(TileKind),
    Bullet(u32),
    Tank(u32),
    Base,
}

impl Game {
    /// Advance one bullet and resolve what it runs into
    pub fn update_bullet(&mut self, idx: usize) -> Option<BulletHit> {
        self.bullets[idx].update();
        if !self.bullets[idx].is_active() {
            return None;
        }
        let left_field = self.bullets[idx].advance();
        let bullet = &self.bullets[idx];
        let (id, owner, owner_id, rect, power, damage) = (
            bullet.id,
            bullet.owner,
            bullet.owner_id,
            bullet.rect,
            bullet.power,
            bullet.damage,
        );
        let from_player = owner == Side::Player;

        if left_field {
            if from_player {
                self.play(SoundCue::Steel);
            }
            self.explode_bullet(idx);
            return Some(BulletHit::Bounds);
        }

        // Every overlapped tile takes the hit, not just the first
        let mut stopped_by = None;
        for pos in rect.collisions(self.level.obstacles()) {
            if let Some(kind) = self.level.hit_tile(pos, power) {
                if from_player {
                    self.play(match kind {
                        TileKind::Steel => SoundCue::Steel,
                        _ => SoundCue::Brick,
                    });
                }
                stopped_by = Some(kind);
            }
        }
        if let Some(kind) = stopped_by {
            self.explode_bullet(idx);
            return Some(BulletHit::Terrain(kind));
        }

        if let Some(other) = self
            .bullets
            .iter()
            .position(|b| b.id != id && b.owner != owner && b.is_active() && rect.collides(&b.rect))
        {
            let other_id = self.bullets[other].id;
            self.explode_bullet(idx);
            self.explode_bullet(other);
            return Some(BulletHit::Bullet(other_id));
        }

        let players: Vec<u32> = self
            .players
            .iter()
            .filter(|t| t.state == TankState::Alive && rect.collides(&t.rect))
            .map(|t| t.id)
            .collect();
        for target in players {
            if self.bullet_impact(target, from_player, damage, owner_id) {
                self.bullets[idx].remove();
                return Some(BulletHit::Tank(target));
            }
        }

        let enemies: Vec<u32> = self
            .enemies
            .iter()
            .filter(|t| t.state == TankState::Alive && rect.collides(&t.rect))
            .map(|t| t.id)
            .collect();
        for target in enemies {
            if self.bullet_impact(target, !from_player, damage, owner_id) {
                self.bullets[idx].remove();
                return Some(BulletHit::Tank(target));
            }
        }

        if self.base.active && rect.collides(&self.base.rect) {
            self.destroy_base();
            self.bullets[idx].remove();
            return Some(BulletHit::Base);
        }

        None
    }
}
