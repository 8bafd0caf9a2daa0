//! Enemy movement
//!
//! Enemies follow a queue of waypoints. When the queue runs dry, or the next
//! step is blocked, a new straight run is planned: keep going if possible,
//! otherwise try the other directions in random order, reversing last.

use std::collections::VecDeque;

use glam::IVec2;
use rand::Rng;
use rand::seq::SliceRandom;

use super::geom::{Direction, Rect, tile_index};
use super::state::Game;
use super::tank::{Tank, TankState};
use crate::consts::{FIELD_SIZE, TANK_SIZE, TILE_SIZE};

/// Probe distance when checking whether a direction is open
const PROBE_STEP: i32 = 8;

/// Plan a new straight run for `tank` and face it.
///
/// `preferred` is tried first and its opposite last; with no preference the
/// tank's own facing counts as the direction to avoid reversing.
pub fn generate_path<R: Rng + ?Sized>(
    tank: &mut Tank,
    obstacles: &[Rect],
    preferred: Option<Direction>,
    fix_alignment: bool,
    rng: &mut R,
) -> VecDeque<IVec2> {
    let opposite = preferred.unwrap_or(tank.direction).opposite();
    let mut order = Direction::ALL.to_vec();
    order.shuffle(rng);
    order.retain(|&d| d != opposite && Some(d) != preferred);
    if let Some(first) = preferred {
        order.insert(0, first);
    }
    order.push(opposite);

    let tx = tile_index(tank.rect.x, TILE_SIZE);
    let ty = tile_index(tank.rect.y, TILE_SIZE);
    let open = |d: Direction| {
        let room = match d {
            Direction::Up => ty > 1,
            Direction::Right => tx < 24,
            Direction::Down => ty < 24,
            Direction::Left => tx > 1,
        };
        room && !tank
            .rect
            .translated(d.delta() * PROBE_STEP)
            .collides_any(obstacles)
    };
    let chosen = order.into_iter().find(|&d| open(d)).unwrap_or(opposite);

    // Carrying on in the same direction needs no realignment
    let fix = fix_alignment && chosen != tank.direction;
    tank.rotate(chosen, fix);

    let run = rng.random_range(1..=12) * 32 + 3;
    let origin = tank.rect.topleft();
    let step = tank.speed.max(1) as usize;
    (0..run)
        .step_by(step)
        .map(|px| origin + chosen.delta() * px)
        .collect()
}

impl Game {
    fn replan(&mut self, idx: usize, preferred: Option<Direction>, fix_alignment: bool) {
        let tank = &mut self.enemies[idx];
        let path = generate_path(
            tank,
            self.level.obstacles(),
            preferred,
            fix_alignment,
            &mut self.rng,
        );
        if let Some(enemy) = tank.as_enemy_mut() {
            enemy.path = path;
        }
    }

    /// Per-frame enemy update: explosion completion, then movement
    pub fn update_enemy(&mut self, idx: usize) {
        let tank = &mut self.enemies[idx];
        tank.update();
        if tank.is_alive() && !tank.paused {
            self.move_enemy(idx);
        }
    }

    /// Take the next waypoint unless something is in the way
    pub fn move_enemy(&mut self, idx: usize) {
        let tank = &self.enemies[idx];
        if tank.state != TankState::Alive || tank.paused || tank.paralysed {
            return;
        }
        if tank.as_enemy().is_some_and(|e| e.path.is_empty()) {
            self.replan(idx, None, true);
        }

        let tank = &mut self.enemies[idx];
        let Some(next) = tank.as_enemy_mut().and_then(|e| e.path.pop_front()) else {
            return;
        };
        let direction = tank.direction;
        let leaves_field = match direction {
            Direction::Up => next.y < 0,
            Direction::Right => next.x > FIELD_SIZE - TANK_SIZE,
            Direction::Down => next.y > FIELD_SIZE - TANK_SIZE,
            Direction::Left => next.x < 0,
        };
        let new_rect = tank.rect.with_topleft(next);
        if leaves_field || new_rect.collides_any(self.level.obstacles()) {
            self.replan(idx, Some(direction), true);
            return;
        }

        let id = self.enemies[idx].id;
        let blocked = self
            .enemies
            .iter()
            .any(|e| e.id != id && e.state != TankState::Dead && new_rect.collides(&e.rect))
            || self
                .players
                .iter()
                .any(|p| p.state != TankState::Dead && new_rect.collides(&p.rect));
        if blocked {
            let tank = &mut self.enemies[idx];
            tank.turn_around();
            let reversed = tank.direction;
            self.replan(idx, Some(reversed), false);
            return;
        }

        // Enemies crush bonuses without collecting them
        for bonus in &mut self.bonuses {
            if bonus.active && new_rect.collides(&bonus.rect) {
                bonus.active = false;
            }
        }
        self.enemies[idx].rect = new_rect;
    }
}
