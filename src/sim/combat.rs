//! Firing, damage and explosions

use super::effects::{ExplosionOwner, TimerAction};
use super::entities::Bullet;
use super::state::{Game, GameEvent, SoundCue};
use super::tank::{Impact, Side};
use super::timer::Repeat;
use crate::consts::{EXPLOSION_FRAME_MS, PARALYSIS_MS};

impl Game {
    /// Fire from a tank. Fails when the tank is not alive, is paused, or
    /// (unless `forced`) already has its maximum of bullets in flight.
    pub fn fire(&mut self, tank_id: u32, forced: bool) -> bool {
        let Some(tank) = self.tank(tank_id) else {
            return false;
        };
        if !tank.is_alive() || tank.paused {
            return false;
        }
        if !forced {
            let in_flight = self
                .bullets
                .iter()
                .filter(|b| b.owner_id == tank_id && b.is_active())
                .count();
            if in_flight >= tank.max_active_bullets {
                return false;
            }
        }

        let (pos, direction, side) = (tank.rect.topleft(), tank.direction, tank.side());
        let (speed, power) = (tank.bullet_speed(), tank.bullet_power());
        let id = self.next_entity_id();
        let mut bullet = Bullet::new(id, pos, direction, side, tank_id);
        bullet.speed = speed;
        bullet.power = power;
        self.bullets.push(bullet);
        if side == Side::Player {
            self.play(SoundCue::Fire);
        }
        true
    }

    /// A bullet reached a tank. Returns whether the bullet is used up.
    pub fn bullet_impact(&mut self, target: u32, friendly: bool, damage: i32, attacker: u32) -> bool {
        let Some(tank) = self.tank_mut(target) else {
            return false;
        };
        match tank.apply_hit(friendly, damage) {
            Impact::Absorbed | Impact::Damaged => true,
            Impact::PassThrough => false,
            Impact::Paralysed { fresh } => {
                if fresh {
                    let timer = self.timers.once(PARALYSIS_MS, TimerAction::EndParalysis(target));
                    if let Some(p) = self.tank_mut(target).and_then(|t| t.as_player_mut()) {
                        p.paralysis_timer = Some(timer);
                    }
                }
                true
            }
            Impact::Destroyed => {
                let pos = tank.rect.topleft();
                if let Some(kind) = tank.as_enemy().map(|e| e.kind) {
                    let points = kind.points();
                    if let Some(p) = self.player_mut(attacker).and_then(|t| t.as_player_mut()) {
                        p.trophies.enemies[kind.index()] += 1;
                        p.score += points;
                    }
                    self.add_label(pos, points.to_string());
                    self.play(SoundCue::Explosion);
                    self.events.push(GameEvent::EnemyDestroyed {
                        enemy: target,
                        by: attacker,
                        points,
                    });
                }
                self.explode_tank(target);
                true
            }
        }
    }

    /// Start a tank's destruction; carriers drop a bonus
    pub fn explode_tank(&mut self, id: u32) {
        let Some(tank) = self.tank_mut(id) else {
            return;
        };
        if !tank.explode() {
            return;
        }
        let frames = tank.explosion.as_ref().map_or(0, |e| e.ticks());
        let carrier = tank.is_carrier();
        self.timers.schedule(
            EXPLOSION_FRAME_MS,
            TimerAction::AdvanceExplosion(ExplosionOwner::Tank(id)),
            Repeat::Times(frames),
        );
        if carrier {
            self.spawn_bonus();
        }
    }

    /// Start a bullet's explosion animation
    pub fn explode_bullet(&mut self, idx: usize) {
        let bullet = &mut self.bullets[idx];
        if !bullet.explode() {
            return;
        }
        let id = bullet.id;
        let frames = bullet.explosion.as_ref().map_or(0, |e| e.ticks());
        self.timers.schedule(
            EXPLOSION_FRAME_MS,
            TimerAction::AdvanceExplosion(ExplosionOwner::Bullet(id)),
            Repeat::Times(frames),
        );
    }

    /// The base was hit
    pub fn destroy_base(&mut self) {
        if !self.base.destroy() {
            return;
        }
        self.level.set_base(None);
        let frames = self.base.explosion.as_ref().map_or(0, |e| e.ticks());
        self.timers.schedule(
            EXPLOSION_FRAME_MS,
            TimerAction::AdvanceExplosion(ExplosionOwner::Base),
            Repeat::Times(frames),
        );
        self.play(SoundCue::Explosion);
        log::debug!("Base destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::state::test_support::*;
    use crate::sim::{EnemyKind, TankState, TickInput, tick};
    use glam::IVec2;

    fn run(game: &mut Game, ms: u32) {
        for _ in 0..ms / FRAME_MS {
            tick(game, &TickInput::default(), FRAME_MS);
        }
    }

    #[test]
    fn test_fire_respects_bullet_limit() {
        let mut game = game(1);
        let enemy = place_enemy(&mut game, EnemyKind::Basic, IVec2::new(200, 200));
        assert!(game.fire(enemy, false));
        assert!(!game.fire(enemy, false));
        assert!(game.fire(enemy, true));
        assert_eq!(game.bullets.len(), 2);
        assert_eq!(game.bullets[0].speed, BULLET_SPEED);
        assert_eq!(game.bullets[0].power, 1);
    }

    #[test]
    fn test_fire_refused_when_paused_or_not_alive() {
        let mut game = game(1);
        let enemy = place_enemy(&mut game, EnemyKind::Basic, IVec2::new(200, 200));
        game.set_freeze(true);
        assert!(!game.fire(enemy, true));
        game.set_freeze(false);
        game.enemies[0].state = TankState::Spawning;
        assert!(!game.fire(enemy, true));
        assert!(!game.fire(4040, true));
    }

    #[test]
    fn test_player_bullets_after_reset_are_fast() {
        let mut game = game(1);
        let player = game.players[0].id;
        assert!(game.fire(player, false));
        assert_eq!(game.bullets[0].speed, BULLET_FAST_SPEED);
        assert_eq!(game.bullets[0].owner, Side::Player);
        assert!(game.drain_events().contains(&GameEvent::Sound(SoundCue::Fire)));
    }

    #[test]
    fn test_friendly_fire_on_enemy_has_no_effect() {
        let mut game = game(1);
        let a = place_enemy(&mut game, EnemyKind::Basic, IVec2::new(200, 200));
        let b = place_enemy(&mut game, EnemyKind::Basic, IVec2::new(300, 200));
        assert!(!game.bullet_impact(a, true, 100, b));
        assert_eq!(game.tank(a).unwrap().health, 100);
    }

    #[test]
    fn test_basic_enemy_falls_on_second_hit() {
        let mut game = game(1);
        let player = game.players[0].id;
        let enemy = place_enemy(&mut game, EnemyKind::Basic, IVec2::new(200, 200));
        assert_eq!(game.tank(enemy).unwrap().speed, 1);

        assert!(game.bullet_impact(enemy, false, 50, player));
        assert_eq!(game.tank(enemy).unwrap().state, TankState::Alive);
        assert_eq!(game.players[0].as_player().unwrap().score, 0);

        assert!(game.bullet_impact(enemy, false, 50, player));
        assert_eq!(game.tank(enemy).unwrap().state, TankState::Exploding);
        let p = game.players[0].as_player().unwrap();
        assert_eq!(p.trophies.enemies[0], 1);
        assert_eq!(p.score, 100);
        assert_eq!(game.labels[0].text, "100");
    }

    #[test]
    fn test_armor_takes_four_hits() {
        let mut game = game(1);
        let player = game.players[0].id;
        let enemy = place_enemy(&mut game, EnemyKind::Armor, IVec2::new(200, 200));
        for _ in 0..3 {
            game.bullet_impact(enemy, false, BULLET_DAMAGE, player);
        }
        assert_eq!(game.tank(enemy).unwrap().state, TankState::Alive);
        game.bullet_impact(enemy, false, BULLET_DAMAGE, player);
        assert_eq!(game.tank(enemy).unwrap().state, TankState::Exploding);
        assert_eq!(game.players[0].as_player().unwrap().score, 400);
    }

    #[test]
    fn test_player_paralysis_lasts_ten_seconds() {
        let mut game = game(2);
        quiet(&mut game);
        let (p1, p2) = (game.players[0].id, game.players[1].id);
        game.set_shield(p2, false, None);

        assert!(game.bullet_impact(p2, true, BULLET_DAMAGE, p1));
        assert!(game.players[1].paralysed);
        assert_eq!(game.players[1].health, 100);
        // A second hit does not extend it
        run(&mut game, 5000);
        assert!(game.bullet_impact(p2, true, BULLET_DAMAGE, p1));
        run(&mut game, PARALYSIS_MS - 5000 - FRAME_MS);
        assert!(game.players[1].paralysed);
        run(&mut game, FRAME_MS);
        assert!(!game.players[1].paralysed);
        assert_eq!(game.players[1].health, 100);
    }

    #[test]
    fn test_explosion_runs_to_dead() {
        let mut game = game(1);
        quiet(&mut game);
        let enemy = place_enemy(&mut game, EnemyKind::Basic, IVec2::new(200, 200));
        game.explode_tank(enemy);
        game.explode_tank(enemy);
        run(&mut game, 2 * EXPLOSION_FRAME_MS);
        assert_eq!(game.tank(enemy).unwrap().state, TankState::Exploding);
        run(&mut game, EXPLOSION_FRAME_MS);
        assert_eq!(game.tank(enemy).unwrap().state, TankState::Dead);
        run(&mut game, FRAME_MS);
        assert!(game.tank(enemy).is_none());
    }

    #[test]
    fn test_carrier_drops_bonus() {
        let mut game = game(1);
        let id = game.next_entity_id();
        let pos = IVec2::new(200, 200);
        let mut tank = crate::sim::Tank::enemy(id, EnemyKind::Fast, pos, crate::sim::Direction::Down, true);
        tank.state = TankState::Alive;
        game.enemies.push(tank);
        game.explode_tank(id);
        assert_eq!(game.bonuses.len(), 1);
    }

    #[test]
    fn test_carrier_kills_keep_a_single_bonus() {
        let mut game = game(1);
        quiet(&mut game);
        let player = game.players[0].id;
        let first = place_carrier(&mut game, EnemyKind::Basic, IVec2::new(3, 200));
        let second = place_carrier(&mut game, EnemyKind::Basic, IVec2::new(100, 200));

        assert!(game.bullet_impact(first, false, BULLET_DAMAGE, player));
        assert_eq!(game.bonuses.len(), 1);
        let dropped = game.bonuses[0].id;
        run(&mut game, 10 * FRAME_MS);

        assert!(game.bullet_impact(second, false, BULLET_DAMAGE, player));
        assert_eq!(game.bonuses.len(), 1);
        assert_eq!(game.bonuses[0].id, dropped);
        for _ in 0..100 {
            run(&mut game, FRAME_MS);
            assert!(game.bonuses.len() <= 1);
        }
    }
}
