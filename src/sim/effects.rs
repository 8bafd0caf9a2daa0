//! Timed effects and the stage flow they drive
//!
//! Every delayed or repeating behaviour is a [`TimerAction`] registered with
//! the game's scheduler. [`Game::dispatch`] runs one; an `Err` means the
//! target is gone and the caller drops the entry.

use std::fmt;

use glam::IVec2;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use super::entities::{Bonus, BonusKind, Label};
use super::geom::{Direction, Rect};
use super::level::TileKind;
use super::state::{Game, GameEvent, GamePhase, SoundCue};
use super::tank::{Tank, TankState};
use super::timer::TimerId;
use crate::consts::*;

/// Whose explosion a timer advances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplosionOwner {
    Tank(u32),
    Bullet(u32),
    Base,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    SpawnEnemy,
    ToggleWater,
    AdvanceExplosion(ExplosionOwner),
    SpawnBlink(u32),
    EndSpawn(u32),
    ShieldBlink(u32),
    EndShield(u32),
    EndParalysis(u32),
    EnemyFire(u32),
    CarrierFlash(u32),
    BonusBlink(u32),
    BonusExpire(u32),
    LabelExpire(u32),
    RestoreFortress,
    EndFreeze,
    ShowScores,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    TankGone(u32),
    BulletGone(u32),
    BonusGone(u32),
    LabelGone(u32),
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectError::TankGone(id) => write!(f, "tank {id} no longer exists"),
            EffectError::BulletGone(id) => write!(f, "bullet {id} no longer exists"),
            EffectError::BonusGone(id) => write!(f, "bonus {id} no longer exists"),
            EffectError::LabelGone(id) => write!(f, "label {id} no longer exists"),
        }
    }
}

impl std::error::Error for EffectError {}

/// Enemy entry cells along the top row
pub const ENEMY_SPAWN_POINTS: [IVec2; 3] =
    [IVec2::new(3, 3), IVec2::new(195, 3), IVec2::new(387, 3)];

impl Game {
    /// Run one timer action
    pub fn dispatch(&mut self, id: TimerId, action: TimerAction) -> Result<(), EffectError> {
        match action {
            TimerAction::SpawnEnemy => self.spawn_enemy(),
            TimerAction::ToggleWater => self.level.toggle_water(),
            TimerAction::AdvanceExplosion(owner) => {
                let explosion = match owner {
                    ExplosionOwner::Tank(t) => {
                        self.tank_mut(t)
                            .ok_or(EffectError::TankGone(t))?
                            .explosion
                            .as_mut()
                    }
                    ExplosionOwner::Bullet(b) => {
                        self.bullets
                            .iter_mut()
                            .find(|x| x.id == b)
                            .ok_or(EffectError::BulletGone(b))?
                            .explosion
                            .as_mut()
                    }
                    ExplosionOwner::Base => self.base.explosion.as_mut(),
                };
                if let Some(explosion) = explosion {
                    explosion.advance();
                }
            }
            TimerAction::SpawnBlink(t) => {
                let tank = self.tank_mut(t).ok_or(EffectError::TankGone(t))?;
                if tank.state == TankState::Spawning {
                    tank.spawn_frame ^= 1;
                } else {
                    self.timers.cancel(id);
                }
            }
            TimerAction::EndSpawn(t) => {
                self.tank_mut(t).ok_or(EffectError::TankGone(t))?.end_spawning();
            }
            TimerAction::ShieldBlink(t) => {
                let tank = self.tank_mut(t).ok_or(EffectError::TankGone(t))?;
                if tank.state != TankState::Alive {
                    self.timers.cancel(id);
                } else if tank.shielded {
                    tank.shield_frame ^= 1;
                }
            }
            TimerAction::EndShield(t) => {
                if self.tank(t).is_none() {
                    return Err(EffectError::TankGone(t));
                }
                self.set_shield(t, false, None);
            }
            TimerAction::EndParalysis(t) => {
                let tank = self.tank_mut(t).ok_or(EffectError::TankGone(t))?;
                if tank.state == TankState::Alive {
                    tank.paralysed = false;
                }
                if let Some(p) = tank.as_player_mut() {
                    p.paralysis_timer = None;
                }
            }
            TimerAction::EnemyFire(t) => {
                let state = self.tank(t).ok_or(EffectError::TankGone(t))?.state;
                match state {
                    TankState::Alive => {
                        self.fire(t, false);
                    }
                    TankState::Spawning => {}
                    TankState::Exploding | TankState::Dead => {
                        self.timers.cancel(id);
                    }
                }
            }
            TimerAction::CarrierFlash(t) => {
                let tank = self.tank_mut(t).ok_or(EffectError::TankGone(t))?;
                if matches!(tank.state, TankState::Alive | TankState::Spawning) {
                    tank.flash = !tank.flash;
                } else {
                    self.timers.cancel(id);
                }
            }
            TimerAction::BonusBlink(b) => {
                let bonus = self
                    .bonuses
                    .iter_mut()
                    .find(|x| x.id == b)
                    .ok_or(EffectError::BonusGone(b))?;
                bonus.visible = !bonus.visible;
            }
            TimerAction::BonusExpire(b) => {
                self.bonuses
                    .iter_mut()
                    .find(|x| x.id == b)
                    .ok_or(EffectError::BonusGone(b))?
                    .active = false;
            }
            TimerAction::LabelExpire(l) => {
                self.labels
                    .iter_mut()
                    .find(|x| x.id == l)
                    .ok_or(EffectError::LabelGone(l))?
                    .active = false;
            }
            TimerAction::RestoreFortress => {
                self.level.build_fortress(TileKind::Brick);
                self.fortress_timer = None;
            }
            TimerAction::EndFreeze => self.set_freeze(false),
            TimerAction::ShowScores => self.show_scores(),
        }
        Ok(())
    }

    /// Bring in the next enemy from the pool, if there is room
    pub fn spawn_enemy(&mut self) {
        if self.enemies.len() >= self.level.max_active_enemies
            || self.level.enemies_left.is_empty()
            || self.time_freeze
        {
            return;
        }
        let Some(pos) = self.free_spawn_position() else {
            log::trace!("All spawn points occupied");
            return;
        };
        let Some(kind) = self.level.enemies_left.pop() else {
            return;
        };

        let direction = [Direction::Right, Direction::Down, Direction::Left]
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(Direction::Down);
        let carrier = self.rng.random_range(1..=CARRIER_ODDS) == 1
            && !self.enemies.iter().any(Tank::is_carrier);

        let id = self.next_entity_id();
        let mut tank = Tank::enemy(id, kind, pos, direction, carrier);
        tank.spawn_timer = Some(self.timers.every(BLINK_MS, TimerAction::SpawnBlink(id)));
        self.timers.once(SPAWN_MS, TimerAction::EndSpawn(id));

        let path = super::ai::generate_path(
            &mut tank,
            self.level.obstacles(),
            Some(direction),
            false,
            &mut self.rng,
        );
        let fire_timer = self.timers.every(ENEMY_FIRE_MS, TimerAction::EnemyFire(id));
        let flash_timer =
            carrier.then(|| self.timers.every(CARRIER_FLASH_MS, TimerAction::CarrierFlash(id)));
        if let Some(enemy) = tank.as_enemy_mut() {
            enemy.path = path;
            enemy.fire_timer = Some(fire_timer);
            enemy.flash_timer = flash_timer;
        }

        log::debug!("Spawned {kind:?} enemy {id} at {pos} (carrier: {carrier})");
        self.enemies.push(tank);
    }

    /// First unoccupied spawn point, tried in random order
    pub fn free_spawn_position(&mut self) -> Option<IVec2> {
        let mut points = ENEMY_SPAWN_POINTS;
        points.shuffle(&mut self.rng);
        points.into_iter().find(|&pos| {
            let rect = Rect::square(pos, TANK_SIZE);
            !self
                .enemies
                .iter()
                .chain(self.players.iter())
                .any(|t| t.state != TankState::Dead && rect.collides(&t.rect))
        })
    }

    /// Drop a random bonus unless one is already out
    pub fn spawn_bonus(&mut self) {
        if !self.bonuses.is_empty() {
            return;
        }
        let limit = FIELD_SIZE - 32;
        let pos = IVec2::new(
            self.rng.random_range(0..=limit),
            self.rng.random_range(0..=limit),
        );
        let kind = BonusKind::ALL
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(BonusKind::Star);
        let id = self.next_entity_id();
        self.bonuses.push(Bonus::new(id, kind, pos));
        self.timers.every(BONUS_BLINK_MS, TimerAction::BonusBlink(id));
        self.timers.once(BONUS_LIFETIME_MS, TimerAction::BonusExpire(id));
        log::debug!("Bonus {kind:?} dropped at {pos}");
    }

    /// Apply a collected bonus to a player.
    ///
    /// A star also raises the upgrade level (up to [`MAX_SUPERPOWERS`]) on top
    /// of the speed boost, so repeated stars unlock faster and steel-breaking
    /// bullets.
    pub fn trigger_bonus(&mut self, player_id: u32, bonus_id: u32) {
        let Some((kind, pos)) = self
            .bonuses
            .iter()
            .find(|b| b.id == bonus_id && b.active)
            .map(|b| (b.kind, b.rect.topleft()))
        else {
            return;
        };
        let Some(p) = self.player_mut(player_id).and_then(|t| t.as_player_mut()) else {
            return;
        };
        p.trophies.bonus += 1;
        p.score += BONUS_POINTS;

        match kind {
            BonusKind::Grenade => {
                let ids: Vec<u32> = self.enemies.iter().map(|e| e.id).collect();
                for id in ids {
                    self.explode_tank(id);
                }
            }
            BonusKind::Helmet => self.set_shield(player_id, true, Some(POWERUP_MS)),
            BonusKind::Shovel => {
                self.level.build_fortress(TileKind::Steel);
                if let Some(old) = self.fortress_timer.take() {
                    self.timers.cancel(old);
                }
                self.fortress_timer = Some(self.timers.once(POWERUP_MS, TimerAction::RestoreFortress));
            }
            BonusKind::Star => {
                if let Some(player) = self.player_mut(player_id) {
                    player.speed = (player.speed + 1).min(MAX_TANK_SPEED);
                    player.superpowers = (player.superpowers + 1).min(MAX_SUPERPOWERS);
                }
            }
            BonusKind::Tank => {
                if let Some(player) = self.player_mut(player_id) {
                    player.health += 50;
                    if let Some(p) = player.as_player_mut() {
                        p.lives += 1;
                    }
                }
            }
            BonusKind::Clock => {
                self.set_freeze(true);
                if let Some(old) = self.freeze_timer.take() {
                    self.timers.cancel(old);
                }
                self.freeze_timer = Some(self.timers.once(POWERUP_MS, TimerAction::EndFreeze));
            }
        }

        if let Some(bonus) = self.bonuses.iter_mut().find(|b| b.id == bonus_id) {
            bonus.active = false;
        }
        self.add_label(pos, BONUS_POINTS.to_string());
        self.play(SoundCue::Bonus);
        self.events.push(GameEvent::BonusCollected { player: player_id });
        log::debug!("Player {player_id} collected {kind:?}");
    }

    /// Turn a tank's shield on or off. Turning it on restarts any running
    /// shield; `duration` schedules the matching switch-off.
    pub fn set_shield(&mut self, tank_id: u32, on: bool, duration: Option<u32>) {
        let Some(tank) = self.tank_mut(tank_id) else {
            return;
        };
        tank.shielded = on;
        let stale = [tank.shield_timer.take(), tank.shield_end_timer.take()];
        for old in stale.into_iter().flatten() {
            self.timers.cancel(old);
        }
        if !on {
            return;
        }
        let blink = self.timers.every(BLINK_MS, TimerAction::ShieldBlink(tank_id));
        let end = duration.map(|ms| self.timers.once(ms, TimerAction::EndShield(tank_id)));
        if let Some(tank) = self.tank_mut(tank_id) {
            tank.shield_timer = Some(blink);
            tank.shield_end_timer = end;
        }
    }

    /// Pause or release every enemy and enemy spawning
    pub fn set_freeze(&mut self, freeze: bool) {
        self.time_freeze = freeze;
        for enemy in &mut self.enemies {
            enemy.paused = freeze;
        }
        if !freeze {
            self.freeze_timer = None;
        }
    }

    /// Put a player back at its start with a temporary shield
    pub fn respawn_player(&mut self, idx: usize) {
        let Some(tank) = self.players.get_mut(idx) else {
            return;
        };
        tank.reset();
        let (id, index) = (tank.id, tank.as_player().map_or(idx, |p| p.index));
        let paralysis = tank.as_player_mut().and_then(|p| p.paralysis_timer.take());
        if let Some(old) = paralysis {
            self.timers.cancel(old);
        }
        self.set_shield(id, true, Some(RESPAWN_SHIELD_MS));
        self.events.push(GameEvent::PlayerRespawned(index));
    }

    /// End the game. Only the first call in a game has any effect.
    pub fn game_over(&mut self) {
        if matches!(self.phase, GamePhase::GameOver | GamePhase::Tally { .. }) {
            return;
        }
        self.phase = GamePhase::GameOver;
        self.game_over_y = BANNER_START_Y;
        if let Some(old) = self.tally_timer.take() {
            self.timers.cancel(old);
        }
        self.tally_timer = Some(self.timers.once(TALLY_DELAY_MS, TimerAction::ShowScores));
        self.play(SoundCue::GameOver);
        self.events.push(GameEvent::GameOver);
        log::info!("Game over on stage {}", self.stage);
    }

    /// Stage cleared: tally follows after a delay
    pub fn finish_level(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        self.phase = GamePhase::StageClear;
        self.tally_timer = Some(self.timers.once(TALLY_DELAY_MS, TimerAction::ShowScores));
        self.events.push(GameEvent::StageCleared(self.stage));
        log::info!("Stage {} completed", self.stage);
    }

    /// Stop the stage, record the high score and emit the tally
    pub fn show_scores(&mut self) {
        self.timers.clear();
        self.spawn_timer = None;
        self.fortress_timer = None;
        self.freeze_timer = None;
        self.tally_timer = None;

        self.hiscore = self.hiscore.max(self.scores.load());
        let best = self
            .players
            .iter()
            .filter_map(|t| t.as_player())
            .map(|p| p.score)
            .max()
            .unwrap_or(0);
        if best > self.hiscore {
            self.hiscore = best;
            if let Err(e) = self.scores.save(best) {
                log::warn!("Can't save high score: {e}");
            }
            self.events.push(GameEvent::HighScore(best));
            log::info!("New high score {best}");
        }

        let kills: u32 = self
            .players
            .iter()
            .filter_map(|t| t.as_player())
            .map(|p| p.trophies.kills())
            .sum();
        for _ in 0..kills {
            self.play(SoundCue::Score);
        }

        let game_over = self.phase == GamePhase::GameOver;
        self.phase = GamePhase::Tally { game_over };
    }

    /// Floating text that disappears after a short while
    pub fn add_label(&mut self, pos: IVec2, text: String) {
        let id = self.next_entity_id();
        self.labels.push(Label {
            id,
            pos,
            text,
            active: true,
        });
        self.timers.once(LABEL_MS, TimerAction::LabelExpire(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::test_support::*;
    use crate::sim::{EnemyKind, TickInput, tick};

    fn run(game: &mut Game, ms: u32) {
        for _ in 0..ms / FRAME_MS {
            tick(game, &TickInput::default(), FRAME_MS);
        }
    }

    fn drop_bonus(game: &mut Game, kind: BonusKind) -> u32 {
        let id = game.next_entity_id();
        game.bonuses.push(Bonus::new(id, kind, IVec2::new(200, 200)));
        id
    }

    #[test]
    fn test_dispatch_on_missing_target_fails() {
        let mut game = game(1);
        let id = game.timers.once(10, TimerAction::EndSpawn(777));
        assert_eq!(
            game.dispatch(id, TimerAction::EndSpawn(777)),
            Err(EffectError::TankGone(777))
        );
        assert!(game.dispatch(id, TimerAction::BonusBlink(5)).is_err());
    }

    #[test]
    fn test_failed_timer_is_dropped_others_continue() {
        let mut game = game(1);
        quiet(&mut game);
        let bad = game.timers.every(FRAME_MS, TimerAction::BonusBlink(4242));
        let water = game.level.water_frame;
        run(&mut game, WATER_MS);
        assert!(!game.timers.contains(bad));
        assert_ne!(game.level.water_frame, water);
    }

    #[test]
    fn test_spawn_respects_cap_and_freeze() {
        let mut game = game(1);
        for _ in 0..10 {
            game.spawn_enemy();
            // Clear the spawn points so the cap is what stops us
            for (i, e) in game.enemies.iter_mut().enumerate() {
                e.rect = e.rect.with_topleft(IVec2::new(3 + 32 * i as i32, 200));
            }
        }
        assert_eq!(game.enemies.len(), MAX_ACTIVE_ENEMIES);
        assert_eq!(game.level.enemies_left.len(), 20 - MAX_ACTIVE_ENEMIES);

        game.enemies.clear();
        game.set_freeze(true);
        game.spawn_enemy();
        assert!(game.enemies.is_empty());
    }

    #[test]
    fn test_spawn_skipped_without_free_point_keeps_pool() {
        let mut game = game(1);
        for pos in ENEMY_SPAWN_POINTS {
            place_enemy(&mut game, EnemyKind::Basic, pos);
        }
        let before = game.level.enemies_left.len();
        game.spawn_enemy();
        assert_eq!(game.enemies.len(), 3);
        assert_eq!(game.level.enemies_left.len(), before);
    }

    #[test]
    fn test_at_most_one_carrier() {
        let mut game = game(1);
        for _ in 0..200 {
            game.enemies.clear();
            game.level.enemies_left = vec![EnemyKind::Basic; 4];
            for i in 0..4 {
                game.spawn_enemy();
                if let Some(e) = game.enemies.last_mut() {
                    e.rect = e.rect.with_topleft(IVec2::new(3 + 32 * i, 200));
                }
            }
            assert!(game.enemies.iter().filter(|e| e.is_carrier()).count() <= 1);
        }
    }

    #[test]
    fn test_only_one_bonus_at_a_time() {
        let mut game = game(1);
        quiet(&mut game);
        game.spawn_bonus();
        game.spawn_bonus();
        assert_eq!(game.bonuses.len(), 1);
        run(&mut game, BONUS_LIFETIME_MS + FRAME_MS);
        assert!(game.bonuses.is_empty());
        game.spawn_bonus();
        assert_eq!(game.bonuses.len(), 1);
    }

    #[test]
    fn test_bonus_awards_points_and_label() {
        let mut game = game(1);
        let player = game.players[0].id;
        let bonus = drop_bonus(&mut game, BonusKind::Tank);
        game.trigger_bonus(player, bonus);
        let p = game.players[0].as_player().unwrap();
        assert_eq!((p.score, p.trophies.bonus, p.lives), (500, 1, 4));
        assert_eq!(game.players[0].health, 150);
        assert_eq!(game.labels.len(), 1);
        assert_eq!(game.labels[0].text, "500");
        assert!(!game.bonuses[0].active);
        // Already spent
        game.trigger_bonus(player, bonus);
        assert_eq!(game.players[0].as_player().unwrap().score, 500);
    }

    #[test]
    fn test_star_caps() {
        let mut game = game(1);
        let player = game.players[0].id;
        for _ in 0..6 {
            let bonus = drop_bonus(&mut game, BonusKind::Star);
            game.trigger_bonus(player, bonus);
            game.bonuses.clear();
        }
        assert_eq!(game.players[0].speed, MAX_TANK_SPEED);
        assert_eq!(game.players[0].superpowers, MAX_SUPERPOWERS);
        assert_eq!(game.players[0].bullet_power(), 2);
    }

    #[test]
    fn test_grenade_explodes_every_enemy() {
        let mut game = game(1);
        let a = place_enemy(&mut game, EnemyKind::Armor, IVec2::new(3, 100));
        let b = place_enemy(&mut game, EnemyKind::Fast, IVec2::new(100, 100));
        let player = game.players[0].id;
        let bonus = drop_bonus(&mut game, BonusKind::Grenade);
        game.trigger_bonus(player, bonus);
        for id in [a, b] {
            assert_eq!(game.tank(id).unwrap().state, TankState::Exploding);
        }
        assert_eq!(game.players[0].as_player().unwrap().trophies.kills(), 0);
    }

    #[test]
    fn test_shovel_then_brick_after_ten_seconds() {
        let mut game = game(1);
        quiet(&mut game);
        let player = game.players[0].id;
        let bonus = drop_bonus(&mut game, BonusKind::Shovel);
        game.trigger_bonus(player, bonus);
        let ring = |game: &Game, kind: TileKind| {
            crate::sim::FORTRESS.iter().all(|&(x, y)| {
                let pos = IVec2::new(x * TILE_SIZE, y * TILE_SIZE);
                let at: Vec<_> = game
                    .level
                    .tiles
                    .iter()
                    .filter(|t| t.rect.topleft() == pos)
                    .collect();
                at.len() == 1 && at[0].kind == kind
            })
        };
        assert!(ring(&game, TileKind::Steel));
        run(&mut game, POWERUP_MS - 2 * FRAME_MS);
        assert!(ring(&game, TileKind::Steel));
        run(&mut game, 2 * FRAME_MS);
        assert!(ring(&game, TileKind::Brick));
        assert_eq!(game.level.tiles.len(), 8);
    }

    #[test]
    fn test_clock_freezes_then_releases() {
        let mut game = game(1);
        quiet(&mut game);
        let enemy = place_enemy(&mut game, EnemyKind::Basic, IVec2::new(3, 200));
        let player = game.players[0].id;
        let bonus = drop_bonus(&mut game, BonusKind::Clock);
        game.trigger_bonus(player, bonus);
        assert!(game.time_freeze);
        assert!(game.tank(enemy).unwrap().paused);
        run(&mut game, POWERUP_MS);
        assert!(!game.time_freeze);
        assert!(!game.tank(enemy).unwrap().paused);
    }

    #[test]
    fn test_recollecting_helmet_restarts_shield() {
        let mut game = game(1);
        quiet(&mut game);
        let player = game.players[0].id;
        let first = drop_bonus(&mut game, BonusKind::Helmet);
        game.trigger_bonus(player, first);
        run(&mut game, 6000);
        game.bonuses.clear();
        let second = drop_bonus(&mut game, BonusKind::Helmet);
        game.trigger_bonus(player, second);
        run(&mut game, 6000);
        assert!(game.players[0].shielded);
        run(&mut game, 4000);
        assert!(!game.players[0].shielded);
    }

    #[test]
    fn test_game_over_is_idempotent() {
        let mut game = game(1);
        game.game_over();
        game.game_over();
        let overs = game
            .drain_events()
            .into_iter()
            .filter(|e| *e == GameEvent::GameOver)
            .count();
        assert_eq!(overs, 1);
        run(&mut game, TALLY_DELAY_MS);
        assert_eq!(game.phase, GamePhase::Tally { game_over: true });
        assert!(game.timers.is_empty());
    }

    #[test]
    fn test_tally_records_high_score() {
        let mut game = game(1);
        if let Some(p) = game.players[0].as_player_mut() {
            p.score = 25000;
            p.trophies.enemies = [2, 1, 0, 0];
        }
        game.finish_level();
        game.drain_events();
        run(&mut game, TALLY_DELAY_MS);
        assert_eq!(game.phase, GamePhase::Tally { game_over: false });
        assert_eq!(game.hiscore, 25000);
        assert_eq!(game.scores.load(), 25000);
        let events = game.drain_events();
        assert!(events.contains(&GameEvent::HighScore(25000)));
        let cues = events
            .iter()
            .filter(|e| **e == GameEvent::Sound(SoundCue::Score))
            .count();
        assert_eq!(cues, 3);
    }
}
