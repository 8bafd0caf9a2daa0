//! Fixed timestep simulation tick
//!
//! One call advances the game by one frame: timers first, then players,
//! enemies, bullets and the small entities, then the stage-level checks.

use super::entities::BulletState;
use super::geom::Direction;
use super::input::TickInput;
use super::state::{Game, GamePhase, SoundCue};
use super::tank::TankState;
use crate::consts::*;

/// Advance the game by one frame of `elapsed_ms`
pub fn tick(game: &mut Game, input: &TickInput, elapsed_ms: u32) {
    if matches!(game.phase, GamePhase::Idle | GamePhase::Tally { .. }) {
        return;
    }
    game.frame += 1;

    run_timers(game, elapsed_ms);
    // The tally may have been reached by a timer this frame
    if matches!(game.phase, GamePhase::Tally { .. }) {
        return;
    }

    for idx in 0..game.players.len() {
        let tank = &game.players[idx];
        if game.phase == GamePhase::Playing && tank.is_alive() {
            let (id, index) = (tank.id, tank.as_player().map_or(0, |p| p.index));
            let controls = input.players.get(index).copied().unwrap_or_default();
            if controls.fire {
                game.fire(id, false);
            }
            if let Some(direction) = controls.direction() {
                move_player(game, idx, direction);
            }
        }
        game.players[idx].update();
    }

    let mut idx = 0;
    while idx < game.enemies.len() {
        if game.enemies[idx].state == TankState::Dead && game.phase == GamePhase::Playing {
            let tank = game.enemies.remove(idx);
            game.cancel_tank_timers(&tank);
            continue;
        }
        game.update_enemy(idx);
        idx += 1;
    }
    if game.phase == GamePhase::Playing
        && game.level.enemies_left.is_empty()
        && game.enemies.is_empty()
    {
        game.finish_level();
    }

    if game.phase == GamePhase::Playing {
        for idx in 0..game.players.len() {
            match game.players[idx].state {
                TankState::Alive => {
                    let id = game.players[idx].id;
                    let bonus = game.players[idx]
                        .as_player_mut()
                        .and_then(|p| p.pending_bonus.take());
                    if let Some(bonus) = bonus {
                        game.trigger_bonus(id, bonus);
                    }
                }
                TankState::Dead => {
                    let lives = match game.players[idx].as_player_mut() {
                        Some(p) => {
                            p.lives = p.lives.saturating_sub(1);
                            p.lives
                        }
                        None => 0,
                    };
                    if lives > 0 {
                        game.respawn_player(idx);
                        game.play(SoundCue::Respawn);
                    } else {
                        game.game_over();
                        break;
                    }
                }
                TankState::Spawning | TankState::Exploding => {}
            }
        }
    }

    let count = game.bullets.len();
    for idx in 0..count {
        game.update_bullet(idx);
    }
    game.bullets.retain(|b| b.state != BulletState::Removed);
    game.bonuses.retain(|b| b.active);
    game.labels.retain(|l| l.active);

    game.base.update();
    if !game.base.active {
        game.game_over();
    }

    if game.phase == GamePhase::GameOver && game.game_over_y > BANNER_STOP_Y {
        game.game_over_y = (game.game_over_y - BANNER_STEP).max(BANNER_STOP_Y);
    }
}

/// Drain every due timer; a failed action drops its entry
fn run_timers(game: &mut Game, elapsed_ms: u32) {
    game.timers.advance(elapsed_ms);
    while let Some(fired) = game.timers.next_due() {
        if let Err(e) = game.dispatch(fired.id, fired.action) {
            log::debug!("Dropping timer {:?}: {e}", fired.id);
            game.timers.cancel(fired.id);
        }
    }
}

/// Turn and step a player tank one frame in `direction`.
///
/// A paralysed tank can still turn. Field edges, terrain, other live players
/// and any enemy block the step. Touching a bonus marks it for pickup.
pub fn move_player(game: &mut Game, idx: usize, direction: Direction) {
    let tank = &mut game.players[idx];
    if tank.direction != direction {
        tank.rotate(direction, true);
    }
    if tank.paralysed {
        return;
    }

    let id = tank.id;
    let new_rect = tank.rect.translated(direction.delta() * tank.speed);
    if !new_rect.inside_field(FIELD_SIZE) || new_rect.collides_any(game.level.obstacles()) {
        return;
    }
    let blocked = game
        .players
        .iter()
        .any(|p| p.id != id && p.state == TankState::Alive && new_rect.collides(&p.rect))
        || game
            .enemies
            .iter()
            .any(|e| e.state != TankState::Dead && new_rect.collides(&e.rect));
    if blocked {
        return;
    }

    let touched = game
        .bonuses
        .iter()
        .find(|b| b.active && new_rect.collides(&b.rect))
        .map(|b| b.id);
    let tank = &mut game.players[idx];
    if let (Some(bonus), Some(p)) = (touched, tank.as_player_mut()) {
        p.pending_bonus = Some(bonus);
    }
    tank.rect = new_rect;
}
