//! Frame description for a renderer
//!
//! The simulation never draws. [`draw_list`] flattens the current state into
//! back-to-front [`DrawItem`]s that a front end can turn into sprites.

use glam::IVec2;

use super::entities::{BaseState, BonusKind, BulletState, Explosion};
use super::geom::Direction;
use super::level::TileKind;
use super::state::{Game, GamePhase};
use super::tank::{EnemyKind, Side, Tank, TankState};

/// Horizontal position of the game over banner
pub const BANNER_X: i32 = 176;

/// Counters shown beside the field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarStats {
    pub enemies_left: usize,
    pub lives: Vec<u32>,
    pub stage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawItem {
    /// `frame` animates water
    Tile { kind: TileKind, pos: IVec2, frame: u8 },
    Base { pos: IVec2, destroyed: bool },
    Explosion { pos: IVec2, frame: u8 },
    Tank {
        side: Side,
        /// Enemy kind, or `None` for a player
        kind: Option<EnemyKind>,
        /// Player number, for colouring
        player: Option<usize>,
        pos: IVec2,
        direction: Direction,
        /// Carrier flash phase
        flash: bool,
    },
    /// Spawn star in place of a tank that is arriving
    Spawn { pos: IVec2, frame: u8 },
    Shield { pos: IVec2, frame: u8 },
    Label { pos: IVec2, text: String },
    Bullet { pos: IVec2, direction: Direction },
    Bonus { kind: BonusKind, pos: IVec2 },
    Banner { pos: IVec2 },
    Sidebar(SidebarStats),
}

fn explosion_item(explosion: &Explosion) -> DrawItem {
    DrawItem::Explosion {
        pos: explosion.pos,
        frame: explosion.frame,
    }
}

fn terrain(game: &Game, overlay: bool, out: &mut Vec<DrawItem>) {
    out.extend(
        game.level
            .tiles
            .iter()
            .filter(|t| t.kind.is_overlay() == overlay)
            .map(|t| DrawItem::Tile {
                kind: t.kind,
                pos: t.rect.topleft(),
                frame: if t.kind == TileKind::Water {
                    game.level.water_frame
                } else {
                    0
                },
            }),
    );
}

fn tank(tank: &Tank, out: &mut Vec<DrawItem>) {
    let pos = tank.rect.topleft();
    match tank.state {
        TankState::Spawning => out.push(DrawItem::Spawn {
            pos,
            frame: tank.spawn_frame,
        }),
        TankState::Alive => {
            out.push(DrawItem::Tank {
                side: tank.side(),
                kind: tank.as_enemy().map(|e| e.kind),
                player: tank.as_player().map(|p| p.index),
                pos,
                direction: tank.direction,
                flash: tank.flash,
            });
            if tank.shielded {
                out.push(DrawItem::Shield {
                    pos: pos - IVec2::splat(3),
                    frame: tank.shield_frame,
                });
            }
        }
        TankState::Exploding => out.extend(tank.explosion.as_ref().map(explosion_item)),
        TankState::Dead => {}
    }
}

/// Everything visible this frame, back to front
pub fn draw_list(game: &Game) -> Vec<DrawItem> {
    let mut out = Vec::new();

    terrain(game, false, &mut out);

    let base = &game.base;
    match base.state {
        BaseState::Exploding => out.extend(base.explosion.as_ref().map(explosion_item)),
        state => out.push(DrawItem::Base {
            pos: base.rect.topleft(),
            destroyed: state == BaseState::Destroyed,
        }),
    }

    for enemy in &game.enemies {
        tank(enemy, &mut out);
    }
    out.extend(game.labels.iter().map(|l| DrawItem::Label {
        pos: l.pos,
        text: l.text.clone(),
    }));
    for player in &game.players {
        tank(player, &mut out);
    }

    for bullet in &game.bullets {
        match bullet.state {
            BulletState::Active => out.push(DrawItem::Bullet {
                pos: bullet.rect.topleft(),
                direction: bullet.direction,
            }),
            BulletState::Exploding => out.extend(bullet.explosion.as_ref().map(explosion_item)),
            BulletState::Removed => {}
        }
    }
    out.extend(
        game.bonuses
            .iter()
            .filter(|b| b.active && b.visible)
            .map(|b| DrawItem::Bonus {
                kind: b.kind,
                pos: b.rect.topleft(),
            }),
    );

    terrain(game, true, &mut out);

    if game.phase == GamePhase::GameOver {
        out.push(DrawItem::Banner {
            pos: IVec2::new(BANNER_X, game.game_over_y),
        });
    }

    out.push(DrawItem::Sidebar(SidebarStats {
        enemies_left: game.enemies_remaining(),
        lives: game
            .players
            .iter()
            .filter_map(|t| t.as_player())
            .map(|p| p.lives)
            .collect(),
        stage: game.stage,
    }));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entities::Bonus;
    use crate::sim::state::test_support::*;

    fn index_of(items: &[DrawItem], pred: impl Fn(&DrawItem) -> bool) -> Option<usize> {
        items.iter().position(|i| pred(i))
    }

    #[test]
    fn test_grass_drawn_over_tanks() {
        let mut game = game_with_map(1, "%~#");
        let enemy = place_enemy(&mut game, EnemyKind::Armor, IVec2::new(3, 3));
        let items = draw_list(&game);

        let grass = index_of(&items, |i| matches!(i, DrawItem::Tile { kind: TileKind::Grass, .. }));
        let brick = index_of(&items, |i| matches!(i, DrawItem::Tile { kind: TileKind::Brick, .. }));
        let base = index_of(&items, |i| matches!(i, DrawItem::Base { destroyed: false, .. }));
        let enemy_item = index_of(&items, |i| {
            matches!(i, DrawItem::Tank { kind: Some(EnemyKind::Armor), .. })
        });
        let player = index_of(&items, |i| matches!(i, DrawItem::Tank { player: Some(0), .. }));
        assert!(grass.is_some() && brick.is_some());

        assert!(brick < base && base < enemy_item && enemy_item < player && player < grass);
        assert!(game.tank(enemy).is_some());
        assert!(matches!(items.last(), Some(DrawItem::Sidebar(_))));
    }

    #[test]
    fn test_water_frame_follows_level() {
        let mut game = game_with_map(1, "~");
        game.level.toggle_water();
        let items = draw_list(&game);
        assert!(items.contains(&DrawItem::Tile {
            kind: TileKind::Water,
            pos: IVec2::ZERO,
            frame: 1,
        }));
    }

    #[test]
    fn test_spawning_shielded_and_exploding_tanks() {
        let mut game = game(1);
        quiet(&mut game);
        let enemy = place_enemy(&mut game, EnemyKind::Basic, IVec2::new(100, 100));
        game.enemies[0].state = TankState::Spawning;
        let items = draw_list(&game);
        assert!(items.iter().any(|i| matches!(i, DrawItem::Spawn { .. })));
        // Fresh players carry a respawn shield
        assert!(items.iter().any(|i| matches!(i, DrawItem::Shield { .. })));

        game.enemies[0].state = TankState::Alive;
        game.explode_tank(enemy);
        let items = draw_list(&game);
        assert!(items.iter().any(|i| matches!(i, DrawItem::Explosion { .. })));
        assert!(!items.iter().any(|i| matches!(i, DrawItem::Tank { side: Side::Enemy, .. })));
    }

    #[test]
    fn test_hidden_bonus_not_drawn() {
        let mut game = game(1);
        let id = game.next_entity_id();
        game.bonuses.push(Bonus::new(id, BonusKind::Clock, IVec2::new(50, 50)));
        assert!(draw_list(&game).iter().any(|i| matches!(i, DrawItem::Bonus { .. })));
        game.bonuses[0].visible = false;
        assert!(!draw_list(&game).iter().any(|i| matches!(i, DrawItem::Bonus { .. })));
    }

    #[test]
    fn test_banner_and_sidebar() {
        let mut game = game(2);
        assert!(!draw_list(&game).iter().any(|i| matches!(i, DrawItem::Banner { .. })));
        game.game_over();
        let items = draw_list(&game);
        assert!(items.contains(&DrawItem::Banner {
            pos: IVec2::new(BANNER_X, game.game_over_y),
        }));
        assert_eq!(
            items.last(),
            Some(&DrawItem::Sidebar(SidebarStats {
                enemies_left: 20,
                lives: vec![3, 3],
                stage: 1,
            }))
        );
    }
}
