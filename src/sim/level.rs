//! Terrain map for one stage
//!
//! The map is a flat list of tiles rather than a dense grid: empty cells are
//! never stored, and the obstacle list is rebuilt whenever a tile is removed.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::geom::Rect;
use super::tank::EnemyKind;
use crate::consts::{MAX_ACTIVE_ENEMIES, TILE_SIZE};

/// Terrain kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Empty,
    Brick,
    Steel,
    Water,
    Grass,
    Ice,
}

impl TileKind {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '#' => Some(TileKind::Brick),
            '@' => Some(TileKind::Steel),
            '~' => Some(TileKind::Water),
            '%' => Some(TileKind::Grass),
            '-' => Some(TileKind::Ice),
            _ => None,
        }
    }

    /// Brick, steel and water block tanks and appear in the obstacle set
    pub fn is_obstacle(self) -> bool {
        matches!(self, TileKind::Brick | TileKind::Steel | TileKind::Water)
    }

    /// Grass is drawn over tanks and bullets
    pub fn is_overlay(self) -> bool {
        self == TileKind::Grass
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub rect: Rect,
}

/// Ring of tiles around the base, in tile units
pub const FORTRESS: [(i32, i32); 8] = [
    (11, 23),
    (11, 24),
    (11, 25),
    (14, 23),
    (14, 24),
    (14, 25),
    (12, 23),
    (13, 23),
];

#[derive(Debug, Clone)]
pub struct Level {
    pub tiles: Vec<Tile>,
    /// Enemy types still waiting to spawn (popped from the back)
    pub enemies_left: Vec<EnemyKind>,
    pub max_active_enemies: usize,
    /// Cosmetic water animation frame (0 or 1)
    pub water_frame: u8,
    base: Option<Rect>,
    obstacles: Vec<Rect>,
}

impl Level {
    pub fn new(tiles: Vec<Tile>, base: Option<Rect>) -> Self {
        let mut level = Self {
            tiles,
            enemies_left: Vec::new(),
            max_active_enemies: MAX_ACTIVE_ENEMIES,
            water_frame: 0,
            base,
            obstacles: Vec::new(),
        };
        level.rebuild_obstacles();
        level
    }

    /// Parse a character grid, one 16px tile per character
    pub fn parse(grid: &str) -> Vec<Tile> {
        let mut tiles = Vec::new();
        for (row, line) in grid.lines().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if let Some(kind) = TileKind::from_char(ch) {
                    tiles.push(Tile {
                        kind,
                        rect: Rect::new(
                            col as i32 * TILE_SIZE,
                            row as i32 * TILE_SIZE,
                            TILE_SIZE,
                            TILE_SIZE,
                        ),
                    });
                }
            }
        }
        tiles
    }

    pub fn from_grid(grid: &str, base: Option<Rect>) -> Self {
        Self::new(Self::parse(grid), base)
    }

    /// Base rect first, then brick/steel/water
    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    /// Track whether the base still blocks (it drops out once destroyed)
    pub fn set_base(&mut self, base: Option<Rect>) {
        self.base = base;
        self.rebuild_obstacles();
    }

    pub fn rebuild_obstacles(&mut self) {
        self.obstacles.clear();
        self.obstacles.extend(self.base);
        self.obstacles.extend(
            self.tiles
                .iter()
                .filter(|t| t.kind.is_obstacle())
                .map(|t| t.rect),
        );
    }

    #[cfg(test)]
    pub(crate) fn tile_at(&self, pos: IVec2) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.rect.topleft() == pos)
    }

    /// A bullet hit the tile at `pos`.
    ///
    /// Returns the tile kind when the shot is stopped (brick or steel).
    /// Brick always breaks; steel only breaks under power 2.
    pub fn hit_tile(&mut self, pos: IVec2, power: u8) -> Option<TileKind> {
        let idx = self.tiles.iter().position(|t| t.rect.topleft() == pos)?;
        match self.tiles[idx].kind {
            TileKind::Brick => {
                self.tiles.remove(idx);
                self.rebuild_obstacles();
                Some(TileKind::Brick)
            }
            TileKind::Steel => {
                if power >= 2 {
                    self.tiles.remove(idx);
                    self.rebuild_obstacles();
                }
                Some(TileKind::Steel)
            }
            _ => None,
        }
    }

    /// Replace the ring around the base with `kind`
    pub fn build_fortress(&mut self, kind: TileKind) {
        let positions: Vec<IVec2> = FORTRESS
            .iter()
            .map(|&(x, y)| IVec2::new(x * TILE_SIZE, y * TILE_SIZE))
            .collect();

        self.tiles
            .retain(|t| !positions.contains(&t.rect.topleft()));
        self.tiles.extend(positions.into_iter().map(|pos| Tile {
            kind,
            rect: Rect::square(pos, TILE_SIZE),
        }));

        self.rebuild_obstacles();
    }

    pub fn toggle_water(&mut self) {
        self.water_frame ^= 1;
    }
}
