//! Axis-aligned geometry for the playfield
//!
//! Everything on the field is an integer rectangle in screen pixels with y
//! growing downward. Collision is rectangle vs rectangle only.

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Facing direction of tanks and bullets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// In input-priority order
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    /// Unit step in screen space
    pub fn delta(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::new(0, -1),
            Direction::Right => IVec2::new(1, 0),
            Direction::Down => IVec2::new(0, 1),
            Direction::Left => IVec2::new(-1, 0),
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Integer rectangle (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Square of side `size` at `pos`
    pub fn square(pos: IVec2, size: i32) -> Self {
        Self::new(pos.x, pos.y, size, size)
    }

    #[inline]
    pub fn topleft(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn translated(&self, delta: IVec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.w, self.h)
    }

    pub fn with_topleft(&self, pos: IVec2) -> Self {
        Self::new(pos.x, pos.y, self.w, self.h)
    }

    /// Overlap test; rectangles that only share an edge do not collide
    #[inline]
    pub fn collides(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn collides_any(&self, others: &[Rect]) -> bool {
        others.iter().any(|r| self.collides(r))
    }

    /// Top-left corners of every rectangle in `others` that overlaps this one
    pub fn collisions(&self, others: &[Rect]) -> Vec<IVec2> {
        others
            .iter()
            .filter(|r| self.collides(r))
            .map(Rect::topleft)
            .collect()
    }

    /// True if the rectangle lies fully inside a square field of side `size`
    pub fn inside_field(&self, size: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.right() <= size && self.bottom() <= size
    }
}

/// Round `num` to the nearest multiple of `base`, ties to even
pub fn nearest(num: i32, base: i32) -> i32 {
    ((num as f64 / base as f64).round_ties_even() * base as f64) as i32
}

/// Tile coordinate of a pixel coordinate
pub fn tile_index(px: i32, tile: i32) -> i32 {
    (px as f64 / tile as f64).round_ties_even() as i32
}
