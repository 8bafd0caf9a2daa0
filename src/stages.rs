//! Stage maps and enemy quotas
//!
//! Maps come from a [`LevelSource`]; quotas are a fixed table. Stage numbers
//! keep growing during a session, map numbers wrap at [`STAGE_COUNT`].

use std::fmt;
use std::path::PathBuf;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::sim::EnemyKind;

/// Number of distinct stage maps
pub const STAGE_COUNT: u32 = 35;

/// Maximum map dimensions in tiles
pub const MAP_TILES: usize = 26;

/// Enemies per stage as (basic, fast, power, armor)
pub const ENEMY_QUOTAS: [(u32, u32, u32, u32); STAGE_COUNT as usize] = [
    (18, 2, 0, 0),
    (14, 4, 0, 2),
    (14, 4, 0, 2),
    (2, 5, 10, 3),
    (8, 5, 5, 2),
    (9, 2, 7, 2),
    (7, 4, 6, 3),
    (7, 4, 7, 2),
    (6, 4, 7, 3),
    (12, 2, 4, 2),
    (5, 5, 4, 6),
    (0, 6, 8, 6),
    (0, 8, 8, 4),
    (0, 4, 10, 6),
    (0, 2, 10, 8),
    (16, 2, 0, 2),
    (8, 2, 8, 2),
    (2, 8, 6, 4),
    (4, 4, 4, 8),
    (2, 8, 2, 8),
    (6, 2, 8, 4),
    (6, 8, 2, 4),
    (0, 10, 4, 6),
    (10, 4, 4, 2),
    (0, 8, 2, 10),
    (4, 6, 4, 6),
    (2, 8, 2, 8),
    (15, 2, 2, 1),
    (0, 4, 10, 6),
    (4, 8, 4, 4),
    (3, 8, 3, 6),
    (6, 4, 2, 8),
    (4, 4, 4, 8),
    (0, 10, 4, 6),
    (0, 6, 4, 10),
];

/// Map to load for a stage: wraps at 35, with 0 meaning 35
pub fn map_number(stage: u32) -> u32 {
    match stage % STAGE_COUNT {
        0 => STAGE_COUNT,
        n => n,
    }
}

/// Enemy counts for a stage; stages past the table reuse its last entry
pub fn enemy_quota(stage: u32) -> [u32; 4] {
    let idx = (stage.max(1) as usize - 1).min(ENEMY_QUOTAS.len() - 1);
    let (basic, fast, power, armor) = ENEMY_QUOTAS[idx];
    [basic, fast, power, armor]
}

/// Shuffled spawn order for a stage
pub fn enemy_pool<R: Rng + ?Sized>(stage: u32, rng: &mut R) -> Vec<EnemyKind> {
    let quota = enemy_quota(stage);
    let mut pool: Vec<EnemyKind> = EnemyKind::ALL
        .iter()
        .zip(quota)
        .flat_map(|(&kind, count)| std::iter::repeat_n(kind, count as usize))
        .collect();
    pool.shuffle(rng);
    pool
}

/// Failure to produce a stage map
#[derive(Debug)]
pub enum LevelError {
    Missing { map: u32, path: PathBuf },
    Io { map: u32, source: std::io::Error },
    Malformed { map: u32, reason: String },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Missing { map, path } => {
                write!(f, "map {map} not found at {}", path.display())
            }
            LevelError::Io { map, source } => write!(f, "map {map} unreadable: {source}"),
            LevelError::Malformed { map, reason } => write!(f, "map {map} malformed: {reason}"),
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LevelError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Check a character grid and normalise line endings
pub fn validate(map: u32, grid: &str) -> Result<String, LevelError> {
    let rows: Vec<&str> = grid
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .collect();
    let rows = match rows.iter().rposition(|r| !r.is_empty()) {
        Some(last) => &rows[..=last],
        None => {
            return Err(LevelError::Malformed {
                map,
                reason: "empty grid".into(),
            });
        }
    };
    if rows.len() > MAP_TILES {
        return Err(LevelError::Malformed {
            map,
            reason: format!("{} rows, at most {MAP_TILES} allowed", rows.len()),
        });
    }
    if let Some((i, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, r)| r.chars().count() > MAP_TILES)
    {
        return Err(LevelError::Malformed {
            map,
            reason: format!("row {i} has {} columns", row.chars().count()),
        });
    }
    Ok(rows.join("\n"))
}

/// Provides the character grid for a map number
pub trait LevelSource: fmt::Debug {
    fn load(&self, map: u32) -> Result<String, LevelError>;
}

/// Stage files named by map number (`<root>/1` .. `<root>/35`)
#[derive(Debug, Clone)]
pub struct DirLevelSource {
    pub root: PathBuf,
}

impl DirLevelSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LevelSource for DirLevelSource {
    fn load(&self, map: u32) -> Result<String, LevelError> {
        let path = self.root.join(map.to_string());
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LevelError::Missing { map, path });
            }
            Err(source) => return Err(LevelError::Io { map, source }),
        };
        validate(map, &text)
    }
}

/// Built-in map used for every stage
pub const DEFAULT_MAP: &str = "\
..........................
..........................
..##..##..##..##..##..##..
..##..##..##..##..##..##..
..##..##..##..##..##..##..
..##..##..##@@##..##..##..
..##..##..##@@##..##..##..
..##..##..##..##..##..##..
..##..##..........##..##..
..##..##...%%%%...##..##..
..........##..##..........
~~........##..##........~~
##..####..........####..##
@@..####..........####..@@
..........##..##..........
..........######..........
..##..##..##..##..##..##..
..##..##..##..##..##..##..
..##..##..##..##..##..##..
..##..##..........##..##..
..##..##..........##..##..
..##..##..........##..##..
......----......----......
...........####...........
...........#..#...........
...........#..#...........";

/// Embedded fallback maps
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLevels;

impl LevelSource for BuiltinLevels {
    fn load(&self, map: u32) -> Result<String, LevelError> {
        validate(map, DEFAULT_MAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{BASE_X, BASE_Y, TILE_SIZE};
    use crate::sim::{FORTRESS, Level, TileKind};
    use glam::IVec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_map_number_wraps() {
        assert_eq!(map_number(1), 1);
        assert_eq!(map_number(35), 35);
        assert_eq!(map_number(36), 1);
        assert_eq!(map_number(37), 2);
        assert_eq!(map_number(70), 35);
        assert_eq!(map_number(0), 35);
    }

    #[test]
    fn test_quota_beyond_table_reuses_last() {
        assert_eq!(enemy_quota(1), [18, 2, 0, 0]);
        assert_eq!(enemy_quota(35), [0, 6, 4, 10]);
        assert_eq!(enemy_quota(36), [0, 6, 4, 10]);
        assert_eq!(enemy_quota(500), [0, 6, 4, 10]);
    }

    #[test]
    fn test_every_stage_has_twenty_enemies() {
        for stage in 1..=STAGE_COUNT {
            assert_eq!(enemy_quota(stage).iter().sum::<u32>(), 20, "stage {stage}");
        }
    }

    #[test]
    fn test_pool_matches_quota() {
        let mut rng = Pcg32::seed_from_u64(7);
        let pool = enemy_pool(4, &mut rng);
        assert_eq!(pool.len(), 20);
        let armor = pool.iter().filter(|k| **k == EnemyKind::Armor).count();
        let power = pool.iter().filter(|k| **k == EnemyKind::Power).count();
        assert_eq!((power, armor), (10, 3));
    }

    #[test]
    fn test_builtin_map_leaves_base_open_and_walls_it() {
        let grid = BuiltinLevels.load(1).unwrap();
        let level = Level::from_grid(&grid, None);
        for &(x, y) in &FORTRESS {
            let tile = level
                .tile_at(IVec2::new(x * TILE_SIZE, y * TILE_SIZE))
                .unwrap();
            assert_eq!(tile.kind, TileKind::Brick);
        }
        for dx in [0, TILE_SIZE] {
            for dy in [0, TILE_SIZE] {
                assert!(level.tile_at(IVec2::new(BASE_X + dx, BASE_Y + dy)).is_none());
            }
        }
        assert!(grid.lines().all(|l| l.len() == MAP_TILES));
        assert_eq!(grid.lines().count(), MAP_TILES);
    }

    #[test]
    fn test_validate_rejects_bad_grids() {
        assert!(matches!(
            validate(3, "\n\n"),
            Err(LevelError::Malformed { map: 3, .. })
        ));
        let wide = "#".repeat(27);
        assert!(validate(3, &wide).is_err());
        let tall = ".\n".repeat(27);
        assert!(validate(3, &tall).is_err());
        assert_eq!(validate(3, "#.\r\n.@\r\n\r\n").unwrap(), "#.\n.@");
    }

    #[test]
    fn test_dir_source_reads_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2"), "@@\n##\n").unwrap();
        let source = DirLevelSource::new(dir.path());
        assert_eq!(source.load(2).unwrap(), "@@\n##");
        assert!(matches!(source.load(3), Err(LevelError::Missing { map: 3, .. })));
    }
}
