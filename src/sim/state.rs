//! Game state and stage lifecycle
//!
//! One [`Game`] owns every entity. Entities refer to each other by id and
//! lookups go through the collections here.

use glam::IVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::effects::TimerAction;
use super::entities::{Base, Bonus, Bullet, Label};
use super::geom::Direction;
use super::level::Level;
use super::tank::{Tank, TankState};
use super::timer::{Scheduler, TimerId};
use crate::consts::*;
use crate::highscores::ScoreStore;
use crate::settings::Settings;
use crate::stages::{self, BuiltinLevels, LevelSource};

/// Current phase of play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// No stage loaded yet
    Idle,
    Playing,
    /// All enemies destroyed, waiting for the tally
    StageClear,
    /// Base lost or lives exhausted, banner rising
    GameOver,
    /// Score tally shown; the host decides what comes next
    Tally { game_over: bool },
}

/// Discrete sound effects for the audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Fire,
    Steel,
    Brick,
    Explosion,
    Bonus,
    Score,
    Respawn,
    GameOver,
    StageStart,
}

/// Things that happened during a frame, drained by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Sound(SoundCue),
    StageStarted(u32),
    StageCleared(u32),
    GameOver,
    EnemyDestroyed { enemy: u32, by: u32, points: u32 },
    BonusCollected { player: u32 },
    /// Player number whose tank is back at its start; held keys are stale
    PlayerRespawned(usize),
    HighScore(u32),
}

/// Player start cells (bottom row, either side of the base)
pub const PLAYER_STARTS: [IVec2; 2] = [IVec2::new(131, 387), IVec2::new(259, 387)];

#[derive(Debug)]
pub struct Game {
    /// Stage counter, keeps growing past the map count
    pub stage: u32,
    pub phase: GamePhase,
    pub nr_of_players: usize,
    pub players: Vec<Tank>,
    pub enemies: Vec<Tank>,
    pub bullets: Vec<Bullet>,
    pub bonuses: Vec<Bonus>,
    pub labels: Vec<Label>,
    pub base: Base,
    pub level: Level,
    pub timers: Scheduler<TimerAction>,
    pub events: Vec<GameEvent>,
    pub hiscore: u32,
    /// Game-over banner position
    pub game_over_y: i32,
    /// Frames simulated since creation
    pub frame: u64,
    /// Clock bonus in effect: enemies paused and no spawns
    pub time_freeze: bool,
    pub sound: bool,
    pub rng: Pcg32,
    pub(crate) spawn_timer: Option<TimerId>,
    pub(crate) fortress_timer: Option<TimerId>,
    pub(crate) freeze_timer: Option<TimerId>,
    pub(crate) tally_timer: Option<TimerId>,
    max_active_enemies: usize,
    next_id: u32,
    levels: Box<dyn LevelSource>,
    pub(crate) scores: Box<dyn ScoreStore>,
}

impl Game {
    pub fn new(
        settings: &Settings,
        levels: Box<dyn LevelSource>,
        scores: Box<dyn ScoreStore>,
    ) -> Self {
        let rng = match settings.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        };
        let base = Base::default();
        let hiscore = scores.load();
        Self {
            stage: 0,
            phase: GamePhase::Idle,
            nr_of_players: settings.players.clamp(1, 2),
            players: Vec::new(),
            enemies: Vec::new(),
            bullets: Vec::new(),
            bonuses: Vec::new(),
            labels: Vec::new(),
            level: Level::new(Vec::new(), Some(base.rect)),
            base,
            timers: Scheduler::new(),
            events: Vec::new(),
            hiscore,
            game_over_y: BANNER_START_Y,
            frame: 0,
            time_freeze: false,
            sound: settings.sound,
            rng,
            spawn_timer: None,
            fortress_timer: None,
            freeze_timer: None,
            tally_timer: None,
            max_active_enemies: settings.max_active_enemies.max(1),
            next_id: 1,
            levels,
            scores,
        }
    }

    /// New game from stage 1 with fresh players
    pub fn start(&mut self, players: usize) {
        self.nr_of_players = players.clamp(1, 2);
        self.players.clear();
        self.stage = 0;
        self.next_level();
    }

    /// Reset the field and load the following stage
    pub fn next_level(&mut self) {
        self.bullets.clear();
        self.enemies.clear();
        self.bonuses.clear();
        self.labels.clear();
        self.base.rebuild();
        self.timers.clear();
        self.spawn_timer = None;
        self.fortress_timer = None;
        self.freeze_timer = None;
        self.tally_timer = None;
        self.time_freeze = false;

        self.stage += 1;
        let map = stages::map_number(self.stage);
        let grid = self.levels.load(map).or_else(|e| {
            log::warn!("{e}; using built-in map");
            BuiltinLevels.load(map)
        });
        let grid = grid.unwrap_or_default();
        self.level = Level::from_grid(&grid, Some(self.base.rect));
        self.level.max_active_enemies = self.max_active_enemies;
        self.level.enemies_left = stages::enemy_pool(self.stage, &mut self.rng);

        self.reload_players();

        self.spawn_timer = Some(self.timers.every(ENEMY_SPAWN_MS, TimerAction::SpawnEnemy));
        self.timers.every(WATER_MS, TimerAction::ToggleWater);

        self.game_over_y = BANNER_START_Y;
        self.phase = GamePhase::Playing;
        self.events.push(GameEvent::StageStarted(self.stage));
        self.play(SoundCue::StageStart);
        log::info!(
            "Stage {} started (map {map}, {} enemies)",
            self.stage,
            self.level.enemies_left.len()
        );
    }

    /// Create players on first use, then put everyone back at the start
    fn reload_players(&mut self) {
        if self.players.is_empty() {
            for index in 0..self.nr_of_players {
                let id = self.next_entity_id();
                self.players
                    .push(Tank::player(id, index, PLAYER_STARTS[index], Direction::Up));
            }
        }
        for idx in 0..self.players.len() {
            self.respawn_player(idx);
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn tank(&self, id: u32) -> Option<&Tank> {
        self.players
            .iter()
            .chain(self.enemies.iter())
            .find(|t| t.id == id)
    }

    pub fn tank_mut(&mut self, id: u32) -> Option<&mut Tank> {
        self.players
            .iter_mut()
            .chain(self.enemies.iter_mut())
            .find(|t| t.id == id)
    }

    pub fn player_mut(&mut self, id: u32) -> Option<&mut Tank> {
        self.players.iter_mut().find(|t| t.id == id)
    }

    /// Queue a sound cue if sound is on
    pub fn play(&mut self, cue: SoundCue) {
        if self.sound {
            self.events.push(GameEvent::Sound(cue));
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Enemies still to come plus those on the field
    pub fn enemies_remaining(&self) -> usize {
        self.level.enemies_left.len() + self.enemies.len()
    }

    pub fn is_over(&self) -> bool {
        matches!(
            self.phase,
            GamePhase::GameOver | GamePhase::Tally { game_over: true }
        )
    }

    /// Cancel every timer an entity keeps for itself
    pub(crate) fn cancel_tank_timers(&mut self, tank: &Tank) {
        let mut ids = vec![tank.spawn_timer, tank.shield_timer, tank.shield_end_timer];
        if let Some(e) = tank.as_enemy() {
            ids.extend([e.fire_timer, e.flash_timer]);
        }
        if let Some(p) = tank.as_player() {
            ids.push(p.paralysis_timer);
        }
        for id in ids.into_iter().flatten() {
            self.timers.cancel(id);
        }
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Tank> {
        self.players.iter().filter(|t| t.state == TankState::Alive)
    }
}
