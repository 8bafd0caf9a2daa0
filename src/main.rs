//! Tank City entry point
//!
//! Headless runner: drives the simulation at the configured frame length with
//! a scripted autopilot and logs what a front end would present.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tank_city::sim::{
    Control, Direction, Game, GameEvent, GamePhase, InputEvent, InputState, KeyBindings,
    draw_list, tick,
};
use tank_city::stages::{BuiltinLevels, DirLevelSource, LevelSource};
use tank_city::{FileScoreStore, Settings};

#[derive(Parser, Debug)]
#[command(name = "tank-city")]
#[command(about = "Headless Tank City simulation with a scripted autopilot")]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, default_value = "tank-city.json")]
    config: PathBuf,
    /// RNG seed, overrides the settings file
    #[arg(long)]
    seed: Option<u64>,
    /// Number of players (1 or 2)
    #[arg(long)]
    players: Option<usize>,
    /// Stop after this many frames
    #[arg(long, default_value_t = 15_000)]
    frames: u64,
    /// Directory of stage files named 1..35
    #[arg(long)]
    levels: Option<PathBuf>,
    /// High score file
    #[arg(long)]
    hiscore: Option<PathBuf>,
    /// Write the effective settings back to the config file
    #[arg(long, default_value_t = false)]
    save_config: bool,
}

/// Scripted key presses: a new heading every 40 frames, a shot every 12
struct Autopilot {
    bindings: [KeyBindings; 2],
    held: [Option<Direction>; 2],
}

impl Autopilot {
    const ROUTE: [Direction; 6] = [
        Direction::Up,
        Direction::Left,
        Direction::Up,
        Direction::Right,
        Direction::Right,
        Direction::Down,
    ];
    const TURN_EVERY: u64 = 40;
    const FIRE_EVERY: u64 = 12;

    fn new(bindings: [KeyBindings; 2]) -> Self {
        Self {
            bindings,
            held: [None; 2],
        }
    }

    fn events(&mut self, frame: u64, players: usize) -> Vec<InputEvent> {
        let mut events = Vec::new();
        for (player, keys) in self.bindings.iter().enumerate().take(players) {
            if frame % Self::TURN_EVERY == 0 {
                let step = (frame / Self::TURN_EVERY) as usize + player;
                let heading = Self::ROUTE[step % Self::ROUTE.len()];
                if let Some(old) = self.held[player].replace(heading) {
                    events.push(InputEvent::Released(keys.key(Control::Move(old))));
                }
                events.push(InputEvent::Pressed(keys.key(Control::Move(heading))));
            }
            if frame % Self::FIRE_EVERY == player as u64 * (Self::FIRE_EVERY / 2) {
                events.push(InputEvent::Pressed(keys.key(Control::Fire)));
            }
        }
        events
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config);
    if let Some(seed) = cli.seed {
        settings.seed = Some(seed);
    }
    if let Some(players) = cli.players {
        settings.players = players;
    }
    if let Some(dir) = cli.levels {
        settings.levels_dir = Some(dir);
    }
    if let Some(path) = cli.hiscore {
        settings.hiscore_path = path;
    }
    let settings = settings.clamped();
    if cli.save_config {
        settings
            .save(&cli.config)
            .with_context(|| format!("saving settings to {}", cli.config.display()))?;
    }

    let levels: Box<dyn LevelSource> = match &settings.levels_dir {
        Some(dir) => Box::new(DirLevelSource::new(dir)),
        None => Box::new(BuiltinLevels),
    };
    let scores = Box::new(FileScoreStore::new(&settings.hiscore_path));
    let mut game = Game::new(&settings, levels, scores);
    log::info!(
        "Tank City starting: {} player(s), seed {:?}, high score {}",
        settings.players,
        settings.seed,
        game.hiscore
    );
    game.start(settings.players);

    let mut input = InputState::new(settings.controls);
    let mut autopilot = Autopilot::new(settings.controls);

    for _ in 0..cli.frames {
        for event in autopilot.events(game.frame, game.nr_of_players) {
            input.handle(event);
        }
        tick(&mut game, &input.take(), settings.frame_ms);

        for event in game.drain_events() {
            input.observe(&event);
            match event {
                GameEvent::Sound(cue) => log::trace!("Sound: {cue:?}"),
                other => log::debug!("Event: {other:?}"),
            }
        }
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Frame {}: {} draw items", game.frame, draw_list(&game).len());
        }

        if let GamePhase::Tally { game_over } = game.phase {
            if game_over {
                break;
            }
            game.next_level();
        }
    }

    let scores: Vec<u32> = game
        .players
        .iter()
        .filter_map(|t| t.as_player())
        .map(|p| p.score)
        .collect();
    println!(
        "Stage {} after {} frames, scores {:?}, high score {}{}",
        game.stage,
        game.frame,
        scores,
        game.hiscore,
        if game.is_over() { " (game over)" } else { "" }
    );
    Ok(())
}
