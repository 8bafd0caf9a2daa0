//! Keyboard mapping to per-player tick input

use serde::{Deserialize, Serialize};

use super::geom::Direction;
use super::state::GameEvent;

/// Logical control, in key-set order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Fire,
    Move(Direction),
}

/// Key codes for one player (fire + 4 directions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub fire: u32,
    pub up: u32,
    pub right: u32,
    pub down: u32,
    pub left: u32,
}

impl KeyBindings {
    /// Space + arrow keys
    pub const PLAYER_ONE: KeyBindings = KeyBindings {
        fire: 32,
        up: 273,
        right: 275,
        down: 274,
        left: 276,
    };

    /// f + w/d/s/a
    pub const PLAYER_TWO: KeyBindings = KeyBindings {
        fire: 102,
        up: 119,
        right: 100,
        down: 115,
        left: 97,
    };

    pub fn control(&self, key: u32) -> Option<Control> {
        if key == self.fire {
            Some(Control::Fire)
        } else if key == self.up {
            Some(Control::Move(Direction::Up))
        } else if key == self.right {
            Some(Control::Move(Direction::Right))
        } else if key == self.down {
            Some(Control::Move(Direction::Down))
        } else if key == self.left {
            Some(Control::Move(Direction::Left))
        } else {
            None
        }
    }

    /// Key code bound to `control`
    pub fn key(&self, control: Control) -> u32 {
        match control {
            Control::Fire => self.fire,
            Control::Move(Direction::Up) => self.up,
            Control::Move(Direction::Right) => self.right,
            Control::Move(Direction::Down) => self.down,
            Control::Move(Direction::Left) => self.left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pressed(u32),
    Released(u32),
}

/// One player's controls for a single frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInput {
    /// Held directions indexed by [`Direction::index`]
    pub pressed: [bool; 4],
    /// Fire was pressed since the last frame
    pub fire: bool,
}

impl PlayerInput {
    /// Held direction with priority up > right > down > left
    pub fn direction(&self) -> Option<Direction> {
        Direction::ALL.into_iter().find(|d| self.pressed[d.index()])
    }
}

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub players: [PlayerInput; 2],
}

/// Accumulates key events between frames
#[derive(Debug, Clone)]
pub struct InputState {
    bindings: [KeyBindings; 2],
    current: TickInput,
}

impl InputState {
    pub fn new(bindings: [KeyBindings; 2]) -> Self {
        Self {
            bindings,
            current: TickInput::default(),
        }
    }

    pub fn handle(&mut self, event: InputEvent) {
        let (key, down) = match event {
            InputEvent::Pressed(k) => (k, true),
            InputEvent::Released(k) => (k, false),
        };
        for (binding, player) in self.bindings.iter().zip(self.current.players.iter_mut()) {
            match binding.control(key) {
                Some(Control::Fire) if down => player.fire = true,
                Some(Control::Move(dir)) => player.pressed[dir.index()] = down,
                _ => {}
            }
        }
    }

    /// Input for this frame; fire edges are consumed, held keys stay
    pub fn take(&mut self) -> TickInput {
        let out = self.current;
        for player in &mut self.current.players {
            player.fire = false;
        }
        out
    }

    /// Forget held keys for one player
    pub fn release_all(&mut self, player: usize) {
        if let Some(p) = self.current.players.get_mut(player) {
            *p = PlayerInput::default();
        }
    }

    /// React to a game event; a respawned tank starts with no keys held
    pub fn observe(&mut self, event: &GameEvent) {
        if let GameEvent::PlayerRespawned(player) = *event {
            self.release_all(player);
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new([KeyBindings::PLAYER_ONE, KeyBindings::PLAYER_TWO])
    }
}
