/// Keyboard input.
///
/// Two modes:
///   - `InputState::drain_events` empties the terminal queue without
///     blocking, once per frame. Presses are kept in arrival order so the
///     shell can fold them into both avatars' `FrameInput`s.
///   - `read_key` blocks for one key press. Only the riddle modal uses it.
///
/// Avatars auto-move, so only presses matter; repeats and releases are
/// ignored.

use std::io;
use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::config::{ControlsConfig, PlayerKeys};
use crate::domain::motion::{Action, Direction, FrameInput};

// ── Key bindings ──

/// One avatar's keys, parsed from config.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PlayerBinding {
    keys: Vec<(KeyCode, Action)>,
}

impl PlayerBinding {
    fn from_config(keys: &PlayerKeys, avatar: usize) -> Self {
        let table = [
            (&keys.up, Action::Move(Direction::Up)),
            (&keys.down, Action::Move(Direction::Down)),
            (&keys.left, Action::Move(Direction::Left)),
            (&keys.right, Action::Move(Direction::Right)),
            (&keys.stay, Action::Stay),
            (&keys.drop, Action::Drop),
        ];
        let keys = table
            .into_iter()
            .filter_map(|(name, action)| match parse_key(name) {
                Some(code) => Some((code, action)),
                None => {
                    log::warn!("player {}: unknown key \"{}\" for {:?}", avatar + 1, name, action);
                    None
                }
            })
            .collect();
        PlayerBinding { keys }
    }

    fn action_for(&self, code: KeyCode) -> Option<Action> {
        self.keys.iter().find(|(k, _)| *k == code).map(|&(_, a)| a)
    }
}

/// Both avatars' bindings. Built once from config and handed to the input
/// loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBindings {
    players: [PlayerBinding; 2],
}

impl KeyBindings {
    pub fn from_config(cfg: &ControlsConfig) -> Self {
        KeyBindings {
            players: [
                PlayerBinding::from_config(&cfg.player1, 0),
                PlayerBinding::from_config(&cfg.player2, 1),
            ],
        }
    }

    /// Fold key presses, in order, into per-avatar frame input. When both
    /// avatars share a key, player 1 gets it.
    pub fn frame_inputs(&self, presses: &[KeyCode]) -> [FrameInput; 2] {
        let mut out = [FrameInput::default(); 2];
        for &code in presses {
            let code = normalize(code);
            if let Some((i, action)) = self
                .players
                .iter()
                .enumerate()
                .find_map(|(i, p)| p.action_for(code).map(|a| (i, a)))
            {
                out[i].push(action);
            }
        }
        out
    }
}

/// One-line key reference for the HUD and instructions.
pub fn help_line(cfg: &ControlsConfig) -> String {
    let describe = |label: &str, k: &PlayerKeys| {
        format!(
            "{}: {}/{}/{}/{} move  {} stay  {} drop",
            label,
            k.up.to_uppercase(),
            k.down.to_uppercase(),
            k.left.to_uppercase(),
            k.right.to_uppercase(),
            k.stay.to_uppercase(),
            k.drop.to_uppercase(),
        )
    };
    format!(" {}  │  {}  │  ESC pause", describe("P1", &cfg.player1), describe("P2", &cfg.player2))
}

/// Single characters (case-insensitive) or a named key.
fn parse_key(name: &str) -> Option<KeyCode> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(normalize(KeyCode::Char(c)));
    }
    match name.to_lowercase().as_str() {
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "space" => Some(KeyCode::Char(' ')),
        "enter" => Some(KeyCode::Enter),
        "tab" => Some(KeyCode::Tab),
        "backspace" => Some(KeyCode::Backspace),
        _ => None,
    }
}

fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

// ── Non-blocking drain ──

pub struct InputState {
    /// Key presses from the most recent drain, oldest first.
    presses: Vec<KeyCode>,
    ctrl_c: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            presses: Vec::with_capacity(8),
            ctrl_c: false,
        }
    }

    /// Read every pending terminal event without blocking.
    /// Call once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.presses.clear();
        self.ctrl_c = false;

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.record(key),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("terminal read failed: {e}");
                    break;
                }
            }
        }
    }

    fn record(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && normalize(key.code) == KeyCode::Char('c') {
            self.ctrl_c = true;
            return;
        }
        self.presses.push(normalize(key.code));
    }

    pub fn presses(&self) -> &[KeyCode] {
        &self.presses
    }

    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.presses.contains(&normalize(code))
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn esc_pressed(&self) -> bool {
        self.was_pressed(KeyCode::Esc)
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.ctrl_c
    }

    /// Frame input for both avatars from this drain's presses.
    pub fn frame_inputs(&self, bindings: &KeyBindings) -> [FrameInput; 2] {
        bindings.frame_inputs(&self.presses)
    }
}

// ── Blocking read ──

/// Wait for the next key press. Letters come back lowercased.
pub fn read_key() -> io::Result<KeyCode> {
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(normalize(key.code));
            }
        }
    }
}
