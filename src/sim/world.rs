/// WorldState: the complete snapshot of a running game.
///
/// ## Room Architecture
///
/// Every room of the pack is built up front and kept alive for the whole
/// session, so a room left and re-entered keeps its runtime changes
/// (opened doors, picked items, blasted walls). Only `current_room` is
/// stepped; the others are frozen.
///
/// Avatars belong to the world, not to a room: they carry their slot,
/// key count and lives across transitions.

use crate::config::RulesConfig;
use crate::domain::motion::Pos;
use crate::domain::riddle::RiddleBank;
use super::avatar::Avatar;
use super::level::LevelPack;
use super::room::Room;

pub const AVATAR_GLYPHS: [char; 2] = ['$', '&'];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Instructions,
    Playing,
    Paused,
    GameOver,
    Victory,
}

pub struct WorldState {
    // ── Rooms ──
    pub rooms: Vec<Room>,
    /// Index into `rooms`.
    pub current: usize,
    pub final_room: u32,

    // ── Avatars ──
    pub avatars: [Avatar; 2],

    // ── Content ──
    pub riddles: RiddleBank,
    pub rules: RulesConfig,

    // ── Meta ──
    pub phase: Phase,
    pub tick: u64,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
}

// ── Construction ──

impl WorldState {
    pub fn new(pack: &LevelPack, riddles: RiddleBank, rules: RulesConfig) -> Self {
        let rooms: Vec<Room> = pack.rooms.iter().map(Room::new).collect();
        let current = rooms
            .iter()
            .position(|r| r.id == pack.start_room)
            .unwrap_or(0);
        let spawn = rooms.get(current).map(|r| r.spawn).unwrap_or(Pos::new(1, 1));
        let lives = rules.riddle_lives;
        WorldState {
            rooms,
            current,
            final_room: pack.final_room,
            avatars: [
                Avatar::new(0, AVATAR_GLYPHS[0], spawn, lives),
                Avatar::new(1, AVATAR_GLYPHS[1], spawn.offset(0, 1), lives),
            ],
            riddles,
            rules,
            phase: Phase::Title,
            tick: 0,
            message: String::new(),
            message_timer: 0,
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }
}

// ── Room access ──

impl WorldState {
    pub fn room(&self) -> &Room {
        &self.rooms[self.current]
    }

    pub fn room_mut(&mut self) -> &mut Room {
        &mut self.rooms[self.current]
    }

    pub fn room_index(&self, id: u32) -> Option<usize> {
        self.rooms.iter().position(|r| r.id == id)
    }

    pub fn avatar_positions(&self) -> [Pos; 2] {
        [self.avatars[0].pos, self.avatars[1].pos]
    }

    /// Combined key count across both avatars.
    pub fn keys_held(&self) -> u32 {
        self.avatars[0].key_count + self.avatars[1].key_count
    }

    /// Positions of avatars that currently hold a torch.
    pub fn torch_bearers(&self) -> Vec<Pos> {
        self.avatars.iter().filter(|a| a.has_torch()).map(|a| a.pos).collect()
    }
}
