/// Avatars: the two cooperating player characters.
///
/// An avatar keeps walking in its last commanded direction every tick
/// until told to stay or until something blocks it. `try_step` resolves a
/// single cell of movement against the room in the fixed rule order of
/// `domain::rules`; callers decide what a refusal means for velocity.

use crate::domain::entity::{EntityKind, Item};
use crate::domain::motion::{Direction, Pos, Velocity};
use crate::domain::riddle::{self, RiddleBook, RiddleOutcome, RiddlePrompt};
use crate::domain::rules::{self, StepVerdict};
use super::event::GameEvent;
use super::room::Room;

#[derive(Clone, Debug)]
pub struct Avatar {
    /// 0 or 1.
    pub index: usize,
    pub glyph: char,
    pub pos: Pos,
    pub velocity: Velocity,
    /// Perpendicular steering kept while a spring launch is in flight.
    pub lateral: Direction,
    pub slot: Option<Item>,
    pub key_count: u32,
    pub alive: bool,
    pub at_door: bool,
    pub door_id: Option<u8>,
    pub lives: u32,
}

/// Collaborators a step may need beyond the room.
pub struct StepContext<'a> {
    pub book: &'a dyn RiddleBook,
    pub prompt: &'a mut dyn RiddlePrompt,
    pub events: &'a mut Vec<GameEvent>,
    /// Set when the avatar escaped a riddle prompt.
    pub pause_requested: bool,
}

impl Avatar {
    pub fn new(index: usize, glyph: char, pos: Pos, lives: u32) -> Self {
        Avatar {
            index,
            glyph,
            pos,
            velocity: Velocity::ZERO,
            lateral: Direction::Stay,
            slot: None,
            key_count: 0,
            alive: true,
            at_door: false,
            door_id: None,
            lives,
        }
    }

    /// Current walking direction.
    pub fn heading(&self) -> Direction {
        self.velocity.direction()
    }

    pub fn steer(&mut self, dir: Direction) {
        self.velocity = Velocity::from_dir(dir);
    }

    pub fn halt(&mut self) {
        self.velocity = Velocity::ZERO;
        self.lateral = Direction::Stay;
    }

    pub fn has_torch(&self) -> bool {
        self.slot == Some(Item::Torch)
    }

    /// Move to a spawn point for a room change.
    pub fn place_at(&mut self, p: Pos) {
        self.pos = p;
        self.halt();
        self.at_door = false;
        self.door_id = None;
    }

    /// Give up `n` keys to a door. A spent key also empties the slot.
    pub fn spend_keys(&mut self, n: u32) {
        if n == 0 {
            return;
        }
        self.key_count = self.key_count.saturating_sub(n);
        if self.slot == Some(Item::Key) {
            self.slot = None;
        }
    }

    /// Deduct a riddle life. Returns false once the avatar is out of lives.
    pub fn lose_life(&mut self) -> bool {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.alive = false;
        }
        self.alive
    }

    /// Put the held item down next to the avatar.
    pub fn drop_item(&mut self, room: &mut Room, fuse: u32) -> Option<(Item, Pos)> {
        let item = self.slot?;
        let at = room.drop_item(self.pos, item, fuse)?;
        self.slot = None;
        if item == Item::Key {
            self.key_count = self.key_count.saturating_sub(1);
        }
        Some((item, at))
    }

    /// Try to move one cell in `dir`. Returns true if the avatar moved.
    pub fn try_step(&mut self, room: &mut Room, dir: Direction, ctx: &mut StepContext) -> bool {
        if dir == Direction::Stay {
            return false;
        }
        let target = self.pos.step(dir);
        let verdict = rules::classify(room.grid(), target, room.entity_at(target), self.slot.is_none());

        match verdict {
            StepVerdict::OutOfGrid | StepVerdict::Border | StepVerdict::Wall | StepVerdict::Blocked { .. } => false,

            StepVerdict::Switch { entity } => {
                if let Some(flip) = room.toggle_switch(entity) {
                    ctx.events.push(GameEvent::SwitchToggled { x: target.x, y: target.y, on: flip.on });
                    if flip.solved {
                        ctx.events.push(GameEvent::PuzzleSolved);
                    }
                }
                false
            }

            StepVerdict::Riddle { entity, riddle_id } => {
                match riddle::challenge(ctx.book, ctx.prompt, riddle_id) {
                    RiddleOutcome::Solved => {
                        room.remove_entity(entity);
                        ctx.events.push(GameEvent::RiddleSolved { avatar: self.index });
                        self.enter(room, target);
                        true
                    }
                    RiddleOutcome::Wrong => {
                        let alive = self.lose_life();
                        ctx.events.push(GameEvent::RiddleFailed { avatar: self.index, lives: self.lives });
                        if !alive {
                            ctx.events.push(GameEvent::AvatarLost { avatar: self.index });
                        }
                        false
                    }
                    RiddleOutcome::Escaped => {
                        ctx.pause_requested = true;
                        false
                    }
                    RiddleOutcome::Missing => false,
                }
            }

            StepVerdict::Pickup { entity, item } => {
                room.remove_entity(entity);
                self.slot = Some(item);
                if item == Item::Key {
                    self.key_count += 1;
                }
                ctx.events.push(GameEvent::ItemPicked { avatar: self.index, item });
                self.enter(room, target);
                true
            }

            StepVerdict::Door { .. } | StepVerdict::Open => {
                self.enter(room, target);
                true
            }
        }
    }

    fn enter(&mut self, room: &Room, target: Pos) {
        self.pos = target;
        self.door_id = match room.entity_at(target).map(|(_, e)| e.kind) {
            Some(EntityKind::Door { id }) => Some(id),
            _ => None,
        };
        self.at_door = self.door_id.is_some();
    }
}
