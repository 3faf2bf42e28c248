/// Events emitted during a simulation step.
/// The presentation layer consumes these for messages and sound.

use crate::domain::entity::Item;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    ItemPicked { avatar: usize, item: Item },
    ItemDropped { avatar: usize, item: Item, x: i32, y: i32 },
    SwitchToggled { x: i32, y: i32, on: bool },
    PuzzleSolved,
    DoorUnlocked { id: u8 },
    BombExploded { x: i32, y: i32, destroyed: u32 },
    AvatarHit { avatar: usize },
    KeyDestroyed,
    SpringLaunched { avatar: usize, speed: u32, frames: u32 },
    RiddleSolved { avatar: usize },
    RiddleFailed { avatar: usize, lives: u32 },
    AvatarLost { avatar: usize },
    RoomChanged { from: u32, to: u32 },
    GameOver,
    Victory,
}
