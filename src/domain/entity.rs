/// Entities layered on top of the grid: one closed sum type over every
/// object kind a layout can produce.
///
/// Capability flags (blocking / pickable / interactable) are plain data,
/// seeded from the kind when the entity is built. Behaviour is a `match`
/// on `EntityKind`, never a downcast.
///
/// ## Kind table
///
/// | Kind          | Glyph | Blocking | Pickable | Interactable | Blast |
/// |---------------|-------|----------|----------|--------------|-------|
/// | Wall          | W     | yes      |          |              | immune |
/// | BreakableWall | =     | yes      |          |              | destroyed |
/// | Obstacle      | *     | yes      |          |              | destroyed |
/// | SwitchWall    | Z     | yes      |          |              | destroyed |
/// | Key           | K     |          | yes      |              | destroyed |
/// | Torch         | !     |          | yes      |              | destroyed |
/// | Bomb          | @     |          | unarmed  |              | destroyed |
/// | Switch        | \ /   | yes      |          | yes          | destroyed |
/// | Door          | 0-9   |          |          | yes          | immune |
/// | Riddle        | ?     | yes      |          | yes          | destroyed |
/// | Spring        | #     |          |          |              | destroyed |

use super::glyph;
use super::motion::Pos;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntityKind {
    Wall,
    BreakableWall,
    /// Vanishes when the room's switch puzzle is solved.
    Obstacle,
    /// Same latch behaviour as `Obstacle`, drawn as a wall segment.
    SwitchWall,
    Key,
    Torch,
    Bomb { armed: bool },
    Switch { on: bool },
    Door { id: u8 },
    Riddle { riddle_id: u32 },
    /// One cell of a multi-cell spring; `spring` indexes the room's springs.
    Spring { spring: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Capabilities {
    pub blocking: bool,
    pub pickable: bool,
    pub interactable: bool,
}

impl EntityKind {
    pub fn capabilities(self) -> Capabilities {
        let (blocking, pickable, interactable) = match self {
            EntityKind::Wall
            | EntityKind::BreakableWall
            | EntityKind::Obstacle
            | EntityKind::SwitchWall => (true, false, false),
            EntityKind::Key | EntityKind::Torch => (false, true, false),
            EntityKind::Bomb { armed } => (false, !armed, false),
            EntityKind::Switch { .. } => (true, false, true),
            EntityKind::Door { .. } => (false, false, true),
            EntityKind::Riddle { .. } => (true, false, true),
            EntityKind::Spring { .. } => (false, false, false),
        };
        Capabilities { blocking, pickable, interactable }
    }

    pub fn glyph(self) -> char {
        match self {
            EntityKind::Wall => glyph::WALL,
            EntityKind::BreakableWall => glyph::BREAKABLE_WALL,
            EntityKind::Obstacle => glyph::OBSTACLE,
            EntityKind::SwitchWall => glyph::SWITCH_WALL,
            EntityKind::Key => glyph::KEY,
            EntityKind::Torch => glyph::TORCH,
            EntityKind::Bomb { .. } => glyph::BOMB,
            EntityKind::Switch { on: false } => glyph::SWITCH_OFF,
            EntityKind::Switch { on: true } => glyph::SWITCH_ON,
            EntityKind::Door { id } => glyph::door_glyph(id),
            EntityKind::Riddle { .. } => glyph::RIDDLE,
            EntityKind::Spring { .. } => glyph::SPRING,
        }
    }

    /// Blast hook: true when the entity is destroyed.
    pub fn on_explosion(self) -> bool {
        !matches!(self, EntityKind::Wall | EntityKind::Door { .. })
    }

    /// Removed when the room's switch puzzle latch fires.
    pub fn is_switch_controlled(self) -> bool {
        matches!(self, EntityKind::Obstacle | EntityKind::SwitchWall)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    pub pos: Pos,
    pub glyph: char,
    pub active: bool,
    pub caps: Capabilities,
}

impl Entity {
    pub fn new(kind: EntityKind, pos: Pos) -> Self {
        Entity {
            kind,
            pos,
            glyph: kind.glyph(),
            active: true,
            caps: kind.capabilities(),
        }
    }

    /// Factory: layout glyph → entity. Air and unknown glyphs yield `None`.
    /// Riddles start with id 0 and springs with index 0; the room assigns
    /// the real values while loading.
    pub fn from_glyph(c: char, pos: Pos) -> Option<Self> {
        let kind = match c {
            glyph::WALL => EntityKind::Wall,
            glyph::BREAKABLE_WALL => EntityKind::BreakableWall,
            glyph::OBSTACLE => EntityKind::Obstacle,
            glyph::SWITCH_WALL => EntityKind::SwitchWall,
            glyph::KEY => EntityKind::Key,
            glyph::TORCH => EntityKind::Torch,
            glyph::BOMB => EntityKind::Bomb { armed: false },
            glyph::SWITCH_OFF => EntityKind::Switch { on: false },
            glyph::SWITCH_ON => EntityKind::Switch { on: true },
            glyph::RIDDLE => EntityKind::Riddle { riddle_id: 0 },
            glyph::SPRING => EntityKind::Spring { spring: 0 },
            d if glyph::is_door(d) => EntityKind::Door { id: glyph::door_id(d)? },
            _ => return None,
        };
        Some(Entity::new(kind, pos))
    }

    pub fn is_blocking(&self) -> bool {
        self.caps.blocking
    }

    pub fn is_pickable(&self) -> bool {
        self.caps.pickable
    }

    pub fn is_interactable(&self) -> bool {
        self.caps.interactable
    }

    pub fn on_explosion(&self) -> bool {
        self.kind.on_explosion()
    }

    /// Replace the kind, refreshing glyph and capabilities to match.
    pub fn set_kind(&mut self, kind: EntityKind) {
        self.kind = kind;
        self.glyph = kind.glyph();
        self.caps = kind.capabilities();
    }

    /// Flip a switch. Returns the new ON state, or `None` for non-switches.
    pub fn toggle(&mut self) -> Option<bool> {
        match self.kind {
            EntityKind::Switch { on } => {
                self.set_kind(EntityKind::Switch { on: !on });
                Some(!on)
            }
            _ => None,
        }
    }

    /// Lift this entity into an inventory item, if it is pickable.
    pub fn to_item(&self) -> Option<Item> {
        if !self.is_pickable() {
            return None;
        }
        match self.kind {
            EntityKind::Key => Some(Item::Key),
            EntityKind::Torch => Some(Item::Torch),
            EntityKind::Bomb { .. } => Some(Item::Bomb),
            _ => None,
        }
    }
}

/// What an avatar can carry in its single inventory slot. Picking up moves
/// the item out of the room; dropping moves it back as a fresh entity.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Item {
    Key,
    Torch,
    Bomb,
}

impl Item {
    pub fn glyph(self) -> char {
        match self {
            Item::Key => glyph::KEY,
            Item::Torch => glyph::TORCH,
            Item::Bomb => glyph::BOMB,
        }
    }

    /// Entity placed in the room when this item is dropped. Bombs arm on drop.
    pub fn into_entity(self, pos: Pos) -> Entity {
        let kind = match self {
            Item::Key => EntityKind::Key,
            Item::Torch => EntityKind::Torch,
            Item::Bomb => EntityKind::Bomb { armed: true },
        };
        Entity::new(kind, pos)
    }
}
