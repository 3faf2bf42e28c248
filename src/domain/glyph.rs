/// Layout glyph alphabet and its properties.
/// Properties are queried via functions, not stored as flags,
/// so glyph semantics are centralized here.

pub const AIR: char = ' ';
pub const WALL: char = 'W';
pub const BREAKABLE_WALL: char = '=';
pub const SPRING: char = '#';
pub const OBSTACLE: char = '*';
pub const TORCH: char = '!';
pub const BOMB: char = '@';
pub const KEY: char = 'K';
pub const SWITCH_OFF: char = '\\';
pub const SWITCH_ON: char = '/';
pub const RIDDLE: char = '?';
pub const SWITCH_WALL: char = 'Z';

/// Second frame of an armed bomb's blink.
pub const BOMB_BLINK: char = '*';

pub const AVATAR_ONE: char = '$';
pub const AVATAR_TWO: char = '&';

/// Indestructible wall. Out-of-bounds reads also report this.
#[inline]
pub fn is_wall(c: char) -> bool {
    c == WALL
}

#[inline]
pub fn is_breakable(c: char) -> bool {
    c == BREAKABLE_WALL
}

/// Either kind of wall; both reject movement before any entity check.
#[inline]
pub fn is_any_wall(c: char) -> bool {
    is_wall(c) || is_breakable(c)
}

#[inline]
pub fn is_door(c: char) -> bool {
    c.is_ascii_digit()
}

/// Door id for a door glyph ('0'..='9').
#[inline]
pub fn door_id(c: char) -> Option<u8> {
    c.to_digit(10).map(|d| d as u8)
}

#[inline]
pub fn door_glyph(id: u8) -> char {
    char::from(b'0' + id.min(9))
}

/// Blocks explosion line-of-sight and is never destroyed by a blast.
#[inline]
pub fn is_blast_proof(c: char) -> bool {
    is_wall(c) || is_door(c)
}

/// Solid leftovers a blast turns into air when no entity owns the cell.
#[inline]
pub fn is_blast_debris(c: char) -> bool {
    c != AIR && !is_blast_proof(c)
}

/// Cell an item may be dropped onto (before checking entities).
#[inline]
pub fn is_open_floor(c: char) -> bool {
    c == AIR
}
