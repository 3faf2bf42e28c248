/// Door requirements and the room-level switch puzzle latch.
///
/// ## Door check
///
///   can_open(id) = unlocked
///               OR (active_switches >= required_switches
///                   AND keys_combined >= required_keys)
///
/// Unlocking is a one-way latch. Keys are consumed up to the requirement,
/// avatar 1 first, then avatar 2.
///
/// ## Puzzle latch
///
///   unsolved ──(active >= total AND total > 0)──▶ solved   (never reverts)

/// Door ids are the digits '0'..='9'.
pub const MAX_DOORS: usize = 10;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DoorRequirements {
    pub door_id: u8,
    /// Total across both avatars.
    pub required_keys: u32,
    /// Number of simultaneously-ON switches.
    pub required_switches: u32,
    pub unlocked: bool,
}

impl DoorRequirements {
    pub fn new(door_id: u8) -> Self {
        DoorRequirements { door_id, required_keys: 1, required_switches: 0, unlocked: false }
    }

    pub fn is_satisfied(&self, keys_held: u32, active_switches: u32) -> bool {
        active_switches >= self.required_switches && keys_held >= self.required_keys
    }
}

#[derive(Clone, Debug)]
pub struct DoorTable {
    doors: [DoorRequirements; MAX_DOORS],
}

impl Default for DoorTable {
    fn default() -> Self {
        DoorTable { doors: std::array::from_fn(|i| DoorRequirements::new(i as u8)) }
    }
}

impl DoorTable {
    pub fn get(&self, id: u8) -> Option<&DoorRequirements> {
        self.doors.get(id as usize)
    }

    /// Configure a door. Ids outside 0..=9 are rejected.
    pub fn set_requirements(&mut self, id: u8, keys: u32, switches: u32) -> bool {
        match self.doors.get_mut(id as usize) {
            Some(d) => {
                d.required_keys = keys;
                d.required_switches = switches;
                true
            }
            None => {
                log::warn!("door id {} out of range, requirements ignored", id);
                false
            }
        }
    }

    pub fn can_open(&self, id: u8, keys_held: u32, active_switches: u32) -> bool {
        self.get(id)
            .map(|d| d.unlocked || d.is_satisfied(keys_held, active_switches))
            .unwrap_or(false)
    }

    pub fn is_unlocked(&self, id: u8) -> bool {
        self.get(id).map(|d| d.unlocked).unwrap_or(false)
    }

    /// Latch the door open. Returns true only on the locked → unlocked edge.
    pub fn unlock(&mut self, id: u8) -> bool {
        match self.doors.get_mut(id as usize) {
            Some(d) if !d.unlocked => {
                d.unlocked = true;
                true
            }
            _ => false,
        }
    }

    pub fn required_keys(&self, id: u8) -> u32 {
        self.get(id).map(|d| d.required_keys).unwrap_or(0)
    }
}

/// Split a key requirement across the two avatars' holdings.
/// Avatar 1 pays first; avatar 2 covers the remainder. Returns keys taken
/// from each.
pub fn consume_keys(required: u32, held: [u32; 2]) -> [u32; 2] {
    let first = held[0].min(required);
    let second = held[1].min(required - first);
    [first, second]
}

/// One-way room puzzle latch over the room's switch count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PuzzleLatch {
    pub total_switches: u32,
    pub active_switches: u32,
    pub solved: bool,
}

impl PuzzleLatch {
    pub fn new(total_switches: u32, active_switches: u32) -> Self {
        PuzzleLatch { total_switches, active_switches, solved: false }
    }

    /// Record the current ON count. Returns true on the unsolved → solved edge.
    pub fn update(&mut self, active: u32) -> bool {
        self.active_switches = active;
        if !self.solved && self.total_switches > 0 && active >= self.total_switches {
            self.solved = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_need_one_key() {
        let t = DoorTable::default();
        assert!(!t.can_open(3, 0, 0));
        assert!(t.can_open(3, 1, 0));
        assert!(!t.can_open(12, 5, 5));
    }

    #[test]
    fn both_requirements_must_hold() {
        let mut t = DoorTable::default();
        assert!(t.set_requirements(1, 2, 2));
        assert!(!t.can_open(1, 2, 1));
        assert!(!t.can_open(1, 1, 2));
        assert!(t.can_open(1, 2, 2));
        assert!(!t.set_requirements(10, 0, 0));
    }

    #[test]
    fn unlock_latch_is_monotonic() {
        let mut t = DoorTable::default();
        t.set_requirements(2, 3, 1);
        assert!(t.unlock(2));
        assert!(!t.unlock(2));
        // Requirements no longer matter
        for keys in 0..4 {
            for sw in 0..3 {
                assert!(t.can_open(2, keys, sw));
            }
        }
    }

    #[test]
    fn avatar_one_pays_first() {
        assert_eq!(consume_keys(2, [3, 1]), [2, 0]);
        assert_eq!(consume_keys(2, [1, 4]), [1, 1]);
        assert_eq!(consume_keys(3, [0, 3]), [0, 3]);
        assert_eq!(consume_keys(0, [2, 2]), [0, 0]);
    }

    #[test]
    fn latch_fires_once() {
        let mut p = PuzzleLatch::new(2, 0);
        assert!(!p.update(1));
        assert!(p.update(2));
        assert!(!p.update(2));
        assert!(!p.update(0));
        assert!(p.solved);
    }

    #[test]
    fn no_switches_never_solves() {
        let mut p = PuzzleLatch::new(0, 0);
        assert!(!p.update(0));
        assert!(!p.solved);
    }
}
