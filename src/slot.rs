use rand::Rng;

/// Index into the fixed grid of slots
pub type SlotIndex = usize;

/// Chooses the slot for the next target, never repeating the previous one
/// while more than one slot exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPicker {
    slots: usize,
}

impl SlotPicker {
    pub fn new(slots: usize) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn contains(&self, slot: SlotIndex) -> bool {
        slot < self.slots
    }

    /// Uniformly pick a slot, resampling while it equals `exclude`.
    /// Returns `None` for an empty grid.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R, exclude: Option<SlotIndex>) -> Option<SlotIndex> {
        match self.slots {
            0 => None,
            1 => Some(0),
            n => loop {
                let slot = rng.gen_range(0..n);
                if Some(slot) != exclude {
                    return Some(slot);
                }
            },
        }
    }
}
