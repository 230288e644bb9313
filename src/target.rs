use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::slot::SlotIndex;

/// Reward class of a target, drawn when it spawns
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum Tier {
    Normal,
    /// First bonus tier
    Golden,
    /// Rarest bonus tier
    Diamond,
}

/// Spawn probabilities for the bonus tiers; the remainder is `Normal`.
/// The diamond band is checked first, golden occupies the next band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierOdds {
    pub diamond: f64,
    pub golden: f64,
}

impl Default for TierOdds {
    fn default() -> Self {
        Self {
            diamond: 0.04,
            golden: 0.10,
        }
    }
}

impl TierOdds {
    /// Map a roll in `[0, 1)` onto a tier
    pub fn tier_for(&self, roll: f64) -> Tier {
        if roll < self.diamond {
            Tier::Diamond
        } else if roll < self.diamond + self.golden {
            Tier::Golden
        } else {
            Tier::Normal
        }
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Tier {
        self.tier_for(rng.gen::<f64>())
    }

    /// Clamp both bands into `[0, 1]` with a combined mass of at most 1
    pub fn sanitized(self) -> Self {
        let clamp = |p: f64| if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
        let diamond = clamp(self.diamond);
        let golden = clamp(self.golden).min(1.0 - diamond);
        Self { diamond, golden }
    }
}

/// Points awarded per tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierPoints {
    pub normal: u32,
    pub golden: u32,
    pub diamond: u32,
}

impl Default for TierPoints {
    fn default() -> Self {
        Self {
            normal: 10,
            golden: 50,
            diamond: 100,
        }
    }
}

impl TierPoints {
    pub fn for_tier(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Normal => self.normal,
            Tier::Golden => self.golden,
            Tier::Diamond => self.diamond,
        }
    }
}

/// One appearance of a target in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub slot: SlotIndex,
    pub tier: Tier,
    pub spawned_at: Millis,
    pub expires_at: Millis,
    /// Set once a hit has been credited; later hits on this target are ignored
    pub resolved: bool,
}

impl Target {
    pub fn new(slot: SlotIndex, tier: Tier, spawned_at: Millis, visible_for: Millis) -> Self {
        Self {
            slot,
            tier,
            spawned_at,
            expires_at: spawned_at.saturating_add(visible_for),
            resolved: false,
        }
    }

    /// Last instant a hit is still honored
    pub fn grace_deadline(&self, grace_ms: Millis) -> Millis {
        self.expires_at.saturating_add(grace_ms)
    }

    fn shift(&mut self, by: Millis) {
        self.spawned_at = self.spawned_at.saturating_add(by);
        self.expires_at = self.expires_at.saturating_add(by);
    }
}

/// Which entry of the hit-window log a target lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Current,
    Previous,
}

/// Bounded log of the current and the immediately preceding target.
/// Anything older is dropped when a new target is pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitWindows {
    current: Option<Target>,
    previous: Option<Target>,
}

impl HitWindows {
    pub fn current(&self) -> Option<&Target> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&Target> {
        self.previous.as_ref()
    }

    pub fn get(&self, window: Window) -> Option<&Target> {
        match window {
            Window::Current => self.current.as_ref(),
            Window::Previous => self.previous.as_ref(),
        }
    }

    pub(crate) fn get_mut(&mut self, window: Window) -> Option<&mut Target> {
        match window {
            Window::Current => self.current.as_mut(),
            Window::Previous => self.previous.as_mut(),
        }
    }

    /// Make `target` current, demoting the old current to previous
    pub(crate) fn push(&mut self, target: Target) {
        self.previous = self.current.replace(target);
    }

    /// Move every retained deadline forward, e.g. by a paused interval
    pub(crate) fn shift(&mut self, by: Millis) {
        for target in self.current.iter_mut().chain(self.previous.iter_mut()) {
            target.shift(by);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.current = None;
        self.previous = None;
    }
}
