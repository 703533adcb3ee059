pub mod fifo;
pub mod lfu;
pub mod lru;
pub mod mru;
pub mod random;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{cache::ResidentSet, error::SimError};

/// Eviction strategy for a single cache level.
///
/// Per-block bookkeeping lives in `Meta`, stored next to each resident block.
/// The policy itself only holds level-wide state such as a logical clock.
pub trait Replace {
    type Meta: Default;

    /// A resident block was referenced.
    fn on_access(&mut self, meta: &mut Self::Meta);

    /// A block was just filled into the level.
    fn on_insert(&mut self, meta: &mut Self::Meta);

    /// Picks the block to evict. Only called when the level is full.
    fn select_victim(&mut self, resident: &ResidentSet<Self::Meta>) -> Option<u64>;

    /// Drops all level-wide state, as if freshly constructed.
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    Lru,
    Mru,
    Lfu,
    Fifo,
    Random,
}

impl Policy {
    pub const ALL: [Policy; 5] = [
        Policy::Lru,
        Policy::Lfu,
        Policy::Fifo,
        Policy::Mru,
        Policy::Random,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Policy::Lru => "lru",
            Policy::Mru => "mru",
            Policy::Lfu => "lfu",
            Policy::Fifo => "fifo",
            Policy::Random => "random",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Policy {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(Policy::Lru),
            "mru" => Ok(Policy::Mru),
            "lfu" => Ok(Policy::Lfu),
            "fifo" => Ok(Policy::Fifo),
            "random" | "rand" => Ok(Policy::Random),
            _ => Err(SimError::config(format!(
                "unrecognized replacement policy: {s}"
            ))),
        }
    }
}

/// Monotonic logical time shared by the stamp-based policies.
#[derive(Debug, Default)]
pub(crate) struct Clock(u64);

impl Clock {
    pub(crate) fn tick(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    pub(crate) fn reset(&mut self) {
        self.0 = 0;
    }
}
