use crate::cache::ResidentSet;

use super::{Clock, Replace};

/// Evicts the least frequently referenced block, oldest insertion first on ties.
#[derive(Debug, Default)]
pub struct Lfu {
    inserts: Clock,
}

impl Lfu {
    pub fn new() -> Self {
        Lfu::default()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LfuBlockData {
    pub freq: u64,
    pub inserted: u64,
}

impl Replace for Lfu {
    type Meta = LfuBlockData;

    fn on_access(&mut self, meta: &mut LfuBlockData) {
        meta.freq += 1;
    }

    fn on_insert(&mut self, meta: &mut LfuBlockData) {
        meta.freq = 1;
        meta.inserted = self.inserts.tick();
    }

    fn select_victim(&mut self, resident: &ResidentSet<LfuBlockData>) -> Option<u64> {
        resident
            .values()
            .min_by_key(|block| (block.repl.freq, block.repl.inserted))
            .map(|block| block.addr)
    }

    fn reset(&mut self) {
        self.inserts.reset();
    }
}
