use crate::cache::ResidentSet;

use super::{Clock, Replace};

/// Evicts in insertion order; hits do not change anything.
#[derive(Debug, Default)]
pub struct Fifo {
    seq: Clock,
}

impl Fifo {
    pub fn new() -> Self {
        Fifo::default()
    }
}

impl Replace for Fifo {
    /// Insertion sequence number.
    type Meta = u64;

    fn on_access(&mut self, _seq: &mut u64) {}

    fn on_insert(&mut self, seq: &mut u64) {
        *seq = self.seq.tick();
    }

    fn select_victim(&mut self, resident: &ResidentSet<u64>) -> Option<u64> {
        resident
            .values()
            .min_by_key(|block| block.repl)
            .map(|block| block.addr)
    }

    fn reset(&mut self) {
        self.seq.reset();
    }
}
