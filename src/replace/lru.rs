use crate::cache::ResidentSet;

use super::{Clock, Replace};

/// Evicts the block whose last reference is oldest.
#[derive(Debug, Default)]
pub struct Lru {
    clock: Clock,
}

impl Lru {
    pub fn new() -> Self {
        Lru::default()
    }
}

impl Replace for Lru {
    /// Last-access stamp.
    type Meta = u64;

    fn on_access(&mut self, stamp: &mut u64) {
        *stamp = self.clock.tick();
    }

    fn on_insert(&mut self, stamp: &mut u64) {
        *stamp = self.clock.tick();
    }

    fn select_victim(&mut self, resident: &ResidentSet<u64>) -> Option<u64> {
        resident
            .values()
            .min_by_key(|block| block.repl)
            .map(|block| block.addr)
    }

    fn reset(&mut self) {
        self.clock.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::tests::{fill_all, touch};

    #[test]
    fn evicts_least_recently_inserted() {
        let mut lru = Lru::new();
        let resident = fill_all(&mut lru, &[0x40, 0x80, 0xc0]);
        assert_eq!(lru.select_victim(&resident), Some(0x40));
    }

    #[test]
    fn recent_access_protects_block() {
        let mut lru = Lru::new();
        let mut resident = fill_all(&mut lru, &[0x40, 0x80, 0xc0]);
        touch(&mut lru, &mut resident, 0x40);
        assert_eq!(lru.select_victim(&resident), Some(0x80));

        // 0x40 survives until everything else is older than its last touch
        resident.remove(&0x80);
        touch(&mut lru, &mut resident, 0xc0);
        assert_eq!(lru.select_victim(&resident), Some(0x40));
    }

    #[test]
    fn empty_set_has_no_victim() {
        let mut lru = Lru::new();
        assert_eq!(lru.select_victim(&ResidentSet::new()), None);
    }
}
