use crate::cache::ResidentSet;

use super::{Clock, Replace};

/// Evicts the most recently referenced block. Suits cyclic scans larger than the level.
#[derive(Debug, Default)]
pub struct Mru {
    clock: Clock,
}

impl Mru {
    pub fn new() -> Self {
        Mru::default()
    }
}

impl Replace for Mru {
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
            .max_by_key(|block| block.repl)
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
    fn evicts_newest_block() {
        let mut mru = Mru::new();
        let mut resident = fill_all(&mut mru, &[0x0, 0x40, 0x80]);
        assert_eq!(mru.select_victim(&resident), Some(0x80));

        touch(&mut mru, &mut resident, 0x0);
        assert_eq!(mru.select_victim(&resident), Some(0x0));
    }
}
