use crate::cache::ResidentSet;

use super::Replace;

/// Uniformly random victim from a seeded generator, so runs are reproducible.
pub struct Random {
    seed: u64,
    rng: fastrand::Rng,
}

impl Random {
    pub fn new(seed: u64) -> Self {
        Random {
            seed,
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Replace for Random {
    type Meta = ();

    fn on_access(&mut self, _meta: &mut ()) {}

    fn on_insert(&mut self, _meta: &mut ()) {}

    fn select_victim(&mut self, resident: &ResidentSet<()>) -> Option<u64> {
        if resident.is_empty() {
            return None;
        }
        let idx = self.rng.usize(0..resident.len());
        resident.keys().nth(idx).copied()
    }

    fn reset(&mut self) {
        self.rng = fastrand::Rng::with_seed(self.seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::tests::fill_all;

    fn victims(repl: &mut Random, resident: &ResidentSet<()>, n: usize) -> Vec<u64> {
        (0..n).map(|_| repl.select_victim(resident).unwrap()).collect()
    }

    #[test]
    fn same_seed_same_victims() {
        let addrs: Vec<u64> = (0..16).map(|i| i * 64).collect();
        let mut a = Random::new(7);
        let mut b = Random::new(7);
        let resident = fill_all(&mut a, &addrs);
        assert_eq!(victims(&mut a, &resident, 32), victims(&mut b, &resident, 32));
    }

    #[test]
    fn victim_is_always_resident() {
        let mut repl = Random::new(42);
        let resident = fill_all(&mut repl, &[0x10, 0x20, 0x30]);
        for victim in victims(&mut repl, &resident, 100) {
            assert!(resident.contains_key(&victim));
        }
    }

    #[test]
    fn reset_rewinds_the_generator() {
        let mut repl = Random::new(3);
        let resident = fill_all(&mut repl, &(0..8).map(|i| i * 64).collect::<Vec<_>>());
        let first = victims(&mut repl, &resident, 10);
        repl.reset();
        assert_eq!(victims(&mut repl, &resident, 10), first);
    }
}
