use std::collections::BTreeMap;

use tracing::trace;

use crate::{
    error::{Result, SimError},
    replace::{AccessResult, Replace},
};

/// Resident blocks of one level, keyed by block address.
///
/// Ordered so that iteration, and therefore random victim selection, is
/// reproducible for a given seed.
pub type ResidentSet<M> = BTreeMap<u64, MemoryBlock<M>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evicted {
    pub block: u64,
    pub dirty: bool,
}

/// One tier of the memory hierarchy, as seen by the engine.
pub trait IsCache {
    fn name(&self) -> &str;
    fn latency(&self) -> u64;
    /// Maximum resident blocks, `None` for an unbounded tier.
    fn capacity(&self) -> Option<usize>;
    fn line_size(&self) -> u64;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_terminal(&self) -> bool {
        false
    }

    fn block_addr(&self, addr: u64) -> u64 {
        addr - addr % self.line_size()
    }

    fn lookup(&mut self, addr: u64) -> AccessResult;
    fn contains(&self, addr: u64) -> bool;
    fn fill(&mut self, addr: u64) -> Result<Option<Evicted>>;
    /// Returns whether the block was resident and is now dirty.
    fn mark_dirty(&mut self, addr: u64) -> bool;
    fn is_dirty(&self, addr: u64) -> bool;
    /// Resident block addresses in ascending order.
    fn resident_blocks(&self) -> Vec<u64>;
    fn invalidate_all(&mut self);
}

pub struct Cache<R: Replace> {
    name: String,
    capacity: usize,
    line_size: u64,
    latency: u64,
    blocks: ResidentSet<R::Meta>,
    pub repl: R,
}

impl<R: Replace> Cache<R> {
    /// Capacity, line size and latency must be non-zero; `HierarchyConfig`
    /// checks that before building levels.
    pub fn new(name: String, capacity: usize, line_size: u64, latency: u64, repl: R) -> Self {
        debug_assert!(capacity > 0 && line_size > 0);
        Cache {
            name,
            capacity,
            line_size,
            latency,
            blocks: ResidentSet::new(),
            repl,
        }
    }

    pub fn block(&self, addr: u64) -> Option<&MemoryBlock<R::Meta>> {
        self.blocks.get(&self.block_addr(addr))
    }
}

impl<R: Replace> IsCache for Cache<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn latency(&self) -> u64 {
        self.latency
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }

    fn line_size(&self) -> u64 {
        self.line_size
    }

    fn len(&self) -> usize {
        self.blocks.len()
    }

    fn lookup(&mut self, addr: u64) -> AccessResult {
        let block_addr = self.block_addr(addr);
        match self.blocks.get_mut(&block_addr) {
            Some(block) => {
                self.repl.on_access(&mut block.repl);
                AccessResult::Hit
            }
            None => AccessResult::Miss,
        }
    }

    fn contains(&self, addr: u64) -> bool {
        self.blocks.contains_key(&self.block_addr(addr))
    }

    fn fill(&mut self, addr: u64) -> Result<Option<Evicted>> {
        let block_addr = self.block_addr(addr);
        if self.blocks.contains_key(&block_addr) {
            return Err(SimError::InvariantViolation(format!(
                "{}: fill of resident block {block_addr:#x}",
                self.name
            )));
        }

        let evicted = if self.blocks.len() >= self.capacity {
            let victim = self.repl.select_victim(&self.blocks).ok_or_else(|| {
                SimError::InvariantViolation(format!("{}: no victim in a full level", self.name))
            })?;
            let victim = self.blocks.remove(&victim).ok_or_else(|| {
                SimError::InvariantViolation(format!(
                    "{}: victim {victim:#x} is not resident",
                    self.name
                ))
            })?;
            trace!(cache = %self.name, block = victim.addr, dirty = victim.dirty, "evict");
            Some(victim.evict())
        } else {
            None
        };

        let mut block = MemoryBlock::new(block_addr);
        self.repl.on_insert(&mut block.repl);
        self.blocks.insert(block_addr, block);
        Ok(evicted)
    }

    fn mark_dirty(&mut self, addr: u64) -> bool {
        let block_addr = self.block_addr(addr);
        match self.blocks.get_mut(&block_addr) {
            Some(block) => {
                block.dirty = true;
                true
            }
            None => false,
        }
    }

    fn is_dirty(&self, addr: u64) -> bool {
        self.block(addr).is_some_and(|b| b.dirty)
    }

    fn resident_blocks(&self) -> Vec<u64> {
        self.blocks.keys().copied().collect()
    }

    fn invalidate_all(&mut self) {
        self.blocks.clear();
        self.repl.reset();
    }
}

/// Backing store at the bottom of the hierarchy: always hits, never evicts.
#[derive(Debug, Clone)]
pub struct Terminal {
    name: String,
    latency: u64,
}

impl Terminal {
    pub fn new(name: String, latency: u64) -> Self {
        Terminal { name, latency }
    }
}

impl IsCache for Terminal {
    fn name(&self) -> &str {
        &self.name
    }

    fn latency(&self) -> u64 {
        self.latency
    }

    fn capacity(&self) -> Option<usize> {
        None
    }

    fn line_size(&self) -> u64 {
        1
    }

    fn len(&self) -> usize {
        0
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn lookup(&mut self, _addr: u64) -> AccessResult {
        AccessResult::Hit
    }

    fn contains(&self, _addr: u64) -> bool {
        true
    }

    fn fill(&mut self, _addr: u64) -> Result<Option<Evicted>> {
        Ok(None)
    }

    /// Write-backs into the terminal tier are absorbed.
    fn mark_dirty(&mut self, _addr: u64) -> bool {
        true
    }

    fn is_dirty(&self, _addr: u64) -> bool {
        false
    }

    fn resident_blocks(&self) -> Vec<u64> {
        Vec::new()
    }

    fn invalidate_all(&mut self) {}
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBlock<M> {
    pub addr: u64,
    pub dirty: bool,

    // Replace Data
    pub repl: M,
}

impl<M: Default> MemoryBlock<M> {
    pub fn new(addr: u64) -> Self {
        MemoryBlock {
            addr,
            dirty: false,
            repl: M::default(),
        }
    }
}

impl<M> MemoryBlock<M> {
    pub fn evict(self) -> Evicted {
        Evicted {
            block: self.addr,
            dirty: self.dirty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::{fifo::Fifo, lru::Lru};

    fn lru_cache(capacity: usize) -> Cache<Lru> {
        Cache::new("L1".into(), capacity, 64, 1, Lru::new())
    }

    #[test]
    fn addresses_share_a_line() {
        let mut cache = lru_cache(4);
        assert_eq!(cache.block_addr(0x1234), 0x1200);
        assert_eq!(cache.lookup(0x1234), AccessResult::Miss);
        cache.fill(0x1234).unwrap();
        assert_eq!(cache.lookup(0x1200), AccessResult::Hit);
        assert_eq!(cache.lookup(0x123f), AccessResult::Hit);
        assert_eq!(cache.lookup(0x1240), AccessResult::Miss);
        assert_eq!(cache.resident_blocks(), vec![0x1200]);
    }

    #[test]
    fn fill_evicts_only_when_full() {
        let mut cache = lru_cache(2);
        assert_eq!(cache.fill(0x000).unwrap(), None);
        assert_eq!(cache.fill(0x040).unwrap(), None);
        assert_eq!(cache.len(), 2);

        let evicted = cache.fill(0x080).unwrap();
        assert_eq!(
            evicted,
            Some(Evicted {
                block: 0x000,
                dirty: false
            })
        );
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(0x000));
    }

    #[test]
    fn dirty_victim_is_reported() {
        let mut cache = Cache::new("L2".into(), 1, 64, 10, Fifo::new());
        cache.fill(0x100).unwrap();
        assert!(cache.mark_dirty(0x13c));
        assert!(cache.is_dirty(0x100));

        let evicted = cache.fill(0x200).unwrap().unwrap();
        assert_eq!(evicted.block, 0x100);
        assert!(evicted.dirty);
        assert!(!cache.is_dirty(0x200));
    }

    #[test]
    fn mark_dirty_ignores_absent_blocks() {
        let mut cache = lru_cache(2);
        assert!(!cache.mark_dirty(0x40));
    }

    #[test]
    fn filling_a_resident_block_is_an_invariant_violation() {
        let mut cache = lru_cache(2);
        cache.fill(0x40).unwrap();
        let err = cache.fill(0x44).unwrap_err();
        assert!(matches!(err, SimError::InvariantViolation(_)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_all_empties_level() {
        let mut cache = lru_cache(2);
        cache.fill(0x0).unwrap();
        cache.fill(0x40).unwrap();
        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.lookup(0x0), AccessResult::Miss);
    }

    #[test]
    fn terminal_always_hits() {
        let mut disk = Terminal::new("Disk".into(), 100);
        assert!(disk.is_terminal());
        assert_eq!(disk.capacity(), None);
        assert_eq!(disk.lookup(0xdead_beef), AccessResult::Hit);
        assert_eq!(disk.fill(0xdead_beef).unwrap(), None);
        assert!(disk.is_empty());
    }
}
