use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::{
    cache::IsCache,
    config::HierarchyConfig,
    error::{Result, SimError},
    replace::AccessResult,
    stats::StatisticsCollector,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRequest {
    pub address: u64,
    pub op: Op,
}

impl AccessRequest {
    pub fn read(address: u64) -> Self {
        AccessRequest {
            address,
            op: Op::Read,
        }
    }

    pub fn write(address: u64) -> Self {
        AccessRequest {
            address,
            op: Op::Write,
        }
    }
}

/// Tier that finally supplied the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    Level(usize),
    Terminal,
}

impl fmt::Display for Served {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Served::Level(idx) => write!(f, "L{}", idx + 1),
            Served::Terminal => f.write_str("terminal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub level: usize,
    pub block: u64,
    pub dirty: bool,
}

/// A dirty victim of `from` delivered to the tier right below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBack {
    pub from: usize,
    pub block: u64,
    /// The receiving tier held the block and marked it dirty.
    pub absorbed: bool,
}

/// Outcome of one simulated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    pub address: u64,
    pub op: Op,
    /// One entry per cache level probed, in probe order.
    pub outcomes: Vec<AccessResult>,
    pub served_by: Served,
    /// Sum of the latencies of every tier probed.
    pub latency: u64,
    pub evictions: Vec<Eviction>,
    pub write_backs: Vec<WriteBack>,
}

pub struct MemoryHierarchy {
    /// Cache levels in probe order, followed by the terminal tier.
    tiers: Vec<Box<dyn IsCache>>,
}

impl MemoryHierarchy {
    pub fn new(config: &HierarchyConfig) -> Result<Self> {
        let tiers = config.to_tiers()?;
        debug!(
            levels = tiers.len() - 1,
            terminal = %config.terminal.name,
            "built memory hierarchy"
        );
        Ok(MemoryHierarchy { tiers })
    }

    /// Number of cache levels, not counting the terminal tier.
    pub fn levels(&self) -> usize {
        self.tiers.len() - 1
    }

    pub fn level(&self, idx: usize) -> Option<&dyn IsCache> {
        self.tiers[..self.levels()].get(idx).map(|t| t.as_ref())
    }

    pub fn terminal(&self) -> &dyn IsCache {
        self.tiers[self.levels()].as_ref()
    }

    pub fn tiers(&self) -> impl Iterator<Item = &dyn IsCache> + '_ {
        self.tiers.iter().map(|t| t.as_ref())
    }

    pub fn access(&mut self, req: AccessRequest) -> Result<AccessRecord> {
        let n_levels = self.levels();
        let mut outcomes = Vec::with_capacity(n_levels);
        let mut latency = 0;
        let mut served = None;

        for (idx, tier) in self.tiers.iter_mut().enumerate() {
            latency += tier.latency();
            match tier.lookup(req.address) {
                AccessResult::Hit => {
                    if !tier.is_terminal() {
                        outcomes.push(AccessResult::Hit);
                    }
                    served = Some(idx);
                    break;
                }
                AccessResult::Miss => outcomes.push(AccessResult::Miss),
            }
        }
        let served = served.ok_or_else(|| {
            SimError::InvariantViolation(format!("no tier served {:#x}", req.address))
        })?;

        // Copy the block upwards, deepest level first
        let mut evictions = Vec::new();
        let mut write_backs = Vec::new();
        for level in (0..served.min(n_levels)).rev() {
            let Some(evicted) = self.tiers[level].fill(req.address)? else {
                continue;
            };
            evictions.push(Eviction {
                level,
                block: evicted.block,
                dirty: evicted.dirty,
            });
            if evicted.dirty {
                // A next level that no longer holds the block drops the write-back
                let absorbed = self.tiers[level + 1].mark_dirty(evicted.block);
                trace!(
                    from = self.tiers[level].name(),
                    to = self.tiers[level + 1].name(),
                    block = evicted.block,
                    absorbed,
                    "write-back"
                );
                write_backs.push(WriteBack {
                    from: level,
                    block: evicted.block,
                    absorbed,
                });
            }
        }

        if req.op == Op::Write {
            for tier in &mut self.tiers[..n_levels] {
                tier.mark_dirty(req.address);
            }
        }

        Ok(AccessRecord {
            address: req.address,
            op: req.op,
            outcomes,
            served_by: if served < n_levels {
                Served::Level(served)
            } else {
                Served::Terminal
            },
            latency,
            evictions,
            write_backs,
        })
    }

    pub fn run<I>(&mut self, source: I, stats: &mut StatisticsCollector) -> Result<u64>
    where
        I: IntoIterator<Item = AccessRequest>,
    {
        self.run_with(source, stats, |_, _| {})
    }

    /// Like `run`, calling `observer` after every recorded access.
    pub fn run_with<I, F>(
        &mut self,
        source: I,
        stats: &mut StatisticsCollector,
        mut observer: F,
    ) -> Result<u64>
    where
        I: IntoIterator<Item = AccessRequest>,
        F: FnMut(&AccessRecord, &StatisticsCollector),
    {
        if stats.levels() != self.levels() {
            return Err(SimError::config(format!(
                "statistics track {} levels but the hierarchy has {}",
                stats.levels(),
                self.levels()
            )));
        }

        let mut n_accesses = 0;
        for req in source {
            let record = self.access(req)?;
            trace!(
                address = record.address,
                served_by = %record.served_by,
                latency = record.latency,
                "access"
            );
            stats.record(&record);
            observer(&record, stats);
            n_accesses += 1;
        }
        info!(
            accesses = n_accesses,
            amat = stats.compute_amat(),
            "run finished"
        );
        Ok(n_accesses)
    }

    /// Empties every level and rewinds policy state.
    pub fn reset(&mut self) {
        for tier in &mut self.tiers {
            tier.invalidate_all();
        }
        debug!("hierarchy reset");
    }
}

/// A hierarchy paired with the statistics of the runs driven through it.
pub struct Simulation {
    pub hierarchy: MemoryHierarchy,
    pub stats: StatisticsCollector,
}

impl Simulation {
    pub fn new(config: &HierarchyConfig) -> Result<Self> {
        let hierarchy = MemoryHierarchy::new(config)?;
        let stats = StatisticsCollector::new(&hierarchy);
        Ok(Simulation { hierarchy, stats })
    }

    pub fn run<I>(&mut self, source: I) -> Result<u64>
    where
        I: IntoIterator<Item = AccessRequest>,
    {
        self.hierarchy.run(source, &mut self.stats)
    }

    pub fn run_with<I, F>(&mut self, source: I, observer: F) -> Result<u64>
    where
        I: IntoIterator<Item = AccessRequest>,
        F: FnMut(&AccessRecord, &StatisticsCollector),
    {
        self.hierarchy.run_with(source, &mut self.stats, observer)
    }

    /// Clears statistics and all resident sets.
    pub fn reset(&mut self) {
        self.hierarchy.reset();
        self.stats.reset();
    }
}
