use std::fmt;

use serde::Serialize;

use crate::{
    hierarchy::{AccessRecord, MemoryHierarchy, Op, Served},
    replace::AccessResult,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub write_backs: u64,
}

impl LevelStats {
    /// Accesses that reached this level.
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        match self.accesses() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }

    pub fn miss_rate(&self) -> f64 {
        match self.accesses() {
            0 => 0.0,
            total => self.misses as f64 / total as f64,
        }
    }
}

#[derive(Debug, Clone)]
struct TierInfo {
    name: String,
    latency: u64,
}

/// Running counters for one hierarchy. Levels are indexed from 0 (L1).
#[derive(Debug, Clone)]
pub struct StatisticsCollector {
    tiers: Vec<TierInfo>,
    levels: Vec<LevelStats>,
    terminal_hits: u64,
    accesses: u64,
    reads: u64,
    writes: u64,
    total_latency: u64,
}

impl StatisticsCollector {
    pub fn new(hierarchy: &MemoryHierarchy) -> Self {
        let tiers: Vec<TierInfo> = hierarchy
            .tiers()
            .map(|t| TierInfo {
                name: t.name().to_string(),
                latency: t.latency(),
            })
            .collect();
        StatisticsCollector {
            levels: vec![LevelStats::default(); tiers.len() - 1],
            tiers,
            terminal_hits: 0,
            accesses: 0,
            reads: 0,
            writes: 0,
            total_latency: 0,
        }
    }

    pub fn record(&mut self, record: &AccessRecord) {
        self.accesses += 1;
        self.total_latency += record.latency;
        match record.op {
            Op::Read => self.reads += 1,
            Op::Write => self.writes += 1,
        }

        for (stats, outcome) in self.levels.iter_mut().zip(&record.outcomes) {
            match outcome {
                AccessResult::Hit => stats.hits += 1,
                AccessResult::Miss => stats.misses += 1,
            }
        }
        if record.served_by == Served::Terminal {
            self.terminal_hits += 1;
        }
        for eviction in &record.evictions {
            if let Some(stats) = self.levels.get_mut(eviction.level) {
                stats.evictions += 1;
            }
        }
        for write_back in &record.write_backs {
            if let Some(stats) = self.levels.get_mut(write_back.from) {
                stats.write_backs += 1;
            }
        }
    }

    /// Total latency over total accesses; 0 before any access.
    pub fn compute_amat(&self) -> f64 {
        if self.accesses == 0 {
            return 0.0;
        }
        self.total_latency as f64 / self.accesses as f64
    }

    /// AMAT as the sum over tiers of P(reaching the tier) * tier latency.
    pub fn amat_by_level(&self) -> f64 {
        if self.accesses == 0 {
            return 0.0;
        }
        let reached = self
            .levels
            .iter()
            .map(LevelStats::accesses)
            .chain(std::iter::once(self.terminal_hits));
        self.tiers
            .iter()
            .zip(reached)
            .map(|(tier, n)| n as f64 / self.accesses as f64 * tier.latency as f64)
            .sum()
    }

    pub fn hit_rate(&self, level: usize) -> f64 {
        self.levels.get(level).map_or(0.0, LevelStats::hit_rate)
    }

    pub fn miss_rate(&self, level: usize) -> f64 {
        self.levels.get(level).map_or(0.0, LevelStats::miss_rate)
    }

    pub fn eviction_count(&self, level: usize) -> u64 {
        self.levels.get(level).map_or(0, |s| s.evictions)
    }

    pub fn write_back_count(&self, level: usize) -> u64 {
        self.levels.get(level).map_or(0, |s| s.write_backs)
    }

    pub fn level(&self, level: usize) -> Option<&LevelStats> {
        self.levels.get(level)
    }

    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    pub fn accesses(&self) -> u64 {
        self.accesses
    }

    pub fn terminal_hits(&self) -> u64 {
        self.terminal_hits
    }

    pub fn total_latency(&self) -> u64 {
        self.total_latency
    }

    pub fn reset(&mut self) {
        self.levels.fill(LevelStats::default());
        self.terminal_hits = 0;
        self.accesses = 0;
        self.reads = 0;
        self.writes = 0;
        self.total_latency = 0;
    }

    pub fn report(&self) -> Report {
        let levels = self
            .tiers
            .iter()
            .zip(&self.levels)
            .map(|(tier, stats)| LevelReport {
                name: tier.name.clone(),
                latency: tier.latency,
                hits: stats.hits,
                misses: stats.misses,
                hit_rate: stats.hit_rate(),
                miss_rate: stats.miss_rate(),
                evictions: stats.evictions,
                write_backs: stats.write_backs,
            })
            .collect();
        let terminal = self.tiers.last().map(|tier| TerminalReport {
            name: tier.name.clone(),
            latency: tier.latency,
            hits: self.terminal_hits,
        });

        Report {
            accesses: self.accesses,
            reads: self.reads,
            writes: self.writes,
            total_latency: self.total_latency,
            amat: self.compute_amat(),
            levels,
            terminal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelReport {
    pub name: String,
    pub latency: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub evictions: u64,
    pub write_backs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalReport {
    pub name: String,
    pub latency: u64,
    pub hits: u64,
}

/// Snapshot of a collector, for the JSON output and the summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub accesses: u64,
    pub reads: u64,
    pub writes: u64,
    pub total_latency: u64,
    pub amat: f64,
    pub levels: Vec<LevelReport>,
    pub terminal: Option<TerminalReport>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<26} {:>10} {:>10} {:>9} {:>9} {:>10} {:>11} {:>12}",
            "Level", "Hits", "Misses", "Hit Rate", "Miss Rate", "Evictions", "Write-backs", "Latency"
        )?;
        for level in &self.levels {
            writeln!(
                f,
                "{:<26} {:>10} {:>10} {:>8.2}% {:>8.2}% {:>10} {:>11} {:>12}",
                level.name,
                level.hits,
                level.misses,
                level.hit_rate * 100.0,
                level.miss_rate * 100.0,
                level.evictions,
                level.write_backs,
                level.latency
            )?;
        }
        if let Some(terminal) = &self.terminal {
            writeln!(
                f,
                "{:<26} {:>10} {:>10} {:>9} {:>9} {:>10} {:>11} {:>12}",
                terminal.name, terminal.hits, "N/A", "100%", "0%", "-", "-", terminal.latency
            )?;
        }
        write!(
            f,
            "Accesses: {} ({} reads, {} writes)  AMAT: {:.2} cycles",
            self.accesses, self.reads, self.writes, self.amat
        )
    }
}
