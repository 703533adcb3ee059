use serde::{Deserialize, Serialize};

use crate::{
    cache::{Cache, IsCache, Terminal},
    error::{Result, SimError},
    generator::GeneratorConfig,
    replace::{fifo::Fifo, lfu::Lfu, lru::Lru, mru::Mru, random::Random, Policy, Replace},
};

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

fn default_line_size() -> u64 {
    64
}

fn default_policy() -> String {
    Policy::Lru.name().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    /// Maximum resident blocks.
    pub capacity: usize,
    #[serde(default = "default_line_size")]
    pub line_size: u64,
    pub latency: u64,
    #[serde(default = "default_policy")]
    pub policy: String,
}

impl LevelConfig {
    pub fn new(name: impl Into<String>, capacity: usize, latency: u64, policy: Policy) -> Self {
        LevelConfig {
            name: name.into(),
            capacity,
            line_size: default_line_size(),
            latency,
            policy: policy.name().to_string(),
        }
    }

    /// Capacity derived from a total size in bytes.
    pub fn sized(name: impl Into<String>, size_bytes: usize, line_size: u64, latency: u64) -> Self {
        LevelConfig {
            name: name.into(),
            capacity: size_bytes / line_size.max(1) as usize,
            line_size,
            latency,
            policy: default_policy(),
        }
    }

    pub fn with_line_size(mut self, line_size: u64) -> Self {
        self.line_size = line_size;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    pub name: String,
    pub latency: u64,
}

impl TerminalConfig {
    pub fn new(name: impl Into<String>, latency: u64) -> Self {
        TerminalConfig {
            name: name.into(),
            latency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    pub levels: Vec<LevelConfig>,
    pub terminal: TerminalConfig,
    /// Base seed for the Random policy; level `i` uses `seed + i`.
    #[serde(default)]
    pub seed: u64,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        let line = default_line_size();
        HierarchyConfig {
            levels: vec![
                LevelConfig::sized("L1 Cache", 32 * KIB, line, 1),
                LevelConfig::sized("L2 Cache", 256 * KIB, line, 5),
                LevelConfig::sized("L3 Cache", 2 * MIB, line, 15),
                LevelConfig::sized("Main Memory (RAM)", GIB, line, 100),
            ],
            terminal: TerminalConfig::new("Secondary Memory (Disk)", 10_000_000),
            seed: 0,
        }
    }
}

impl HierarchyConfig {
    pub fn new(levels: Vec<LevelConfig>, terminal: TerminalConfig) -> Self {
        HierarchyConfig {
            levels,
            terminal,
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Applies one policy to every level.
    pub fn set_policy(&mut self, policy: Policy) {
        for level in &mut self.levels {
            level.policy = policy.name().to_string();
        }
    }

    /// Checks every level and returns the parsed policies in level order.
    pub fn validate(&self) -> Result<Vec<Policy>> {
        if self.levels.is_empty() {
            return Err(SimError::config("hierarchy needs at least one cache level"));
        }

        let mut policies = Vec::with_capacity(self.levels.len());
        let mut prev: Option<(&str, u64)> = None;
        for level in &self.levels {
            if level.capacity == 0 {
                return Err(SimError::config(format!("{}: capacity must be positive", level.name)));
            }
            if level.line_size == 0 {
                return Err(SimError::config(format!("{}: line size must be positive", level.name)));
            }
            if level.latency == 0 {
                return Err(SimError::config(format!("{}: latency must be positive", level.name)));
            }
            check_latency_order(prev, &level.name, level.latency)?;
            policies.push(level.policy.parse::<Policy>()?);
            prev = Some((&level.name, level.latency));
        }

        if self.terminal.latency == 0 {
            return Err(SimError::config(format!(
                "{}: latency must be positive",
                self.terminal.name
            )));
        }
        check_latency_order(prev, &self.terminal.name, self.terminal.latency)?;
        Ok(policies)
    }

    /// Validates, then builds the tier chain ending in the terminal tier.
    pub fn to_tiers(&self) -> Result<Vec<Box<dyn IsCache>>> {
        let policies = self.validate()?;
        let mut tiers = self
            .levels
            .iter()
            .zip(policies)
            .enumerate()
            .map(|(idx, (lc, policy))| match policy {
                Policy::Lru => build_level(lc, Lru::new()),
                Policy::Mru => build_level(lc, Mru::new()),
                Policy::Lfu => build_level(lc, Lfu::new()),
                Policy::Fifo => build_level(lc, Fifo::new()),
                Policy::Random => build_level(lc, Random::new(self.seed.wrapping_add(idx as u64))),
            })
            .collect::<Vec<_>>();
        tiers.push(Box::new(Terminal::new(
            self.terminal.name.clone(),
            self.terminal.latency,
        )));
        Ok(tiers)
    }
}

fn build_level<R>(lc: &LevelConfig, repl: R) -> Box<dyn IsCache>
where
    R: Replace + 'static,
    R::Meta: 'static,
{
    Box::new(Cache::new(
        lc.name.clone(),
        lc.capacity,
        lc.line_size,
        lc.latency,
        repl,
    ))
}

fn check_latency_order(prev: Option<(&str, u64)>, name: &str, latency: u64) -> Result<()> {
    match prev {
        Some((prev_name, prev_latency)) if latency < prev_latency => Err(SimError::config(format!(
            "{name}: latency {latency} is lower than {prev_name} ({prev_latency})"
        ))),
        _ => Ok(()),
    }
}

/// Everything a run needs: the hierarchy and the workload driven through it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
    #[serde(default)]
    pub workload: GeneratorConfig,
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.hierarchy.validate()?;
        config.workload.validate()?;
        Ok(config)
    }
}
