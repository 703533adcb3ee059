//! Multi-level memory hierarchy simulator.
//!
//! Accesses are driven through a chain of finite cache levels, each with its
//! own capacity, line size, latency and replacement policy, and end in an
//! always-hit terminal tier. A [`StatisticsCollector`] accumulates hits,
//! misses, evictions and write-backs per level and derives the average memory
//! access time (AMAT).

pub mod cache;
pub mod compare;
pub mod config;
pub mod error;
pub mod generator;
pub mod hierarchy;
pub mod replace;
pub mod stats;
pub mod trace;

pub use cache::{Cache, IsCache, MemoryBlock, Terminal};
pub use compare::{compare_policies, ComparisonTable, PolicyReport};
pub use config::{HierarchyConfig, LevelConfig, SimConfig, TerminalConfig};
pub use error::{Result, SimError};
pub use generator::{AccessGenerator, GeneratorConfig, Pattern, Rotation};
pub use hierarchy::{AccessRecord, AccessRequest, MemoryHierarchy, Op, Served, Simulation};
pub use replace::{AccessResult, Policy, Replace};
pub use stats::{Report, StatisticsCollector};
pub use trace::Trace;
