use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::{
    config::HierarchyConfig,
    error::{Result, SimError},
    hierarchy::{AccessRequest, Simulation},
    replace::Policy,
    stats::Report,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyReport {
    pub policy: Policy,
    pub report: Report,
}

/// Runs the same workload once per policy, each on its own thread with its
/// own hierarchy and statistics. `source` is called once per run and must
/// yield the same stream every time.
///
/// Reports come back in the order of `policies`.
pub fn compare_policies<F, I>(
    hierarchy: &HierarchyConfig,
    policies: &[Policy],
    source: F,
) -> Result<Vec<PolicyReport>>
where
    F: Fn() -> Result<I> + Sync,
    I: IntoIterator<Item = AccessRequest>,
{
    // Fail before spawning anything
    hierarchy.validate()?;

    let (sender, receiver) = crossbeam::channel::unbounded();
    crossbeam::scope(|s| {
        for (idx, &policy) in policies.iter().enumerate() {
            let sender = sender.clone();
            let source = &source;
            s.spawn(move |_| {
                let result = run_policy(hierarchy, policy, source);
                // The receiver outlives the scope
                let _ = sender.send((idx, policy, result));
            });
        }
    })
    .map_err(|_| SimError::InvariantViolation("a comparison run panicked".into()))?;
    drop(sender);

    let mut results: Vec<(usize, Policy, Result<Report>)> = receiver.iter().collect();
    results.sort_by_key(|(idx, _, _)| *idx);
    results
        .into_iter()
        .map(|(_, policy, report)| report.map(|report| PolicyReport { policy, report }))
        .collect()
}

fn run_policy<F, I>(hierarchy: &HierarchyConfig, policy: Policy, source: &F) -> Result<Report>
where
    F: Fn() -> Result<I>,
    I: IntoIterator<Item = AccessRequest>,
{
    let mut config = hierarchy.clone();
    config.set_policy(policy);
    let mut sim = Simulation::new(&config)?;
    sim.run(source()?)?;
    debug!(%policy, amat = sim.stats.compute_amat(), "comparison run done");
    Ok(sim.stats.report())
}

/// One row per policy: AMAT and the hit rate of every level.
pub struct ComparisonTable<'a>(pub &'a [PolicyReport]);

impl fmt::Display for ComparisonTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.0.first() else {
            return Ok(());
        };
        write!(f, "{:<8} {:>14}", "Policy", "AMAT")?;
        for level in &first.report.levels {
            write!(f, " {:>20}", level.name)?;
        }
        writeln!(f)?;
        for row in self.0 {
            write!(f, "{:<8} {:>14.2}", row.policy, row.report.amat)?;
            for level in &row.report.levels {
                write!(f, " {:>19.2}%", level.hit_rate * 100.0)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
