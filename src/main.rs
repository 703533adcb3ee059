use std::{error::Error, fs, path::PathBuf};

use memsim::{
    compare_policies, AccessGenerator, AccessRequest, ComparisonTable, Pattern, Policy, SimConfig,
    Simulation, Trace,
};
use serde::Serialize;
use tracing::{info, warn, Level};

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = pico_args::Arguments::from_env();

    let log_level: String = args
        .opt_value_from_str("--log-level")?
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_max_level(parse_level(&log_level))
        .with_writer(std::io::stderr)
        .init();

    let mut config = if let Some(config_str) = args.opt_value_from_str::<_, String>("--config")? {
        SimConfig::from_json(&config_str)?
    } else if let Some(config_path) = args.opt_value_from_str::<_, PathBuf>("-p")? {
        SimConfig::from_json(&fs::read_to_string(config_path)?)?
    } else {
        SimConfig::default()
    };

    if let Some(policy) = args.opt_value_from_str::<_, Policy>("--policy")? {
        config.hierarchy.set_policy(policy);
    }
    if let Some(pattern) = args.opt_value_from_str::<_, Pattern>("--pattern")? {
        config.workload.pattern = pattern;
    }
    if let Some(count) = args.opt_value_from_str("-n")? {
        config.workload.count = count;
    }
    if let Some(seed) = args.opt_value_from_str::<_, u64>("--seed")? {
        config.workload.seed = seed;
        config.hierarchy.seed = seed;
    }
    if let Some(write_ratio) = args.opt_value_from_str("--write-ratio")? {
        config.workload.write_ratio = write_ratio;
    }
    let heartbeat_int: u64 = args.opt_value_from_str("-h")?.unwrap_or(0);
    let trace_path: Option<PathBuf> = args.opt_value_from_str("-t")?;
    let stats_path: Option<PathBuf> = args.opt_value_from_str("--json")?;
    let compare = args.contains("--compare");

    let remaining = args.finish();
    if !remaining.is_empty() {
        warn!(?remaining, "ignoring unrecognized arguments");
    }

    // Validate everything before simulating anything
    config.hierarchy.validate()?;
    config.workload.validate()?;
    let trace = trace_path.map(|path| Trace::load(&path)).transpose()?;

    if compare {
        let reports = match &trace {
            Some(trace) => compare_policies(&config.hierarchy, &Policy::ALL, || Ok(trace.iter()))?,
            None => compare_policies(&config.hierarchy, &Policy::ALL, || {
                AccessGenerator::new(config.workload.clone())
            })?,
        };
        print!("{}", ComparisonTable(&reports));
        write_json(stats_path, &reports)?;
        return Ok(());
    }

    let mut sim = Simulation::new(&config.hierarchy)?;
    let n_accesses = match trace {
        Some(trace) => run(&mut sim, trace, heartbeat_int)?,
        None => {
            let generator = AccessGenerator::new(config.workload)?;
            info!(
                pattern = ?generator.config().pattern,
                accesses = generator.total(),
                "generating workload"
            );
            run(&mut sim, generator, heartbeat_int)?
        }
    };
    info!("Ran {} accesses", n_accesses);

    let report = sim.stats.report();
    println!("{report}");
    write_json(stats_path, &report)?;
    Ok(())
}

fn run<I>(sim: &mut Simulation, source: I, heartbeat_int: u64) -> memsim::Result<u64>
where
    I: IntoIterator<Item = AccessRequest>,
{
    sim.run_with(source, |_, stats| {
        if heartbeat_int != 0 && stats.accesses() % heartbeat_int == 0 {
            info!(
                accesses = stats.accesses(),
                amat = stats.compute_amat(),
                "heartbeat"
            );
        }
    })
}

fn write_json<T: Serialize>(path: Option<PathBuf>, value: &T) -> Result<(), Box<dyn Error>> {
    if let Some(path) = path {
        let stats_file = fs::File::create(&path)?;
        serde_json::to_writer_pretty(stats_file, value)?;
        info!(path = %path.display(), "wrote statistics");
    }
    Ok(())
}

fn parse_level(level: &str) -> Level {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

