use std::{fs, io::Write};

use memsim::{
    AccessRequest, HierarchyConfig, LevelConfig, Policy, SimError, Simulation, TerminalConfig,
    Trace,
};
use xz2::write::XzEncoder;

const TRACE: &str = "# A B C A\nr 0x1000\nr 0x2000\nw 0x3000\nr 0x1000\n";

fn scenario() -> HierarchyConfig {
    HierarchyConfig::new(
        vec![
            LevelConfig::new("L1", 2, 1, Policy::Lru),
            LevelConfig::new("L2", 4, 10, Policy::Lru),
        ],
        TerminalConfig::new("Memory", 100),
    )
}

#[test]
fn loads_plain_trace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("abca.trace");
    fs::write(&path, TRACE).unwrap();

    let trace = Trace::load(&path).unwrap();
    assert_eq!(trace.len(), 4);
    assert_eq!(trace.requests[2], AccessRequest::write(0x3000));

    let mut sim = Simulation::new(&scenario()).unwrap();
    sim.run(trace).unwrap();
    assert_eq!(sim.stats.compute_amat(), 86.0);
    assert_eq!(sim.stats.report().writes, 1);
}

#[test]
fn loads_xz_trace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("abca.trace.xz");
    let mut encoder = XzEncoder::new(fs::File::create(&path).unwrap(), 6);
    encoder.write_all(TRACE.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let plain = Trace::read(TRACE.as_bytes()).unwrap();
    assert_eq!(Trace::load(&path).unwrap(), plain);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Trace::load(&dir.path().join("nope.trace")).unwrap_err();
    assert!(matches!(err, SimError::Io(_)));
}

#[test]
fn malformed_line_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.trace");
    fs::write(&path, "r 0x10\nr 0xg0\n").unwrap();
    match Trace::load(&path) {
        Err(SimError::Trace { line, .. }) => assert_eq!(line, 2),
        other => panic!("unexpected {other:?}"),
    }
}
