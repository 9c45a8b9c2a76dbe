use procon::isolate::{IsolateStatus, LimitHit, MetaFile, SandboxReport};

use super::FIXTURES_PATH;

fn report_from_fixture(name: &str) -> SandboxReport {
    let path = format!("{FIXTURES_PATH}/meta/{name}");
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read meta fixture {path}: {e}"));
    SandboxReport::from(&MetaFile::parse(&content))
}

#[test]
fn test_meta_success() {
    let report = report_from_fixture("success.meta");
    assert_eq!(report.status, IsolateStatus::Ok);
    assert_eq!(report.exit_code, Some(0));
    assert!((report.wall_time - 0.021).abs() < 0.001);
    assert_eq!(report.memory_kb, 1536);
    assert_eq!(report.limit, LimitHit::Within);
    assert!(report.is_success());
}

#[test]
fn test_meta_wall_timeout() {
    let report = report_from_fixture("wall_timeout.meta");
    assert_eq!(report.status, IsolateStatus::TimedOut);
    assert_eq!(report.limit, LimitHit::WallTime);
    assert!(!report.is_success());
}

#[test]
fn test_meta_cpu_timeout() {
    let report = report_from_fixture("cpu_timeout.meta");
    assert_eq!(report.status, IsolateStatus::TimedOut);
    assert_eq!(report.limit, LimitHit::CpuTime);
    assert_eq!(
        report.failure_reason(),
        "Time limit exceeded (CPU time limit)"
    );
}

#[test]
fn test_meta_runtime_error() {
    let report = report_from_fixture("runtime_error.meta");
    assert_eq!(report.status, IsolateStatus::RuntimeError);
    assert_eq!(report.exit_code, Some(1));
    assert_eq!(report.failure_reason(), "Exited with error status 1");
}

#[test]
fn test_meta_memory_kill() {
    let mut report = report_from_fixture("memory_kill.meta");
    assert_eq!(report.status, IsolateStatus::Signaled);
    assert_eq!(report.signal, Some(9));
    assert_eq!(report.memory_kb, 524288);

    // isolate only reports the signal; the limit is inferred from usage
    assert_eq!(report.limit, LimitHit::Within);
    report.blame_memory(524288);
    assert_eq!(report.limit, LimitHit::Memory);
}
