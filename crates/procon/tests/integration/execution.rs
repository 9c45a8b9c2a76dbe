use std::sync::Arc;
use std::time::Duration;

use procon::config::{LanguageId, TIMEOUT_SENTINEL};
use procon::sandbox::{ExecutionRequest, Executor, Outcome, SandboxExecutor};
use procon::limits::ResourceLimits;
use tokio::task::JoinSet;

use super::{fixture_source, test_config};

#[tokio::test]
#[ignore = "requires root"]
async fn test_python_reads_input() {
    let executor = SandboxExecutor::new(test_config(30));
    let request = ExecutionRequest::new(LanguageId::Python, fixture_source("double.py"), "21\n");

    let result = executor.execute(&request).await;
    assert_eq!(result.outcome, Outcome::Completed, "{}", result.diagnostic);
    assert_eq!(result.output.trim(), "42");
    assert!(result.elapsed > Duration::ZERO);
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_cpp_compiles_and_runs() {
    let executor = SandboxExecutor::new(test_config(34));
    let request = ExecutionRequest::new(LanguageId::Cpp, fixture_source("double.cpp"), "123456789\n");

    let result = executor.execute(&request).await;
    assert_eq!(result.outcome, Outcome::Completed, "{}", result.diagnostic);
    assert_eq!(result.output.trim(), "246913578");
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_compile_error_is_reported() {
    let executor = SandboxExecutor::new(test_config(38));
    let request = ExecutionRequest::new(LanguageId::C, fixture_source("compile_error.c"), "1\n");

    let result = executor.execute(&request).await;
    assert_eq!(result.outcome, Outcome::CompilationFailed);
    assert!(result.output.is_empty());
    assert!(result.diagnostic.contains("error"));
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_hard_limit_appends_sentinel() {
    let executor = SandboxExecutor::new(test_config(42));
    let limits = ResourceLimits::default().time(1.0);
    let request = ExecutionRequest::new(LanguageId::C, fixture_source("infinite_loop.c"), "")
        .with_limits(limits);

    let result = executor.execute(&request).await;
    assert_eq!(result.outcome, Outcome::TimedOut);
    assert!(result.output.contains(TIMEOUT_SENTINEL));
    assert!(result.hit_hard_limit());
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_uncaught_exception_is_execution_error() {
    let executor = SandboxExecutor::new(test_config(46));
    let request = ExecutionRequest::new(LanguageId::Python, fixture_source("raise.py"), "5\n");

    let result = executor.execute(&request).await;
    assert_eq!(result.outcome, Outcome::ExecutionError);
    assert!(result.diagnostic.contains("ValueError"));
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_stderr_is_kept_out_of_output_by_default() {
    let executor = SandboxExecutor::new(test_config(50));
    let request = ExecutionRequest::new(LanguageId::Python, fixture_source("stderr_noise.py"), "4\n");

    let result = executor.execute(&request).await;
    assert_eq!(result.outcome, Outcome::Completed);
    assert_eq!(result.output.trim(), "8");
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_merge_stderr_interleaves_streams() {
    let mut config = test_config(54);
    config.judge.merge_stderr = true;
    let executor = SandboxExecutor::new(config);
    let request = ExecutionRequest::new(LanguageId::Python, fixture_source("stderr_noise.py"), "4\n");

    let result = executor.execute(&request).await;
    assert_eq!(result.outcome, Outcome::Completed);
    assert!(result.output.contains("debug: read input"));
    assert!(result.output.contains('8'));
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_concurrent_runs_share_the_pool() {
    let mut config = test_config(58);
    config.sandbox.pool_size = 2;
    let executor = Arc::new(SandboxExecutor::new(config));

    let mut tasks = JoinSet::new();
    for n in 0..6 {
        let executor = Arc::clone(&executor);
        tasks.spawn(async move {
            let request = ExecutionRequest::new(
                LanguageId::Python,
                fixture_source("double.py"),
                format!("{n}\n"),
            );
            (n, executor.execute(&request).await)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (n, result) = joined.unwrap();
        assert_eq!(result.outcome, Outcome::Completed, "{}", result.diagnostic);
        assert_eq!(result.output.trim(), (n * 2).to_string());
    }
    assert_eq!(executor.pool().available(), 2);
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_shutdown_rejects_new_runs() {
    let executor = SandboxExecutor::new(test_config(62));
    executor.shutdown();

    let request = ExecutionRequest::new(LanguageId::Python, fixture_source("double.py"), "1\n");
    let result = executor.execute(&request).await;
    assert_eq!(result.outcome, Outcome::ExecutionError);
}
