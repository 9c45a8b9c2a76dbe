//! Run step
//!
//! Runs the built program with `input.txt` on stdin, timed from the host.

use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use crate::config::{Config, Language};
use crate::isolate::{
    Invocation, IsolateBox, IsolateError, Mount, SandboxReport, StepFiles, resolve_program,
    run_step,
};
use crate::limits::ResourceLimits;

/// Configured submission ceilings, then the language's run limits, then the
/// request's own
pub(crate) fn run_limits(
    config: &Config,
    language: &Language,
    overrides: &ResourceLimits,
) -> ResourceLimits {
    config
        .limits
        .overlay(&language.run.limits)
        .overlay(overrides)
}

/// Run the program and return isolate's report with the host-measured
/// wall-clock time of the run
#[instrument(skip_all, fields(box_id = sandbox.id(), language = %language.name))]
pub(crate) async fn execute(
    sandbox: &IsolateBox,
    config: &Config,
    language: &Language,
    overrides: &ResourceLimits,
) -> Result<(SandboxReport, Duration), IsolateError> {
    let artifact = language.artifact();
    if !sandbox.contains(&artifact).await? {
        return Err(IsolateError::MissingArtifact(artifact));
    }
    language.run.mounts.iter().try_for_each(Mount::verify)?;

    let mut argv = language.run_argv();
    resolve_program(&mut argv)?;

    let limits = run_limits(config, language, overrides);
    let memory_ceiling = limits.memory_kb;
    let invocation = Invocation::new(argv)
        .limits(limits)
        .mounts(&config.sandbox.mounts)
        .mounts(&language.run.mounts)
        .var("PATH", &language.run.path)
        .env(&language.run.env)
        .chdir(sandbox.working_dir())
        .merge_stderr(config.judge.merge_stderr);

    let started = Instant::now();
    let mut report = run_step(sandbox, &invocation, StepFiles::RUN).await?;
    let elapsed = started.elapsed();

    if let Some(ceiling) = memory_ceiling {
        report.blame_memory(ceiling);
    }

    debug!(
        status = ?report.status,
        ?elapsed,
        memory_kb = report.memory_kb,
        exit_code = ?report.exit_code,
        "run step finished"
    );
    Ok((report, elapsed))
}
