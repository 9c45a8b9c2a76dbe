//! Compile step
//!
//! Runs the language's compiler on `sol.<ext>` as its own isolate run, under
//! the compiler ceilings rather than the submission ones.

use tracing::{debug, instrument};

use crate::config::{Config, DEFAULT_SANDBOX_PATH, Language};
use crate::isolate::{
    Invocation, IsolateBox, IsolateError, SandboxReport, StepFiles, resolve_program, run_step,
};
use crate::limits::ResourceLimits;

#[derive(Debug, Clone)]
pub(crate) struct CompileOutcome {
    pub report: SandboxReport,

    /// What the compiler printed, or isolate's message when it printed nothing
    pub log: String,
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }
}

/// Compile the source already written to the box. Interpreted languages
/// succeed without running anything.
#[instrument(skip_all, fields(box_id = sandbox.id(), language = %language.name))]
pub(crate) async fn compile(
    sandbox: &IsolateBox,
    config: &Config,
    language: &Language,
) -> Result<CompileOutcome, IsolateError> {
    let (Some(step), Some(mut argv)) = (language.compile.as_ref(), language.compile_argv()) else {
        return Ok(CompileOutcome {
            report: SandboxReport::skipped(),
            log: String::new(),
        });
    };
    resolve_program(&mut argv)?;

    let invocation = Invocation::new(argv)
        .limits(ResourceLimits::compiler().overlay(&step.limits))
        .mounts(&config.sandbox.mounts)
        .var("PATH", DEFAULT_SANDBOX_PATH)
        .env(&step.env)
        .chdir(sandbox.working_dir());

    let report = run_step(sandbox, &invocation, StepFiles::COMPILE).await?;
    let log = compiler_log(&report);
    debug!(
        success = report.is_success(),
        status = ?report.status,
        exit_code = ?report.exit_code,
        "compile step finished"
    );

    Ok(CompileOutcome { report, log })
}

fn compiler_log(report: &SandboxReport) -> String {
    let log = format!("{}{}", report.stdout_text(), report.stderr_text());
    match report.message {
        Some(ref message) if log.trim().is_empty() => message.clone(),
        _ => log,
    }
}
