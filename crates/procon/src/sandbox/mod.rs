//! Sandbox executor
//!
//! Runs one program against one input in a freshly provisioned isolate box and
//! reports what happened. Every failure of the backend is folded into the
//! returned [`ExecutionResult`]; nothing escapes as an error.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, INPUT_FILE, Language, LanguageId, TIMEOUT_SENTINEL};
use crate::isolate::{BoxPool, IsolateBox, IsolateError, IsolateStatus, SandboxReport};
use crate::limits::ResourceLimits;

mod compile;
mod execute;

/// One program run against one input
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub language: LanguageId,
    pub source: String,
    pub input: String,
    /// Overrides on top of the configured defaults, typically the hard
    /// wall-clock ceiling and the problem's memory limit
    pub limits: ResourceLimits,
}

impl ExecutionRequest {
    pub fn new(language: LanguageId, source: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            language,
            source: source.into(),
            input: input.into(),
            limits: ResourceLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The program exited with status 0
    Completed,
    /// The hard execution ceiling killed the program
    TimedOut,
    /// The program crashed, or the sandbox could not run it
    ExecutionError,
    /// The compile step exited unsuccessfully
    CompilationFailed,
}

/// Captured result of a single run
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Program stdout (with stderr interleaved when merging is enabled)
    pub output: String,
    /// Stderr, compiler output or backend error text; never shown to submitters
    pub diagnostic: String,
    /// Wall-clock time of the run step, measured from the host
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl ExecutionResult {
    pub fn completed(output: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            output: output.into(),
            diagnostic: String::new(),
            elapsed,
            outcome: Outcome::Completed,
        }
    }

    /// A run killed by the hard ceiling; the sentinel goes at the end of the output
    pub fn timed_out(output: impl Into<String>, elapsed: Duration) -> Self {
        let mut output = output.into();
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(TIMEOUT_SENTINEL);
        output.push('\n');
        Self {
            output,
            diagnostic: String::new(),
            elapsed,
            outcome: Outcome::TimedOut,
        }
    }

    pub fn execution_error(diagnostic: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            diagnostic: diagnostic.into(),
            elapsed: Duration::ZERO,
            outcome: Outcome::ExecutionError,
        }
    }

    pub fn compilation_failed(diagnostic: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            diagnostic: diagnostic.into(),
            elapsed: Duration::ZERO,
            outcome: Outcome::CompilationFailed,
        }
    }

    /// True when the hard ceiling fired, judged by the sentinel in the output
    pub fn hit_hard_limit(&self) -> bool {
        self.outcome == Outcome::TimedOut || self.output.contains(TIMEOUT_SENTINEL)
    }
}

/// Something that can run submissions in isolation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Executor: Send + Sync {
    /// Whether a toolchain is configured for `language`
    fn supports(&self, language: LanguageId) -> bool;

    /// Build and run the request. Never fails: backend problems come back as
    /// [`Outcome::ExecutionError`].
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult;
}

/// Isolate-backed executor, created once per process and shared.
///
/// Every request gets a fresh box and is compiled there again, so no state
/// carries over between test cases.
#[derive(Debug)]
pub struct SandboxExecutor {
    config: Config,
    pool: BoxPool,
}

impl SandboxExecutor {
    pub fn new(config: Config) -> Self {
        let pool = config.sandbox.pool();
        Self { config, pool }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &BoxPool {
        &self.pool
    }

    /// Refuse new runs. Runs in flight finish and clean up their boxes.
    pub fn shutdown(&self) {
        self.pool.close();
        info!("sandbox executor shut down");
    }

    async fn run_in_box(
        &self,
        sandbox: &IsolateBox,
        language: &Language,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, IsolateError> {
        sandbox
            .write(&language.source_file(), request.source.as_bytes())
            .await?;
        sandbox.write(INPUT_FILE, request.input.as_bytes()).await?;

        if language.is_compiled() {
            let compiled = compile::compile(sandbox, &self.config, language).await?;
            if !compiled.is_success() {
                return Ok(ExecutionResult::compilation_failed(compiled.log));
            }
        }

        let (report, elapsed) =
            execute::execute(sandbox, &self.config, language, &request.limits).await?;
        Ok(classify(report, elapsed))
    }
}

#[async_trait]
impl Executor for SandboxExecutor {
    fn supports(&self, language: LanguageId) -> bool {
        self.config.languages.contains_key(&language)
    }

    #[instrument(skip_all, fields(language = %request.language))]
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let language = match self.config.language(request.language) {
            Ok(language) => language,
            Err(e) => return ExecutionResult::execution_error(e.to_string()),
        };

        let mut sandbox = match self.pool.acquire().await {
            Ok(sandbox) => sandbox,
            Err(e) => {
                warn!(error = %e, "failed to provision sandbox");
                return ExecutionResult::execution_error(e.to_string());
            }
        };

        let result = self.run_in_box(&sandbox, language, request).await;

        if let Err(e) = sandbox.cleanup().await {
            warn!(box_id = sandbox.id(), error = %e, "sandbox cleanup failed");
        }

        match result {
            Ok(result) => {
                debug!(outcome = ?result.outcome, elapsed = ?result.elapsed, "run finished");
                result
            }
            Err(e) => {
                warn!(error = %e, "sandbox run failed");
                ExecutionResult::execution_error(e.to_string())
            }
        }
    }
}

/// Map an isolate report of the run step onto an outcome
fn classify(report: SandboxReport, elapsed: Duration) -> ExecutionResult {
    let output = report.stdout_text();

    if report.is_success() {
        return ExecutionResult::completed(output, elapsed);
    }

    if report.status == IsolateStatus::TimedOut {
        return ExecutionResult::timed_out(output, elapsed);
    }

    let mut diagnostic = report.failure_reason();
    if !report.stderr.is_empty() {
        diagnostic.push('\n');
        diagnostic.push_str(&report.stderr_text());
    }

    ExecutionResult {
        output,
        diagnostic,
        elapsed,
        outcome: Outcome::ExecutionError,
    }
}
