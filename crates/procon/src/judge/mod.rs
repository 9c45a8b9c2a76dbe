//! Verdict engine
//!
//! Runs a submission against every test case of a problem, in order, and turns
//! the per-case results into a single [`Verdict`]. The first failing case
//! decides the verdict and nothing after it is run.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument};

pub use crate::judge::problem::{Problem, ProblemError, TestCase};
pub use crate::judge::verdict::{SubmissionStatus, UnknownStatus, Verdict, partial_score};

use crate::config::{JudgeConfig, LanguageId};
use crate::limits::ResourceLimits;
use crate::sandbox::{ExecutionRequest, ExecutionResult, Executor, Outcome};

mod problem;
mod verdict;

/// Reasons a submission could not be judged at all. These are reported to the
/// caller and never stored as a submission status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JudgeError {
    #[error("problem {0} has no test cases")]
    NoTestCases(u64),

    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(LanguageId),
}

/// Judges submissions with an [`Executor`].
///
/// Shareable across tasks; concurrency is bounded by the executor.
#[derive(Debug)]
pub struct Judge<E> {
    executor: E,
    settings: JudgeConfig,
}

impl<E: Executor> Judge<E> {
    pub fn new(executor: E, settings: JudgeConfig) -> Self {
        Self { executor, settings }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn settings(&self) -> &JudgeConfig {
        &self.settings
    }

    /// Judge `source` against `problem`.
    ///
    /// Fails without touching the sandbox when the problem has no test cases
    /// or the language has no toolchain.
    #[instrument(skip(self, problem, source), fields(problem = problem.id))]
    pub async fn judge(
        &self,
        problem: &Problem,
        source: &str,
        language: LanguageId,
    ) -> Result<Verdict, JudgeError> {
        if problem.test_cases.is_empty() {
            return Err(JudgeError::NoTestCases(problem.id));
        }
        if !self.executor.supports(language) {
            return Err(JudgeError::UnsupportedLanguage(language));
        }

        let verdict = self.run_cases(problem, source, language).await;

        info!(
            status = %verdict.status,
            score = verdict.score,
            detail = %verdict.detail,
            "submission judged"
        );
        Ok(verdict)
    }

    async fn run_cases(&self, problem: &Problem, source: &str, language: LanguageId) -> Verdict {
        // Browsers submit CRLF line endings
        let source = source.replace("\r\n", "\n");
        let threshold = problem.scoring_threshold(self.settings.scoring_threshold());
        let limits = self.request_limits(problem, threshold);
        let mut slow = false;

        for (index, case) in problem.test_cases.iter().enumerate() {
            let number = index + 1;
            let request = ExecutionRequest {
                language,
                source: source.clone(),
                input: case.input.clone(),
                limits: limits.clone(),
            };

            let result = self.executor.execute(&request).await;
            debug!(
                case = number,
                outcome = ?result.outcome,
                elapsed = ?result.elapsed,
                "test case finished"
            );

            if let Some(verdict) = classify_failure(number, case, &result) {
                return verdict;
            }

            if result.elapsed > threshold {
                debug!(case = number, ?threshold, "passed above the scoring threshold");
                slow = true;
            }
        }

        if slow {
            Verdict::slow(problem.score)
        } else {
            Verdict::accepted(problem.score)
        }
    }

    /// Limits passed with every request: the hard ceiling, kept above the
    /// scoring threshold, and the problem's memory limit
    fn request_limits(&self, problem: &Problem, threshold: Duration) -> ResourceLimits {
        let limits = self.settings.hard_limits(threshold);
        match problem.memory_limit {
            Some(kb) => limits.memory_kb(kb),
            None => limits,
        }
    }
}

/// The verdict for a test case that did not pass, or `None` when it did
fn classify_failure(number: usize, case: &TestCase, result: &ExecutionResult) -> Option<Verdict> {
    if result.hit_hard_limit() {
        return Some(Verdict::rejected(
            SubmissionStatus::TimeLimitExceeded,
            format!(
                "test {number}: killed at the hard time limit after {}",
                format_elapsed(result.elapsed)
            ),
        ));
    }

    match result.outcome {
        Outcome::CompilationFailed => {
            return Some(Verdict::rejected(
                SubmissionStatus::CompilationError,
                result.diagnostic.clone(),
            ));
        }
        Outcome::ExecutionError => {
            return Some(Verdict::rejected(
                SubmissionStatus::RuntimeError,
                format!("test {number}: {}", result.diagnostic),
            ));
        }
        Outcome::Completed | Outcome::TimedOut => {}
    }

    if result.output.trim() != case.expected.trim() {
        return Some(Verdict::rejected(
            SubmissionStatus::WrongAnswer,
            format!("test {number}: output differs from expected"),
        ));
    }

    None
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}s", elapsed.as_secs_f64())
}
