//! Problems and their test cases
//!
//! Problems are loaded from TOML files:
//!
//! ```toml
//! id = 1
//! title = "Double it"
//! statement = "Read n and print 2n."
//! score = 100
//! time_limit = 2.0
//!
//! [[test_cases]]
//! input = "50\n"
//! expected = "100\n"
//! sample = true
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigBuilder, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProblemError {
    #[error("failed to parse problem: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid problem: {0}")]
    Invalid(String),
}

/// One input with its expected output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected: String,

    /// Shown on the problem page
    #[serde(default)]
    pub sample: bool,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
            sample: false,
        }
    }

    pub fn sample(mut self) -> Self {
        self.sample = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: u64,
    pub title: String,

    #[serde(default)]
    pub statement: String,

    /// Score awarded for an accepted submission
    #[serde(default = "default_score")]
    pub score: u32,

    /// Scoring time limit in seconds. Falls back to `judge.scoring_threshold`.
    #[serde(default)]
    pub time_limit: Option<f64>,

    /// Memory limit in kilobytes. Falls back to the configured default limits.
    #[serde(default)]
    pub memory_limit: Option<u64>,

    /// Judged in this order
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl Problem {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            statement: String::new(),
            score: default_score(),
            time_limit: None,
            memory_limit: None,
            test_cases: Vec::new(),
        }
    }

    pub fn with_score(mut self, score: u32) -> Self {
        self.score = score;
        self
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_memory_limit(mut self, kb: u64) -> Self {
        self.memory_limit = Some(kb);
        self
    }

    pub fn with_test_case(mut self, test_case: TestCase) -> Self {
        self.test_cases.push(test_case);
        self
    }

    /// Test cases marked as samples
    pub fn samples(&self) -> impl Iterator<Item = &TestCase> {
        self.test_cases.iter().filter(|tc| tc.sample)
    }

    /// Time above which a passing run only earns partial credit. A limit
    /// that is not a positive, representable duration falls back.
    pub fn scoring_threshold(&self, fallback: Duration) -> Duration {
        self.time_limit
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
            .filter(|threshold| !threshold.is_zero())
            .unwrap_or(fallback)
    }

    /// Load a problem from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProblemError> {
        let problem: Problem = ConfigBuilder::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        problem.validate()?;
        Ok(problem)
    }

    /// Parse a problem from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ProblemError> {
        let problem: Problem = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        problem.validate()?;
        Ok(problem)
    }

    fn validate(&self) -> Result<(), ProblemError> {
        if self.title.trim().is_empty() {
            return Err(ProblemError::Invalid(format!(
                "problem {} has an empty title",
                self.id
            )));
        }
        if let Some(limit) = self.time_limit
            && (!limit.is_finite() || limit <= 0.0)
        {
            return Err(ProblemError::Invalid(format!(
                "problem {} needs a positive, finite time limit, got {limit}",
                self.id
            )));
        }
        if self.memory_limit == Some(0) {
            return Err(ProblemError::Invalid(format!(
                "problem {} has a zero memory limit",
                self.id
            )));
        }
        Ok(())
    }
}

fn default_score() -> u32 {
    100
}
