//! Submission statuses and verdicts

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of a submission.
///
/// `WaitingForJudge` is the only non-terminal state; judging moves a submission
/// straight to one of the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[default]
    #[serde(rename = "WJ")]
    WaitingForJudge,
    #[serde(rename = "AC")]
    Accepted,
    #[serde(rename = "WA")]
    WrongAnswer,
    #[serde(rename = "TLE")]
    TimeLimitExceeded,
    #[serde(rename = "RE")]
    RuntimeError,
    #[serde(rename = "CE")]
    CompilationError,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 6] = [
        SubmissionStatus::WaitingForJudge,
        SubmissionStatus::Accepted,
        SubmissionStatus::WrongAnswer,
        SubmissionStatus::TimeLimitExceeded,
        SubmissionStatus::RuntimeError,
        SubmissionStatus::CompilationError,
    ];

    /// Short code as stored with submissions
    pub fn code(&self) -> &'static str {
        match self {
            SubmissionStatus::WaitingForJudge => "WJ",
            SubmissionStatus::Accepted => "AC",
            SubmissionStatus::WrongAnswer => "WA",
            SubmissionStatus::TimeLimitExceeded => "TLE",
            SubmissionStatus::RuntimeError => "RE",
            SubmissionStatus::CompilationError => "CE",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SubmissionStatus::WaitingForJudge => "Waiting for Judge",
            SubmissionStatus::Accepted => "Accepted",
            SubmissionStatus::WrongAnswer => "Wrong Answer",
            SubmissionStatus::TimeLimitExceeded => "Time Limit Exceeded",
            SubmissionStatus::RuntimeError => "Runtime Error",
            SubmissionStatus::CompilationError => "Compilation Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::WaitingForJudge)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error for an unrecognized status code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown submission status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for SubmissionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionStatus::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Outcome of judging one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: SubmissionStatus,
    pub score: u32,

    /// Why the verdict was reached (failing test, compiler output, crash
    /// reason). Logged, never shown to the submitter.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl Verdict {
    pub fn accepted(score: u32) -> Self {
        Self {
            status: SubmissionStatus::Accepted,
            score,
            detail: String::new(),
        }
    }

    /// Correct on every test but over the scoring threshold somewhere
    pub fn slow(max_score: u32) -> Self {
        Self {
            status: SubmissionStatus::TimeLimitExceeded,
            score: partial_score(max_score),
            detail: "all tests passed above the scoring threshold".to_string(),
        }
    }

    /// A terminal failure worth nothing
    pub fn rejected(status: SubmissionStatus, detail: impl Into<String>) -> Self {
        debug_assert!(status != SubmissionStatus::Accepted && status.is_terminal());
        Self {
            status,
            score: 0,
            detail: detail.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == SubmissionStatus::Accepted
    }

    /// Line shown to the submitter
    pub fn message(&self) -> String {
        format!(
            "Judging complete: {} ({}), score {}",
            self.status,
            self.status.description(),
            self.score
        )
    }
}

/// Credit for a correct but slow submission: half the score, rounded down
pub fn partial_score(max_score: u32) -> u32 {
    max_score / 2
}
