//! Where verdicts end up
//!
//! Signed-in users get [`Submission`]s stored through a [`SubmissionRecorder`];
//! anonymous sessions accumulate points in a [`GuestLedger`].

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::record::guest::GuestLedger;
pub use crate::record::memory::MemoryRecorder;

use crate::config::LanguageId;
use crate::judge::{SubmissionStatus, Verdict};

mod guest;
mod memory;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid submission: {0}")]
    Invalid(String),

    #[error("submission store unavailable: {0}")]
    Unavailable(String),
}

/// Identifier assigned to a stored submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One judged (or waiting) submission by a signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub problem_id: u64,
    pub user_id: String,
    pub code: String,
    pub language: LanguageId,
    pub status: SubmissionStatus,
    pub score: u32,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    /// A new submission waiting for the judge
    pub fn new(
        problem_id: u64,
        user_id: impl Into<String>,
        code: impl Into<String>,
        language: LanguageId,
    ) -> Self {
        Self {
            problem_id,
            user_id: user_id.into(),
            code: code.into(),
            language,
            status: SubmissionStatus::WaitingForJudge,
            score: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_verdict(mut self, verdict: &Verdict) -> Self {
        self.status = verdict.status;
        self.score = verdict.score;
        self
    }

    pub fn is_accepted(&self) -> bool {
        self.status == SubmissionStatus::Accepted
    }
}

/// Storage for submissions of signed-in users
#[async_trait]
pub trait SubmissionRecorder: Send + Sync {
    async fn record(&self, submission: Submission) -> Result<SubmissionId, RecordError>;

    /// Submissions by `user`, oldest first
    async fn submissions_for(&self, user: &str) -> Result<Vec<Submission>, RecordError>;

    /// Ids of the problems `user` has an accepted submission for, ascending
    async fn solved_problems(&self, user: &str) -> Result<Vec<u64>, RecordError>;

    /// Sum over problems of the best score `user` reached on each
    async fn user_score(&self, user: &str) -> Result<u64, RecordError>;
}
