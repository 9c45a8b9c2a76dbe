//! In-process submission store

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::record::{RecordError, Submission, SubmissionId, SubmissionRecorder};

/// Keeps submissions in memory, grouped by user
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    by_user: DashMap<String, Vec<(SubmissionId, Submission)>>,
    next_id: AtomicU64,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored submissions
    pub fn len(&self) -> usize {
        self.by_user.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SubmissionRecorder for MemoryRecorder {
    async fn record(&self, submission: Submission) -> Result<SubmissionId, RecordError> {
        if submission.user_id.is_empty() {
            return Err(RecordError::Invalid("empty user id".into()));
        }

        let id = SubmissionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        debug!(
            %id,
            user = %submission.user_id,
            problem = submission.problem_id,
            status = %submission.status,
            "recording submission"
        );
        self.by_user
            .entry(submission.user_id.clone())
            .or_default()
            .push((id, submission));
        Ok(id)
    }

    async fn submissions_for(&self, user: &str) -> Result<Vec<Submission>, RecordError> {
        Ok(self
            .by_user
            .get(user)
            .map(|entries| entries.iter().map(|(_, s)| s.clone()).collect())
            .unwrap_or_default())
    }

    async fn solved_problems(&self, user: &str) -> Result<Vec<u64>, RecordError> {
        let solved: BTreeSet<u64> = self
            .by_user
            .get(user)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, s)| s.is_accepted())
                    .map(|(_, s)| s.problem_id)
                    .collect()
            })
            .unwrap_or_default();
        Ok(solved.into_iter().collect())
    }

    async fn user_score(&self, user: &str) -> Result<u64, RecordError> {
        let Some(entries) = self.by_user.get(user) else {
            return Ok(0);
        };

        let mut best: BTreeMap<u64, u32> = BTreeMap::new();
        for (_, submission) in entries.iter() {
            let slot = best.entry(submission.problem_id).or_default();
            *slot = (*slot).max(submission.score);
        }
        Ok(best.values().map(|&score| u64::from(score)).sum())
    }
}
