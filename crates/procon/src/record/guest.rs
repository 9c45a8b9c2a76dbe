//! Scores for anonymous sessions

use std::collections::BTreeMap;

use dashmap::DashMap;
use tracing::debug;

use crate::judge::Verdict;

#[derive(Debug, Default, Clone)]
struct GuestProgress {
    /// Best score per problem id
    best: BTreeMap<u64, u32>,
    /// Problems with an accepted verdict
    solved: Vec<u64>,
}

/// Per-session score keeping for visitors who are not signed in.
///
/// Each problem contributes only its best score, however many times it is
/// solved.
#[derive(Debug, Default)]
pub struct GuestLedger {
    sessions: DashMap<String, GuestProgress>,
}

impl GuestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a verdict to a session and return the points it added
    pub fn apply(&self, session: &str, problem_id: u64, verdict: &Verdict) -> u32 {
        let mut progress = self.sessions.entry(session.to_string()).or_default();

        if verdict.is_accepted() && !progress.solved.contains(&problem_id) {
            progress.solved.push(problem_id);
        }

        let best = progress.best.entry(problem_id).or_default();
        let gained = verdict.score.saturating_sub(*best);
        *best = (*best).max(verdict.score);

        if gained > 0 {
            debug!(session, problem = problem_id, gained, "guest score increased");
        }
        gained
    }

    /// Total score of a session; unknown sessions have zero
    pub fn score(&self, session: &str) -> u64 {
        self.sessions
            .get(session)
            .map(|p| p.best.values().map(|&s| u64::from(s)).sum())
            .unwrap_or(0)
    }

    /// Problems solved in a session, in the order they were first solved
    pub fn solved(&self, session: &str) -> Vec<u64> {
        self.sessions
            .get(session)
            .map(|p| p.solved.clone())
            .unwrap_or_default()
    }

    /// Drop everything kept for an expired session
    pub fn forget(&self, session: &str) {
        self.sessions.remove(session);
    }
}
