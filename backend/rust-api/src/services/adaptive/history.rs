use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Attempt, DifficultyTier};

/// Append-only, chronologically ordered attempt log owned by one session.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AttemptHistory {
    attempts: Vec<Attempt>,
}

impl AttemptHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    /// The last `min(n, len)` attempts in insertion order. Never padded.
    pub fn last_n(&self, n: usize) -> &[Attempt] {
        let start = self.attempts.len().saturating_sub(n);
        &self.attempts[start..]
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// Ordinal the next appended attempt should carry.
    pub fn next_ordinal(&self) -> u64 {
        self.attempts.len() as u64 + 1
    }

    /// Share of correct attempts over the whole session, 0.0 when empty.
    pub fn accuracy(&self) -> f64 {
        if self.attempts.is_empty() {
            return 0.0;
        }
        let correct = self.attempts.iter().filter(|a| a.correct).count();
        correct as f64 / self.attempts.len() as f64
    }

    /// Mean response time over the whole session, 0.0 when empty.
    pub fn average_response_time(&self) -> f64 {
        if self.attempts.is_empty() {
            return 0.0;
        }
        let total: f64 = self.attempts.iter().map(|a| a.response_time).sum();
        total / self.attempts.len() as f64
    }

    /// How many attempts were made at each tier. Every tier is present.
    pub fn tier_counts(&self) -> BTreeMap<DifficultyTier, usize> {
        let mut counts: BTreeMap<DifficultyTier, usize> =
            DifficultyTier::ALL.iter().map(|tier| (*tier, 0)).collect();
        for attempt in &self.attempts {
            *counts.entry(attempt.level).or_insert(0) += 1;
        }
        counts
    }
}
