//! Best score
//!
//! A single integer persisted under a fixed key.

use crate::persistence::KeyValueStore;

/// Storage key for the best score
pub const BEST_SCORE_KEY: &str = "spec-runner:highScore";

/// Outcome of submitting a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreResult {
    pub score: u64,
    /// Best after this run
    pub best: u64,
    pub is_new_best: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BestScore {
    pub value: u64,
}

impl BestScore {
    /// Load from storage. Missing or unparseable values count as 0.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let value = match store.get(BEST_SCORE_KEY) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("Ignoring corrupt best score: {:?}", raw);
                0
            }),
            None => 0,
        };
        Self { value }
    }

    /// Record a finished run, persisting it if it beats the best
    pub fn submit(&mut self, store: &dyn KeyValueStore, score: u64) -> ScoreResult {
        let is_new_best = score > self.value;
        if is_new_best {
            self.value = score;
            store.set(BEST_SCORE_KEY, &score.to_string());
            log::info!("New best score: {}", score);
        }
        ScoreResult {
            score,
            best: self.value,
            is_new_best,
        }
    }
}
