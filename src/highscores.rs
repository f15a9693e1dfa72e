//! High score leaderboard
//!
//! Keeps the top 10 runs of this engine instance, ranked by round reached
//! (longer running time breaks ties). Nothing is persisted.

use serde::{Deserialize, Serialize};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Round the run ended on
    pub round: u32,
    /// Running time of the run
    pub elapsed_ms: f64,
    /// Host frame timestamp (ms) when the run ended
    pub timestamp: f64,
}

impl HighScoreEntry {
    fn beats(&self, round: u32, elapsed_ms: f64) -> bool {
        round > self.round || (round == self.round && elapsed_ms > self.elapsed_ms)
    }
}

/// High score leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a run qualifies for the leaderboard
    pub fn qualifies(&self, round: u32, elapsed_ms: f64) -> bool {
        if round == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries
            .last()
            .is_none_or(|e| e.beats(round, elapsed_ms))
    }

    /// Rank a run would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, round: u32, elapsed_ms: f64) -> Option<usize> {
        if !self.qualifies(round, elapsed_ms) {
            return None;
        }
        let rank = self.entries.iter().position(|e| e.beats(round, elapsed_ms));
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Record a finished run. Returns the rank achieved, if any.
    pub fn add_score(&mut self, round: u32, elapsed_ms: f64, timestamp: f64) -> Option<usize> {
        let rank = self.potential_rank(round, elapsed_ms)?;

        self.entries.insert(
            rank - 1,
            HighScoreEntry {
                round,
                elapsed_ms,
                timestamp,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);

        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best round reached so far
    pub fn best_round(&self) -> Option<u32> {
        self.entries.first().map(|e| e.round)
    }

    pub fn top_score(&self) -> Option<&HighScoreEntry> {
        self.entries.first()
    }
}
