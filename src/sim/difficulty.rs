//! Round-based difficulty curve
//!
//! A step function of the round number: each tier applies from its
//! `first_round` until the next tier begins.

use serde::{Deserialize, Serialize};

use crate::consts::CELL_COUNT;
use crate::error::ConfigError;

/// One step of the difficulty curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTier {
    /// First round (1-based) this tier applies to
    pub first_round: u32,
    /// Hazards per batch
    pub hazard_count: usize,
    /// Warning phase duration before hazards turn active
    pub warning_ms: f64,
}

impl DifficultyTier {
    pub const fn new(first_round: u32, hazard_count: usize, warning_ms: f64) -> Self {
        Self {
            first_round,
            hazard_count,
            warning_ms,
        }
    }
}

/// Default curve: 2 hazards with a 5s warning, tightening to 5 hazards at 2s
pub fn default_tiers() -> Vec<DifficultyTier> {
    vec![
        DifficultyTier::new(1, 2, 5000.0),
        DifficultyTier::new(4, 3, 4000.0),
        DifficultyTier::new(7, 3, 3000.0),
        DifficultyTier::new(10, 4, 2500.0),
        DifficultyTier::new(15, 4, 2000.0),
        DifficultyTier::new(20, 5, 2000.0),
    ]
}

/// Validated, ordered difficulty table
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyTable {
    tiers: Vec<DifficultyTier>,
    max_hazards: usize,
}

impl DifficultyTable {
    /// Build a table, rejecting curves that would run nonsensically
    pub fn new(tiers: Vec<DifficultyTier>, max_hazards: usize) -> Result<Self, ConfigError> {
        validate_tiers(&tiers)?;
        if max_hazards == 0 || max_hazards > CELL_COUNT {
            return Err(ConfigError::MaxHazards(max_hazards));
        }
        Ok(Self { tiers, max_hazards })
    }

    /// Tier in effect for `round`
    pub fn tier_for(&self, round: u32) -> DifficultyTier {
        let round = round.max(1);
        let tier = self
            .tiers
            .iter()
            .rev()
            .find(|t| t.first_round <= round)
            .copied()
            .unwrap_or(self.tiers[0]);
        DifficultyTier {
            hazard_count: tier.hazard_count.min(self.max_hazards),
            ..tier
        }
    }
}

/// Check a tier list: starts at round 1, strictly ordered, sane counts and
/// durations, never easier in a later tier
pub fn validate_tiers(tiers: &[DifficultyTier]) -> Result<(), ConfigError> {
    let first = tiers.first().ok_or(ConfigError::EmptyDifficulty)?;
    if first.first_round != 1 {
        return Err(ConfigError::FirstTierNotRoundOne(first.first_round));
    }

    for tier in tiers {
        if tier.hazard_count == 0 {
            return Err(ConfigError::ZeroHazards {
                round: tier.first_round,
            });
        }
        if tier.hazard_count > CELL_COUNT {
            return Err(ConfigError::TooManyHazards {
                round: tier.first_round,
                count: tier.hazard_count,
            });
        }
        if !(tier.warning_ms.is_finite() && tier.warning_ms > 0.0) {
            return Err(ConfigError::NonPositiveDuration {
                name: "warning_ms",
                value: tier.warning_ms,
            });
        }
    }

    for pair in tiers.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if next.first_round <= prev.first_round {
            return Err(ConfigError::TierOrder {
                previous: prev.first_round,
                next: next.first_round,
            });
        }
        if next.hazard_count < prev.hazard_count || next.warning_ms > prev.warning_ms {
            return Err(ConfigError::NonMonotoneDifficulty {
                round: next.first_round,
            });
        }
    }

    Ok(())
}
