//! Engine tuning
//!
//! Every timing constant and the difficulty curve live here so a host can
//! ship a JSON override. Validation happens once, before an engine exists.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineError};
use crate::sim::difficulty::{DifficultyTable, DifficultyTier, default_tiers};

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Position stabilizer ===
    /// EMA weight given to the newest sample (0.3 new / 0.7 old)
    pub smoothing: f32,
    /// Normalized distance a sample must travel past a band boundary
    pub hysteresis: f32,
    /// Landmarks below this visibility are ignored
    pub min_landmark_visibility: f32,

    // === Start gate ===
    /// Center-column hold required to start the countdown
    pub center_hold_ms: f64,
    /// Countdown length (displayed as 3, 2, 1)
    pub countdown_ms: f64,

    // === Session ===
    /// Lives at the start of each run
    pub starting_lives: u8,
    /// Consecutive "no body" reports before pausing for tracking
    pub tracking_loss_frames: u32,
    /// Frame deltas above this are clamped (tab switches, debugger stops)
    pub max_frame_delta_ms: f64,
    /// An unanswered pose request counts as "no body" after this long and is re-issued
    pub pose_timeout_ms: f64,

    // === Hazards ===
    /// How long an active batch stays on screen before replacement
    pub active_display_ms: f64,
    /// Upper bound on hazards per batch, applied on top of the tier table
    pub max_hazards: usize,
    /// Difficulty tiers, ordered by first round
    pub difficulty: Vec<DifficultyTier>,

    // === Collision (dwell-on-cell) ===
    /// Continuous time in an active hazard cell that costs a life
    pub dwell_ms: f64,
    /// Window after activation during which no life can be lost
    pub spawn_grace_ms: f64,
    /// Window after a hit during which no further life can be lost
    pub hit_cooldown_ms: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            smoothing: 0.3,
            hysteresis: 0.05,
            min_landmark_visibility: 0.5,

            center_hold_ms: 1200.0,
            countdown_ms: 3000.0,

            starting_lives: 3,
            tracking_loss_frames: 3,
            max_frame_delta_ms: 100.0,
            pose_timeout_ms: 250.0,

            active_display_ms: 800.0,
            max_hazards: 5,
            difficulty: default_tiers(),

            dwell_ms: 600.0,
            spawn_grace_ms: 600.0,
            hit_cooldown_ms: 700.0,
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate a JSON settings file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| EngineError::SettingsRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON (for hosts that persist their own overrides)
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings that would make the engine run nonsensically
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(ConfigError::Smoothing(self.smoothing));
        }
        if !(self.hysteresis >= 0.0 && self.hysteresis < 1.0 / 6.0) {
            return Err(ConfigError::Hysteresis(self.hysteresis));
        }
        if self.starting_lives == 0 || self.starting_lives > 3 {
            return Err(ConfigError::StartingLives(self.starting_lives));
        }
        if self.tracking_loss_frames == 0 {
            return Err(ConfigError::TrackingLossFrames);
        }

        let durations = [
            ("center_hold_ms", self.center_hold_ms),
            ("countdown_ms", self.countdown_ms),
            ("max_frame_delta_ms", self.max_frame_delta_ms),
            ("pose_timeout_ms", self.pose_timeout_ms),
            ("active_display_ms", self.active_display_ms),
            ("dwell_ms", self.dwell_ms),
        ];
        for (name, value) in durations {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveDuration { name, value });
            }
        }
        // Grace and cooldown may be switched off, but not negative
        for (name, value) in [
            ("spawn_grace_ms", self.spawn_grace_ms),
            ("hit_cooldown_ms", self.hit_cooldown_ms),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::NonPositiveDuration { name, value });
            }
        }

        self.difficulty_table().map(|_| ())
    }

    /// Build the validated difficulty table
    pub fn difficulty_table(&self) -> Result<DifficultyTable, ConfigError> {
        DifficultyTable::new(self.difficulty.clone(), self.max_hazards)
    }
}
