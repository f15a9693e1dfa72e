//! Engine error types
//!
//! Transient per-frame problems (no body in view, a sample sitting on a
//! boundary) are absorbed by the state machine and never show up here.
//! Everything in this module is structural: bad configuration or a failed
//! collaborator.

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the engine to its host
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("failed to parse settings: {0}")]
    SettingsParse(#[from] serde_json::Error),
    #[error("failed to read settings from {path}: {source}")]
    SettingsRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Collaborator(#[from] CollaboratorFailure),
    #[error("engine has not been started")]
    NotStarted,
    #[error("engine has been disposed")]
    Disposed,
}

/// A configuration value that would make the game run nonsensically
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("difficulty table is empty")]
    EmptyDifficulty,
    #[error("first difficulty tier must start at round 1, found {0}")]
    FirstTierNotRoundOne(u32),
    #[error("difficulty tier starts must strictly increase (round {previous} then {next})")]
    TierOrder { previous: u32, next: u32 },
    #[error("difficulty tier at round {round} has zero hazards")]
    ZeroHazards { round: u32 },
    #[error("difficulty tier at round {round} asks for {count} hazards, grid has 9 cells")]
    TooManyHazards { round: u32, count: usize },
    #[error("difficulty must not get easier: round {round} breaks the curve")]
    NonMonotoneDifficulty { round: u32 },
    #[error("{name} must be positive, got {value}")]
    NonPositiveDuration { name: &'static str, value: f64 },
    #[error("smoothing factor must be in (0, 1], got {0}")]
    Smoothing(f32),
    #[error("hysteresis margin must be in [0, 1/6), got {0}")]
    Hysteresis(f32),
    #[error("max_hazards must be between 1 and 9, got {0}")]
    MaxHazards(usize),
    #[error("starting lives must be between 1 and 3, got {0}")]
    StartingLives(u8),
    #[error("tracking_loss_frames must be at least 1")]
    TrackingLossFrames,
}

/// An external collaborator (camera, pose model) could not do its job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{collaborator} failed: {reason}")]
pub struct CollaboratorFailure {
    /// Which collaborator failed (e.g. "camera", "pose-model")
    pub collaborator: String,
    /// Human-readable cause, suitable for the host's error screen
    pub reason: String,
}

impl CollaboratorFailure {
    pub fn new(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }
}
