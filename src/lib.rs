//! Pose Dodge - a motion-controlled 3x3 grid dodge game
//!
//! Core modules:
//! - `sim`: Per-frame simulation (stabilizer, hazards, collisions, session state)
//! - `engine`: Lifecycle, pose mailbox and render publication around `sim`
//! - `pose`: Landmark sets from the pose-estimation collaborator
//! - `platform`: Host collaborators (scripted native source, wasm bindings)
//! - `settings`: Data-driven tuning and difficulty tiers

pub mod engine;
pub mod error;
pub mod highscores;
pub mod platform;
pub mod pose;
pub mod settings;
pub mod sim;

pub use engine::{Engine, EngineStatus, FrameSnapshot, RenderSink};
pub use error::{CollaboratorFailure, ConfigError, EngineError};
pub use highscores::HighScores;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Cells per grid side
    pub const GRID_SIZE: u8 = 3;
    /// Total cells in the grid
    pub const CELL_COUNT: usize = 9;
    /// Column the player must hold to arm the start gate
    pub const CENTER_COL: u8 = 1;

    /// Nominal host frame interval (60 Hz)
    pub const FRAME_MS: f64 = 1000.0 / 60.0;

    /// MediaPipe pose landmark indices for the hips
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
}

/// Mirror a normalized x coordinate to match a selfie-view camera feed
#[inline]
pub fn mirror_x(x: f32) -> f32 {
    1.0 - x
}

/// Format a run clock as `mm:ss` (whole seconds, truncated)
pub fn format_clock(elapsed_ms: f64) -> String {
    let secs = (elapsed_ms.max(0.0) / 1000.0).floor() as u64;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_x() {
        assert_eq!(mirror_x(0.0), 1.0);
        assert!((mirror_x(0.25) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "00:00");
        assert_eq!(format_clock(999.0), "00:00");
        assert_eq!(format_clock(61_500.0), "01:01");
        assert_eq!(format_clock(-5.0), "00:00");
        assert_eq!(format_clock(3_600_000.0), "60:00");
    }
}
