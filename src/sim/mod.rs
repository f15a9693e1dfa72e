//! Per-frame simulation module
//!
//! All gameplay logic lives here. This module stays free of I/O:
//! - Time arrives as frame deltas from the host
//! - Pose input arrives already reduced to a normalized position
//! - Randomness comes from a seeded RNG only

pub mod collision;
pub mod difficulty;
pub mod grid;
pub mod hazards;
pub mod stabilizer;
pub mod start_gate;
pub mod state;
pub mod tick;

pub use collision::{CollisionDetector, DwellRecord, DwellRules, Hit};
pub use difficulty::{DifficultyTable, DifficultyTier};
pub use grid::Cell;
pub use hazards::{Hazard, HazardBatch, HazardPhase, HazardScheduler, SchedulerTick};
pub use stabilizer::PositionStabilizer;
pub use start_gate::{Countdown, CountdownStep, StartGate};
pub use state::{GameEvent, GamePhase, GameState, PauseReason, PoseSignal, SessionState, TickInput};
pub use tick::{request_pause, request_resume, tick};
