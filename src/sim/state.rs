//! Session state and core simulation types
//!
//! `GameState` is the single owner of everything that changes per frame:
//! counters, stabilizer, scheduler, detector, start gate and countdown.
//! Guards in `tick` read these fields fresh every frame.

use serde::{Deserialize, Serialize};

use super::collision::{CollisionDetector, DwellRules};
use super::grid::Cell;
use super::hazards::HazardScheduler;
use super::stabilizer::PositionStabilizer;
use super::start_gate::{Countdown, StartGate};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Top-level session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the player to hold the center column
    Idle,
    /// 3, 2, 1...
    Countdown,
    /// Hazards spawning, collisions live
    Running,
    /// Frozen; see `PauseReason`
    Paused,
    /// Out of lives (terminal)
    GameOver,
}

/// Why the session is paused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PauseReason {
    /// No body detected; resumes by itself when tracking returns
    Tracking,
    /// The player asked to pause
    User,
    /// The host paused (tab hidden, window blurred)
    System,
    None,
}

/// Published counters for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub lives: u8,
    /// Current round (1-based)
    pub round: u32,
    /// Running time of the session (excludes pauses and countdown)
    pub elapsed_ms: f64,
    pub phase: GamePhase,
    pub pause_reason: PauseReason,
}

impl SessionState {
    pub fn new(lives: u8) -> Self {
        Self {
            lives,
            round: 1,
            elapsed_ms: 0.0,
            phase: GamePhase::Idle,
            pause_reason: PauseReason::None,
        }
    }
}

/// Something observable that happened during a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    CountdownStarted { value: u8 },
    CountdownTick { value: u8 },
    RunStarted,
    HazardsSpawned { batch: u64, round: u32, cells: Vec<Cell> },
    HazardsActivated { batch: u64, cells: Vec<Cell> },
    RoundAdvanced { round: u32 },
    LifeLost { cell: Cell, lives: u8 },
    Paused { reason: PauseReason },
    Resumed,
    GameOver { round: u32, elapsed_ms: f64 },
}

/// Pose input for one frame, already reduced to a position
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum PoseSignal {
    /// A fresh normalized, mirrored position arrived this frame
    Fresh(glam::Vec2),
    /// The pose source explicitly reported no body
    Lost,
    /// Nothing new arrived yet (asynchronous latency)
    #[default]
    Pending,
}

/// Input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub pose: PoseSignal,
}

/// Complete per-session simulation state
#[derive(Debug, Clone)]
pub struct GameState {
    pub session: SessionState,
    pub stabilizer: PositionStabilizer,
    pub scheduler: HazardScheduler,
    pub collision: CollisionDetector,
    pub gate: StartGate,
    pub countdown: Countdown,
    /// Consecutive explicit "no body" reports
    pub lost_frames: u32,
    /// Seed the session was created with
    pub seed: u64,
    pub(crate) starting_lives: u8,
    pub(crate) tracking_loss_frames: u32,
}

impl GameState {
    /// Create an idle session from validated settings
    pub fn new(settings: &Settings, seed: u64) -> Result<Self, ConfigError> {
        settings.validate()?;
        let table = settings.difficulty_table()?;

        Ok(Self {
            session: SessionState::new(settings.starting_lives),
            stabilizer: PositionStabilizer::new(settings.smoothing, settings.hysteresis),
            scheduler: HazardScheduler::new(table, settings.active_display_ms, seed),
            collision: CollisionDetector::new(DwellRules {
                dwell_ms: settings.dwell_ms,
                spawn_grace_ms: settings.spawn_grace_ms,
                hit_cooldown_ms: settings.hit_cooldown_ms,
            }),
            gate: StartGate::new(settings.center_hold_ms),
            countdown: Countdown::new(settings.countdown_ms),
            lost_frames: 0,
            seed,
            starting_lives: settings.starting_lives,
            tracking_loss_frames: settings.tracking_loss_frames,
        })
    }

    /// Player's stabilized cell
    pub fn player_cell(&self) -> Option<Cell> {
        self.stabilizer.cell()
    }

    /// Countdown value for display (0 outside the countdown)
    pub fn countdown_value(&self) -> u8 {
        match self.session.phase {
            GamePhase::Countdown => self.countdown.value(),
            _ => 0,
        }
    }
}
