//! Engine lifecycle around the simulation
//!
//! The host drives `Engine::tick` once per rendering frame. Each frame:
//! 1. Clamp the delta from consecutive frame timestamps
//! 2. Take the newest pose report from the mailbox (latest wins)
//! 3. Advance `sim::tick` once
//! 4. Request the next pose if none is in flight. A request left unanswered
//!    for `pose_timeout_ms` counts as "no body" and is issued again.
//! 5. Publish one `FrameSnapshot`, built from the state just computed, to every sink

use glam::Vec2;
use serde::Serialize;

use crate::error::{CollaboratorFailure, EngineError};
use crate::format_clock;
use crate::highscores::HighScores;
use crate::pose::{PoseMailbox, PoseReport, PoseSource, position_from_landmarks};
use crate::settings::Settings;
use crate::sim::{
    self, Cell, GameEvent, GamePhase, GameState, HazardPhase, PauseReason, PoseSignal, TickInput,
};

/// Lifecycle status of the engine (distinct from the game phase)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EngineStatus {
    /// Constructed, `start` not called yet
    Stopped,
    Running,
    /// A collaborator failed; every later `tick` reports it
    Failed(CollaboratorFailure),
    Disposed,
}

/// One hazard as the presentation layer sees it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HazardView {
    pub cell: Cell,
    pub phase: HazardPhase,
}

/// Everything the presentation layer needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    /// Frames published since `start`
    pub frame: u64,
    pub status: EngineStatus,
    pub phase: GamePhase,
    pub pause_reason: PauseReason,
    pub lives: u8,
    pub round: u32,
    pub elapsed_ms: f64,
    /// `elapsed_ms` as `mm:ss`
    pub clock: String,
    /// 3, 2, 1 during the countdown, 0 otherwise
    pub countdown: u8,
    /// Center-hold progress while idle (0-1)
    pub hold_progress: f32,
    pub player: Option<Cell>,
    pub smoothed: Option<Vec2>,
    pub batch_id: Option<u64>,
    pub hazards: Vec<HazardView>,
    pub events: Vec<GameEvent>,
}

impl FrameSnapshot {
    fn from_state(
        frame: u64,
        status: EngineStatus,
        state: &GameState,
        events: Vec<GameEvent>,
    ) -> Self {
        let session = &state.session;
        let batch = state.scheduler.batch();
        Self {
            frame,
            status,
            phase: session.phase,
            pause_reason: session.pause_reason,
            lives: session.lives,
            round: session.round,
            elapsed_ms: session.elapsed_ms,
            clock: format_clock(session.elapsed_ms),
            countdown: state.countdown_value(),
            hold_progress: match session.phase {
                GamePhase::Idle => state.gate.progress(),
                _ => 0.0,
            },
            player: state.player_cell(),
            smoothed: state.stabilizer.smoothed(),
            batch_id: batch.map(|b| b.id),
            hazards: batch
                .map(|b| {
                    b.hazards
                        .iter()
                        .map(|h| HazardView {
                            cell: h.cell,
                            phase: h.phase,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            events,
        }
    }
}

/// Presentation-layer subscriber; receives one snapshot per frame
pub trait RenderSink {
    fn publish(&mut self, frame: &FrameSnapshot);
}

impl<F: FnMut(&FrameSnapshot)> RenderSink for F {
    fn publish(&mut self, frame: &FrameSnapshot) {
        self(frame)
    }
}

/// Frame delta from consecutive host timestamps
#[derive(Debug, Clone)]
struct FrameClock {
    last_ms: Option<f64>,
    max_delta_ms: f64,
}

impl FrameClock {
    fn new(max_delta_ms: f64) -> Self {
        Self {
            last_ms: None,
            max_delta_ms,
        }
    }

    /// First frame, backwards and non-finite timestamps all yield 0
    fn delta(&mut self, timestamp_ms: f64) -> f64 {
        if !timestamp_ms.is_finite() {
            return 0.0;
        }
        let dt = match self.last_ms {
            Some(prev) => (timestamp_ms - prev).clamp(0.0, self.max_delta_ms),
            None => 0.0,
        };
        self.last_ms = Some(self.last_ms.map_or(timestamp_ms, |prev| prev.max(timestamp_ms)));
        dt
    }

    fn reset(&mut self) {
        self.last_ms = None;
    }
}

/// Single-threaded game engine owning all session state
pub struct Engine {
    settings: Settings,
    seed: u64,
    source: Box<dyn PoseSource>,
    mailbox: PoseMailbox,
    primed: bool,
    /// Time the outstanding pose request has waited (None when none is in flight)
    request_wait_ms: Option<f64>,
    state: Option<GameState>,
    status: EngineStatus,
    clock: FrameClock,
    sessions: u64,
    frame: u64,
    pending_events: Vec<GameEvent>,
    sinks: Vec<Box<dyn RenderSink>>,
    high_scores: HighScores,
    last_snapshot: Option<FrameSnapshot>,
}

impl Engine {
    /// Validate settings and build a stopped engine
    pub fn new(
        settings: Settings,
        seed: u64,
        source: Box<dyn PoseSource>,
    ) -> Result<Self, EngineError> {
        settings.validate()?;
        let clock = FrameClock::new(settings.max_frame_delta_ms);

        Ok(Self {
            settings,
            seed,
            source,
            mailbox: PoseMailbox::new(),
            primed: false,
            request_wait_ms: None,
            state: None,
            status: EngineStatus::Stopped,
            clock,
            sessions: 0,
            frame: 0,
            pending_events: Vec::new(),
            sinks: Vec::new(),
            high_scores: HighScores::new(),
            last_snapshot: None,
        })
    }

    /// Add a presentation-layer subscriber
    pub fn subscribe(&mut self, sink: Box<dyn RenderSink>) {
        self.sinks.push(sink);
    }

    /// Begin a fresh session in Idle.
    ///
    /// The pose source is primed on the first start only; calling `start`
    /// again (e.g. after game over) just replaces the session. Fails with
    /// `Disposed` once the engine has been disposed.
    pub fn start(&mut self) -> Result<(), EngineError> {
        match &self.status {
            EngineStatus::Disposed => return Err(EngineError::Disposed),
            EngineStatus::Failed(failure) => return Err(failure.clone().into()),
            EngineStatus::Stopped | EngineStatus::Running => {}
        }

        let seed = self.seed.wrapping_add(self.sessions);
        let state = GameState::new(&self.settings, seed)?;
        self.sessions += 1;

        if !self.primed {
            if let Err(failure) = self.source.prime(self.mailbox.clone()) {
                self.fail(failure.clone());
                return Err(failure.into());
            }
            self.primed = true;
        }

        // Nothing addressed to a previous session may reach this one
        self.mailbox.take();
        self.request_wait_ms = None;

        self.state = Some(state);
        self.status = EngineStatus::Running;
        self.clock.reset();
        self.frame = 0;
        self.pending_events.clear();
        log::info!("Session {} started (seed {})", self.sessions, seed);
        Ok(())
    }

    /// Advance one rendering frame
    pub fn tick(&mut self, timestamp_ms: f64) -> Result<(), EngineError> {
        match &self.status {
            EngineStatus::Disposed => return Ok(()),
            EngineStatus::Stopped => return Err(EngineError::NotStarted),
            EngineStatus::Failed(failure) => return Err(failure.clone().into()),
            EngineStatus::Running => {}
        }

        let dt = self.clock.delta(timestamp_ms);

        let report = self.mailbox.take();
        let mut timed_out = false;
        if report.is_some() {
            self.request_wait_ms = None;
        } else if let Some(waited) = self.request_wait_ms.as_mut() {
            *waited += dt;
            if *waited >= self.settings.pose_timeout_ms {
                log::debug!("Pose request unanswered after {:.0}ms, re-issuing", waited);
                self.request_wait_ms = None;
                timed_out = true;
            }
        }
        let pose = match report {
            Some(PoseReport::Body(landmarks)) => {
                match position_from_landmarks(&landmarks, self.settings.min_landmark_visibility) {
                    Some(pos) => PoseSignal::Fresh(pos),
                    None => PoseSignal::Lost,
                }
            }
            Some(PoseReport::NoBody) => PoseSignal::Lost,
            Some(PoseReport::Failed(failure)) => {
                self.fail(failure.clone());
                return Err(failure.into());
            }
            None if timed_out => PoseSignal::Lost,
            None => PoseSignal::Pending,
        };

        let Some(state) = self.state.as_mut() else {
            return Err(EngineError::NotStarted);
        };
        let mut events = std::mem::take(&mut self.pending_events);
        events.extend(sim::tick(state, &TickInput { pose }, dt));

        for event in &events {
            if let GameEvent::GameOver { round, elapsed_ms } = event {
                match self.high_scores.add_score(*round, *elapsed_ms, timestamp_ms) {
                    Some(rank) => log::info!("Run reached round {} (rank {})", round, rank),
                    None => log::info!("Run reached round {}", round),
                }
            }
        }

        if self.request_wait_ms.is_none() {
            if let Err(failure) = self.source.request(timestamp_ms) {
                self.pending_events = events;
                self.fail(failure.clone());
                return Err(failure.into());
            }
            self.request_wait_ms = Some(0.0);
        }

        self.publish(events);
        Ok(())
    }

    /// Pause a running session, or take over a tracking pause; false if not applicable
    pub fn pause(&mut self, reason: PauseReason) -> bool {
        let Some(state) = self.live_state() else {
            return false;
        };
        match sim::request_pause(state, reason) {
            Some(event) => {
                self.pending_events.push(event);
                true
            }
            None => false,
        }
    }

    /// Resume a session paused for exactly `reason` (User or System)
    pub fn resume(&mut self, reason: PauseReason) -> bool {
        let Some(state) = self.live_state() else {
            return false;
        };
        match sim::request_resume(state, reason) {
            Some(event) => {
                self.pending_events.push(event);
                true
            }
            None => false,
        }
    }

    /// Stop the engine and release collaborators. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.status == EngineStatus::Disposed {
            return;
        }
        self.mailbox.close();
        if self.primed {
            self.source.release();
            self.primed = false;
        }
        self.request_wait_ms = None;
        self.state = None;
        self.pending_events.clear();
        self.status = EngineStatus::Disposed;
        log::info!("Engine disposed");
    }

    /// Mailbox for hosts that deliver pose results themselves
    pub fn mailbox(&self) -> PoseMailbox {
        self.mailbox.clone()
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Last published snapshot
    pub fn snapshot(&self) -> Option<&FrameSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn high_scores(&self) -> &HighScores {
        &self.high_scores
    }

    fn live_state(&mut self) -> Option<&mut GameState> {
        match self.status {
            EngineStatus::Running => self.state.as_mut(),
            _ => None,
        }
    }

    /// Enter the failed status and publish it; counters are left untouched
    fn fail(&mut self, failure: CollaboratorFailure) {
        log::error!("{}", failure);
        self.status = EngineStatus::Failed(failure);
        self.request_wait_ms = None;
        let events = std::mem::take(&mut self.pending_events);
        self.publish(events);
    }

    fn publish(&mut self, events: Vec<GameEvent>) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        self.frame += 1;
        let snapshot = FrameSnapshot::from_state(self.frame, self.status.clone(), state, events);
        for sink in &mut self.sinks {
            sink.publish(&snapshot);
        }
        self.last_snapshot = Some(snapshot);
    }
}
