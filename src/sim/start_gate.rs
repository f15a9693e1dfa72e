//! Start gate and countdown
//!
//! The gate arms while the session is idle: the player holds the middle
//! column for `center_hold_ms` (any other column, or an explicit "no body"
//! report, resets the hold). The countdown then runs down continuously and
//! reports each whole second it crosses (3, 2, 1).

use crate::consts::CENTER_COL;

/// Center-hold trigger
#[derive(Debug, Clone)]
pub struct StartGate {
    threshold_ms: f64,
    held_ms: f64,
}

impl StartGate {
    pub fn new(threshold_ms: f64) -> Self {
        Self {
            threshold_ms,
            held_ms: 0.0,
        }
    }

    /// Accumulate hold time; returns true on the frame the gate fires
    pub fn update(&mut self, col: Option<u8>, dt_ms: f64) -> bool {
        if col == Some(CENTER_COL) {
            self.held_ms += dt_ms;
        } else {
            self.held_ms = 0.0;
        }

        if self.held_ms >= self.threshold_ms {
            self.held_ms = 0.0;
            return true;
        }
        false
    }

    /// Hold progress in [0, 1] for the "get centered" indicator
    pub fn progress(&self) -> f32 {
        (self.held_ms / self.threshold_ms).clamp(0.0, 1.0) as f32
    }

    pub fn reset(&mut self) {
        self.held_ms = 0.0;
    }
}

/// Result of advancing the countdown one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountdownStep {
    /// New display value, when it changed this frame
    pub tick: Option<u8>,
    /// The countdown reached zero this frame
    pub finished: bool,
}

/// Discrete countdown driven by a continuous timer
#[derive(Debug, Clone)]
pub struct Countdown {
    total_ms: f64,
    remaining_ms: f64,
    shown: u8,
}

impl Countdown {
    pub fn new(total_ms: f64) -> Self {
        Self {
            total_ms,
            remaining_ms: 0.0,
            shown: 0,
        }
    }

    /// Restart from the full duration; returns the first display value
    pub fn start(&mut self) -> u8 {
        self.remaining_ms = self.total_ms;
        self.shown = display_value(self.remaining_ms);
        self.shown
    }

    pub fn advance(&mut self, dt_ms: f64) -> CountdownStep {
        if self.remaining_ms <= 0.0 {
            return CountdownStep::default();
        }

        self.remaining_ms = (self.remaining_ms - dt_ms).max(0.0);
        let value = display_value(self.remaining_ms);
        let mut step = CountdownStep::default();
        if value != self.shown && value > 0 {
            step.tick = Some(value);
        }
        self.shown = value;
        step.finished = self.remaining_ms <= 0.0;
        step
    }

    /// Value to display (0 when not running)
    pub fn value(&self) -> u8 {
        self.shown
    }
}

/// Whole seconds left, rounded up (2999ms shows 3)
fn display_value(remaining_ms: f64) -> u8 {
    (remaining_ms / 1000.0).ceil().clamp(0.0, u8::MAX as f64) as u8
}
