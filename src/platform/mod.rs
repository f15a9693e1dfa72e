//! Host collaborators
//!
//! - `ScriptedPoseSource`: a timeline of poses for headless runs and tests
//! - `web` (wasm32): JavaScript bindings; the page owns camera and pose model

#[cfg(target_arch = "wasm32")]
pub mod web;

use glam::Vec2;

use crate::error::CollaboratorFailure;
use crate::pose::{PoseMailbox, PoseReport, PoseSource, hips_at};

/// What the scripted "player" does during one script segment
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Stand with hips at a mirrored display position
    Stand(Vec2),
    /// Step out of frame (model reports no body)
    Away,
    /// Model crashes
    Fail(String),
}

/// Pose source replaying a fixed timeline.
///
/// Time is measured from the first request. Each request is answered
/// immediately, so the engine sees it on the following frame.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPoseSource {
    segments: Vec<(f64, ScriptStep)>,
    mailbox: Option<PoseMailbox>,
    origin_ms: Option<f64>,
    fail_prime: Option<String>,
}

impl ScriptedPoseSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment lasting `duration_ms`
    pub fn then(mut self, duration_ms: f64, step: ScriptStep) -> Self {
        self.segments.push((duration_ms, step));
        self
    }

    /// Make `prime` fail, as a denied camera would
    pub fn deny_camera(mut self, reason: impl Into<String>) -> Self {
        self.fail_prime = Some(reason.into());
        self
    }

    /// Segment active `t_ms` after the first request; the last one holds forever
    pub fn step_at(&self, t_ms: f64) -> Option<&ScriptStep> {
        let mut end = 0.0;
        for (duration, step) in &self.segments {
            end += duration;
            if t_ms < end {
                return Some(step);
            }
        }
        self.segments.last().map(|(_, step)| step)
    }
}

impl PoseSource for ScriptedPoseSource {
    fn prime(&mut self, mailbox: PoseMailbox) -> Result<(), CollaboratorFailure> {
        if let Some(reason) = &self.fail_prime {
            return Err(CollaboratorFailure::new("camera", reason.clone()));
        }
        self.mailbox = Some(mailbox);
        Ok(())
    }

    fn request(&mut self, timestamp_ms: f64) -> Result<(), CollaboratorFailure> {
        let origin = *self.origin_ms.get_or_insert(timestamp_ms);
        let report = match self.step_at(timestamp_ms - origin) {
            Some(ScriptStep::Stand(pos)) => PoseReport::Body(hips_at(*pos)),
            Some(ScriptStep::Away) | None => PoseReport::NoBody,
            Some(ScriptStep::Fail(reason)) => {
                PoseReport::Failed(CollaboratorFailure::new("pose-model", reason.clone()))
            }
        };
        if let Some(mailbox) = &self.mailbox {
            mailbox.post(report);
        }
        Ok(())
    }

    fn release(&mut self) {
        log::debug!("Scripted pose source released");
        self.mailbox = None;
    }
}
