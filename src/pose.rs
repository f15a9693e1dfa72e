//! Pose-estimation boundary
//!
//! The pose model runs outside the engine and reports, per request, either a
//! landmark set in normalized `[0,1] x [0,1]` camera coordinates, an explicit
//! "no body", or a failure. Reports land in a `PoseMailbox`; the engine takes
//! the newest one on its next frame, so a result may arrive one or more
//! frames after it was requested.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{LEFT_HIP, RIGHT_HIP};
use crate::error::CollaboratorFailure;
use crate::mirror_x;

/// One landmark from the pose model (camera space, not mirrored)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Model confidence that the point is visible (0-1)
    #[serde(default = "full_visibility")]
    pub visibility: f32,
}

fn full_visibility() -> f32 {
    1.0
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, visibility }
    }
}

/// What the pose collaborator delivered for one request
#[derive(Debug, Clone, PartialEq)]
pub enum PoseReport {
    /// One body's landmarks
    Body(Vec<Landmark>),
    /// The model ran and saw nobody
    NoBody,
    /// Camera or model failure; the engine stops
    Failed(CollaboratorFailure),
}

/// Reduce a landmark set to the player's mirrored display position.
///
/// Uses the hip midpoint when both hips are visible enough, otherwise the
/// centroid of every visible landmark. `None` means nothing usable.
pub fn position_from_landmarks(landmarks: &[Landmark], min_visibility: f32) -> Option<Vec2> {
    let visible = |lm: &&Landmark| {
        lm.visibility >= min_visibility && lm.x.is_finite() && lm.y.is_finite()
    };

    let hips = (
        landmarks.get(LEFT_HIP).filter(visible),
        landmarks.get(RIGHT_HIP).filter(visible),
    );
    let camera = match hips {
        (Some(l), Some(r)) => Vec2::new((l.x + r.x) / 2.0, (l.y + r.y) / 2.0),
        _ => {
            let points: Vec<Vec2> = landmarks
                .iter()
                .filter(visible)
                .map(|lm| Vec2::new(lm.x, lm.y))
                .collect();
            if points.is_empty() {
                return None;
            }
            points.iter().sum::<Vec2>() / points.len() as f32
        }
    };

    Some(Vec2::new(mirror_x(camera.x), camera.y))
}

/// Latest-wins slot shared between the engine and the pose callback.
///
/// Once closed (engine disposed) late deliveries are silently dropped.
#[derive(Debug, Clone, Default)]
pub struct PoseMailbox {
    inner: Rc<RefCell<MailboxSlot>>,
}

#[derive(Debug, Default)]
struct MailboxSlot {
    latest: Option<PoseReport>,
    closed: bool,
    delivered: u64,
}

impl PoseMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a report; replaces any report not yet taken.
    /// Returns false if the mailbox is closed.
    pub fn post(&self, report: PoseReport) -> bool {
        let mut slot = self.inner.borrow_mut();
        if slot.closed {
            return false;
        }
        // A failure must not be overwritten by a later ordinary report
        if matches!(slot.latest, Some(PoseReport::Failed(_)))
            && !matches!(report, PoseReport::Failed(_))
        {
            return true;
        }
        slot.latest = Some(report);
        slot.delivered += 1;
        true
    }

    /// Take the newest report, if any arrived since the last take
    pub fn take(&self) -> Option<PoseReport> {
        self.inner.borrow_mut().latest.take()
    }

    pub fn close(&self) {
        let mut slot = self.inner.borrow_mut();
        slot.closed = true;
        slot.latest = None;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    /// Reports accepted over the mailbox's lifetime
    pub fn delivered(&self) -> u64 {
        self.inner.borrow().delivered
    }
}

/// A pose-estimation collaborator
pub trait PoseSource {
    /// Acquire camera/model resources and remember where to deliver reports
    fn prime(&mut self, mailbox: PoseMailbox) -> Result<(), CollaboratorFailure>;

    /// Ask for the pose at `timestamp_ms`; must not block. The report may be
    /// posted now or on a later frame. An error means the request could not
    /// even be issued, which stops the engine.
    fn request(&mut self, timestamp_ms: f64) -> Result<(), CollaboratorFailure>;

    /// Release camera/model resources. Called once, from `Engine::dispose`.
    fn release(&mut self);
}

/// Build a 33-point landmark set with only the hips placed (test and demo helper).
///
/// `display` is the desired mirrored display position.
pub fn hips_at(display: Vec2) -> Vec<Landmark> {
    let mut landmarks = vec![Landmark::new(0.0, 0.0, 0.0); 33];
    let camera_x = mirror_x(display.x);
    landmarks[LEFT_HIP] = Landmark::new(camera_x - 0.02, display.y, 1.0);
    landmarks[RIGHT_HIP] = Landmark::new(camera_x + 0.02, display.y, 1.0);
    landmarks
}
