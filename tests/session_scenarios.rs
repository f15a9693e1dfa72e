//! End-to-end sessions driven through `Engine` at 10ms frames.
//!
//! Pose reports are answered on request, so the engine sees each one a
//! frame later, as with a real asynchronous model.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use pose_dodge::error::CollaboratorFailure;
use pose_dodge::platform::{ScriptStep, ScriptedPoseSource};
use pose_dodge::pose::{PoseMailbox, PoseReport, PoseSource, hips_at};
use pose_dodge::sim::{Cell, GameEvent, GamePhase, HazardPhase, PauseReason};
use pose_dodge::{Engine, EngineError, EngineStatus, FrameSnapshot, Settings};

const FRAME: f64 = 10.0;

/// Pose source the test steers directly; `None` reports "no body"
struct Puppet {
    pos: Rc<RefCell<Option<Vec2>>>,
    line: Rc<RefCell<Line>>,
    requests: Rc<RefCell<u32>>,
    mailbox: Option<PoseMailbox>,
}

/// How the pose model handles requests
#[derive(Debug, Clone, Copy, PartialEq)]
enum Line {
    Answers,
    /// Takes requests but never replies
    Silent,
    /// The request callback itself errors
    Broken,
}

impl PoseSource for Puppet {
    fn prime(&mut self, mailbox: PoseMailbox) -> Result<(), CollaboratorFailure> {
        self.mailbox = Some(mailbox);
        Ok(())
    }

    fn request(&mut self, _timestamp_ms: f64) -> Result<(), CollaboratorFailure> {
        match *self.line.borrow() {
            Line::Answers => {}
            Line::Silent => {
                *self.requests.borrow_mut() += 1;
                return Ok(());
            }
            Line::Broken => {
                return Err(CollaboratorFailure::new("pose-model", "request callback threw"));
            }
        }
        *self.requests.borrow_mut() += 1;
        let report = match *self.pos.borrow() {
            Some(pos) => PoseReport::Body(hips_at(pos)),
            None => PoseReport::NoBody,
        };
        if let Some(mailbox) = &self.mailbox {
            mailbox.post(report);
        }
        Ok(())
    }

    fn release(&mut self) {
        self.mailbox = None;
    }
}

struct Rig {
    engine: Engine,
    pos: Rc<RefCell<Option<Vec2>>>,
    line: Rc<RefCell<Line>>,
    requests: Rc<RefCell<u32>>,
    frame: u64,
}

impl Rig {
    fn new(settings: Settings, seed: u64) -> Self {
        let pos = Rc::new(RefCell::new(Some(Cell::new(1, 1).center())));
        let line = Rc::new(RefCell::new(Line::Answers));
        let requests = Rc::new(RefCell::new(0));
        let puppet = Puppet {
            pos: pos.clone(),
            line: line.clone(),
            requests: requests.clone(),
            mailbox: None,
        };
        let mut engine = Engine::new(settings, seed, Box::new(puppet)).unwrap();
        engine.start().unwrap();
        Self {
            engine,
            pos,
            line,
            requests,
            frame: 0,
        }
    }

    fn stand(&self, cell: Option<Cell>) {
        *self.pos.borrow_mut() = cell.map(|c| c.center());
    }

    fn set_line(&self, line: Line) {
        *self.line.borrow_mut() = line;
    }

    fn requests(&self) -> u32 {
        *self.requests.borrow()
    }

    fn step(&mut self) -> Vec<GameEvent> {
        self.engine.tick(self.frame as f64 * FRAME).unwrap();
        self.frame += 1;
        self.snap().events.clone()
    }

    fn run_for(&mut self, ms: f64) -> Vec<GameEvent> {
        let frames = (ms / FRAME).round() as u64;
        (0..frames).flat_map(|_| self.step()).collect()
    }

    /// Step until `done` holds; false if `limit_ms` passed first
    fn run_until(&mut self, limit_ms: f64, done: impl Fn(&FrameSnapshot) -> bool) -> bool {
        let frames = (limit_ms / FRAME).round() as u64;
        for _ in 0..frames {
            self.step();
            if done(self.snap()) {
                return true;
            }
        }
        false
    }

    fn snap(&self) -> &FrameSnapshot {
        self.engine.snapshot().unwrap()
    }

    fn hazard_cells(&self) -> Vec<Cell> {
        self.snap().hazards.iter().map(|h| h.cell).collect()
    }

    fn to_running(&mut self) {
        self.stand(Some(Cell::new(1, 1)));
        assert!(self.run_until(6000.0, |s| s.phase == GamePhase::Running));
    }
}

fn count<F: Fn(&GameEvent) -> bool>(events: &[GameEvent], f: F) -> usize {
    events.iter().filter(|e| f(e)).count()
}

#[test]
fn test_center_hold_then_countdown_then_running() {
    let source = ScriptedPoseSource::new().then(1.0, ScriptStep::Stand(Vec2::new(0.5, 0.5)));
    let mut engine = Engine::new(Settings::default(), 3, Box::new(source)).unwrap();
    engine.start().unwrap();

    let mut countdown_at = None;
    let mut running_at = None;
    for frame in 0..=450u64 {
        let t = frame as f64 * FRAME;
        engine.tick(t).unwrap();
        let snap = engine.snapshot().unwrap();
        if countdown_at.is_none() && snap.phase == GamePhase::Countdown {
            countdown_at = Some(t);
            assert_eq!(snap.countdown, 3);
        }
        if running_at.is_none() && snap.phase == GamePhase::Running {
            running_at = Some(t);
            assert_eq!(snap.lives, 3);
            assert_eq!(snap.round, 1);
            assert_eq!(snap.hazards.len(), 2);
            assert!(snap.hazards.iter().all(|h| h.phase == HazardPhase::Warning));
        }
    }

    // Pose arrives from the second frame on, so the hold completes 1200ms later
    assert_eq!(countdown_at, Some(1200.0));
    assert_eq!(running_at, Some(4200.0));
}

#[test]
fn test_off_center_never_starts() {
    let source = ScriptedPoseSource::new().then(1.0, ScriptStep::Stand(Vec2::new(0.15, 0.5)));
    let mut engine = Engine::new(Settings::default(), 3, Box::new(source)).unwrap();
    engine.start().unwrap();
    for frame in 0..600u64 {
        engine.tick(frame as f64 * FRAME).unwrap();
    }
    let snap = engine.snapshot().unwrap();
    assert_eq!(snap.phase, GamePhase::Idle);
    assert_eq!(snap.player, Some(Cell::new(1, 0)));
    assert_eq!(snap.hold_progress, 0.0);
}

#[test]
fn test_dodging_round_one() {
    let mut rig = Rig::new(Settings::default(), 11);
    rig.to_running();

    let hazards = rig.hazard_cells();
    let safe = Cell::ALL
        .into_iter()
        .find(|c| !hazards.contains(c))
        .unwrap();
    rig.stand(Some(safe));

    let events = rig.run_for(5000.0);
    assert_eq!(count(&events, |e| matches!(e, GameEvent::HazardsActivated { .. })), 1);
    assert!(rig.snap().hazards.iter().all(|h| h.phase == HazardPhase::Active));
    assert_eq!(rig.snap().round, 1);

    let events = rig.run_for(800.0);
    assert!(events.contains(&GameEvent::RoundAdvanced { round: 2 }));
    assert_eq!(rig.snap().round, 2);
    assert_eq!(rig.snap().lives, 3);
    assert_eq!(count(&events, |e| matches!(e, GameEvent::LifeLost { .. })), 0);
}

#[test]
fn test_dwelling_costs_exactly_one_life() {
    let mut rig = Rig::new(Settings::default(), 12);
    rig.to_running();

    let target = rig.hazard_cells()[0];
    rig.stand(Some(target));

    let mut events = rig.run_for(6000.0);
    assert_eq!(rig.snap().round, 2);
    events.extend(rig.run_for(5800.0));
    assert_eq!(rig.snap().round, 3);

    let lost: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, GameEvent::LifeLost { .. }))
        .collect();
    assert_eq!(lost, vec![&GameEvent::LifeLost { cell: target, lives: 2 }]);
    assert_eq!(rig.snap().lives, 2);
}

#[test]
fn test_tracking_loss_pauses_and_resumes() {
    let mut rig = Rig::new(Settings::default(), 13);
    rig.to_running();
    rig.run_for(1000.0);
    let before = rig.snap().clone();

    rig.stand(None);
    let events = rig.run_for(100.0);
    assert!(events.contains(&GameEvent::Paused {
        reason: PauseReason::Tracking
    }));
    let paused = rig.snap().clone();
    assert_eq!(paused.phase, GamePhase::Paused);
    assert_eq!(paused.pause_reason, PauseReason::Tracking);

    rig.run_for(3000.0);
    assert_eq!(rig.snap().elapsed_ms, paused.elapsed_ms);
    assert_eq!(rig.snap().hazards, paused.hazards);

    rig.stand(Some(before.player.unwrap()));
    let events = rig.run_for(100.0);
    assert!(events.contains(&GameEvent::Resumed));
    let after = rig.snap();
    assert_eq!(after.phase, GamePhase::Running);
    assert_eq!(after.lives, before.lives);
    assert_eq!(after.round, before.round);
}

#[test]
fn test_unanswered_requests_pause_for_tracking() {
    let mut rig = Rig::new(Settings::default(), 21);
    rig.to_running();
    rig.run_for(1000.0);

    // Three timed-out requests in a row count as three frames without a body
    rig.set_line(Line::Silent);
    let sent = rig.requests();
    assert!(rig.run_until(1000.0, |s| s.phase == GamePhase::Paused));
    let paused = rig.snap().clone();
    assert_eq!(paused.pause_reason, PauseReason::Tracking);
    assert!(rig.requests() >= sent + 3);

    // Requests keep being re-issued while time stays frozen
    let sent = rig.requests();
    rig.run_for(1000.0);
    assert!(rig.requests() >= sent + 3);
    assert_eq!(rig.snap().elapsed_ms, paused.elapsed_ms);

    rig.set_line(Line::Answers);
    assert!(rig.run_until(500.0, |s| s.phase == GamePhase::Running));
    assert_eq!(rig.snap().lives, paused.lives);
}

#[test]
fn test_request_error_stops_engine() {
    let mut rig = Rig::new(Settings::default(), 22);
    rig.to_running();
    let lives = rig.snap().lives;

    rig.set_line(Line::Broken);
    let err = rig.engine.tick(rig.frame as f64 * FRAME).unwrap_err();
    assert!(matches!(err, EngineError::Collaborator(_)));
    assert_eq!(err.to_string(), "pose-model failed: request callback threw");
    let snap = rig.snap();
    assert!(matches!(snap.status, EngineStatus::Failed(_)));
    assert_eq!(snap.lives, lives);
    assert!(rig.engine.tick(1e6).is_err());
}

#[test]
fn test_user_pause_during_tracking_pause() {
    let mut rig = Rig::new(Settings::default(), 23);
    rig.to_running();
    let home = rig.snap().player;

    rig.stand(None);
    assert!(rig.run_until(100.0, |s| s.pause_reason == PauseReason::Tracking));

    assert!(rig.engine.pause(PauseReason::User));
    assert_eq!(
        rig.step(),
        vec![GameEvent::Paused {
            reason: PauseReason::User
        }]
    );

    // The body coming back does not lift a user pause
    rig.stand(home);
    let events = rig.run_for(1000.0);
    assert!(!events.contains(&GameEvent::Resumed));
    assert_eq!(rig.snap().phase, GamePhase::Paused);
    assert_eq!(rig.snap().pause_reason, PauseReason::User);

    assert!(!rig.engine.resume(PauseReason::System));
    assert!(rig.engine.resume(PauseReason::User));
    assert!(rig.step().contains(&GameEvent::Resumed));
    assert_eq!(rig.snap().phase, GamePhase::Running);
}

#[test]
fn test_user_pause_waits_for_user() {
    let mut rig = Rig::new(Settings::default(), 14);
    rig.to_running();

    assert!(rig.engine.pause(PauseReason::User));
    let events = rig.step();
    assert_eq!(
        events,
        vec![GameEvent::Paused {
            reason: PauseReason::User
        }]
    );

    rig.run_for(2000.0);
    assert_eq!(rig.snap().phase, GamePhase::Paused);
    assert!(!rig.engine.resume(PauseReason::System));
    assert!(!rig.engine.resume(PauseReason::Tracking));
    assert!(rig.engine.resume(PauseReason::User));
    assert!(rig.step().contains(&GameEvent::Resumed));
    assert_eq!(rig.snap().phase, GamePhase::Running);
}

#[test]
fn test_game_over_is_terminal_and_recorded() {
    let settings = Settings {
        starting_lives: 1,
        ..Default::default()
    };
    let mut rig = Rig::new(settings, 15);
    rig.to_running();
    rig.stand(Some(rig.hazard_cells()[0]));

    assert!(rig.run_until(7000.0, |s| s.phase == GamePhase::GameOver));
    assert!(rig.snap().events.contains(&GameEvent::GameOver {
        round: 1,
        elapsed_ms: 5600.0
    }));
    let over = rig.snap().clone();
    assert_eq!(over.lives, 0);
    assert_eq!(rig.engine.high_scores().best_round(), Some(1));

    rig.stand(Some(Cell::new(1, 1)));
    let events = rig.run_for(20_000.0);
    assert!(events.is_empty());
    let snap = rig.snap();
    assert_eq!(snap.phase, GamePhase::GameOver);
    assert_eq!(snap.round, over.round);
    assert_eq!(snap.lives, 0);
    assert_eq!(snap.batch_id, over.batch_id);

    // A new session starts from Idle
    rig.engine.start().unwrap();
    rig.step();
    assert_eq!(rig.snap().phase, GamePhase::Idle);
    assert_eq!(rig.snap().lives, 1);
}

#[test]
fn test_model_failure_stops_engine() {
    let source = ScriptedPoseSource::new()
        .then(500.0, ScriptStep::Stand(Vec2::new(0.5, 0.5)))
        .then(1.0, ScriptStep::Fail("model load failed".into()));
    let mut engine = Engine::new(Settings::default(), 3, Box::new(source)).unwrap();
    engine.start().unwrap();

    let mut failure = None;
    for frame in 0..100u64 {
        if let Err(err) = engine.tick(frame as f64 * FRAME) {
            failure = Some(err);
            break;
        }
    }
    assert!(matches!(failure, Some(EngineError::Collaborator(_))));
    let snap = engine.snapshot().unwrap();
    assert!(matches!(snap.status, EngineStatus::Failed(_)));
    assert_eq!(snap.lives, 3);
    assert!(engine.tick(5000.0).is_err());
}

#[test]
fn test_denied_camera_fails_start() {
    let source = ScriptedPoseSource::new().deny_camera("permission denied");
    let mut engine = Engine::new(Settings::default(), 3, Box::new(source)).unwrap();
    let err = engine.start().unwrap_err();
    assert_eq!(err.to_string(), "camera failed: permission denied");
    assert!(matches!(engine.status(), EngineStatus::Failed(_)));
}

#[test]
fn test_dispose_mid_run() {
    let mut rig = Rig::new(Settings::default(), 16);
    rig.to_running();
    let mailbox = rig.engine.mailbox();

    rig.engine.dispose();
    rig.engine.dispose();
    assert!(!mailbox.post(PoseReport::NoBody));
    assert!(rig.engine.tick(1e9).is_ok());
    assert_eq!(rig.engine.status(), &EngineStatus::Disposed);
    assert!(matches!(rig.engine.start(), Err(EngineError::Disposed)));
}

#[test]
fn test_same_seed_same_hazards() {
    let mut a = Rig::new(Settings::default(), 77);
    let mut b = Rig::new(Settings::default(), 77);
    a.to_running();
    b.to_running();
    assert_eq!(a.hazard_cells(), b.hazard_cells());
}

#[test]
fn test_settings_from_json() {
    let settings = Settings::from_json(r#"{"starting_lives": 2, "max_hazards": 4}"#).unwrap();
    let mut rig = Rig::new(settings, 17);
    rig.to_running();
    assert_eq!(rig.snap().lives, 2);
    assert!(Settings::from_json(r#"{"starting_lives": 5}"#).is_err());
}
