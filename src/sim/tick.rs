//! Per-frame simulation tick
//!
//! Advances a `GameState` once per host frame. While running the order is
//! fixed: advance the session clock, count down round-window timers, tick the
//! hazard scheduler, evaluate collisions, check lives, then check state
//! transitions. Hazard and collision outcomes are therefore visible before
//! the end-of-frame phase check.

use super::state::{GameEvent, GamePhase, GameState, PauseReason, PoseSignal, TickInput};

/// Advance the game state by one host frame of `dt_ms`
pub fn tick(state: &mut GameState, input: &TickInput, dt_ms: f64) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let dt_ms = dt_ms.max(0.0);

    match input.pose {
        PoseSignal::Fresh(pos) => {
            state.stabilizer.update(pos);
            state.lost_frames = 0;
        }
        PoseSignal::Lost => state.lost_frames = state.lost_frames.saturating_add(1),
        PoseSignal::Pending => {}
    }

    match state.session.phase {
        GamePhase::Idle => {
            let col = if state.lost_frames > 0 {
                None
            } else {
                state.stabilizer.col()
            };
            if state.gate.update(col, dt_ms) {
                let value = state.countdown.start();
                state.session.phase = GamePhase::Countdown;
                log::info!("Center hold complete, countdown from {}", value);
                events.push(GameEvent::CountdownStarted { value });
            }
        }

        GamePhase::Countdown => {
            let step = state.countdown.advance(dt_ms);
            if let Some(value) = step.tick {
                events.push(GameEvent::CountdownTick { value });
            }
            if step.finished {
                begin_run(state, &mut events);
            }
        }

        GamePhase::Running => run_frame(state, dt_ms, &mut events),

        GamePhase::Paused => {
            let tracking_back = matches!(input.pose, PoseSignal::Fresh(_));
            if state.session.pause_reason == PauseReason::Tracking && tracking_back {
                state.session.phase = GamePhase::Running;
                state.session.pause_reason = PauseReason::None;
                log::info!("Tracking restored, resuming");
                events.push(GameEvent::Resumed);
            }
        }

        GamePhase::GameOver => {}
    }

    events
}

/// Reset counters, spawn the first batch and go live
fn begin_run(state: &mut GameState, events: &mut Vec<GameEvent>) {
    let session = &mut state.session;
    session.lives = state.starting_lives;
    session.round = 1;
    session.elapsed_ms = 0.0;
    session.pause_reason = PauseReason::None;
    session.phase = GamePhase::Running;

    state.collision.reset();
    state.scheduler.clear();
    let batch = state.scheduler.spawn(0.0, 1);

    log::info!("Run started (seed {})", state.seed);
    events.push(GameEvent::RunStarted);
    events.push(GameEvent::HazardsSpawned {
        batch: batch.id,
        round: batch.round,
        cells: batch.cells(),
    });
}

fn run_frame(state: &mut GameState, dt_ms: f64, events: &mut Vec<GameEvent>) {
    // 1. Session clock
    state.session.elapsed_ms += dt_ms;
    let now = state.session.elapsed_ms;

    // 2. Round-window timers
    state.collision.advance_timers(dt_ms);

    // 3. Hazard scheduler
    let round_before = state.session.round;
    let sched = state.scheduler.tick(now, &mut state.session.round);
    debug_assert!(state.session.round >= round_before);

    if !sched.activated.is_empty() {
        let batch = state.scheduler.batch().map(|b| b.id).unwrap_or_default();
        log::debug!("Batch {} active: {:?}", batch, sched.activated);
        events.push(GameEvent::HazardsActivated {
            batch,
            cells: sched.activated,
        });
    }
    if sched.replaced.is_some() {
        events.push(GameEvent::RoundAdvanced {
            round: state.session.round,
        });
        if let Some(batch) = state.scheduler.batch() {
            events.push(GameEvent::HazardsSpawned {
                batch: batch.id,
                round: batch.round,
                cells: batch.cells(),
            });
        }
    }

    // 4. Collision
    let player = state.stabilizer.cell();
    if let Some(hit) = state
        .collision
        .evaluate(player, state.scheduler.batch(), now)
    {
        state.session.lives = state.session.lives.saturating_sub(1);
        log::info!(
            "Hit in {} after {:.0}ms (batch {}), {} lives left",
            hit.cell,
            hit.dwell_ms,
            hit.batch_id,
            state.session.lives
        );
        events.push(GameEvent::LifeLost {
            cell: hit.cell,
            lives: state.session.lives,
        });
    }

    // 5. Lives
    if state.session.lives == 0 {
        state.session.phase = GamePhase::GameOver;
        log::info!(
            "Game over at round {} after {:.1}s",
            state.session.round,
            now / 1000.0
        );
        events.push(GameEvent::GameOver {
            round: state.session.round,
            elapsed_ms: now,
        });
        return;
    }

    // 6. Transitions
    if state.lost_frames >= state.tracking_loss_frames {
        events.extend(request_pause(state, PauseReason::Tracking));
    }
}

/// Pause a running session. Returns the event when the pause took effect.
///
/// A user or system pause also takes over a tracking pause, so the body
/// coming back no longer resumes the run on its own.
pub fn request_pause(state: &mut GameState, reason: PauseReason) -> Option<GameEvent> {
    let manual = matches!(reason, PauseReason::User | PauseReason::System);
    let allowed = match state.session.phase {
        GamePhase::Running => reason != PauseReason::None,
        GamePhase::Paused => manual && state.session.pause_reason == PauseReason::Tracking,
        _ => false,
    };
    if !allowed {
        return None;
    }
    state.session.phase = GamePhase::Paused;
    state.session.pause_reason = reason;
    state.collision.clear_dwell();
    log::info!("Paused ({:?})", reason);
    Some(GameEvent::Paused { reason })
}

/// Resume a user- or system-paused session.
///
/// Only the reason that caused the pause can lift it; tracking pauses lift
/// themselves when a body is seen again.
pub fn request_resume(state: &mut GameState, reason: PauseReason) -> Option<GameEvent> {
    let manual = matches!(reason, PauseReason::User | PauseReason::System);
    if state.session.phase != GamePhase::Paused || state.session.pause_reason != reason || !manual
    {
        return None;
    }
    state.session.phase = GamePhase::Running;
    state.session.pause_reason = PauseReason::None;
    log::info!("Resumed from {:?} pause", reason);
    Some(GameEvent::Resumed)
}
