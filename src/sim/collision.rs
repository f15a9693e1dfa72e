//! Dwell-on-cell collision detection
//!
//! The player's single stabilized cell is checked against the active hazards
//! of the live batch. Touching an active cell is not enough: the player must
//! stay in it for `dwell_ms`, outside the post-activation grace window and
//! outside the post-hit cooldown. A batch can cost at most one life.
//!
//! After a hit the cell is spent until the player leaves it, so standing
//! still never drains more than one life.

use super::grid::Cell;
use super::hazards::HazardBatch;

/// When the player first entered a hazardous cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwellRecord {
    pub cell: Cell,
    /// Session time of entry
    pub since_ms: f64,
}

/// A qualifying collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub cell: Cell,
    pub batch_id: u64,
    /// How long the player had been in the cell
    pub dwell_ms: f64,
}

/// Collision timing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwellRules {
    pub dwell_ms: f64,
    pub spawn_grace_ms: f64,
    pub hit_cooldown_ms: f64,
}

/// Tracks dwell, cooldown and per-batch hit state
#[derive(Debug, Clone)]
pub struct CollisionDetector {
    rules: DwellRules,
    dwell: Option<DwellRecord>,
    /// Cell where the last hit landed, until the player leaves it
    spent_cell: Option<Cell>,
    /// Remaining post-hit cooldown
    cooldown_ms: f64,
    /// Batch that already cost a life
    hit_batch: Option<u64>,
    /// Player cell seen on the previous evaluation
    last_cell: Option<Cell>,
}

impl CollisionDetector {
    pub fn new(rules: DwellRules) -> Self {
        Self {
            rules,
            dwell: None,
            spent_cell: None,
            cooldown_ms: 0.0,
            hit_batch: None,
            last_cell: None,
        }
    }

    /// Count down the post-hit cooldown
    pub fn advance_timers(&mut self, dt_ms: f64) {
        self.cooldown_ms = (self.cooldown_ms - dt_ms).max(0.0);
    }

    /// Evaluate the player's cell against the live batch at `now_ms`
    pub fn evaluate(
        &mut self,
        player: Option<Cell>,
        batch: Option<&HazardBatch>,
        now_ms: f64,
    ) -> Option<Hit> {
        if player != self.last_cell {
            self.dwell = None;
            if self.spent_cell.is_some() && self.spent_cell != player {
                self.spent_cell = None;
            }
            self.last_cell = player;
        }

        let cell = player?;
        let batch = batch?;
        let Some(hazard) = batch.active_at(cell) else {
            self.dwell = None;
            return None;
        };

        if self.spent_cell == Some(cell) {
            return None;
        }

        let record = *self.dwell.get_or_insert(DwellRecord {
            cell,
            since_ms: now_ms,
        });

        let dwelled = now_ms - record.since_ms;
        let in_grace = now_ms - hazard.phase_started_at < self.rules.spawn_grace_ms;
        let cooling = self.cooldown_ms > 0.0;
        let batch_spent = self.hit_batch == Some(batch.id);

        if dwelled < self.rules.dwell_ms || in_grace || cooling || batch_spent {
            log::trace!(
                "dwell {} {:.0}ms (grace={}, cooldown={}, spent={})",
                cell,
                dwelled,
                in_grace,
                cooling,
                batch_spent
            );
            return None;
        }

        self.dwell = None;
        self.spent_cell = Some(cell);
        self.cooldown_ms = self.rules.hit_cooldown_ms;
        self.hit_batch = Some(batch.id);

        Some(Hit {
            cell,
            batch_id: batch.id,
            dwell_ms: dwelled,
        })
    }

    /// Current dwell record, if the player is inside an active hazard
    pub fn dwell(&self) -> Option<DwellRecord> {
        self.dwell
    }

    /// Drop the in-progress dwell (e.g. on pause)
    pub fn clear_dwell(&mut self) {
        self.dwell = None;
    }

    /// Forget everything (new session)
    pub fn reset(&mut self) {
        *self = Self::new(self.rules);
    }
}
