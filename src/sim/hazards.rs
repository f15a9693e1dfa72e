//! Hazard scheduler
//!
//! Owns the live hazard batch and its phase timing. A batch is spawned as a
//! whole, every hazard starting in `Warning`; each flips to `Active` once its
//! warning time has run out, and once the oldest active hazard has been on
//! screen for `active_display_ms` the whole batch is swapped for a fresh one
//! and the round advances. That swap is the only place the round changes.
//!
//! All times are on the session clock (running milliseconds), so a paused
//! session freezes every phase.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::difficulty::DifficultyTable;
use super::grid::Cell;

/// Phase of a single hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardPhase {
    /// Forewarned, not yet dangerous
    Warning,
    /// Dangerous; collidable until the batch is replaced
    Active,
}

/// A cell in a warning or active danger phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub cell: Cell,
    pub phase: HazardPhase,
    /// Session time at which the current phase began
    pub phase_started_at: f64,
}

impl Hazard {
    pub fn is_active(&self) -> bool {
        self.phase == HazardPhase::Active
    }
}

/// The set of hazards spawned (and later replaced) together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardBatch {
    /// Monotonic batch id within a session
    pub id: u64,
    /// Round this batch was spawned for
    pub round: u32,
    /// Warning duration in effect for this batch
    pub warning_ms: f64,
    /// Hazards, sorted by cell index
    pub hazards: Vec<Hazard>,
}

impl HazardBatch {
    /// Active hazard covering `cell`, if any
    pub fn active_at(&self, cell: Cell) -> Option<&Hazard> {
        self.hazards
            .iter()
            .find(|h| h.cell == cell && h.is_active())
    }

    pub fn cells(&self) -> Vec<Cell> {
        self.hazards.iter().map(|h| h.cell).collect()
    }
}

/// What happened during one scheduler tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerTick {
    /// Cells that turned active this tick
    pub activated: Vec<Cell>,
    /// Set when the batch was replaced (and the round advanced)
    pub replaced: Option<u64>,
}

/// Batch lifecycle and difficulty curve
#[derive(Debug, Clone)]
pub struct HazardScheduler {
    rng: Pcg32,
    table: DifficultyTable,
    active_display_ms: f64,
    batch: Option<HazardBatch>,
    /// Cells of the batch most recently spawned (for repeat avoidance)
    previous_cells: Vec<Cell>,
    next_batch_id: u64,
}

impl HazardScheduler {
    pub fn new(table: DifficultyTable, active_display_ms: f64, seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            table,
            active_display_ms,
            batch: None,
            previous_cells: Vec::new(),
            next_batch_id: 1,
        }
    }

    /// Live batch (None before the first spawn)
    pub fn batch(&self) -> Option<&HazardBatch> {
        self.batch.as_ref()
    }

    /// Spawn a fresh batch for `round`, replacing any live one atomically
    pub fn spawn(&mut self, now_ms: f64, round: u32) -> &HazardBatch {
        let tier = self.table.tier_for(round);
        let cells = pick_cells(&mut self.rng, tier.hazard_count, &self.previous_cells);

        let id = self.next_batch_id;
        self.next_batch_id += 1;
        self.previous_cells = cells.clone();

        log::info!(
            "Round {} batch {}: {} hazards, {}ms warning, cells {:?}",
            round,
            id,
            cells.len(),
            tier.warning_ms,
            cells.iter().map(|c| c.index()).collect::<Vec<_>>()
        );

        self.batch.insert(HazardBatch {
            id,
            round,
            warning_ms: tier.warning_ms,
            hazards: cells
                .into_iter()
                .map(|cell| Hazard {
                    cell,
                    phase: HazardPhase::Warning,
                    phase_started_at: now_ms,
                })
                .collect(),
        })
    }

    /// Advance phases at `now_ms`.
    ///
    /// Increments `round` exactly when the batch is replaced; nothing else in
    /// the engine touches it after the run begins.
    pub fn tick(&mut self, now_ms: f64, round: &mut u32) -> SchedulerTick {
        let mut out = SchedulerTick::default();
        let Some(batch) = self.batch.as_mut() else {
            return out;
        };

        for hazard in &mut batch.hazards {
            if hazard.phase == HazardPhase::Warning
                && now_ms - hazard.phase_started_at >= batch.warning_ms
            {
                hazard.phase = HazardPhase::Active;
                hazard.phase_started_at = now_ms;
                out.activated.push(hazard.cell);
            }
        }

        let oldest_active = batch
            .hazards
            .iter()
            .filter(|h| h.is_active())
            .map(|h| h.phase_started_at)
            .reduce(f64::min);

        if let Some(oldest) = oldest_active
            && now_ms - oldest >= self.active_display_ms
        {
            let finished = batch.id;
            *round += 1;
            self.spawn(now_ms, *round);
            out.replaced = Some(finished);
        }

        out
    }

    /// Drop the live batch (new session)
    pub fn clear(&mut self) {
        self.batch = None;
        self.previous_cells.clear();
    }
}

/// Sample `count` distinct cells without replacement.
///
/// Cells from the previous batch are excluded when enough others remain;
/// otherwise the full grid is used. Output is sorted by index.
pub fn pick_cells(rng: &mut Pcg32, count: usize, previous: &[Cell]) -> Vec<Cell> {
    let fresh: Vec<Cell> = Cell::ALL
        .iter()
        .copied()
        .filter(|c| !previous.contains(c))
        .collect();

    let mut pool = if fresh.len() >= count {
        fresh
    } else {
        Cell::ALL.to_vec()
    };

    pool.shuffle(rng);
    pool.truncate(count);
    pool.sort();
    pool
}
