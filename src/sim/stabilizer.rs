//! Position stabilizer
//!
//! Turns a noisy normalized position into a stable grid cell in two steps:
//! an exponential moving average per axis, then a banded quantizer with
//! hysteresis so a sample sitting on a 1/3 or 2/3 boundary cannot flicker
//! between neighbouring cells.
//!
//! Row and column use identical logic. Loss of input leaves the state alone;
//! only a session reset clears it.

use glam::Vec2;

use super::grid::Cell;
use crate::consts::GRID_SIZE;

/// Smoothed position plus the current band on each axis
#[derive(Debug, Clone)]
pub struct PositionStabilizer {
    /// Weight of the newest sample
    alpha: f32,
    /// Distance past a boundary required to change band
    margin: f32,
    /// EMA state (None until the first sample of the session)
    smoothed: Option<Vec2>,
    /// Current (row, col) bands
    bands: Option<(u8, u8)>,
}

impl PositionStabilizer {
    pub fn new(alpha: f32, margin: f32) -> Self {
        Self {
            alpha,
            margin,
            smoothed: None,
            bands: None,
        }
    }

    /// Feed one normalized sample; returns the stabilized cell.
    ///
    /// Non-finite samples are dropped and the last known cell is returned.
    pub fn update(&mut self, raw: Vec2) -> Option<Cell> {
        if !raw.is_finite() {
            return self.cell();
        }

        let smoothed = match self.smoothed {
            Some(prev) => prev.lerp(raw, self.alpha),
            None => raw,
        };
        self.smoothed = Some(smoothed);

        let (row, col) = match self.bands {
            Some((row, col)) => (
                band_with_hysteresis(row, smoothed.y, self.margin),
                band_with_hysteresis(col, smoothed.x, self.margin),
            ),
            None => (seed_band(smoothed.y), seed_band(smoothed.x)),
        };

        if self.bands != Some((row, col)) {
            log::trace!("stabilizer band -> row {} col {} at {:?}", row, col, smoothed);
        }
        self.bands = Some((row, col));
        self.cell()
    }

    /// Current stabilized cell (None before the first sample)
    pub fn cell(&self) -> Option<Cell> {
        self.bands.map(|(row, col)| Cell::new(row, col))
    }

    /// Current stabilized column
    pub fn col(&self) -> Option<u8> {
        self.bands.map(|(_, col)| col)
    }

    /// Smoothed position (None before the first sample)
    pub fn smoothed(&self) -> Option<Vec2> {
        self.smoothed
    }

    /// Forget everything (new session)
    pub fn reset(&mut self) {
        self.smoothed = None;
        self.bands = None;
    }
}

/// Lower boundary of band `k` (k = 1, 2 gives 1/3, 2/3)
#[inline]
fn boundary(k: u8) -> f32 {
    k as f32 / GRID_SIZE as f32
}

/// Initial band: floor of the scaled value, clamped onto the grid
fn seed_band(v: f32) -> u8 {
    let max = (GRID_SIZE - 1) as f32;
    (v * GRID_SIZE as f32).floor().clamp(0.0, max) as u8
}

/// Move from `current` only once `v` is past a boundary by more than `margin`.
///
/// Loops so a single large jump can cross several bands.
pub fn band_with_hysteresis(current: u8, v: f32, margin: f32) -> u8 {
    let mut band = current.min(GRID_SIZE - 1);
    while band < GRID_SIZE - 1 && v > boundary(band + 1) + margin {
        band += 1;
    }
    while band > 0 && v < boundary(band) - margin {
        band -= 1;
    }
    band
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: f32 = 0.05;

    #[test]
    fn test_first_sample_seeds_directly() {
        let mut s = PositionStabilizer::new(0.3, H);
        assert_eq!(s.cell(), None);
        assert_eq!(s.update(Vec2::new(0.9, 0.1)), Some(Cell::new(0, 2)));
        assert_eq!(s.smoothed(), Some(Vec2::new(0.9, 0.1)));
    }

    #[test]
    fn test_seed_clamps_out_of_range() {
        let mut s = PositionStabilizer::new(0.3, H);
        assert_eq!(s.update(Vec2::new(1.4, -0.2)), Some(Cell::new(0, 2)));
        s.reset();
        assert_eq!(s.update(Vec2::new(1.0, 1.0)), Some(Cell::new(2, 2)));
    }

    #[test]
    fn test_ema_blend() {
        let mut s = PositionStabilizer::new(0.3, H);
        s.update(Vec2::new(0.0, 0.0));
        s.update(Vec2::new(1.0, 1.0));
        let p = s.smoothed().unwrap();
        assert!((p.x - 0.3).abs() < 1e-6);
        assert!((p.y - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_boundary_sample_does_not_flip() {
        // Seeded at column 0, a sample right on 1/3 stays in column 0
        assert_eq!(band_with_hysteresis(0, 1.0 / 3.0, H), 0);
        assert_eq!(band_with_hysteresis(0, 1.0 / 3.0 + H, H), 0);
        assert_eq!(band_with_hysteresis(0, 1.0 / 3.0 + H + 0.001, H), 1);
        // Coming back down requires the same margin
        assert_eq!(band_with_hysteresis(1, 1.0 / 3.0 - 0.04, H), 1);
        assert_eq!(band_with_hysteresis(1, 1.0 / 3.0 - H - 0.001, H), 0);
    }

    #[test]
    fn test_large_jump_crosses_two_bands() {
        assert_eq!(band_with_hysteresis(0, 0.95, H), 2);
        assert_eq!(band_with_hysteresis(2, 0.02, H), 0);
    }

    #[test]
    fn test_loss_keeps_last_cell() {
        let mut s = PositionStabilizer::new(0.3, H);
        s.update(Vec2::new(0.5, 0.5));
        assert_eq!(s.update(Vec2::new(f32::NAN, 0.5)), Some(Cell::new(1, 1)));
        assert_eq!(s.cell(), Some(Cell::new(1, 1)));
        assert_eq!(s.col(), Some(1));
    }

    #[test]
    fn test_smoothed_walk_moves_after_margin() {
        let mut s = PositionStabilizer::new(0.3, H);
        s.update(Vec2::new(0.1, 0.5));
        // Walk to the far right; EMA lags, so the column climbs over frames
        let mut cols = Vec::new();
        for _ in 0..30 {
            cols.push(s.update(Vec2::new(0.9, 0.5)).unwrap().col);
        }
        assert!(cols.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*cols.last().unwrap(), 2);
    }
}
