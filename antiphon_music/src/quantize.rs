// Duration quantization onto a fixed grid of bar fractions.

use crate::error::GenerationError;

/// Default candidate durations, as fractions of a bar.
pub const DEFAULT_DURATION_GRID: [f64; 8] = [
    1.0 / 16.0,
    1.0 / 8.0,
    3.0 / 16.0,
    1.0 / 4.0,
    3.0 / 8.0,
    1.0 / 2.0,
    3.0 / 4.0,
    1.0,
];

/// A validated, strictly ascending, non-empty set of positive durations.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationGrid {
    candidates: Vec<f64>,
}

impl DurationGrid {
    pub fn new(candidates: Vec<f64>) -> Result<Self, GenerationError> {
        if candidates.is_empty() {
            return Err(GenerationError::config("duration grid is empty"));
        }
        if candidates.iter().any(|&c| !c.is_finite() || c <= 0.0) {
            return Err(GenerationError::config(
                "duration grid values must be positive and finite",
            ));
        }
        if candidates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(GenerationError::config(
                "duration grid must be strictly ascending",
            ));
        }
        Ok(DurationGrid { candidates })
    }

    pub fn candidates(&self) -> &[f64] {
        &self.candidates
    }

    /// Snap `d` to the nearest candidate. On an exact tie the smaller
    /// candidate wins.
    pub fn quantize(&self, d: f64) -> f64 {
        let mut best = self.candidates[0];
        let mut best_dist = (best - d).abs();
        for &candidate in &self.candidates[1..] {
            let dist = (candidate - d).abs();
            if dist < best_dist {
                best = candidate;
                best_dist = dist;
            }
        }
        best
    }
}

impl Default for DurationGrid {
    fn default() -> Self {
        DurationGrid {
            candidates: DEFAULT_DURATION_GRID.to_vec(),
        }
    }
}
