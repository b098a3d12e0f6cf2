// Generator configuration.
//
// All options have defaults, so a JSON config file only needs to name the
// fields it changes. `validate` is called at the start of every run and
// turns out-of-range values into `InvalidConfig` before any work is done.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::GenerationError;
use crate::markov::SuccessorFallback;
use crate::progression::{ChordProgression, ProgressionEntry, minor_blues};
use crate::quantize::{DEFAULT_DURATION_GRID, DurationGrid};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Markov chain order (state length in slices).
    pub order: usize,
    /// Slice extraction window, seconds.
    pub window: f64,
    /// Length of the response in bars.
    pub bars: u32,
    /// Tempo in quarter notes per minute.
    pub qpm: f64,
    pub beats_per_bar: u32,
    /// Earliest note onset after humanizing, seconds.
    pub start_at: f64,
    /// Allowed note durations as fractions of a bar, ascending.
    pub duration_grid: Vec<f64>,
    /// Slices sampled per run before the assembler trims to `bars`.
    pub max_events: usize,
    /// Upper bound on simultaneous notes emitted for one slice.
    pub max_voices: usize,
    pub velocity: u8,
    pub fallback: SuccessorFallback,
    pub progression: Vec<ProgressionEntry>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            order: 3,
            window: 0.25,
            bars: 12,
            qpm: 130.0,
            beats_per_bar: 4,
            start_at: 0.1,
            duration_grid: DEFAULT_DURATION_GRID.to_vec(),
            max_events: 100,
            max_voices: 5,
            velocity: 95,
            fallback: SuccessorFallback::Generated,
            progression: minor_blues(),
        }
    }
}

impl GeneratorConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, GenerationError> {
        let data = std::fs::read_to_string(path)?;
        let config: GeneratorConfig = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Seconds per bar.
    pub fn bar_duration(&self) -> f64 {
        self.beats_per_bar as f64 * 60.0 / self.qpm
    }

    /// Length of the response in seconds.
    pub fn total_duration(&self) -> f64 {
        self.bars as f64 * self.bar_duration()
    }

    pub fn duration_grid(&self) -> Result<DurationGrid, GenerationError> {
        DurationGrid::new(self.duration_grid.clone())
    }

    pub fn chord_progression(&self) -> Result<ChordProgression, GenerationError> {
        ChordProgression::from_entries(&self.progression, self.beats_per_bar)
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.order == 0 {
            return Err(GenerationError::config("order must be at least 1"));
        }
        if !(self.window.is_finite() && self.window > 0.0) {
            return Err(GenerationError::config("window must be positive"));
        }
        if self.bars == 0 {
            return Err(GenerationError::config("bars must be at least 1"));
        }
        if !(self.qpm.is_finite() && self.qpm > 0.0) {
            return Err(GenerationError::config("qpm must be positive"));
        }
        if self.beats_per_bar == 0 {
            return Err(GenerationError::config("beats_per_bar must be at least 1"));
        }
        if !(self.start_at.is_finite() && self.start_at >= 0.0) {
            return Err(GenerationError::config("start_at must be non-negative"));
        }
        if self.max_voices == 0 {
            return Err(GenerationError::config("max_voices must be at least 1"));
        }
        if !(1..=127).contains(&self.velocity) {
            return Err(GenerationError::config("velocity must be in 1..=127"));
        }
        self.duration_grid()?;
        self.chord_progression()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GeneratorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.order, 3);
        assert_eq!(config.progression.len(), 12);
    }

    #[test]
    fn test_bar_duration() {
        let config = GeneratorConfig {
            qpm: 120.0,
            ..Default::default()
        };
        assert!((config.bar_duration() - 2.0).abs() < 1e-12);
        assert!((config.total_duration() - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"order": 2, "fallback": "backoff"}"#).unwrap();
        assert_eq!(config.order, 2);
        assert_eq!(config.fallback, SuccessorFallback::Backoff);
        assert_eq!(config.window, 0.25);
        assert_eq!(config.progression, minor_blues());
    }

    #[test]
    fn test_progression_from_json() {
        let config: GeneratorConfig = serde_json::from_str(
            r#"{"progression": [{"chord": "D", "beats": 8, "mode": "dorian"}, {"chord": "A7", "beats": 4}]}"#,
        )
        .unwrap();
        let prog = config.chord_progression().unwrap();
        assert_eq!(prog.len(), 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad = [
            GeneratorConfig {
                order: 0,
                ..Default::default()
            },
            GeneratorConfig {
                duration_grid: vec![],
                ..Default::default()
            },
            GeneratorConfig {
                window: 0.0,
                ..Default::default()
            },
            GeneratorConfig {
                velocity: 0,
                ..Default::default()
            },
            GeneratorConfig {
                progression: vec![ProgressionEntry::new("Fm", 3)],
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(GenerationError::InvalidConfig(_))),
                "{config:?} should be rejected"
            );
        }
    }
}
