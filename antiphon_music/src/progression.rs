// Cyclic chord progression: bar index -> harmonic context.
//
// A progression is specified as an ordered list of (chord, beats) entries and
// expanded once into one harmonic context per bar. Lookups wrap modulo the
// bar count, so any non-negative time resolves to a context.

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::mode::{HarmonicContext, Mode};

/// Slack, in bars, for accumulated floating-point error at barlines.
const BARLINE_TOLERANCE: f64 = 1e-9;

/// One entry of a progression as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionEntry {
    /// Lead-sheet chord name, e.g. `"Fm"`.
    pub chord: String,
    /// Length in beats; must be a whole number of bars.
    pub beats: u32,
    /// Overrides the scale implied by the chord quality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
}

impl ProgressionEntry {
    pub fn new(chord: &str, beats: u32) -> Self {
        ProgressionEntry {
            chord: chord.to_string(),
            beats,
            mode: None,
        }
    }
}

/// Twelve-bar minor blues in F, one chord per 4/4 bar.
pub fn minor_blues() -> Vec<ProgressionEntry> {
    [
        "Fm", "Fm", "Fm", "Fm", "Bbm", "Bbm", "Fm", "Fm", "Cm", "Bbm", "Fm", "Fm",
    ]
    .iter()
    .map(|chord| ProgressionEntry::new(chord, 4))
    .collect()
}

#[derive(Debug, Clone)]
pub struct ChordProgression {
    bars: Vec<HarmonicContext>,
}

impl ChordProgression {
    /// Expand progression entries into a per-bar table.
    ///
    /// Fails with `InvalidConfig` on an empty list, an unparseable chord, or
    /// an entry that is not a positive whole number of bars long.
    pub fn from_entries(
        entries: &[ProgressionEntry],
        beats_per_bar: u32,
    ) -> Result<Self, GenerationError> {
        if entries.is_empty() {
            return Err(GenerationError::config("chord progression is empty"));
        }
        if beats_per_bar == 0 {
            return Err(GenerationError::config("beats_per_bar must be at least 1"));
        }
        let mut bars = Vec::new();
        for entry in entries {
            if entry.beats == 0 || entry.beats % beats_per_bar != 0 {
                return Err(GenerationError::config(format!(
                    "chord {:?} lasts {} beats, not a whole number of {}-beat bars",
                    entry.chord, entry.beats, beats_per_bar
                )));
            }
            let mut context = HarmonicContext::from_chord_name(&entry.chord)?;
            if let Some(mode) = entry.mode {
                context.mode = mode;
            }
            let num_bars = (entry.beats / beats_per_bar) as usize;
            bars.extend(std::iter::repeat_n(context, num_bars));
        }
        Ok(ChordProgression { bars })
    }

    /// Number of bars before the progression repeats.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Context of a bar, wrapping cyclically.
    pub fn context_for_bar(&self, bar_index: usize) -> HarmonicContext {
        self.bars[bar_index % self.bars.len()]
    }

    /// Context active at `time` seconds, given the length of one bar.
    ///
    /// Times within rounding error below a barline count as the next bar.
    pub fn context_at(&self, time: f64, bar_duration: f64) -> HarmonicContext {
        let bar_index = (time.max(0.0) / bar_duration + BARLINE_TOLERANCE).floor() as usize;
        self.context_for_bar(bar_index)
    }
}
