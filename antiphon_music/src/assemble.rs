// Response assembly: sampled slices -> timed notes.
//
// Walks the sampled slice sequence against the bar timeline. Each slice is
// filtered to the scale of the bar it lands in, its duration is snapped to
// the duration grid, and a random number of its remaining pitches (the
// lowest ones first) are emitted as a chord. Slices that end up with no
// pitches are skipped without advancing time; the walk is bounded by the
// length of the sampled sequence, so it always terminates.
//
// The humanize pass afterwards pulls the whole phrase earlier so that it
// starts at the configured offset.

use antiphon_prng::PhraseRng;
use serde::{Deserialize, Serialize};

use crate::progression::ChordProgression;
use crate::quantize::DurationGrid;
use crate::slice::Slice;

/// Subdivisions of a bar that note starts are snapped to.
const START_GRID_DIVISIONS: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratedNote {
    pub pitch: u8,
    /// Seconds from the start of the response.
    pub start: f64,
    pub end: f64,
    pub velocity: u8,
}

/// Running state of an assembly pass, returned when the pass finishes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    pub notes: Vec<GeneratedNote>,
    /// Timeline position after the last placed slice, seconds.
    pub end_time: f64,
    /// Slices that carried no pitches.
    pub skipped_empty: usize,
    /// Slices whose pitches all fell outside the active scale.
    pub skipped_filtered: usize,
}

pub struct ResponseAssembler<'a> {
    pub progression: &'a ChordProgression,
    pub grid: &'a DurationGrid,
    /// Seconds per bar.
    pub bar_duration: f64,
    /// No slice is placed at or after this time.
    pub total_duration: f64,
    pub velocity: u8,
    /// Upper bound on notes per chord; values below 1 are treated as 1.
    pub max_voices: usize,
}

impl ResponseAssembler<'_> {
    pub fn assemble(&self, slices: &[Slice], rng: &mut PhraseRng) -> Assembly {
        let mut state = Assembly::default();
        for slice in slices {
            if state.end_time >= self.total_duration {
                break;
            }
            state = self.place(state, slice, rng);
        }
        tracing::debug!(
            notes = state.notes.len(),
            end_time = state.end_time,
            skipped_empty = state.skipped_empty,
            skipped_filtered = state.skipped_filtered,
            "assembled response"
        );
        state
    }

    fn place(&self, mut state: Assembly, slice: &Slice, rng: &mut PhraseRng) -> Assembly {
        if slice.is_empty() {
            state.skipped_empty += 1;
            return state;
        }

        let now = state.end_time;
        let context = self.progression.context_at(now, self.bar_duration);
        let filtered = context.filter(slice.pitches());
        if filtered.is_empty() {
            tracing::debug!(time = now, ?context, pitches = ?slice.pitches(), "slice filtered out");
            state.skipped_filtered += 1;
            return state;
        }

        let duration = self.grid.quantize(slice.duration() / self.bar_duration) * self.bar_duration;
        let num_notes = rng.range_usize_inclusive(1, self.max_voices.max(1).min(filtered.len()));
        let start = self.snap_start(now);

        state
            .notes
            .extend(filtered[..num_notes].iter().map(|&pitch| GeneratedNote {
                pitch,
                start,
                end: now + duration,
                velocity: self.velocity,
            }));
        state.end_time = now + duration;
        state
    }

    /// Latest sixteenth-of-a-bar grid point at or before `time`.
    fn snap_start(&self, time: f64) -> f64 {
        let step = self.bar_duration / START_GRID_DIVISIONS;
        ((time / step + 1e-9).floor() * step).min(time)
    }
}

/// Shift every note earlier so the first onset lands on `start_at`.
///
/// Phrases that already start at or before `start_at` are returned as is;
/// notes are never moved later.
pub fn humanize(mut notes: Vec<GeneratedNote>, start_at: f64) -> Vec<GeneratedNote> {
    let Some(earliest) = notes.iter().map(|n| n.start).reduce(f64::min) else {
        return notes;
    };
    let shift = earliest - start_at;
    if shift <= 0.0 {
        return notes;
    }
    for note in &mut notes {
        note.start -= shift;
        note.end -= shift;
    }
    tracing::debug!(shift, "shifted response earlier");
    notes
}
