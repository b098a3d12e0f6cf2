// Note events and polyphonic slices.
//
// A slice groups every note whose onset falls inside one extraction window:
// its pitch set is what the performer played "together", its duration spans
// from the earliest onset to the latest release in the group. Slices are the
// alphabet of the Markov chain (markov.rs), so they must be totally ordered
// and hashable; durations are therefore held as whole milliseconds.

use serde::{Deserialize, Serialize};

/// One played note, in seconds from the start of the recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub onset: f64,
    pub offset: f64,
    /// MIDI pitch, 0..=127.
    pub pitch: u8,
}

impl Event {
    pub fn new(onset: f64, offset: f64, pitch: u8) -> Self {
        Event {
            onset,
            offset,
            pitch,
        }
    }
}

/// A set of simultaneous pitches plus the span they occupied.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slice {
    /// Distinct pitches, ascending.
    pitches: Vec<u8>,
    /// Always at least 1.
    duration_ms: u32,
}

impl Slice {
    /// Build a slice from any pitch collection and a duration in seconds.
    ///
    /// Pitches are sorted and deduplicated. The duration is rounded to the
    /// millisecond and clamped to at least 1 ms.
    pub fn new(pitches: impl IntoIterator<Item = u8>, duration: f64) -> Self {
        let mut pitches: Vec<u8> = pitches.into_iter().collect();
        pitches.sort_unstable();
        pitches.dedup();
        let duration_ms = (duration * 1000.0).round().max(1.0) as u32;
        Slice {
            pitches,
            duration_ms,
        }
    }

    pub fn pitches(&self) -> &[u8] {
        &self.pitches
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }
}

/// Group onset-ordered events into windowed slices.
///
/// A window opens at the onset of the first event not yet consumed and
/// closes `window` seconds later; every event whose onset is at or before
/// the close joins it. The first event past the close starts a new window.
/// Empty input gives an empty sequence.
pub fn extract_slices(events: &[Event], window: f64) -> Vec<Slice> {
    let mut slices = Vec::new();
    let Some(first) = events.first() else {
        return slices;
    };

    let mut group: Vec<&Event> = Vec::new();
    let mut window_end = first.onset + window;

    for event in events {
        if event.onset > window_end {
            if let Some(slice) = close_group(&group) {
                slices.push(slice);
            }
            group.clear();
            window_end = event.onset + window;
        }
        group.push(event);
    }
    if let Some(slice) = close_group(&group) {
        slices.push(slice);
    }

    slices
}

fn close_group(group: &[&Event]) -> Option<Slice> {
    if group.is_empty() {
        return None;
    }
    let start = group.iter().map(|e| e.onset).fold(f64::INFINITY, f64::min);
    let end = group.iter().map(|e| e.offset).fold(f64::NEG_INFINITY, f64::max);
    Some(Slice::new(group.iter().map(|e| e.pitch), end - start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(extract_slices(&[], 0.25).is_empty());
    }

    #[test]
    fn test_groups_by_window() {
        let events = [
            Event::new(0.0, 0.5, 64),
            Event::new(0.1, 0.3, 60),
            Event::new(0.25, 0.4, 64),
            Event::new(1.0, 1.2, 67),
            Event::new(1.3, 1.6, 69),
        ];
        let slices = extract_slices(&events, 0.25);
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0].pitches(), &[60, 64]);
        assert!((slices[0].duration() - 0.5).abs() < 1e-9);
        assert_eq!(slices[1].pitches(), &[67]);
        assert_eq!(slices[2].pitches(), &[69]);

        let wide = extract_slices(&events, 0.5);
        assert_eq!(wide.len(), 2);
        assert_eq!(wide[1].pitches(), &[67, 69]);
        assert!((wide[1].duration() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_last_group_flushed() {
        let events = [Event::new(0.0, 0.2, 60), Event::new(2.0, 2.3, 62)];
        let slices = extract_slices(&events, 0.25);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[1], Slice::new([62], 0.3));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let events = [Event::new(0.0, 0.1, 60), Event::new(0.25, 0.4, 62)];
        let slices = extract_slices(&events, 0.25);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].pitches(), &[60, 62]);
    }

    #[test]
    fn test_slice_normalizes() {
        let s = Slice::new([65, 62, 65], 0.30004);
        assert_eq!(s.pitches(), &[62, 65]);
        assert_eq!(s, Slice::new([62, 65], 0.3));
        assert!(Slice::new([60], 0.0).duration() > 0.0);
    }
}
