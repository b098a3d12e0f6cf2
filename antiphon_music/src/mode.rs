// Scale types and harmonic contexts.
//
// A harmonic context is a root pitch class plus a scale type. The scale
// table is a fixed enumeration (mode -> semitone offsets from the root), and
// membership is a pure octave-invariant lookup, so no music-theory object
// model is needed to constrain generated pitches.
//
// Chord names follow the lead-sheet convention used by the progression
// ("Fm", "Bb7", "C#m7"): the root letter and accidentals pick the pitch
// class, the quality suffix picks the scale.
//
// Used by progression.rs to resolve each bar and by assemble.rs to filter
// sampled pitch sets.

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// The seven diatonic modes, each defined by its interval pattern from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Major scale: 1 2 3 4 5 6 7
    Ionian,
    /// Minor with raised 6th: 1 2 b3 4 5 6 b7
    Dorian,
    /// Minor with lowered 2nd: 1 b2 b3 4 5 b6 b7
    Phrygian,
    /// Major with raised 4th: 1 2 3 #4 5 6 7
    Lydian,
    /// Major with lowered 7th: 1 2 3 4 5 6 b7
    Mixolydian,
    /// Natural minor: 1 2 b3 4 5 b6 b7
    Aeolian,
    /// 1 b2 b3 4 b5 b6 b7
    Locrian,
}

impl Mode {
    /// Semitone intervals from the root to each of the 7 scale degrees.
    pub fn intervals(self) -> [u8; 7] {
        match self {
            Mode::Ionian => [0, 2, 4, 5, 7, 9, 11],
            Mode::Dorian => [0, 2, 3, 5, 7, 9, 10],
            Mode::Phrygian => [0, 1, 3, 5, 7, 8, 10],
            Mode::Lydian => [0, 2, 4, 6, 7, 9, 11],
            Mode::Mixolydian => [0, 2, 4, 5, 7, 9, 10],
            Mode::Aeolian => [0, 2, 3, 5, 7, 8, 10],
            Mode::Locrian => [0, 1, 3, 5, 6, 8, 10],
        }
    }

    /// Membership table indexed by pitch class relative to the root.
    pub fn pitch_classes(self) -> [bool; 12] {
        let mut pcs = [false; 12];
        for &interval in &self.intervals() {
            pcs[interval as usize] = true;
        }
        pcs
    }

    /// Scale implied by a chord-quality suffix, or `None` if unrecognized.
    pub fn from_chord_quality(suffix: &str) -> Option<Mode> {
        match suffix {
            "" | "maj" => Some(Mode::Ionian),
            "m" | "min" => Some(Mode::Aeolian),
            "7" => Some(Mode::Mixolydian),
            "m7" => Some(Mode::Dorian),
            _ => None,
        }
    }
}

/// Parse a pitch-class name such as `"F"`, `"Bb"` or `"C#"` into 0..12.
pub fn parse_pitch_class(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let base: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let mut offset = 0i32;
    for c in chars {
        match c {
            '#' => offset += 1,
            'b' => offset -= 1,
            _ => return None,
        }
    }
    Some((base + offset).rem_euclid(12) as u8)
}

/// The key a bar is played in: root pitch class plus scale type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmonicContext {
    /// Pitch class of the root (0 = C, 5 = F, 10 = Bb, ...).
    pub root: u8,
    pub mode: Mode,
}

impl HarmonicContext {
    pub fn new(root: u8, mode: Mode) -> Self {
        HarmonicContext {
            root: root % 12,
            mode,
        }
    }

    /// Resolve a chord name like `"Fm"` or `"Bb7"`.
    ///
    /// The root is the leading letter plus any `#`/`b` accidentals; the rest
    /// is the quality suffix (see [`Mode::from_chord_quality`]).
    pub fn from_chord_name(chord: &str) -> Result<Self, GenerationError> {
        let chord = chord.trim();
        let root_len = chord
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c != '#' && c != 'b')
            .map(|(i, _)| i)
            .unwrap_or(chord.len());
        let (root_name, quality) = chord.split_at(root_len);
        let root = parse_pitch_class(root_name)
            .ok_or_else(|| GenerationError::config(format!("unknown chord root in {chord:?}")))?;
        let mode = Mode::from_chord_quality(quality).ok_or_else(|| {
            GenerationError::config(format!("unknown chord quality {quality:?} in {chord:?}"))
        })?;
        Ok(HarmonicContext::new(root, mode))
    }

    /// Octave-invariant scale membership of a MIDI pitch.
    pub fn contains(&self, pitch: u8) -> bool {
        let pc = (pitch % 12 + 12 - self.root) % 12;
        self.mode.pitch_classes()[pc as usize]
    }

    /// Keep only the pitches that belong to this context's scale, in their
    /// original order.
    pub fn filter(&self, pitches: &[u8]) -> Vec<u8> {
        pitches.iter().copied().filter(|&p| self.contains(p)).collect()
    }
}
