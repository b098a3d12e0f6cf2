// Standard MIDI File import and export.
//
// Import flattens every track and channel of an SMF into one onset-ordered
// list of note events in seconds, honouring tempo changes (metrical timing)
// or the fixed frame rate (timecode timing). Export writes a response as a
// format-1 file: a tempo track plus one piano track.
//
// Uses the `midly` crate for parsing and writing.

use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use crate::assemble::GeneratedNote;
use crate::error::GenerationError;
use crate::slice::Event;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Tempo assumed until the first tempo meta event (120 qpm).
const DEFAULT_MICROS_PER_QUARTER: u32 = 500_000;

/// Read a MIDI file into note events.
pub fn read_events(path: &Path) -> Result<Vec<Event>, GenerationError> {
    let data = std::fs::read(path)?;
    events_from_bytes(&data)
}

/// Parse in-memory SMF bytes into onset-ordered note events.
///
/// Note-on with velocity 0 is treated as note-off. Overlapping notes of the
/// same key on the same channel are paired first-in first-out. Notes still
/// held at the end of the file are closed at the last event time; notes of
/// zero length are dropped.
pub fn events_from_bytes(data: &[u8]) -> Result<Vec<Event>, GenerationError> {
    let smf = Smf::parse(data)?;

    let mut timeline: Vec<(u64, TrackEventKind<'_>)> = Vec::new();
    for track in &smf.tracks {
        let mut tick: u64 = 0;
        for event in track {
            tick += event.delta.as_int() as u64;
            timeline.push((tick, event.kind));
        }
    }
    timeline.sort_by_key(|&(tick, _)| tick);

    let mut clock = TickClock::new(smf.header.timing);
    let mut held: BTreeMap<(u8, u8), VecDeque<f64>> = BTreeMap::new();
    let mut events = Vec::new();
    let mut last_time = 0.0;

    for (tick, kind) in timeline {
        let time = clock.seconds(tick);
        last_time = time;
        match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(micros)) => {
                clock.set_tempo(tick, micros.as_int());
            }
            TrackEventKind::Midi { channel, message } => {
                let (key, on) = match message {
                    MidiMessage::NoteOn { key, vel } => (key.as_int(), vel.as_int() > 0),
                    MidiMessage::NoteOff { key, .. } => (key.as_int(), false),
                    _ => continue,
                };
                let slot = (channel.as_int(), key);
                if on {
                    held.entry(slot).or_default().push_back(time);
                } else if let Some(onset) = held
                    .get_mut(&slot)
                    .and_then(VecDeque::pop_front)
                    .filter(|&onset| time > onset)
                {
                    events.push(Event::new(onset, time, key));
                }
            }
            _ => {}
        }
    }

    for ((_, key), onsets) in held {
        for onset in onsets {
            if last_time > onset {
                events.push(Event::new(onset, last_time, key));
            }
        }
    }

    events.sort_by(|a, b| a.onset.total_cmp(&b.onset).then(a.pitch.cmp(&b.pitch)));
    Ok(events)
}

/// Converts absolute ticks to seconds across tempo changes.
///
/// Ticks must be queried in non-decreasing order.
struct TickClock {
    /// Metrical resolution, or `None` for timecode timing.
    ticks_per_quarter: Option<f64>,
    seconds_per_tick: f64,
    anchor_tick: u64,
    anchor_seconds: f64,
}

impl TickClock {
    fn new(timing: Timing) -> Self {
        match timing {
            Timing::Metrical(tpq) => {
                let tpq = tpq.as_int().max(1) as f64;
                TickClock {
                    ticks_per_quarter: Some(tpq),
                    seconds_per_tick: DEFAULT_MICROS_PER_QUARTER as f64 / 1e6 / tpq,
                    anchor_tick: 0,
                    anchor_seconds: 0.0,
                }
            }
            Timing::Timecode(fps, subframes) => TickClock {
                ticks_per_quarter: None,
                seconds_per_tick: 1.0 / (fps.as_f32() as f64 * subframes.max(1) as f64),
                anchor_tick: 0,
                anchor_seconds: 0.0,
            },
        }
    }

    fn seconds(&self, tick: u64) -> f64 {
        self.anchor_seconds + (tick - self.anchor_tick) as f64 * self.seconds_per_tick
    }

    fn set_tempo(&mut self, tick: u64, micros_per_quarter: u32) {
        let Some(tpq) = self.ticks_per_quarter else {
            return;
        };
        self.anchor_seconds = self.seconds(tick);
        self.anchor_tick = tick;
        self.seconds_per_tick = micros_per_quarter as f64 / 1e6 / tpq;
    }
}

/// Write a response to a MIDI file at the given tempo.
pub fn write_notes(notes: &[GeneratedNote], qpm: f64, path: &Path) -> Result<(), GenerationError> {
    let buf = notes_to_bytes(notes, qpm)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

/// Encode a response as SMF bytes.
pub fn notes_to_bytes(notes: &[GeneratedNote], qpm: f64) -> Result<Vec<u8>, GenerationError> {
    let smf = notes_to_smf(notes, qpm);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

fn notes_to_smf(notes: &[GeneratedNote], qpm: f64) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track
    let micros_per_quarter = (60_000_000.0 / qpm).round().clamp(1.0, 0xFF_FFFF as f64) as u32;
    let tempo_track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros_per_quarter))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ];
    smf.tracks.push(tempo_track);

    let channel = u4::new(0);
    let ticks_per_second = qpm / 60.0 * TICKS_PER_QUARTER as f64;
    let to_tick = |seconds: f64| (seconds.max(0.0) * ticks_per_second).round() as u32;

    // (tick, note-offs before note-ons at the same tick, message)
    let mut messages: Vec<(u32, u8, MidiMessage)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        let key = u7::new(note.pitch.min(127));
        messages.push((
            to_tick(note.start),
            1,
            MidiMessage::NoteOn {
                key,
                vel: u7::new(note.velocity.min(127)),
            },
        ));
        messages.push((
            to_tick(note.end),
            0,
            MidiMessage::NoteOff {
                key,
                vel: u7::new(0),
            },
        ));
    }
    messages.sort_by_key(|&(tick, rank, _)| (tick, rank));

    let mut track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(b"Response")),
        },
        // Acoustic grand piano
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange { program: u7::new(0) },
            },
        },
    ];

    let mut last_tick: u32 = 0;
    for (tick, _, message) in messages {
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);

    smf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(pitch: u8, start: f64, end: f64) -> GeneratedNote {
        GeneratedNote {
            pitch,
            start,
            end,
            velocity: 95,
        }
    }

    #[test]
    fn test_smf_layout() {
        let smf = notes_to_smf(&[note(60, 0.0, 0.5), note(64, 0.0, 0.5)], 120.0);
        // 1 tempo track + 1 note track
        assert_eq!(smf.tracks.len(), 2);
        // name + program + 2 on + 2 off + end
        assert_eq!(smf.tracks[1].len(), 7);
    }

    #[test]
    fn test_written_file_reads_back() {
        let notes = vec![
            note(60, 0.1, 0.6),
            note(64, 0.1, 0.6),
            note(67, 0.6, 1.1),
            note(72, 1.1, 2.1),
        ];
        let bytes = notes_to_bytes(&notes, 120.0).unwrap();
        let events = events_from_bytes(&bytes).unwrap();
        assert_eq!(events.len(), 4);
        let pitches: Vec<u8> = events.iter().map(|e| e.pitch).collect();
        assert_eq!(pitches, vec![60, 64, 67, 72]);
        for (event, original) in events.iter().zip(&notes) {
            assert!((event.onset - original.start).abs() < 2e-3);
            assert!((event.offset - original.end).abs() < 2e-3);
        }
    }

    #[test]
    fn test_tempo_change_and_zero_velocity_off() {
        let tpq = 480;
        let midi = |delta: u32, message: MidiMessage| TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message,
            },
        };
        let on = |key: u8| MidiMessage::NoteOn {
            key: u7::new(key),
            vel: u7::new(100),
        };
        let off_by_zero_vel = |key: u8| MidiMessage::NoteOn {
            key: u7::new(key),
            vel: u7::new(0),
        };
        let track: Track<'static> = vec![
            // 60 qpm: one quarter = 1 second
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(1_000_000))),
            },
            midi(0, on(60)),
            midi(tpq, off_by_zero_vel(60)),
            // Switch to 120 qpm at t = 1s
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000))),
            },
            midi(0, on(62)),
            midi(tpq, off_by_zero_vel(62)),
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            },
        ];
        let mut smf = Smf::new(Header::new(
            Format::SingleTrack,
            Timing::Metrical(u15::new(tpq as u16)),
        ));
        smf.tracks.push(track);
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();

        let events = events_from_bytes(&bytes).unwrap();
        assert_eq!(events.len(), 2);
        assert!((events[0].onset - 0.0).abs() < 1e-9);
        assert!((events[0].offset - 1.0).abs() < 1e-9);
        assert!((events[1].onset - 1.0).abs() < 1e-9);
        assert!((events[1].offset - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_timecode_ignores_tempo() {
        let midi = |delta: u32, message: MidiMessage| TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message,
            },
        };
        let on = |key: u8| MidiMessage::NoteOn {
            key: u7::new(key),
            vel: u7::new(100),
        };
        let off = |key: u8| MidiMessage::NoteOff {
            key: u7::new(key),
            vel: u7::new(0),
        };
        let track: Track<'static> = vec![
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(1_000_000))),
            },
            midi(0, on(60)),
            midi(500, off(60)),
            midi(250, on(64)),
            midi(250, off(64)),
        ];
        // 25 fps with 40 subframes: one tick per millisecond.
        let mut smf = Smf::new(Header::new(
            Format::SingleTrack,
            Timing::Timecode(midly::Fps::Fps25, 40),
        ));
        smf.tracks.push(track);
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();

        let events = events_from_bytes(&bytes).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].pitch, 60);
        assert!((events[0].offset - 0.5).abs() < 1e-9);
        assert!((events[1].onset - 0.75).abs() < 1e-9);
        assert!((events[1].offset - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_response_is_still_a_valid_file() {
        let bytes = notes_to_bytes(&[], 130.0).unwrap();
        assert!(events_from_bytes(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(
            events_from_bytes(b"not a midi file"),
            Err(GenerationError::Midi(_))
        ));
    }
}
