// Antiphon: call-and-response polyphonic phrase generator.
//
// Listens to a performance (as note events), learns an order-k Markov chain
// over "slices" (sets of pitches played together plus their span), and
// answers with a new phrase sampled from that chain, constrained to a
// cyclic chord progression and quantized to a duration grid.
//
// Architecture:
// - slice.rs: Note events and windowed slice extraction
// - markov.rs: Transition tables, chain building, sampling + unseen-state fallbacks
// - mode.rs: Scale table, harmonic contexts, chord-name parsing, scale filtering
// - progression.rs: Cyclic bar -> harmonic context table (default: F minor blues)
// - quantize.rs: Duration grid snapping
// - assemble.rs: Slices -> timed notes against the bar timeline, humanize shift
// - midi.rs: SMF import (events) and export (responses)
// - config.rs: Generator options, JSON loading, validation
// - respond.rs: One full generation round, in memory or file to file
// - error.rs: Error taxonomy
//
// Randomness comes only from an explicit `PhraseRng`, so a fixed seed
// reproduces a round exactly.

pub mod assemble;
pub mod config;
pub mod error;
pub mod markov;
pub mod midi;
pub mod mode;
pub mod progression;
pub mod quantize;
pub mod respond;
pub mod slice;
