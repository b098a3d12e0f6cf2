// One call-and-response generation round.
//
// corpus events -> slices -> chain
// primer events -> slices -> seed state (last `order` slices)
// chain + seed -> sampled slices -> assembled notes -> humanized notes
//
// The round is synchronous and owns nothing beyond its arguments; the only
// cross-cutting input is the caller's random source. Any error aborts the
// round before output is produced.

use antiphon_prng::PhraseRng;
use std::path::Path;

use crate::assemble::{GeneratedNote, ResponseAssembler, humanize};
use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::markov::{MarkovChain, sample};
use crate::midi;
use crate::slice::{Event, extract_slices};

/// Generate a response to `primer` in the style of `corpus`.
///
/// Both event lists must be sorted by onset.
pub fn generate_response(
    corpus: &[Event],
    primer: &[Event],
    config: &GeneratorConfig,
    rng: &mut PhraseRng,
) -> Result<Vec<GeneratedNote>, GenerationError> {
    config.validate()?;
    let progression = config.chord_progression()?;
    let grid = config.duration_grid()?;

    let training = extract_slices(corpus, config.window);
    if training.is_empty() {
        return Err(GenerationError::EmptyCorpus);
    }
    let chain = MarkovChain::build(&training, config.order)?;
    tracing::info!(
        slices = training.len(),
        states = chain.table().len(),
        transitions = chain.num_transitions(),
        order = config.order,
        "built chain"
    );

    let primer_slices = extract_slices(primer, config.window);
    let seed = if primer_slices.len() >= config.order {
        Some(&primer_slices[primer_slices.len() - config.order..])
    } else {
        tracing::warn!(
            primer_slices = primer_slices.len(),
            order = config.order,
            "primer too short to seed the chain; starting from a random state"
        );
        None
    };

    let sampled = sample(&chain, config.max_events, seed, config.fallback, rng)?;

    let assembler = ResponseAssembler {
        progression: &progression,
        grid: &grid,
        bar_duration: config.bar_duration(),
        total_duration: config.total_duration(),
        velocity: config.velocity,
        max_voices: config.max_voices,
    };
    let assembly = assembler.assemble(&sampled, rng);
    let notes = humanize(assembly.notes, config.start_at);
    tracing::info!(
        sampled = sampled.len(),
        notes = notes.len(),
        seconds = assembly.end_time,
        "assembled response"
    );
    Ok(notes)
}

/// File-to-file round: read corpus and primer MIDI, write the response.
///
/// Nothing is written if generation fails.
pub fn respond_to_files(
    corpus_path: &Path,
    primer_path: &Path,
    output_path: &Path,
    config: &GeneratorConfig,
    rng: &mut PhraseRng,
) -> Result<Vec<GeneratedNote>, GenerationError> {
    let corpus = midi::read_events(corpus_path)?;
    let primer = midi::read_events(primer_path)?;
    tracing::info!(
        corpus_events = corpus.len(),
        primer_events = primer.len(),
        "loaded MIDI"
    );
    let notes = generate_response(&corpus, &primer, config, rng)?;
    midi::write_notes(&notes, config.qpm, output_path)?;
    tracing::info!(path = %output_path.display(), "wrote response");
    Ok(notes)
}
