// Antiphon CLI entry point.
//
// Runs one call-and-response round: learn from a corpus MIDI file, answer
// the primer MIDI file, write the response as MIDI.
//
// Usage:
//   cargo run -p antiphon_music -- --corpus solo.mid --primer input.mid
//     [--output response.mid] [--config antiphon.json] [--seed N]
//     [--order N] [--bars N] [--qpm QPM] [--fallback generated|backoff|fail]
//
// Logging is controlled with RUST_LOG (default: info).

use anyhow::{Context, Result};
use antiphon_music::config::GeneratorConfig;
use antiphon_music::markov::SuccessorFallback;
use antiphon_music::respond::respond_to_files;
use antiphon_prng::PhraseRng;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Generate a polyphonic response to a recorded phrase
#[derive(Parser)]
#[command(name = "respond")]
#[command(version)]
struct Cli {
    /// Training corpus (Standard MIDI File)
    #[arg(long)]
    corpus: PathBuf,

    /// The phrase to answer (Standard MIDI File)
    #[arg(long)]
    primer: PathBuf,

    /// Where to write the response
    #[arg(long, default_value = "response.mid")]
    output: PathBuf,

    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed (drawn from the clock and logged if omitted)
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    order: Option<usize>,

    #[arg(long)]
    bars: Option<u32>,

    #[arg(long)]
    qpm: Option<f64>,

    #[arg(long, value_enum)]
    fallback: Option<FallbackArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FallbackArg {
    Generated,
    Backoff,
    Fail,
}

impl From<FallbackArg> for SuccessorFallback {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::Generated => SuccessorFallback::Generated,
            FallbackArg::Backoff => SuccessorFallback::Backoff,
            FallbackArg::Fail => SuccessorFallback::Fail,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(order) = cli.order {
        config.order = order;
    }
    if let Some(bars) = cli.bars {
        config.bars = bars;
    }
    if let Some(qpm) = cli.qpm {
        config.qpm = qpm;
    }
    if let Some(fallback) = cli.fallback {
        config.fallback = fallback.into();
    }

    let seed = match cli.seed {
        Some(seed) => seed,
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("System clock is before the Unix epoch")?
            .as_nanos() as u64,
    };
    tracing::info!(
        seed,
        order = config.order,
        bars = config.bars,
        qpm = config.qpm,
        "starting round"
    );
    let mut rng = PhraseRng::new(seed);

    let notes = respond_to_files(&cli.corpus, &cli.primer, &cli.output, &config, &mut rng)
        .with_context(|| {
            format!(
                "Failed to respond to {} using corpus {}",
                cli.primer.display(),
                cli.corpus.display()
            )
        })?;

    tracing::info!(
        notes = notes.len(),
        output = %cli.output.display(),
        "done"
    );
    Ok(())
}
