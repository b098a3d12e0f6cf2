// Error taxonomy for a generation run.
//
// Every failure is raised at the boundary that detects it and propagated to
// the caller unchanged; the core never retries. A failed run produces no
// partial output.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    /// The training corpus yielded no slices at all.
    #[error("training corpus contains no usable note events")]
    EmptyCorpus,

    /// A configuration option or progression entry is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The sampler was handed an empty transition table.
    #[error("transition table is empty; corpus is too short for the chain order")]
    EmptyModel,

    /// A state was unseen during sampling and the fallback policy is `fail`.
    #[error("no known successor for the state ending at generated slice {position}")]
    UnseenState { position: usize },

    #[error("MIDI error: {0}")]
    Midi(#[from] midly::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        GenerationError::InvalidConfig(msg.into())
    }
}
