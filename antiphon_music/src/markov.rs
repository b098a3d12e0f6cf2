// Order-k Markov chain over polyphonic slices.
//
// The chain is built directly from a slice sequence: every run of k
// consecutive slices is a state, and the slice that followed it is appended
// to that state's successor list. Repeats are kept, so a successor seen
// twice is drawn twice as often. Tables are BTreeMaps so that key iteration
// (and therefore random key selection) is reproducible for a given seed.
//
// Besides the order-k table the builder keeps one table per lower order.
// They are only consulted by the `Backoff` fallback when the sampler reaches
// a state the corpus never contained.

use std::collections::BTreeMap;

use antiphon_prng::PhraseRng;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::slice::Slice;

/// A chain key: exactly `order` consecutive slices.
pub type State = Vec<Slice>;

/// State -> successors observed after it (never empty, repeats preserved).
pub type TransitionTable = BTreeMap<State, Vec<Slice>>;

/// What the sampler does when the current state has no recorded successors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessorFallback {
    /// Pick uniformly among the slices generated so far.
    #[default]
    Generated,
    /// Retry with successively shorter contexts, then behave like `Generated`.
    Backoff,
    /// Abort with `GenerationError::UnseenState`.
    Fail,
}

/// Build the order-`order` transition table of a slice sequence.
///
/// Produces exactly `max(0, len - order)` successor insertions; a sequence
/// no longer than `order` yields an empty table.
pub fn build_transition_table(sequence: &[Slice], order: usize) -> TransitionTable {
    let mut table = TransitionTable::new();
    if sequence.len() <= order {
        return table;
    }
    for run in sequence.windows(order + 1) {
        let (state, next) = run.split_at(order);
        table
            .entry(state.to_vec())
            .or_default()
            .push(next[0].clone());
    }
    table
}

#[derive(Debug, Clone)]
pub struct MarkovChain {
    order: usize,
    /// `tables[k - 1]` holds the order-k table, for k in 1..=order.
    tables: Vec<TransitionTable>,
}

impl MarkovChain {
    pub fn build(sequence: &[Slice], order: usize) -> Result<Self, GenerationError> {
        if order == 0 {
            return Err(GenerationError::config("chain order must be at least 1"));
        }
        let tables = (1..=order)
            .map(|k| build_transition_table(sequence, k))
            .collect();
        Ok(MarkovChain { order, tables })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// The order-k table.
    pub fn table(&self) -> &TransitionTable {
        &self.tables[self.order - 1]
    }

    /// Table for a lower context length, 1..=order.
    pub fn table_for_order(&self, k: usize) -> Option<&TransitionTable> {
        k.checked_sub(1).and_then(|i| self.tables.get(i))
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Total successor entries in the order-k table.
    pub fn num_transitions(&self) -> usize {
        self.table().values().map(Vec::len).sum()
    }

    pub fn successors(&self, state: &[Slice]) -> Option<&[Slice]> {
        self.table().get(state).map(Vec::as_slice)
    }
}

/// Longest shorter context (order-1 down to 1) with recorded successors.
fn backoff_successors<'a>(chain: &'a MarkovChain, context: &[Slice]) -> Option<&'a [Slice]> {
    (1..chain.order()).rev().find_map(|k| {
        let state = &context[context.len() - k..];
        chain
            .table_for_order(k)
            .and_then(|table| table.get(state))
            .map(Vec::as_slice)
    })
}

/// Draw a slice sequence of `length` elements from the chain.
///
/// Starts from `seed` when it is a known state, otherwise from a uniformly
/// random key. The starting state is part of the output. If `length` is
/// shorter than the chain order the starting state alone is returned.
pub fn sample(
    chain: &MarkovChain,
    length: usize,
    seed: Option<&[Slice]>,
    fallback: SuccessorFallback,
    rng: &mut PhraseRng,
) -> Result<Vec<Slice>, GenerationError> {
    let table = chain.table();
    if table.is_empty() {
        return Err(GenerationError::EmptyModel);
    }
    let order = chain.order();

    let mut result: Vec<Slice> = match seed.filter(|s| table.contains_key(*s)) {
        Some(seed) => seed.to_vec(),
        None => {
            if seed.is_some() {
                tracing::debug!("seed state not in corpus; starting from a random state");
            }
            let idx = rng.range_usize(0, table.len());
            table
                .keys()
                .nth(idx)
                .cloned()
                .ok_or(GenerationError::EmptyModel)?
        }
    };

    while result.len() < length {
        let state = &result[result.len() - order..];
        let candidates: &[Slice] = match chain.successors(state) {
            Some(successors) => successors,
            None => {
                tracing::debug!(position = result.len(), ?fallback, "unseen state");
                match fallback {
                    SuccessorFallback::Generated => &result,
                    SuccessorFallback::Backoff => {
                        backoff_successors(chain, &result).unwrap_or(&result)
                    }
                    SuccessorFallback::Fail => {
                        return Err(GenerationError::UnseenState {
                            position: result.len(),
                        });
                    }
                }
            }
        };
        let next = rng
            .choose(candidates)
            .cloned()
            .ok_or(GenerationError::EmptyModel)?;
        result.push(next);
    }

    Ok(result)
}
