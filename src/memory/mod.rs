//! Long-Term Memory Tiers
//!
//! Three cooperating tiers behind the [`crate::system::MemorySystem`] facade:
//!
//! - [`EpisodicMemory`] - past experiences ("what happened"), recalled by
//!   keyword similarity, outcome class, or recency
//! - [`SemanticMemory`] - topic-keyed facts ("what is known") with a relation
//!   graph and inverted keyword index
//! - [`ProceduralMemory`] - skills ("how it is done") with an exponentially
//!   averaged success rate
//!
//! Entries are [`MemoryEntry`] records with per-kind structured details.
//! Keyword search here is the documented baseline: word overlap, no
//! embeddings. The tiers only require the overlap/weighting contracts, so a
//! richer matcher can replace the helpers below without touching callers.

mod entry;
mod episodic;
mod procedural;
mod semantic;

pub use entry::{EntryDetails, MemoryEntry, MemoryKind, OutcomeClass};
pub use episodic::{EpisodicConfig, EpisodicMemory};
pub use procedural::ProceduralMemory;
pub use semantic::SemanticMemory;

use std::collections::HashSet;

use crate::constants::KEYWORD_LENGTH_MIN;

/// Split text into a lowercase word set for Jaccard similarity.
///
/// Words are maximal runs of alphanumeric characters and underscores.
pub(crate) fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split text into lowercase index keywords (whitespace-delimited, short
/// words dropped).
pub(crate) fn keywords(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|word| word.len() >= KEYWORD_LENGTH_MIN)
        .map(str::to_string)
        .collect()
}

/// Split a query into lowercase lookup terms (whitespace-delimited).
pub(crate) fn query_terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
