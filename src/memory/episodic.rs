//! Episodic Memory - Past Experiences
//!
//! `TigerStyle`: Bounded capacity, relevance-ranked pruning, deterministic
//! recall scoring.
//!
//! Append-mostly log of experiences with their outcomes. Recall combines
//! Jaccard word overlap with entry relevance; entries sharing no words with
//! the query are excluded outright rather than scored low, so an empty
//! overlap can never ride in on recency alone.

use std::collections::{BTreeMap, HashMap};

use crate::clock::Clock;
use crate::constants::{
    EPISODIC_ENTRIES_COUNT_MAX_DEFAULT, RECALL_RELEVANCE_WEIGHT, RECALL_SIMILARITY_WEIGHT,
};
use crate::memory::entry::{episode_id, EntryDetails, MemoryEntry, OutcomeClass};
use crate::memory::word_set;
use crate::scoring::RelevanceScorer;

/// Configuration for episodic memory.
#[derive(Debug, Clone)]
pub struct EpisodicConfig {
    /// Entry count above which the lowest-relevance entries are pruned
    pub max_entries: usize,
}

impl Default for EpisodicConfig {
    fn default() -> Self {
        Self {
            max_entries: EPISODIC_ENTRIES_COUNT_MAX_DEFAULT,
        }
    }
}

/// Capacity-bounded log of past experiences.
#[derive(Debug)]
pub struct EpisodicMemory {
    config: EpisodicConfig,
    clock: Clock,
    scorer: RelevanceScorer,
    entries: Vec<MemoryEntry>,
    /// id -> index into `entries`
    index: HashMap<String, usize>,
}

impl EpisodicMemory {
    /// Create an empty episodic memory.
    ///
    /// # Panics
    /// Panics if `max_entries` is zero.
    #[must_use]
    pub fn new(config: EpisodicConfig, clock: Clock) -> Self {
        // Precondition
        assert!(config.max_entries > 0, "max_entries must be > 0");

        Self {
            config,
            clock,
            scorer: RelevanceScorer::new(),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Store an experience, classifying its outcome.
    ///
    /// Returns a copy of the stored entry. Storing an identical experience
    /// within the same millisecond replaces the earlier record (the two are
    /// indistinguishable, and ids stay unique within the tier).
    pub fn store(
        &mut self,
        experience: &str,
        outcome: &str,
        context: BTreeMap<String, String>,
        importance: f64,
        tags: Vec<String>,
    ) -> MemoryEntry {
        // Precondition
        assert!(!experience.is_empty(), "experience cannot be empty");

        let now_ms = self.clock.now_ms();
        let id = episode_id(experience, now_ms);
        let outcome_class = OutcomeClass::classify(outcome);

        let entry = MemoryEntry::new(
            id.clone(),
            format!("Experience: {}\nOutcome: {}", experience, outcome),
            EntryDetails::Episodic {
                experience: experience.to_string(),
                outcome: outcome.to_string(),
                outcome_class,
                context,
            },
            now_ms,
            importance,
            tags,
        );

        match self.index.get(&id).copied() {
            Some(existing) => self.entries[existing] = entry.clone(),
            None => {
                self.entries.push(entry.clone());
                self.index.insert(id, self.entries.len() - 1);
            }
        }

        self.prune_if_needed();

        entry
    }

    /// Recall experiences similar to a query.
    ///
    /// Score = `0.6 * jaccard + 0.4 * relevance`; zero-overlap entries are
    /// excluded. Returned entries have their access counters updated.
    pub fn recall_similar(
        &mut self,
        query: &str,
        top_k: usize,
        min_relevance: f64,
    ) -> Vec<MemoryEntry> {
        let query_words = word_set(query);
        if query_words.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let now_ms = self.clock.now_ms();
        let mut scored: Vec<(f64, usize)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| {
                let entry_words = word_set(&entry.content);
                let overlap = query_words.intersection(&entry_words).count();
                if overlap == 0 {
                    return None;
                }

                let union = query_words.union(&entry_words).count();
                let similarity = overlap as f64 / union as f64;
                let relevance = entry.relevance(&self.scorer, now_ms);
                let combined = RECALL_SIMILARITY_WEIGHT * similarity
                    + RECALL_RELEVANCE_WEIGHT * relevance;

                (combined >= min_relevance).then_some((combined, idx))
            })
            .collect();

        scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(_, idx)| {
                self.entries[idx].record_access(now_ms);
                self.entries[idx].clone()
            })
            .collect()
    }

    /// Recall all experiences with a given outcome class. No access-counter
    /// side effects.
    #[must_use]
    pub fn recall_by_outcome(&self, outcome_class: OutcomeClass) -> Vec<MemoryEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                matches!(
                    &entry.details,
                    EntryDetails::Episodic { outcome_class: oc, .. } if *oc == outcome_class
                )
            })
            .cloned()
            .collect()
    }

    /// Recall the `n` most recently created experiences.
    #[must_use]
    pub fn recall_recent(&self, n: usize) -> Vec<MemoryEntry> {
        let mut sorted: Vec<&MemoryEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        sorted.into_iter().take(n).cloned().collect()
    }

    /// Get an entry by id without touching access counters.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&MemoryEntry> {
        self.index.get(id).map(|&idx| &self.entries[idx])
    }

    /// Number of stored experiences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no experiences are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in storage order (for export).
    #[must_use]
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// Rebuild from previously exported entries, preserving all counters.
    ///
    /// # Panics
    /// Panics if `max_entries` is zero. Caller is responsible for id
    /// uniqueness (snapshot validation enforces it).
    #[must_use]
    pub fn restore(config: EpisodicConfig, clock: Clock, entries: Vec<MemoryEntry>) -> Self {
        let mut memory = Self::new(config, clock);
        memory.index = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.id.clone(), idx))
            .collect();
        memory.entries = entries;
        memory.prune_if_needed();
        memory
    }

    /// Drop the lowest-relevance entries once capacity is exceeded.
    ///
    /// O(n log n) per prune event; acceptable at the bounded sizes this tier
    /// is configured with.
    fn prune_if_needed(&mut self) {
        if self.entries.len() <= self.config.max_entries {
            return;
        }

        let before = self.entries.len();
        let now_ms = self.clock.now_ms();
        let scorer = self.scorer.clone();
        self.entries.sort_by(|a, b| {
            b.relevance(&scorer, now_ms)
                .partial_cmp(&a.relevance(&scorer, now_ms))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.entries.truncate(self.config.max_entries);

        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.id.clone(), idx))
            .collect();

        tracing::debug!(
            removed = before - self.entries.len(),
            retained = self.entries.len(),
            "episodic memory pruned"
        );

        // Postcondition
        assert!(
            self.entries.len() <= self.config.max_entries,
            "prune must enforce capacity"
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
