//! Semantic Memory - Factual Knowledge
//!
//! `TigerStyle`: One fact per topic, explicit relation graph, accreting
//! inverted index.
//!
//! Facts are keyed by topic; storing a topic again overwrites its fact. The
//! inverted keyword index accretes across overwrites: words indexed by an
//! earlier version of a fact keep resolving to the topic. Search returns
//! topics in encounter order (index order, first hit first), deliberately not
//! relevance-sorted.

use std::collections::HashMap;

use crate::clock::Clock;
use crate::constants::{ENTRY_IMPORTANCE_MAX, ENTRY_IMPORTANCE_MIN};
use crate::memory::entry::{fact_id, EntryDetails, MemoryEntry};
use crate::memory::{keywords, query_terms};

/// Relation type whose edges are mirrored in both directions.
const RELATION_SYMMETRIC: &str = "related";

/// Topic-keyed fact store with a relation graph and keyword index.
#[derive(Debug)]
pub struct SemanticMemory {
    clock: Clock,
    /// topic -> fact entry
    facts: HashMap<String, MemoryEntry>,
    /// concept -> outgoing edges, stored as "type:target"
    relations: HashMap<String, Vec<String>>,
    /// lowercase keyword -> topics, in first-indexed order
    keyword_index: HashMap<String, Vec<String>>,
}

impl SemanticMemory {
    /// Create an empty semantic memory.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            facts: HashMap::new(),
            relations: HashMap::new(),
            keyword_index: HashMap::new(),
        }
    }

    /// Store a fact under a topic, replacing any prior fact for that topic.
    ///
    /// Importance tracks confidence. Returns a copy of the stored entry.
    ///
    /// # Panics
    /// Panics if `topic` is empty or `confidence` is outside [0, 1].
    pub fn store_fact(
        &mut self,
        topic: &str,
        fact: &str,
        source: Option<String>,
        confidence: f64,
        tags: Vec<String>,
    ) -> MemoryEntry {
        // Preconditions
        assert!(!topic.is_empty(), "topic cannot be empty");
        assert!(
            (ENTRY_IMPORTANCE_MIN..=ENTRY_IMPORTANCE_MAX).contains(&confidence),
            "confidence {} outside [{}, {}]",
            confidence,
            ENTRY_IMPORTANCE_MIN,
            ENTRY_IMPORTANCE_MAX
        );

        let now_ms = self.clock.now_ms();
        let entry = MemoryEntry::new(
            fact_id(topic),
            fact.to_string(),
            EntryDetails::Semantic {
                topic: topic.to_string(),
                source,
                confidence,
            },
            now_ms,
            confidence,
            tags,
        );

        self.index_topic(topic, fact);
        self.facts.insert(topic.to_string(), entry.clone());

        entry
    }

    /// Look up a fact by exact topic, bumping its access counters.
    pub fn query(&mut self, topic: &str) -> Option<MemoryEntry> {
        let now_ms = self.clock.now_ms();
        self.facts.get_mut(topic).map(|entry| {
            entry.record_access(now_ms);
            entry.clone()
        })
    }

    /// Search facts by keyword union.
    ///
    /// Topics are returned in encounter order (query-term order, then index
    /// insertion order), deduplicated, truncated to `top_k`. Returned facts
    /// have their access counters updated.
    pub fn search(&mut self, query: &str, top_k: usize) -> Vec<(String, MemoryEntry)> {
        let now_ms = self.clock.now_ms();
        let mut seen: Vec<String> = Vec::new();

        for term in query_terms(query) {
            let Some(topics) = self.keyword_index.get(&term) else {
                continue;
            };
            for topic in topics {
                if self.facts.contains_key(topic) && !seen.iter().any(|t| t == topic) {
                    seen.push(topic.clone());
                }
            }
        }
        seen.truncate(top_k);

        seen.into_iter()
            .map(|topic| {
                let entry = self
                    .facts
                    .get_mut(&topic)
                    .expect("seen topics exist in the fact map");
                entry.record_access(now_ms);
                (topic, entry.clone())
            })
            .collect()
    }

    /// Add a relation edge between two concepts.
    ///
    /// `"related"` edges are symmetric (the reverse edge is added too); any
    /// other relation type stays directed.
    pub fn add_relation(&mut self, concept_a: &str, concept_b: &str, relation_type: &str) {
        // Preconditions
        assert!(!concept_a.is_empty(), "concept_a cannot be empty");
        assert!(!concept_b.is_empty(), "concept_b cannot be empty");

        Self::insert_edge(&mut self.relations, concept_a, relation_type, concept_b);
        if relation_type == RELATION_SYMMETRIC {
            Self::insert_edge(&mut self.relations, concept_b, relation_type, concept_a);
        }
    }

    fn insert_edge(
        relations: &mut HashMap<String, Vec<String>>,
        from: &str,
        relation_type: &str,
        to: &str,
    ) {
        let edge = format!("{}:{}", relation_type, to);
        let edges = relations.entry(from.to_string()).or_default();
        if !edges.contains(&edge) {
            edges.push(edge);
        }
    }

    /// Get the targets of all edges leaving a concept (relation types
    /// stripped). Unknown concepts yield an empty list.
    #[must_use]
    pub fn related(&self, concept: &str) -> Vec<String> {
        self.relations
            .get(concept)
            .map(|edges| {
                edges
                    .iter()
                    .map(|edge| {
                        edge.split_once(':')
                            .map(|(_, target)| target.to_string())
                            .unwrap_or_else(|| edge.clone())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Adjust a fact's confidence by a delta, clamped to [0, 1].
    ///
    /// Importance tracks the clamped confidence. No-op for unknown topics.
    pub fn update_confidence(&mut self, topic: &str, delta: f64) {
        let Some(entry) = self.facts.get_mut(topic) else {
            return;
        };

        let EntryDetails::Semantic { confidence, .. } = &mut entry.details else {
            unreachable!("semantic tier holds semantic details");
        };

        let updated = (*confidence + delta).clamp(ENTRY_IMPORTANCE_MIN, ENTRY_IMPORTANCE_MAX);
        *confidence = updated;
        entry.set_importance(updated);

        // Postcondition
        assert!(
            (ENTRY_IMPORTANCE_MIN..=ENTRY_IMPORTANCE_MAX).contains(&updated),
            "confidence must stay in range"
        );
    }

    /// Number of stored facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Check if no facts are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// All topics with stored facts.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.facts.keys().cloned().collect()
    }

    /// The fact map (for export and consolidation scans).
    #[must_use]
    pub fn facts(&self) -> &HashMap<String, MemoryEntry> {
        &self.facts
    }

    /// The relation map (for export).
    #[must_use]
    pub fn relations(&self) -> &HashMap<String, Vec<String>> {
        &self.relations
    }

    /// Rebuild from exported facts and relations, preserving all counters.
    ///
    /// The keyword index is derived state and is rebuilt from topic+content.
    #[must_use]
    pub fn restore(
        clock: Clock,
        facts: HashMap<String, MemoryEntry>,
        relations: HashMap<String, Vec<String>>,
    ) -> Self {
        let mut memory = Self::new(clock);
        for (topic, entry) in &facts {
            memory.index_topic(topic, &entry.content);
        }
        memory.facts = facts;
        memory.relations = relations;
        memory
    }

    /// Index the words of a topic and its fact content.
    fn index_topic(&mut self, topic: &str, content: &str) {
        let mut words = keywords(topic);
        words.extend(keywords(content));

        for word in words {
            let topics = self.keyword_index.entry(word).or_default();
            if !topics.iter().any(|t| t == topic) {
                topics.push(topic.to_string());
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
