//! MemorySystem - Unified Facade over the Memory Tiers
//!
//! `TigerStyle`: One reader/writer lock per tier, explicit ownership, no
//! globals.
//!
//! # Overview
//!
//! `MemorySystem` owns the core identity map, the three long-term tiers, a
//! TTL resource cache, and the knowledge vault, and is the only entry point
//! external collaborators use. The orchestrator reads a
//! [`TaskContext`] before each model call and writes experiences, facts, and
//! procedure outcomes after it.
//!
//! Every tier sits behind its own `RwLock`; operations that bump access
//! counters are writers. Tier operations are always fast and in-memory, so
//! locks are held only for the duration of one call. Compound operations
//! (export, import, consolidation) acquire locks in a fixed order: core,
//! episodic, semantic, procedural, vault, counters.
//!
//! # Example
//!
//! ```
//! use engram_memory::clock::Clock;
//! use engram_memory::system::{MemorySystem, MemorySystemConfig};
//! use std::collections::BTreeMap;
//!
//! let memory = MemorySystem::with_clock(MemorySystemConfig::default(), Clock::manual_at_ms(0));
//!
//! memory.remember_experience("migrated the database", "success", BTreeMap::new(), 0.8);
//! memory.learn_fact("migrations", "run inside a transaction", None, 0.9);
//!
//! let context = memory.get_context_for_task("database migration");
//! assert_eq!(context.relevant_experiences.len(), 1);
//! ```

mod snapshot;

pub use snapshot::{MemoryCounters, MemorySnapshot, SemanticState, SnapshotError};

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::constants::{
    LEARNING_CONTEXT_FAILURES_COUNT, LEARNING_CONTEXT_SUCCESSES_COUNT,
    LEARNING_SKILL_IMPROVE_RATE_MAX, LEARNING_SKILL_IMPROVE_RATE_MIN,
    LEARNING_SKILL_MASTERED_RATE_MIN, SNAPSHOT_FORMAT_VERSION, TASK_CONTEXT_EXPERIENCES_COUNT,
    TASK_CONTEXT_FACTS_COUNT, TASK_CONTEXT_PROCEDURES_COUNT, TASK_CONTEXT_VAULT_COUNT,
    TIME_MS_PER_SEC, VAULT_FACT_CONFIDENCE_MIN, VAULT_PROCEDURE_SUCCESS_RATE_MIN,
};
use crate::memory::{
    word_set, EntryDetails, EpisodicConfig, EpisodicMemory, MemoryEntry, OutcomeClass,
    ProceduralMemory, SemanticMemory,
};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a memory system.
#[derive(Debug, Clone)]
pub struct MemorySystemConfig {
    /// Agent name placed in the core identity map
    pub agent_name: String,
    /// Agent purpose placed in the core identity map
    pub agent_purpose: String,
    /// Agent values placed in the core identity map
    pub agent_values: Vec<String>,
    /// Version string placed in the core identity map
    pub agent_version: String,
    /// Episodic tier configuration
    pub episodic: EpisodicConfig,
}

impl Default for MemorySystemConfig {
    fn default() -> Self {
        Self {
            agent_name: "engram".to_string(),
            agent_purpose: "Coding agent that improves through accumulated experience"
                .to_string(),
            agent_values: vec![
                "accuracy".to_string(),
                "efficiency".to_string(),
                "learning".to_string(),
            ],
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            episodic: EpisodicConfig::default(),
        }
    }
}

// =============================================================================
// Aggregation Types
// =============================================================================

/// A fact matched by a knowledge search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeHit {
    /// Topic the fact is filed under
    pub topic: String,
    /// The fact content
    pub content: String,
}

/// A procedure matched by a skill search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureHit {
    /// Skill name
    pub skill: String,
    /// Ordered execution steps
    pub steps: Vec<String>,
    /// Current success rate
    pub success_rate: f64,
}

/// Read-only aggregation across all tiers, used to build a model prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContext {
    /// Core identity map
    pub identity: BTreeMap<String, serde_json::Value>,
    /// Most similar past experiences
    pub relevant_experiences: Vec<MemoryEntry>,
    /// Matching facts
    pub relevant_knowledge: Vec<KnowledgeHit>,
    /// Matching procedures, best success rate first
    pub relevant_procedures: Vec<ProcedureHit>,
    /// Matching consolidated vault entries
    pub vault_knowledge: Vec<MemoryEntry>,
}

/// Aggregation focused on learning from past outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningContext {
    /// Most recent failures
    pub recent_failures: Vec<MemoryEntry>,
    /// Highest-importance successes
    pub recent_successes: Vec<MemoryEntry>,
    /// Skills with a success rate above the mastery threshold
    pub mastered_skills: Vec<String>,
    /// Skills in the improvable success-rate band
    pub skills_to_improve: Vec<String>,
}

/// Live statistics across all tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Lifetime counters
    pub counters: MemoryCounters,
    /// Entries currently in the episodic tier
    pub episodic_entries: usize,
    /// Facts currently in the semantic tier
    pub semantic_facts: usize,
    /// Skills currently in the procedural tier
    pub procedural_skills: usize,
    /// Entries currently in the vault
    pub vault_entries: usize,
    /// Entries currently in the resource cache (including not-yet-collected
    /// expired entries; expiry is lazy)
    pub cache_entries: usize,
}

/// One cached external resource.
#[derive(Debug, Clone)]
struct CachedResource {
    value: serde_json::Value,
    expires_at_ms: u64,
}

// =============================================================================
// Memory System
// =============================================================================

/// Unified memory system: core identity, three long-term tiers, resource
/// cache, and knowledge vault.
#[derive(Debug)]
pub struct MemorySystem {
    config: MemorySystemConfig,
    clock: Clock,
    core: RwLock<BTreeMap<String, serde_json::Value>>,
    episodic: RwLock<EpisodicMemory>,
    semantic: RwLock<SemanticMemory>,
    procedural: RwLock<ProceduralMemory>,
    resource_cache: RwLock<HashMap<String, CachedResource>>,
    vault: RwLock<Vec<MemoryEntry>>,
    counters: RwLock<MemoryCounters>,
}

impl MemorySystem {
    /// Create a memory system with the default configuration and a system
    /// clock.
    #[must_use]
    pub fn new(config: MemorySystemConfig) -> Self {
        Self::with_clock(config, Clock::system())
    }

    /// Create a memory system with an explicit clock.
    #[must_use]
    pub fn with_clock(config: MemorySystemConfig, clock: Clock) -> Self {
        let mut core = BTreeMap::new();
        core.insert(
            "name".to_string(),
            serde_json::Value::String(config.agent_name.clone()),
        );
        core.insert(
            "purpose".to_string(),
            serde_json::Value::String(config.agent_purpose.clone()),
        );
        core.insert(
            "values".to_string(),
            serde_json::json!(config.agent_values.clone()),
        );
        core.insert(
            "version".to_string(),
            serde_json::Value::String(config.agent_version.clone()),
        );
        core.insert(
            "created_at".to_string(),
            serde_json::Value::String(clock.now().to_rfc3339()),
        );

        Self {
            episodic: RwLock::new(EpisodicMemory::new(config.episodic.clone(), clock.clone())),
            semantic: RwLock::new(SemanticMemory::new(clock.clone())),
            procedural: RwLock::new(ProceduralMemory::new(clock.clone())),
            resource_cache: RwLock::new(HashMap::new()),
            vault: RwLock::new(Vec::new()),
            counters: RwLock::new(MemoryCounters::default()),
            core: RwLock::new(core),
            config,
            clock,
        }
    }

    // =========================================================================
    // Core Memory
    // =========================================================================

    /// Get a copy of the core identity map.
    #[must_use]
    pub fn identity(&self) -> BTreeMap<String, serde_json::Value> {
        self.core.read().unwrap().clone()
    }

    /// Set a core identity value.
    pub fn update_core(&self, key: &str, value: serde_json::Value) {
        self.core.write().unwrap().insert(key.to_string(), value);
    }

    // =========================================================================
    // Episodic Interface
    // =========================================================================

    /// Store an experience and its outcome. Returns the entry id.
    pub fn remember_experience(
        &self,
        experience: &str,
        outcome: &str,
        context: BTreeMap<String, String>,
        importance: f64,
    ) -> String {
        let entry = self
            .episodic
            .write()
            .unwrap()
            .store(experience, outcome, context, importance, Vec::new());
        self.counters.write().unwrap().total_experiences += 1;
        entry.id
    }

    /// Recall past experiences similar to a situation.
    #[must_use]
    pub fn recall_experiences(&self, situation: &str, top_k: usize) -> Vec<MemoryEntry> {
        self.episodic
            .write()
            .unwrap()
            .recall_similar(situation, top_k, 0.0)
    }

    /// Recall successful experiences, highest importance first.
    #[must_use]
    pub fn recall_successes(&self, top_k: usize) -> Vec<MemoryEntry> {
        let mut entries = self
            .episodic
            .read()
            .unwrap()
            .recall_by_outcome(OutcomeClass::Success);
        entries.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        entries.truncate(top_k);
        entries
    }

    /// Recall failed experiences, most recent first.
    #[must_use]
    pub fn recall_failures(&self, top_k: usize) -> Vec<MemoryEntry> {
        let mut entries = self
            .episodic
            .read()
            .unwrap()
            .recall_by_outcome(OutcomeClass::Failure);
        entries.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        entries.truncate(top_k);
        entries
    }

    // =========================================================================
    // Semantic Interface
    // =========================================================================

    /// Learn a fact about a topic.
    pub fn learn_fact(&self, topic: &str, fact: &str, source: Option<String>, confidence: f64) {
        self.semantic
            .write()
            .unwrap()
            .store_fact(topic, fact, source, confidence, Vec::new());
        self.counters.write().unwrap().total_facts += 1;
    }

    /// Get the fact stored under an exact topic.
    #[must_use]
    pub fn query_knowledge(&self, topic: &str) -> Option<String> {
        self.semantic
            .write()
            .unwrap()
            .query(topic)
            .map(|entry| entry.content)
    }

    /// Search facts by keyword.
    #[must_use]
    pub fn search_knowledge(&self, query: &str, top_k: usize) -> Vec<KnowledgeHit> {
        self.semantic
            .write()
            .unwrap()
            .search(query, top_k)
            .into_iter()
            .map(|(topic, entry)| KnowledgeHit {
                topic,
                content: entry.content,
            })
            .collect()
    }

    /// Relate two concepts in the semantic graph.
    pub fn relate_concepts(&self, concept_a: &str, concept_b: &str, relation_type: &str) {
        self.semantic
            .write()
            .unwrap()
            .add_relation(concept_a, concept_b, relation_type);
    }

    /// Get concepts related to a concept.
    #[must_use]
    pub fn related_concepts(&self, concept: &str) -> Vec<String> {
        self.semantic.read().unwrap().related(concept)
    }

    /// Adjust confidence in a fact by a delta (clamped to [0, 1]).
    pub fn adjust_confidence(&self, topic: &str, delta: f64) {
        self.semantic.write().unwrap().update_confidence(topic, delta);
    }

    // =========================================================================
    // Procedural Interface
    // =========================================================================

    /// Learn a procedure. A new procedure starts with a zero success rate.
    pub fn learn_procedure(&self, skill_name: &str, steps: Vec<String>, preconditions: Vec<String>) {
        self.procedural.write().unwrap().store_procedure(
            skill_name,
            steps,
            0.0,
            preconditions,
            Vec::new(),
        );
        self.counters.write().unwrap().total_procedures += 1;
    }

    /// Get the steps of a procedure.
    #[must_use]
    pub fn procedure_steps(&self, skill_name: &str) -> Option<Vec<String>> {
        self.procedural.write().unwrap().steps(skill_name)
    }

    /// Find procedures matching a query, best success rate first.
    #[must_use]
    pub fn find_procedures(&self, query: &str, top_k: usize) -> Vec<ProcedureHit> {
        self.procedural
            .write()
            .unwrap()
            .search_procedures(query, top_k)
            .into_iter()
            .filter_map(|entry| match entry.details {
                EntryDetails::Procedural {
                    skill_name,
                    steps,
                    success_rate,
                    ..
                } => Some(ProcedureHit {
                    skill: skill_name,
                    steps,
                    success_rate,
                }),
                _ => None,
            })
            .collect()
    }

    /// Record the outcome of one procedure execution.
    pub fn record_procedure_outcome(&self, skill_name: &str, success: bool) {
        self.procedural
            .write()
            .unwrap()
            .update_success_rate(skill_name, success);
    }

    // =========================================================================
    // Resource Cache
    // =========================================================================

    /// Cache an external resource with a TTL.
    pub fn cache_resource(&self, key: &str, value: serde_json::Value, ttl_secs: u64) {
        let expires_at_ms = self
            .clock
            .now_ms()
            .saturating_add(ttl_secs.saturating_mul(TIME_MS_PER_SEC));
        self.resource_cache.write().unwrap().insert(
            key.to_string(),
            CachedResource {
                value,
                expires_at_ms,
            },
        );
    }

    /// Get a cached resource if it has not expired.
    ///
    /// Expiry is lazy: an expired entry is deleted on the read that finds it,
    /// and there is no background sweeper.
    #[must_use]
    pub fn get_cached_resource(&self, key: &str) -> Option<serde_json::Value> {
        let mut cache = self.resource_cache.write().unwrap();
        match cache.get(key) {
            Some(resource) if !self.clock.is_past_ms(resource.expires_at_ms) => {
                Some(resource.value.clone())
            }
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    // =========================================================================
    // Knowledge Vault
    // =========================================================================

    /// Copy qualifying entries into the knowledge vault.
    ///
    /// Procedures with a success rate above 0.8 and facts with confidence
    /// above 0.9 are copied (never moved) with derived ids, so repeated
    /// calls are idempotent. Returns the number of entries actually added.
    pub fn consolidate_to_vault(&self) -> usize {
        let now_ms = self.clock.now_ms();
        let mut candidates: Vec<MemoryEntry> = Vec::new();

        {
            let procedural = self.procedural.read().unwrap();
            for (skill_name, entry) in procedural.procedures() {
                let EntryDetails::Procedural { success_rate, .. } = &entry.details else {
                    continue;
                };
                if *success_rate > VAULT_PROCEDURE_SUCCESS_RATE_MIN {
                    candidates.push(MemoryEntry::new(
                        format!("vault_{}", entry.id),
                        format!("SKILL: {}\n{}", skill_name, entry.content),
                        EntryDetails::Vault {
                            consolidated_at_ms: now_ms,
                            source: Box::new(entry.details.clone()),
                        },
                        now_ms,
                        1.0,
                        entry.tags.clone(),
                    ));
                }
            }
        }

        {
            let semantic = self.semantic.read().unwrap();
            for (topic, entry) in semantic.facts() {
                let EntryDetails::Semantic { confidence, .. } = &entry.details else {
                    continue;
                };
                if *confidence > VAULT_FACT_CONFIDENCE_MIN {
                    candidates.push(MemoryEntry::new(
                        format!("vault_fact_{}", entry.id),
                        format!("FACT [{}]: {}", topic, entry.content),
                        EntryDetails::Vault {
                            consolidated_at_ms: now_ms,
                            source: Box::new(entry.details.clone()),
                        },
                        now_ms,
                        1.0,
                        entry.tags.clone(),
                    ));
                }
            }
        }

        let mut vault = self.vault.write().unwrap();
        let mut added = 0;
        for candidate in candidates {
            if vault.iter().any(|existing| existing.id == candidate.id) {
                continue;
            }
            vault.push(candidate);
            added += 1;
        }
        drop(vault);

        self.counters.write().unwrap().consolidations += 1;

        tracing::info!(added, "vault consolidation complete");
        added
    }

    /// Query the vault by word overlap, most overlapping first.
    #[must_use]
    pub fn query_vault(&self, query: &str, top_k: usize) -> Vec<MemoryEntry> {
        let query_words = word_set(query);
        if query_words.is_empty() {
            return Vec::new();
        }

        let vault = self.vault.read().unwrap();
        let mut scored: Vec<(usize, &MemoryEntry)> = vault
            .iter()
            .filter_map(|entry| {
                let overlap = query_words
                    .intersection(&word_set(&entry.content))
                    .count();
                (overlap > 0).then_some((overlap, entry))
            })
            .collect();

        scored.sort_by(|(a, _), (b, _)| b.cmp(a));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    // =========================================================================
    // Context Aggregation
    // =========================================================================

    /// Build the cross-tier context for a task.
    ///
    /// Read-only beyond the access-counter side effects of the underlying
    /// recall and search calls.
    #[must_use]
    pub fn get_context_for_task(&self, task: &str) -> TaskContext {
        TaskContext {
            identity: self.identity(),
            relevant_experiences: self.recall_experiences(task, TASK_CONTEXT_EXPERIENCES_COUNT),
            relevant_knowledge: self.search_knowledge(task, TASK_CONTEXT_FACTS_COUNT),
            relevant_procedures: self.find_procedures(task, TASK_CONTEXT_PROCEDURES_COUNT),
            vault_knowledge: self.query_vault(task, TASK_CONTEXT_VAULT_COUNT),
        }
    }

    /// Build the context focused on learning from past outcomes.
    #[must_use]
    pub fn get_learning_context(&self) -> LearningContext {
        let (mastered_skills, skills_to_improve) = {
            let procedural = self.procedural.read().unwrap();
            let mut mastered = Vec::new();
            let mut improvable = Vec::new();
            for (skill, entry) in procedural.procedures() {
                let EntryDetails::Procedural { success_rate, .. } = &entry.details else {
                    continue;
                };
                if *success_rate > LEARNING_SKILL_MASTERED_RATE_MIN {
                    mastered.push(skill.clone());
                } else if *success_rate > LEARNING_SKILL_IMPROVE_RATE_MIN
                    && *success_rate < LEARNING_SKILL_IMPROVE_RATE_MAX
                {
                    improvable.push(skill.clone());
                }
            }
            mastered.sort();
            improvable.sort();
            (mastered, improvable)
        };

        LearningContext {
            recent_failures: self.recall_failures(LEARNING_CONTEXT_FAILURES_COUNT),
            recent_successes: self.recall_successes(LEARNING_CONTEXT_SUCCESSES_COUNT),
            mastered_skills,
            skills_to_improve,
        }
    }

    // =========================================================================
    // Stats & Lifecycle
    // =========================================================================

    /// Live statistics across all tiers.
    #[must_use]
    pub fn get_stats(&self) -> MemoryStats {
        // One lock at a time: each guard is dropped at the end of its
        // statement, so this can never hold locks in a conflicting order
        // with a concurrent import.
        let episodic_entries = self.episodic.read().unwrap().len();
        let semantic_facts = self.semantic.read().unwrap().len();
        let procedural_skills = self.procedural.read().unwrap().len();
        let vault_entries = self.vault.read().unwrap().len();
        let counters = self.counters.read().unwrap().clone();
        let cache_entries = self.resource_cache.read().unwrap().len();

        MemoryStats {
            counters,
            episodic_entries,
            semantic_facts,
            procedural_skills,
            vault_entries,
            cache_entries,
        }
    }

    /// Clear all tiers, the cache, the vault, and the counters.
    ///
    /// The core identity map is preserved.
    pub fn clear_all(&self) {
        *self.episodic.write().unwrap() =
            EpisodicMemory::new(self.config.episodic.clone(), self.clock.clone());
        *self.semantic.write().unwrap() = SemanticMemory::new(self.clock.clone());
        *self.procedural.write().unwrap() = ProceduralMemory::new(self.clock.clone());
        self.resource_cache.write().unwrap().clear();
        self.vault.write().unwrap().clear();
        *self.counters.write().unwrap() = MemoryCounters::default();
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Export the full structural state.
    ///
    /// Locks are acquired in the fixed tier order and held together, so the
    /// snapshot is consistent across tiers.
    #[must_use]
    pub fn export_state(&self) -> MemorySnapshot {
        let core = self.core.read().unwrap();
        let episodic = self.episodic.read().unwrap();
        let semantic = self.semantic.read().unwrap();
        let procedural = self.procedural.read().unwrap();
        let vault = self.vault.read().unwrap();
        let counters = self.counters.read().unwrap();

        MemorySnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            exported_at_ms: self.clock.now_ms(),
            core: core.clone(),
            episodic: episodic.entries().to_vec(),
            semantic: SemanticState {
                facts: semantic.facts().clone(),
                relations: semantic.relations().clone(),
            },
            procedural: procedural.procedures().clone(),
            vault: vault.clone(),
            counters: counters.clone(),
        }
    }

    /// Replace the full state from a snapshot.
    ///
    /// The snapshot is validated first; an invalid snapshot is rejected
    /// without touching any tier. The resource cache is ephemeral and is
    /// cleared on import.
    pub fn import_state(&self, snapshot: MemorySnapshot) -> Result<(), SnapshotError> {
        snapshot.validate()?;

        let mut core = self.core.write().unwrap();
        let mut episodic = self.episodic.write().unwrap();
        let mut semantic = self.semantic.write().unwrap();
        let mut procedural = self.procedural.write().unwrap();
        let mut vault = self.vault.write().unwrap();
        let mut counters = self.counters.write().unwrap();

        *core = snapshot.core;
        *episodic = EpisodicMemory::restore(
            self.config.episodic.clone(),
            self.clock.clone(),
            snapshot.episodic,
        );
        *semantic = SemanticMemory::restore(
            self.clock.clone(),
            snapshot.semantic.facts,
            snapshot.semantic.relations,
        );
        *procedural = ProceduralMemory::restore(self.clock.clone(), snapshot.procedural);
        *vault = snapshot.vault;
        *counters = snapshot.counters;
        self.resource_cache.write().unwrap().clear();

        tracing::info!(
            episodic = episodic.len(),
            facts = semantic.len(),
            procedures = procedural.len(),
            vault = vault.len(),
            "memory state imported"
        );

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
