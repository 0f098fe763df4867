//! MemoryEntry - Structured Record for Long-Term Tiers
//!
//! `TigerStyle`: Explicit types, per-kind details instead of a metadata bag,
//! deterministic ids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{ENTRY_IMPORTANCE_MAX, ENTRY_IMPORTANCE_MIN};
use crate::scoring::RelevanceScorer;

// =============================================================================
// Memory Kind
// =============================================================================

/// The tier a memory entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Persistent identity record
    Core,
    /// Past experiences
    Episodic,
    /// Factual knowledge
    Semantic,
    /// Learned skills
    Procedural,
    /// Consolidated long-term knowledge
    Vault,
}

impl MemoryKind {
    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
            Self::Vault => "vault",
        }
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Outcome Classification
// =============================================================================

/// Keywords marking an outcome as a success. Checked before failure keywords.
const OUTCOME_SUCCESS_KEYWORDS: &[&str] = &[
    "success",
    "completed",
    "achieved",
    "solved",
    "correct",
    "passed",
];

/// Keywords marking an outcome as a failure.
const OUTCOME_FAILURE_KEYWORDS: &[&str] = &[
    "fail",
    "error",
    "wrong",
    "incorrect",
    "crashed",
    "timeout",
];

/// Classification of an experience outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeClass {
    /// Outcome text matched a success keyword
    Success,
    /// Outcome text matched a failure keyword
    Failure,
    /// Neither list matched
    Neutral,
}

impl OutcomeClass {
    /// Classify an outcome description by keyword containment.
    ///
    /// Success keywords are scanned before failure keywords; the first hit
    /// wins, so "passed after one error" classifies as success.
    #[must_use]
    pub fn classify(outcome: &str) -> Self {
        let lowered = outcome.to_lowercase();
        if OUTCOME_SUCCESS_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            Self::Success
        } else if OUTCOME_FAILURE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            Self::Failure
        } else {
            Self::Neutral
        }
    }

    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for OutcomeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Per-Kind Details
// =============================================================================

/// Structured, kind-specific fields of a memory entry.
///
/// The per-kind variants replace the open metadata map of earlier designs:
/// every field an algorithm reads is named and typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryDetails {
    /// What happened and how it went
    Episodic {
        /// The experience as described by the caller
        experience: String,
        /// The raw outcome text
        outcome: String,
        /// Classified outcome
        outcome_class: OutcomeClass,
        /// Situational context captured at store time
        context: BTreeMap<String, String>,
    },
    /// A fact filed under a topic
    Semantic {
        /// Topic/subject of the fact
        topic: String,
        /// Where the fact came from
        source: Option<String>,
        /// Confidence level in [0, 1]
        confidence: f64,
    },
    /// A skill and its steps
    Procedural {
        /// Name of the skill
        skill_name: String,
        /// Ordered execution steps
        steps: Vec<String>,
        /// Exponentially averaged success rate in [0, 1]
        success_rate: f64,
        /// Times the procedure has been executed
        execution_count: u64,
        /// Conditions required before execution
        preconditions: Vec<String>,
    },
    /// A consolidated copy of a qualifying entry
    Vault {
        /// When consolidation created this copy (ms since epoch)
        consolidated_at_ms: u64,
        /// Full details of the source entry
        source: Box<EntryDetails>,
    },
}

impl EntryDetails {
    /// The tier this details variant belongs to.
    #[must_use]
    pub fn kind(&self) -> MemoryKind {
        match self {
            Self::Episodic { .. } => MemoryKind::Episodic,
            Self::Semantic { .. } => MemoryKind::Semantic,
            Self::Procedural { .. } => MemoryKind::Procedural,
            Self::Vault { .. } => MemoryKind::Vault,
        }
    }
}

// =============================================================================
// Memory Entry
// =============================================================================

/// One record in a long-term memory tier.
///
/// `TigerStyle`: importance always clamped to [0, 1]; `kind` always agrees
/// with the `details` variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Stable identifier, unique within the owning tier
    pub id: String,
    /// Owning tier
    pub kind: MemoryKind,
    /// Rendered text content (what a prompt would include)
    pub content: String,
    /// Kind-specific structured fields
    pub details: EntryDetails,
    /// Creation timestamp (ms since epoch)
    pub created_at_ms: u64,
    /// Last successful read that returned this entry (ms since epoch)
    pub accessed_at_ms: u64,
    /// Number of successful reads that returned this entry
    pub access_count: u64,
    /// Importance in [0, 1], used for decay and consolidation
    pub importance: f64,
    /// Free-form retrieval tags
    pub tags: Vec<String>,
}

impl MemoryEntry {
    /// Create a new entry.
    ///
    /// Importance is clamped to [0, 1].
    ///
    /// # Panics
    /// Panics if `id` is empty or `details` does not belong to `kind`.
    #[must_use]
    pub fn new(
        id: String,
        content: String,
        details: EntryDetails,
        created_at_ms: u64,
        importance: f64,
        tags: Vec<String>,
    ) -> Self {
        // Preconditions
        assert!(!id.is_empty(), "entry id cannot be empty");
        let kind = details.kind();

        Self {
            id,
            kind,
            content,
            details,
            created_at_ms,
            accessed_at_ms: created_at_ms,
            access_count: 0,
            importance: clamp_importance(importance),
            tags,
        }
    }

    /// Record a successful read at the given time.
    pub fn record_access(&mut self, now_ms: u64) {
        self.accessed_at_ms = now_ms;
        self.access_count += 1;
    }

    /// Set importance, clamped to [0, 1].
    pub fn set_importance(&mut self, importance: f64) {
        self.importance = clamp_importance(importance);
    }

    /// Current relevance per the shared long-term scoring contract.
    #[must_use]
    pub fn relevance(&self, scorer: &RelevanceScorer, now_ms: u64) -> f64 {
        scorer.score_entry(self.importance, self.accessed_at_ms, now_ms)
    }
}

/// Clamp a score into the importance range.
#[must_use]
pub(crate) fn clamp_importance(value: f64) -> f64 {
    value.clamp(ENTRY_IMPORTANCE_MIN, ENTRY_IMPORTANCE_MAX)
}

// =============================================================================
// Deterministic Ids
// =============================================================================

/// Fixed namespace for deterministic entry ids (UUIDv5).
const ENGRAM_NAMESPACE: uuid::Uuid = uuid::Uuid::from_bytes([
    0x2f, 0x8c, 0x51, 0xe7, 0x9a, 0x04, 0x4b, 0xd1, 0xb6, 0x3e, 0x72, 0x0a, 0xc4, 0x95, 0x1d,
    0x68,
]);

/// Derive the id for a fact. Stable across overwrites of the same topic.
#[must_use]
pub(crate) fn fact_id(topic: &str) -> String {
    uuid::Uuid::new_v5(&ENGRAM_NAMESPACE, format!("fact:{}", topic).as_bytes()).to_string()
}

/// Derive the id for a procedure. Stable across overwrites of the same skill.
#[must_use]
pub(crate) fn procedure_id(skill_name: &str) -> String {
    uuid::Uuid::new_v5(
        &ENGRAM_NAMESPACE,
        format!("procedure:{}", skill_name).as_bytes(),
    )
    .to_string()
}

/// Derive the id for an episode from its content and creation time.
#[must_use]
pub(crate) fn episode_id(experience: &str, created_at_ms: u64) -> String {
    uuid::Uuid::new_v5(
        &ENGRAM_NAMESPACE,
        format!("episode:{}:{}", experience, created_at_ms).as_bytes(),
    )
    .to_string()
}

// =============================================================================
// Tests
// =============================================================================
