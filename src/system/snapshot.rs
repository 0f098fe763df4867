//! Snapshot Persistence - Export/Import with Validation
//!
//! `TigerStyle`: Validate everything before applying anything.
//!
//! A [`MemorySnapshot`] is the full structural state of a
//! [`crate::system::MemorySystem`]: core map, every tier's entries, the
//! vault, and the lifetime counters. Timestamps are milliseconds since the
//! Unix epoch (UTC), so serialized snapshots are timezone-unambiguous;
//! floats are carried as `f64` end to end. Missing required fields surface
//! as `serde` deserialization errors before validation ever runs; the checks
//! here cover what the type system cannot: id uniqueness, score ranges, and
//! tier/detail agreement.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{ENTRY_IMPORTANCE_MAX, ENTRY_IMPORTANCE_MIN, SNAPSHOT_FORMAT_VERSION};
use crate::memory::{EntryDetails, MemoryEntry, MemoryKind};

// =============================================================================
// Error Types
// =============================================================================

/// Validation failures for imported snapshots.
///
/// Import applies nothing when validation fails; each variant names the
/// offending tier and record.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SnapshotError {
    /// Snapshot was produced by an unsupported format version
    #[error("unsupported snapshot version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the snapshot
        found: u32,
        /// Version this build supports
        supported: u32,
    },

    /// Two records in one tier share an id
    #[error("duplicate id in {tier} tier: {id}")]
    DuplicateId {
        /// Tier containing the duplicate
        tier: &'static str,
        /// The duplicated id
        id: String,
    },

    /// A score field is outside [0, 1]
    #[error("{field} {value} out of range in {tier} tier: {id}")]
    ScoreOutOfRange {
        /// Tier containing the record
        tier: &'static str,
        /// Offending record id
        id: String,
        /// Name of the out-of-range field
        field: &'static str,
        /// The offending value
        value: f64,
    },

    /// An entry's kind or details variant does not belong to its tier
    #[error("kind mismatch in {tier} tier: {id}")]
    KindMismatch {
        /// Tier containing the record
        tier: &'static str,
        /// Offending record id
        id: String,
    },

    /// A map key disagrees with the keyed field inside the entry
    #[error("map key {key:?} disagrees with entry field in {tier} tier: {id}")]
    KeyMismatch {
        /// Tier containing the record
        tier: &'static str,
        /// Offending record id
        id: String,
        /// The disagreeing map key
        key: String,
    },
}

// =============================================================================
// Snapshot Types
// =============================================================================

/// Lifetime counters carried across export/import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCounters {
    /// Experiences stored since creation
    pub total_experiences: u64,
    /// Facts stored since creation
    pub total_facts: u64,
    /// Procedures stored since creation
    pub total_procedures: u64,
    /// Consolidation passes run since creation
    pub consolidations: u64,
}

/// Exported semantic tier: facts plus the relation graph.
///
/// The keyword index is derived state and is rebuilt on import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticState {
    /// topic -> fact entry
    pub facts: HashMap<String, MemoryEntry>,
    /// concept -> outgoing edges ("type:target")
    pub relations: HashMap<String, Vec<String>>,
}

/// Full structural state of a memory system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// When the snapshot was taken (ms since epoch)
    pub exported_at_ms: u64,
    /// Core identity map
    pub core: BTreeMap<String, serde_json::Value>,
    /// Episodic tier entries, in storage order
    pub episodic: Vec<MemoryEntry>,
    /// Semantic tier state
    pub semantic: SemanticState,
    /// Procedural tier: skill name -> entry
    pub procedural: HashMap<String, MemoryEntry>,
    /// Knowledge vault entries
    pub vault: Vec<MemoryEntry>,
    /// Lifetime counters
    pub counters: MemoryCounters,
}

impl MemorySnapshot {
    /// Validate the snapshot structurally.
    ///
    /// Checks format version, per-tier id uniqueness, score ranges, and
    /// tier/details agreement. A snapshot that validates can be applied in
    /// full.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.format_version,
                supported: SNAPSHOT_FORMAT_VERSION,
            });
        }

        // Episodic tier
        let mut seen = HashSet::new();
        for entry in &self.episodic {
            check_entry(entry, "episodic", MemoryKind::Episodic)?;
            if !seen.insert(entry.id.as_str()) {
                return Err(SnapshotError::DuplicateId {
                    tier: "episodic",
                    id: entry.id.clone(),
                });
            }
        }

        // Semantic tier
        let mut seen = HashSet::new();
        for (key, entry) in &self.semantic.facts {
            check_entry(entry, "semantic", MemoryKind::Semantic)?;
            let EntryDetails::Semantic {
                topic, confidence, ..
            } = &entry.details
            else {
                return Err(SnapshotError::KindMismatch {
                    tier: "semantic",
                    id: entry.id.clone(),
                });
            };
            if topic != key {
                return Err(SnapshotError::KeyMismatch {
                    tier: "semantic",
                    id: entry.id.clone(),
                    key: key.clone(),
                });
            }
            check_score(*confidence, "semantic", &entry.id, "confidence")?;
            if !seen.insert(entry.id.as_str()) {
                return Err(SnapshotError::DuplicateId {
                    tier: "semantic",
                    id: entry.id.clone(),
                });
            }
        }

        // Procedural tier
        let mut seen = HashSet::new();
        for (key, entry) in &self.procedural {
            check_entry(entry, "procedural", MemoryKind::Procedural)?;
            let EntryDetails::Procedural {
                skill_name,
                success_rate,
                ..
            } = &entry.details
            else {
                return Err(SnapshotError::KindMismatch {
                    tier: "procedural",
                    id: entry.id.clone(),
                });
            };
            if skill_name != key {
                return Err(SnapshotError::KeyMismatch {
                    tier: "procedural",
                    id: entry.id.clone(),
                    key: key.clone(),
                });
            }
            check_score(*success_rate, "procedural", &entry.id, "success_rate")?;
            if !seen.insert(entry.id.as_str()) {
                return Err(SnapshotError::DuplicateId {
                    tier: "procedural",
                    id: entry.id.clone(),
                });
            }
        }

        // Vault
        let mut seen = HashSet::new();
        for entry in &self.vault {
            check_entry(entry, "vault", MemoryKind::Vault)?;
            if !seen.insert(entry.id.as_str()) {
                return Err(SnapshotError::DuplicateId {
                    tier: "vault",
                    id: entry.id.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Check an entry's kind/details agreement and importance range.
fn check_entry(
    entry: &MemoryEntry,
    tier: &'static str,
    expected: MemoryKind,
) -> Result<(), SnapshotError> {
    if entry.kind != expected || entry.details.kind() != expected {
        return Err(SnapshotError::KindMismatch {
            tier,
            id: entry.id.clone(),
        });
    }
    check_score(entry.importance, tier, &entry.id, "importance")
}

/// Check a score field lies in [0, 1].
fn check_score(
    value: f64,
    tier: &'static str,
    id: &str,
    field: &'static str,
) -> Result<(), SnapshotError> {
    if !(ENTRY_IMPORTANCE_MIN..=ENTRY_IMPORTANCE_MAX).contains(&value) || value.is_nan() {
        return Err(SnapshotError::ScoreOutOfRange {
            tier,
            id: id.to_string(),
            field,
            value,
        });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::OutcomeClass;

    fn empty_snapshot() -> MemorySnapshot {
        MemorySnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            exported_at_ms: 0,
            core: BTreeMap::new(),
            episodic: Vec::new(),
            semantic: SemanticState::default(),
            procedural: HashMap::new(),
            vault: Vec::new(),
            counters: MemoryCounters::default(),
        }
    }

    fn episodic_entry(id: &str) -> MemoryEntry {
        MemoryEntry::new(
            id.to_string(),
            "Experience: e\nOutcome: o".to_string(),
            EntryDetails::Episodic {
                experience: "e".to_string(),
                outcome: "o".to_string(),
                outcome_class: OutcomeClass::Neutral,
                context: BTreeMap::new(),
            },
            1000,
            0.5,
            vec![],
        )
    }

    fn semantic_entry(topic: &str, confidence: f64) -> MemoryEntry {
        MemoryEntry::new(
            format!("fact-{}", topic),
            "content".to_string(),
            EntryDetails::Semantic {
                topic: topic.to_string(),
                source: None,
                confidence,
            },
            1000,
            confidence.clamp(0.0, 1.0),
            vec![],
        )
    }

    #[test]
    fn test_empty_snapshot_validates() {
        assert!(empty_snapshot().validate().is_ok());
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut snapshot = empty_snapshot();
        snapshot.format_version = 99;

        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::UnsupportedVersion {
                found: 99,
                supported: SNAPSHOT_FORMAT_VERSION,
            })
        );
    }

    #[test]
    fn test_duplicate_episodic_id_rejected() {
        let mut snapshot = empty_snapshot();
        snapshot.episodic.push(episodic_entry("dup"));
        snapshot.episodic.push(episodic_entry("dup"));

        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::DuplicateId { tier: "episodic", .. })
        ));
    }

    #[test]
    fn test_wrong_kind_in_tier_rejected() {
        let mut snapshot = empty_snapshot();
        // A semantic entry stored in the episodic tier
        snapshot.episodic.push(semantic_entry("topic", 0.5));

        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::KindMismatch { tier: "episodic", .. })
        ));
    }

    #[test]
    fn test_out_of_range_confidence_rejected() {
        let mut snapshot = empty_snapshot();
        let mut entry = semantic_entry("topic", 0.5);
        // Corrupt the score after construction (construction clamps)
        if let EntryDetails::Semantic { confidence, .. } = &mut entry.details {
            *confidence = 1.5;
        }
        snapshot.semantic.facts.insert("topic".to_string(), entry);

        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::ScoreOutOfRange {
                tier: "semantic",
                field: "confidence",
                ..
            })
        ));
    }

    #[test]
    fn test_topic_key_mismatch_rejected() {
        let mut snapshot = empty_snapshot();
        snapshot
            .semantic
            .facts
            .insert("other".to_string(), semantic_entry("topic", 0.5));

        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::KeyMismatch { tier: "semantic", .. })
        ));
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let mut snapshot = empty_snapshot();
        snapshot.exported_at_ms = 1_700_000_000_123;
        snapshot
            .core
            .insert("name".to_string(), serde_json::json!("agent"));
        snapshot.episodic.push(episodic_entry("e1"));
        snapshot
            .semantic
            .facts
            .insert("topic".to_string(), semantic_entry("topic", 0.875_001));
        snapshot.counters.total_facts = 1;

        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        let back: MemorySnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(back.exported_at_ms, snapshot.exported_at_ms);
        assert_eq!(back.core["name"], serde_json::json!("agent"));
        assert_eq!(back.episodic.len(), 1);
        assert_eq!(back.counters, snapshot.counters);

        // Float precision preserved well past 1e-6
        let EntryDetails::Semantic { confidence, .. } = &back.semantic.facts["topic"].details
        else {
            panic!("wrong details");
        };
        assert!((confidence - 0.875_001).abs() < 1e-9);
    }

    #[test]
    fn test_missing_field_is_serde_error() {
        let err = serde_json::from_str::<MemorySnapshot>("{\"format_version\":1}");
        assert!(err.is_err());
    }
}
