//! End-to-end tests across the context store, memory tiers, and facade.
//!
//! These drive the crate the way an orchestrator would: push artifacts into
//! the working set before a model call, write experiences and knowledge after
//! it, consolidate, persist, and restore.

use std::collections::BTreeMap;

use engram_memory::clock::Clock;
use engram_memory::context::{BoundedContextStore, ContentKind, ContextStoreConfig};
use engram_memory::memory::{
    EntryDetails, EpisodicConfig, EpisodicMemory, ProceduralMemory, SemanticMemory,
};
use engram_memory::system::{MemorySystem, MemorySystemConfig, SnapshotError};

const BASE_TIME_MS: u64 = 1_700_000_000_000;

fn context_store(max_tokens: u32) -> BoundedContextStore {
    let config = ContextStoreConfig {
        max_tokens,
        ..Default::default()
    };
    BoundedContextStore::with_config(config, Clock::manual_at_ms(BASE_TIME_MS))
}

fn system() -> (MemorySystem, Clock) {
    let clock = Clock::manual_at_ms(BASE_TIME_MS);
    (
        MemorySystem::with_clock(MemorySystemConfig::default(), clock.clone()),
        clock,
    )
}

// =============================================================================
// Working-Set Scenarios
// =============================================================================

#[test]
fn full_store_optimizes_to_half_capacity() {
    let mut store = context_store(1000);

    for i in 0..10 {
        assert!(store.add(&format!("i{}", i), "x", ContentKind::ToolResult, 100, false));
    }
    assert_eq!(store.usage_percent(), 100.0);

    let report = store.auto_optimize(0, 0.5);

    assert!(store.total_tokens() <= 500);
    assert!(report.items_removed >= 5);
}

#[test]
fn pinned_content_floors_optimization() {
    let mut store = context_store(1000);

    assert!(store.add("pinned", "keep me", ContentKind::Conversation, 500, true));
    for i in 0..5 {
        assert!(store.add(&format!("u{}", i), "x", ContentKind::ToolResult, 100, false));
    }
    assert_eq!(store.total_tokens(), 1000);

    store.auto_optimize(0, 0.4);

    // All unpinned items evicted; the pinned floor of 500 remains
    assert!(store.contains("pinned"));
    assert_eq!(store.total_tokens(), 500);
}

#[test]
fn token_budget_holds_across_mixed_operations() {
    let mut store = context_store(2000);
    let kinds = ContentKind::all();

    for i in 0..200u32 {
        let id = format!("item{}", i % 40);
        let kind = kinds[(i % kinds.len() as u32) as usize];
        let accepted = store.add(&id, "content", kind, 37 + (i % 13) * 29, i % 11 == 0);
        let _ = accepted;
        if i % 3 == 0 {
            store.access(&id);
        }
        if i % 17 == 0 {
            store.remove(&format!("item{}", (i + 5) % 40));
        }
        assert!(store.total_tokens() <= 2000, "budget violated at step {}", i);
    }
}

#[test]
fn compressed_content_fits_edit_context() {
    let body = format!("{}{}{}", "header ".repeat(40), "body ", "footer ".repeat(40));
    let compressed = engram_memory::compress(&body, 100);

    assert!(compressed.starts_with("header"));
    assert!(compressed.trim_end().ends_with("footer"));
    assert!(compressed.contains("[truncated]"));
}

// =============================================================================
// Tier Scenarios
// =============================================================================

#[test]
fn success_rate_ema_matches_reference_sequence() {
    let mut procedural = ProceduralMemory::new(Clock::manual_at_ms(BASE_TIME_MS));
    procedural.store_procedure(
        "setup",
        vec!["a".to_string(), "b".to_string()],
        0.0,
        vec![],
        vec![],
    );

    procedural.update_success_rate("setup", true);
    let entry = procedural.get("setup").unwrap();
    match entry.details {
        EntryDetails::Procedural {
            success_rate,
            execution_count,
            ..
        } => {
            assert!((success_rate - 0.5).abs() < 1e-9);
            assert_eq!(execution_count, 1);
        }
        other => panic!("unexpected details: {:?}", other),
    }

    procedural.update_success_rate("setup", true);
    let entry = procedural.get("setup").unwrap();
    match entry.details {
        EntryDetails::Procedural { success_rate, .. } => {
            assert!((success_rate - 0.75).abs() < 1e-9);
        }
        other => panic!("unexpected details: {:?}", other),
    }
}

#[test]
fn confidence_clamps_at_one() {
    let mut semantic = SemanticMemory::new(Clock::manual_at_ms(BASE_TIME_MS));
    semantic.store_fact("topic", "fact", None, 0.8, vec![]);

    semantic.update_confidence("topic", 0.3);

    match semantic.query("topic").unwrap().details {
        EntryDetails::Semantic { confidence, .. } => assert_eq!(confidence, 1.0),
        other => panic!("unexpected details: {:?}", other),
    }
}

#[test]
fn scores_stay_bounded_under_update_storms() {
    let mut semantic = SemanticMemory::new(Clock::manual_at_ms(BASE_TIME_MS));
    let mut procedural = ProceduralMemory::new(Clock::manual_at_ms(BASE_TIME_MS));

    semantic.store_fact("topic", "fact", None, 0.5, vec![]);
    procedural.store_procedure("skill", vec!["step".to_string()], 0.5, vec![], vec![]);

    for i in 0..100 {
        semantic.update_confidence("topic", if i % 2 == 0 { 0.4 } else { -0.7 });
        procedural.update_success_rate("skill", i % 3 != 0);

        match semantic.query("topic").unwrap().details {
            EntryDetails::Semantic { confidence, .. } => {
                assert!((0.0..=1.0).contains(&confidence));
            }
            other => panic!("unexpected details: {:?}", other),
        }
        match procedural.get("skill").unwrap().details {
            EntryDetails::Procedural { success_rate, .. } => {
                assert!((0.0..=1.0).contains(&success_rate));
            }
            other => panic!("unexpected details: {:?}", other),
        }
    }
}

#[test]
fn episodic_capacity_prunes_lowest_relevance() {
    let clock = Clock::manual_at_ms(BASE_TIME_MS);
    let mut episodic = EpisodicMemory::new(EpisodicConfig { max_entries: 10 }, clock.clone());

    for i in 0..20 {
        let importance = if i < 10 { 0.1 } else { 0.9 };
        episodic.store(
            &format!("event number {}", i),
            "neutral outcome",
            BTreeMap::new(),
            importance,
            vec![],
        );
        clock.advance_ms(1);
    }

    assert_eq!(episodic.len(), 10);
    // The high-importance half survived
    for entry in episodic.entries() {
        assert!(entry.importance > 0.5);
    }
}

// =============================================================================
// Consolidation Scenarios
// =============================================================================

/// Thresholds are exclusive: a 0.85 procedure and a 0.95 fact consolidate, a
/// 0.79 procedure and a 0.89 fact do not. Rates are injected via snapshot
/// import, which is how a persisted system re-enters the process.
#[test]
fn consolidation_respects_both_thresholds() {
    let (seed, _clock) = system();
    seed.learn_fact("strong", "known with certainty", None, 0.95);
    seed.learn_fact("weak", "probably right", None, 0.89);
    seed.learn_procedure("good skill", vec!["works".to_string()], vec![]);
    seed.learn_procedure("bad skill", vec!["flaky".to_string()], vec![]);

    let mut snapshot = seed.export_state();
    for (name, rate) in [("good skill", 0.85), ("bad skill", 0.79)] {
        let entry = snapshot.procedural.get_mut(name).unwrap();
        entry.importance = rate;
        match &mut entry.details {
            EntryDetails::Procedural { success_rate, .. } => *success_rate = rate,
            other => panic!("unexpected details: {:?}", other),
        }
    }

    let (target, _clock) = system();
    target.import_state(snapshot).unwrap();

    let added = target.consolidate_to_vault();
    assert_eq!(added, 2);

    assert_eq!(target.query_vault("works", 5).len(), 1);
    assert!(target.query_vault("flaky", 5).is_empty());
    assert_eq!(target.query_vault("certainty", 5).len(), 1);
    assert!(target.query_vault("probably", 5).is_empty());

    // Idempotence: nothing new on the second pass
    assert_eq!(target.consolidate_to_vault(), 0);
}

// =============================================================================
// Persistence Scenarios
// =============================================================================

#[test]
fn snapshot_round_trips_losslessly() {
    let (memory, clock) = system();

    memory.update_core("workspace", serde_json::json!("/repo"));
    memory.remember_experience("fixed the flaky test", "tests passed", BTreeMap::new(), 0.8);
    clock.advance_ms(500);
    memory.remember_experience("refactored the parser", "completed", BTreeMap::new(), 0.6);
    // Bump access counters so the round trip has to preserve them
    memory.recall_experiences("flaky test", 1);

    memory.learn_fact("parser", "uses recursive descent", Some("src/parser.rs".to_string()), 0.95);
    memory.relate_concepts("parser", "lexer", "related");
    memory.learn_procedure("fix flaky test", vec!["rerun".to_string(), "bisect".to_string()], vec![]);
    memory.record_procedure_outcome("fix flaky test", true);
    memory.consolidate_to_vault();

    // Export -> JSON -> import into a fresh system
    let exported = memory.export_state();
    let json = serde_json::to_string(&exported).unwrap();
    let decoded = serde_json::from_str(&json).unwrap();

    let (restored, _clock) = system();
    restored.import_state(decoded).unwrap();

    // Re-exporting yields structurally identical tiers
    let reexported = restored.export_state();
    let original = serde_json::to_value(&exported).unwrap();
    let round_tripped = serde_json::to_value(&reexported).unwrap();

    for tier in ["core", "episodic", "semantic", "procedural", "vault", "counters"] {
        assert_eq!(original[tier], round_tripped[tier], "tier {} drifted", tier);
    }

    // Behavior survives the round trip
    assert_eq!(
        restored.query_knowledge("parser").unwrap(),
        "uses recursive descent"
    );
    assert_eq!(restored.related_concepts("lexer"), vec!["parser".to_string()]);
    assert_eq!(restored.procedure_steps("fix flaky test").unwrap().len(), 2);
    assert_eq!(restored.get_stats().vault_entries, 1);

    // Access counters preserved verbatim
    let recalled = restored.recall_experiences("flaky test", 1);
    assert_eq!(recalled[0].access_count, 2);
}

#[test]
fn invalid_snapshot_rejected_without_side_effects() {
    let (memory, _clock) = system();
    memory.learn_fact("existing", "knowledge to keep", None, 0.8);

    // Corrupt snapshot: duplicate episodic ids
    let (donor, _clock) = system();
    donor.remember_experience("event", "success", BTreeMap::new(), 0.5);
    let mut snapshot = donor.export_state();
    let duplicate = snapshot.episodic[0].clone();
    snapshot.episodic.push(duplicate);

    let result = memory.import_state(snapshot);
    assert!(matches!(result, Err(SnapshotError::DuplicateId { .. })));

    // Target untouched
    assert_eq!(memory.get_stats().episodic_entries, 0);
    assert_eq!(memory.query_knowledge("existing").unwrap(), "knowledge to keep");
}

#[test]
fn version_mismatch_rejected() {
    let (memory, _clock) = system();
    let mut snapshot = memory.export_state();
    snapshot.format_version += 1;

    assert!(matches!(
        memory.import_state(snapshot),
        Err(SnapshotError::UnsupportedVersion { .. })
    ));
}

// =============================================================================
// Orchestrator Workflow
// =============================================================================

/// The loop an orchestrator runs: seed the working set, pull task context,
/// record results, learn, and carry on.
#[test]
fn orchestrator_round_trip_workflow() {
    let clock = Clock::manual_at_ms(BASE_TIME_MS);
    let memory = MemorySystem::with_clock(MemorySystemConfig::default(), clock.clone());
    let mut context = BoundedContextStore::with_config(
        ContextStoreConfig {
            max_tokens: 10_000,
            ..Default::default()
        },
        clock.clone(),
    );

    // Task 1: investigate a failing build
    assert!(context.add("task", "investigate failing build", ContentKind::Conversation, 50, true));
    assert!(context.add("read:ci.log", "error[E0502]: cannot borrow...", ContentKind::ErrorMessage, 800, false));
    assert!(context.add("read:src/lib.rs", "pub mod parser;", ContentKind::FileContent, 2000, false));

    memory.remember_experience(
        "borrow checker error in parser module",
        "solved by splitting the borrow",
        BTreeMap::from([("file".to_string(), "src/parser.rs".to_string())]),
        0.8,
    );
    memory.learn_fact("E0502", "fix by restructuring overlapping borrows", None, 0.9);
    memory.learn_procedure(
        "diagnose borrow error",
        vec!["read the span labels".to_string(), "split the borrow".to_string()],
        vec![],
    );
    memory.record_procedure_outcome("diagnose borrow error", true);

    // Task 2, a day later: similar problem, context informs the prompt
    clock.advance_ms(24 * 60 * 60 * 1000);
    let task_context = memory.get_context_for_task("borrow checker error in lexer");

    assert!(!task_context.relevant_experiences.is_empty());
    assert!(task_context
        .relevant_experiences[0]
        .content
        .contains("borrow checker"));
    assert_eq!(task_context.relevant_procedures.len(), 1);
    assert!(task_context.relevant_procedures[0].success_rate > 0.0);

    // Working set keeps serving under churn
    for i in 0..30 {
        context.add(
            &format!("tool:{}", i),
            "output",
            ContentKind::ToolResult,
            900,
            false,
        );
    }
    assert!(context.total_tokens() <= 10_000);
    assert!(context.contains("task"), "pinned task survived churn");
}
