//! Procedural Memory - Learned Skills
//!
//! `TigerStyle`: Explicit EMA phases, importance tracks the success rate.
//!
//! Procedures are keyed by skill name; storing a name again overwrites the
//! procedure. The success rate is an exponential moving average with two
//! phases: the first few executions are highly reactive (`alpha = 0.5`),
//! later executions are stable (`alpha = 0.2`). The switch happens once
//! `execution_count > 5` at update time, so the 7th recorded outcome is the
//! first to use the stable alpha.

use std::collections::HashMap;

use crate::clock::Clock;
use crate::constants::{
    ENTRY_IMPORTANCE_MAX, ENTRY_IMPORTANCE_MIN, PROCEDURE_EMA_ALPHA_EARLY,
    PROCEDURE_EMA_ALPHA_LATE, PROCEDURE_EMA_EARLY_EXECUTIONS_COUNT,
};
use crate::memory::entry::{procedure_id, EntryDetails, MemoryEntry};
use crate::memory::{keywords, query_terms};

/// Skill store with keyword search and success-rate tracking.
#[derive(Debug)]
pub struct ProceduralMemory {
    clock: Clock,
    /// skill name -> procedure entry
    procedures: HashMap<String, MemoryEntry>,
    /// lowercase keyword -> skill names, in first-indexed order
    keyword_index: HashMap<String, Vec<String>>,
}

impl ProceduralMemory {
    /// Create an empty procedural memory.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            procedures: HashMap::new(),
            keyword_index: HashMap::new(),
        }
    }

    /// Store a procedure, replacing any prior procedure under that name.
    ///
    /// The entry content is the steps rendered as a numbered list (used for
    /// search and display, not execution). Returns a copy of the stored
    /// entry.
    ///
    /// # Panics
    /// Panics if `skill_name` is empty or `success_rate` is outside [0, 1].
    pub fn store_procedure(
        &mut self,
        skill_name: &str,
        steps: Vec<String>,
        success_rate: f64,
        preconditions: Vec<String>,
        tags: Vec<String>,
    ) -> MemoryEntry {
        // Preconditions
        assert!(!skill_name.is_empty(), "skill_name cannot be empty");
        assert!(
            (ENTRY_IMPORTANCE_MIN..=ENTRY_IMPORTANCE_MAX).contains(&success_rate),
            "success_rate {} outside [{}, {}]",
            success_rate,
            ENTRY_IMPORTANCE_MIN,
            ENTRY_IMPORTANCE_MAX
        );

        let now_ms = self.clock.now_ms();
        let entry = MemoryEntry::new(
            procedure_id(skill_name),
            render_steps(&steps),
            EntryDetails::Procedural {
                skill_name: skill_name.to_string(),
                steps: steps.clone(),
                success_rate,
                execution_count: 0,
                preconditions,
            },
            now_ms,
            success_rate,
            tags,
        );

        self.index_skill(skill_name, &steps);
        self.procedures.insert(skill_name.to_string(), entry.clone());

        entry
    }

    /// Look up a procedure by skill name, bumping its access counters.
    pub fn get(&mut self, skill_name: &str) -> Option<MemoryEntry> {
        let now_ms = self.clock.now_ms();
        self.procedures.get_mut(skill_name).map(|entry| {
            entry.record_access(now_ms);
            entry.clone()
        })
    }

    /// Get just the steps of a procedure, bumping its access counters.
    pub fn steps(&mut self, skill_name: &str) -> Option<Vec<String>> {
        self.get(skill_name).map(|entry| match entry.details {
            EntryDetails::Procedural { steps, .. } => steps,
            _ => unreachable!("procedural tier holds procedural details"),
        })
    }

    /// Search procedures by keyword, best success rate first.
    ///
    /// Returned procedures have their access counters updated.
    pub fn search_procedures(&mut self, query: &str, top_k: usize) -> Vec<MemoryEntry> {
        let now_ms = self.clock.now_ms();
        let mut seen: Vec<String> = Vec::new();

        for term in query_terms(query) {
            let Some(skills) = self.keyword_index.get(&term) else {
                continue;
            };
            for skill in skills {
                if self.procedures.contains_key(skill) && !seen.iter().any(|s| s == skill) {
                    seen.push(skill.clone());
                }
            }
        }

        let mut results: Vec<MemoryEntry> = seen
            .into_iter()
            .map(|skill| {
                let entry = self
                    .procedures
                    .get_mut(&skill)
                    .expect("seen skills exist in the procedure map");
                entry.record_access(now_ms);
                entry.clone()
            })
            .collect();

        results.sort_by(|a, b| {
            success_rate_of(b)
                .partial_cmp(&success_rate_of(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        results
    }

    /// Fold one execution outcome into the success rate.
    ///
    /// `new_rate = (1 - alpha) * old_rate + alpha * outcome` with
    /// `alpha = 0.2` once `execution_count > 5`, else `0.5`. Importance
    /// tracks the new rate. No-op for unknown skills.
    pub fn update_success_rate(&mut self, skill_name: &str, success: bool) {
        let Some(entry) = self.procedures.get_mut(skill_name) else {
            return;
        };

        let EntryDetails::Procedural {
            success_rate,
            execution_count,
            ..
        } = &mut entry.details
        else {
            unreachable!("procedural tier holds procedural details");
        };

        let alpha = if *execution_count > PROCEDURE_EMA_EARLY_EXECUTIONS_COUNT {
            PROCEDURE_EMA_ALPHA_LATE
        } else {
            PROCEDURE_EMA_ALPHA_EARLY
        };
        let outcome = if success { 1.0 } else { 0.0 };
        let new_rate = (1.0 - alpha) * *success_rate + alpha * outcome;

        *success_rate = new_rate;
        *execution_count += 1;
        entry.set_importance(new_rate);

        // Postcondition
        assert!(
            (ENTRY_IMPORTANCE_MIN..=ENTRY_IMPORTANCE_MAX).contains(&new_rate),
            "success rate must stay in range"
        );
    }

    /// Insert a step into an existing procedure.
    ///
    /// A position within bounds inserts there; anything else appends. The
    /// rendered content is rebuilt. No-op for unknown skills.
    pub fn add_step(&mut self, skill_name: &str, step: &str, position: Option<usize>) {
        let Some(entry) = self.procedures.get_mut(skill_name) else {
            return;
        };

        let EntryDetails::Procedural { steps, .. } = &mut entry.details else {
            unreachable!("procedural tier holds procedural details");
        };

        match position {
            Some(pos) if pos <= steps.len() => steps.insert(pos, step.to_string()),
            _ => steps.push(step.to_string()),
        }
        entry.content = render_steps(steps);

        self.index_skill(skill_name, &[step.to_string()]);
    }

    /// All skill names.
    #[must_use]
    pub fn skills(&self) -> Vec<String> {
        self.procedures.keys().cloned().collect()
    }

    /// Number of stored procedures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// Check if no procedures are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// The procedure map (for export and consolidation scans).
    #[must_use]
    pub fn procedures(&self) -> &HashMap<String, MemoryEntry> {
        &self.procedures
    }

    /// Rebuild from exported procedures, preserving all counters.
    ///
    /// The keyword index is derived state and is rebuilt from names+steps.
    #[must_use]
    pub fn restore(clock: Clock, procedures: HashMap<String, MemoryEntry>) -> Self {
        let mut memory = Self::new(clock);
        for (skill, entry) in &procedures {
            if let EntryDetails::Procedural { steps, .. } = &entry.details {
                memory.index_skill(skill, steps);
            }
        }
        memory.procedures = procedures;
        memory
    }

    /// Index the words of a skill name and its steps.
    fn index_skill(&mut self, skill_name: &str, steps: &[String]) {
        let mut words = keywords(skill_name);
        for step in steps {
            words.extend(keywords(step));
        }

        for word in words {
            let skills = self.keyword_index.entry(word).or_default();
            if !skills.iter().any(|s| s == skill_name) {
                skills.push(skill_name.to_string());
            }
        }
    }
}

/// Render steps as the numbered list used for search and display.
fn render_steps(steps: &[String]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Success rate of a procedural entry.
fn success_rate_of(entry: &MemoryEntry) -> f64 {
    match &entry.details {
        EntryDetails::Procedural { success_rate, .. } => *success_rate,
        _ => 0.0,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_TIME_MS: u64 = 1_700_000_000_000;

    fn memory() -> ProceduralMemory {
        ProceduralMemory::new(Clock::manual_at_ms(BASE_TIME_MS))
    }

    fn steps(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_store_renders_numbered_steps() {
        let mut procedural = memory();

        let entry = procedural.store_procedure(
            "release",
            steps(&["tag the commit", "build artifacts", "publish"]),
            0.0,
            vec![],
            vec![],
        );

        assert_eq!(
            entry.content,
            "1. tag the commit\n2. build artifacts\n3. publish"
        );
        assert_eq!(procedural.len(), 1);
    }

    #[test]
    fn test_store_overwrites_skill() {
        let mut procedural = memory();

        let first = procedural.store_procedure("setup", steps(&["a"]), 0.9, vec![], vec![]);
        let second = procedural.store_procedure("setup", steps(&["b", "c"]), 0.0, vec![], vec![]);

        assert_eq!(first.id, second.id);
        assert_eq!(procedural.len(), 1);
        assert_eq!(procedural.steps("setup").unwrap(), steps(&["b", "c"]));
    }

    #[test]
    fn test_get_bumps_access() {
        let mut procedural = memory();
        procedural.store_procedure("setup", steps(&["a"]), 0.0, vec![], vec![]);

        let entry = procedural.get("setup").unwrap();
        assert_eq!(entry.access_count, 1);

        assert!(procedural.get("missing").is_none());
    }

    // =========================================================================
    // Success-Rate EMA Tests
    // =========================================================================

    #[test]
    fn test_ema_reactive_phase() {
        let mut procedural = memory();
        procedural.store_procedure("setup", steps(&["a", "b"]), 0.0, vec![], vec![]);

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
        assert!((entry.importance - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_ema_switches_to_stable_phase_after_sixth_execution() {
        let mut procedural = memory();
        procedural.store_procedure("setup", steps(&["a"]), 0.0, vec![], vec![]);

        // Six successes in the reactive phase (count 0..=5 all use alpha 0.5)
        let mut expected = 0.0;
        for _ in 0..6 {
            procedural.update_success_rate("setup", true);
            expected = 0.5 * expected + 0.5;
        }

        // The 7th update sees execution_count == 6 > 5: alpha drops to 0.2
        procedural.update_success_rate("setup", true);
        expected = 0.8 * expected + 0.2;

        let entry = procedural.get("setup").unwrap();
        match entry.details {
            EntryDetails::Procedural {
                success_rate,
                execution_count,
                ..
            } => {
                assert!((success_rate - expected).abs() < 1e-9);
                assert_eq!(execution_count, 7);
            }
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_ema_stays_in_range() {
        let mut procedural = memory();
        procedural.store_procedure("setup", steps(&["a"]), 0.5, vec![], vec![]);

        for i in 0..50 {
            procedural.update_success_rate("setup", i % 3 == 0);
            let entry = procedural.get("setup").unwrap();
            match entry.details {
                EntryDetails::Procedural { success_rate, .. } => {
                    assert!((0.0..=1.0).contains(&success_rate));
                }
                other => panic!("unexpected details: {:?}", other),
            }
        }
    }

    #[test]
    fn test_update_unknown_skill_is_noop() {
        let mut procedural = memory();
        procedural.update_success_rate("missing", true);
        assert!(procedural.is_empty());
    }

    // =========================================================================
    // Search Tests
    // =========================================================================

    #[test]
    fn test_search_sorts_by_success_rate() {
        let mut procedural = memory();

        procedural.store_procedure(
            "deploy staging",
            steps(&["push the image"]),
            0.4,
            vec![],
            vec![],
        );
        procedural.store_procedure(
            "deploy production",
            steps(&["push the image", "verify health"]),
            0.9,
            vec![],
            vec![],
        );

        let results = procedural.search_procedures("deploy", 5);

        assert_eq!(results.len(), 2);
        match &results[0].details {
            EntryDetails::Procedural { skill_name, .. } => {
                assert_eq!(skill_name, "deploy production");
            }
            other => panic!("unexpected details: {:?}", other),
        }
        assert_eq!(results[0].access_count, 1);
    }

    #[test]
    fn test_search_matches_step_words() {
        let mut procedural = memory();

        procedural.store_procedure("rollback", steps(&["restore the snapshot"]), 0.5, vec![], vec![]);

        let results = procedural.search_procedures("snapshot", 5);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_search_truncates() {
        let mut procedural = memory();
        for i in 0..5 {
            procedural.store_procedure(
                &format!("deploy service {}", i),
                steps(&["step"]),
                0.1 * i as f64,
                vec![],
                vec![],
            );
        }

        assert_eq!(procedural.search_procedures("deploy", 3).len(), 3);
    }

    // =========================================================================
    // Step Editing Tests
    // =========================================================================

    #[test]
    fn test_add_step_appends_and_inserts() {
        let mut procedural = memory();
        procedural.store_procedure("setup", steps(&["install", "configure"]), 0.0, vec![], vec![]);

        procedural.add_step("setup", "verify", None);
        assert_eq!(
            procedural.steps("setup").unwrap(),
            steps(&["install", "configure", "verify"])
        );

        procedural.add_step("setup", "download", Some(0));
        assert_eq!(
            procedural.steps("setup").unwrap(),
            steps(&["download", "install", "configure", "verify"])
        );

        // Content re-rendered with the new numbering
        let entry = procedural.get("setup").unwrap();
        assert!(entry.content.starts_with("1. download\n2. install"));
    }

    #[test]
    fn test_add_step_out_of_bounds_appends() {
        let mut procedural = memory();
        procedural.store_procedure("setup", steps(&["a"]), 0.0, vec![], vec![]);

        procedural.add_step("setup", "z", Some(99));
        assert_eq!(procedural.steps("setup").unwrap(), steps(&["a", "z"]));
    }

    #[test]
    fn test_restore_preserves_counters_and_rebuilds_index() {
        let mut procedural = memory();
        procedural.store_procedure("deploy", steps(&["push"]), 0.8, vec![], vec![]);
        procedural.get("deploy");

        let mut restored = ProceduralMemory::restore(
            Clock::manual_at_ms(BASE_TIME_MS),
            procedural.procedures().clone(),
        );

        assert_eq!(restored.len(), 1);
        assert_eq!(restored.procedures()["deploy"].access_count, 1);
        assert_eq!(restored.search_procedures("push", 5).len(), 1);
    }

    #[test]
    #[should_panic(expected = "success_rate")]
    fn test_store_invalid_success_rate() {
        let mut procedural = memory();
        procedural.store_procedure("setup", steps(&["a"]), 1.5, vec![], vec![]);
    }
}
