//! RelevanceScorer - Shared Desirability Scoring
//!
//! `TigerStyle`: Configurable weights validated in constructors, scores
//! clamped to [0, 1] with asserted postconditions.
//!
//! One scorer serves two consumers:
//! - the bounded context store ranks eviction candidates by the working-set
//!   score (recency + access frequency + content kind; pinned items always
//!   score 1.0);
//! - the long-term tiers rank recall and prune candidates by entry relevance
//!   (importance blended with exponentially decayed recency).
//!
//! The defaults bias the working set toward recent, frequently-touched,
//! conversational content, and long-term recall toward importance with mild
//! recency decay.

use crate::constants::{
    CONTEXT_FREQUENCY_SATURATION_COUNT, CONTEXT_RECENCY_HALFLIFE_SECS,
    CONTEXT_SCORE_WEIGHT_FREQUENCY, CONTEXT_SCORE_WEIGHT_KIND, CONTEXT_SCORE_WEIGHT_RECENCY,
    ENTRY_RECENCY_DECAY_PER_DAY, ENTRY_RECENCY_WEIGHT_DEFAULT, TIME_MS_PER_DAY, TIME_MS_PER_SEC,
};
use crate::context::{ContentKind, ContextItem};

/// Computes [0, 1] desirability scores for stored items. Higher = keep.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    /// Weight of the recency term for working-set items
    weight_recency: f64,
    /// Weight of the access-frequency term for working-set items
    weight_frequency: f64,
    /// Weight of the content-kind term for working-set items
    weight_kind: f64,
    /// Weight of the recency term for long-term entries
    entry_recency_weight: f64,
}

impl RelevanceScorer {
    /// Create a scorer with the default weights.
    #[must_use]
    pub fn new() -> Self {
        Self {
            weight_recency: CONTEXT_SCORE_WEIGHT_RECENCY,
            weight_frequency: CONTEXT_SCORE_WEIGHT_FREQUENCY,
            weight_kind: CONTEXT_SCORE_WEIGHT_KIND,
            entry_recency_weight: ENTRY_RECENCY_WEIGHT_DEFAULT,
        }
    }

    /// Create a scorer with custom working-set weights.
    ///
    /// # Preconditions
    /// - All weights must be >= 0.0
    /// - Weights must sum to approximately 1.0
    #[must_use]
    pub fn with_weights(weight_recency: f64, weight_frequency: f64, weight_kind: f64) -> Self {
        // Preconditions
        assert!(weight_recency >= 0.0, "weight_recency must be >= 0.0");
        assert!(weight_frequency >= 0.0, "weight_frequency must be >= 0.0");
        assert!(weight_kind >= 0.0, "weight_kind must be >= 0.0");

        let weight_sum = weight_recency + weight_frequency + weight_kind;
        assert!(
            (weight_sum - 1.0).abs() < 0.01,
            "weights should sum to ~1.0, got {}",
            weight_sum
        );

        Self {
            weight_recency,
            weight_frequency,
            weight_kind,
            entry_recency_weight: ENTRY_RECENCY_WEIGHT_DEFAULT,
        }
    }

    /// Set the long-term entry recency weight.
    ///
    /// # Preconditions
    /// - `weight` must be in range [0.0, 1.0]
    #[must_use]
    pub fn with_entry_recency_weight(mut self, weight: f64) -> Self {
        // Precondition
        assert!(
            (0.0..=1.0).contains(&weight),
            "entry recency weight must be in [0.0, 1.0], got {}",
            weight
        );
        self.entry_recency_weight = weight;
        self
    }

    /// Score a working-set item at the given time. Pinned items score 1.0.
    ///
    /// # Postconditions
    /// - Returns a score in [0.0, 1.0]
    #[must_use]
    pub fn score_item(&self, item: &ContextItem, now_ms: u64) -> f64 {
        if item.pinned {
            return 1.0;
        }

        let age_secs =
            now_ms.saturating_sub(item.last_accessed_ms) as f64 / TIME_MS_PER_SEC as f64;

        let recency = 1.0 / (1.0 + age_secs / CONTEXT_RECENCY_HALFLIFE_SECS as f64);
        let frequency = (((item.access_count + 1) as f64)
            / CONTEXT_FREQUENCY_SATURATION_COUNT as f64)
            .min(1.0);
        let kind_weight = Self::kind_weight(item.kind);

        let score = self.weight_recency * recency
            + self.weight_frequency * frequency
            + self.weight_kind * kind_weight;

        // Postcondition
        assert!(
            (0.0..=1.0).contains(&score),
            "item score {} outside [0, 1]",
            score
        );

        score
    }

    /// Long-term relevance: `(1 - w) * importance + w * exp(-0.1 * days)`.
    ///
    /// # Preconditions
    /// - `importance` must be in range [0.0, 1.0]
    ///
    /// # Postconditions
    /// - Returns a score in [0.0, 1.0]
    #[must_use]
    pub fn score_entry(&self, importance: f64, accessed_at_ms: u64, now_ms: u64) -> f64 {
        // Precondition
        assert!(
            (0.0..=1.0).contains(&importance),
            "importance {} outside [0, 1]",
            importance
        );

        let days_since_access =
            now_ms.saturating_sub(accessed_at_ms) as f64 / TIME_MS_PER_DAY as f64;
        let recency = (-ENTRY_RECENCY_DECAY_PER_DAY * days_since_access).exp();

        let w = self.entry_recency_weight;
        let score = (1.0 - w) * importance + w * recency;

        // Postcondition
        assert!(
            (0.0..=1.0).contains(&score),
            "entry score {} outside [0, 1]",
            score
        );

        score
    }

    /// Fixed desirability weight for a content kind.
    #[must_use]
    pub fn kind_weight(kind: ContentKind) -> f64 {
        kind.weight()
    }
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
