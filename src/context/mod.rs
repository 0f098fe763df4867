//! Bounded Context Store - Token-Budgeted Working Set
//!
//! `TigerStyle`: Explicit token budget, relevance-weighted eviction,
//! postcondition-asserted bookkeeping.
//!
//! # Design
//!
//! The working set holds the transient artifacts (file reads, tool output,
//! conversation turns) an agent wants visible on its next model call. The sum
//! of `token_count` over stored items never exceeds the budget once an
//! [`BoundedContextStore::add`] call has returned `true`. When an insert
//! would overflow, the store evicts the lowest-relevance unpinned items
//! first; pinned items are exempt from eviction entirely, so the store may
//! stay above an optimization target when pinned content alone exceeds it.
//!
//! Capacity rejection is an expected, frequent outcome and is therefore a
//! boolean result, not an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::constants::{
    COMPRESS_HEAD_RATIO, COMPRESS_TAIL_RATIO, COMPRESS_TRUNCATION_MARKER,
    CONTENT_KIND_WEIGHT_CODE_SNIPPET, CONTENT_KIND_WEIGHT_CONVERSATION,
    CONTENT_KIND_WEIGHT_ERROR_MESSAGE, CONTENT_KIND_WEIGHT_FILE_CONTENT,
    CONTENT_KIND_WEIGHT_TOOL_RESULT, CONTEXT_ITEM_LOW_RELEVANCE_THRESHOLD,
    CONTEXT_ITEM_STALE_SECS, CONTEXT_OPTIMIZE_TARGET_RATIO_DEFAULT,
    CONTEXT_TOKENS_COUNT_MAX_DEFAULT, CONTEXT_USAGE_CRITICAL_RATIO, CONTEXT_USAGE_WARN_RATIO,
    TIME_MS_PER_SEC,
};
use crate::scoring::RelevanceScorer;

// =============================================================================
// Content Kind
// =============================================================================

/// Kind of content held in the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// File contents read into context
    FileContent,
    /// Output captured from a tool invocation
    ToolResult,
    /// Conversation turns
    Conversation,
    /// Code fragments under discussion
    CodeSnippet,
    /// Error output and diagnostics
    ErrorMessage,
}

impl ContentKind {
    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileContent => "file_content",
            Self::ToolResult => "tool_result",
            Self::Conversation => "conversation",
            Self::CodeSnippet => "code_snippet",
            Self::ErrorMessage => "error_message",
        }
    }

    /// Fixed desirability weight used by the relevance scorer.
    ///
    /// Conversation outranks errors, code, tool output, and file content, in
    /// that order.
    #[must_use]
    pub fn weight(&self) -> f64 {
        match self {
            Self::Conversation => CONTENT_KIND_WEIGHT_CONVERSATION,
            Self::ErrorMessage => CONTENT_KIND_WEIGHT_ERROR_MESSAGE,
            Self::CodeSnippet => CONTENT_KIND_WEIGHT_CODE_SNIPPET,
            Self::ToolResult => CONTENT_KIND_WEIGHT_TOOL_RESULT,
            Self::FileContent => CONTENT_KIND_WEIGHT_FILE_CONTENT,
        }
    }

    /// Get all content kinds in weight order.
    #[must_use]
    pub fn all() -> &'static [ContentKind] {
        &[
            Self::Conversation,
            Self::ErrorMessage,
            Self::CodeSnippet,
            Self::ToolResult,
            Self::FileContent,
        ]
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Context Item
// =============================================================================

/// A single item in the working set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    /// Caller-supplied unique identifier
    pub id: String,
    /// The content itself
    pub content: String,
    /// Kind of content
    pub kind: ContentKind,
    /// Token cost charged against the budget
    pub token_count: u32,
    /// When the item was added (ms since epoch)
    pub created_at_ms: u64,
    /// When the item was last accessed (ms since epoch)
    pub last_accessed_ms: u64,
    /// Number of explicit accesses
    pub access_count: u64,
    /// Pinned items are exempt from eviction
    pub pinned: bool,
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the bounded context store.
#[derive(Debug, Clone)]
pub struct ContextStoreConfig {
    /// Token budget
    pub max_tokens: u32,
    /// Usage ratio at which `should_optimize` turns on
    pub warn_ratio: f64,
    /// Usage ratio at which `must_optimize` turns on
    pub critical_ratio: f64,
    /// Default post-optimization usage target
    pub target_ratio: f64,
}

impl Default for ContextStoreConfig {
    fn default() -> Self {
        Self {
            max_tokens: CONTEXT_TOKENS_COUNT_MAX_DEFAULT,
            warn_ratio: CONTEXT_USAGE_WARN_RATIO,
            critical_ratio: CONTEXT_USAGE_CRITICAL_RATIO,
            target_ratio: CONTEXT_OPTIMIZE_TARGET_RATIO_DEFAULT,
        }
    }
}

// =============================================================================
// Optimization Report
// =============================================================================

/// Metrics from one optimization pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeReport {
    /// Item count before the pass
    pub items_before: usize,
    /// Item count after the pass
    pub items_after: usize,
    /// Token total before the pass
    pub tokens_before: u64,
    /// Token total after the pass
    pub tokens_after: u64,
    /// Items evicted
    pub items_removed: usize,
    /// Tokens released
    pub tokens_freed: u64,
    /// Wall time spent, in milliseconds
    pub duration_ms: f64,
}

/// Aggregate statistics for the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextStats {
    /// Items currently stored
    pub total_items: usize,
    /// Tokens currently charged
    pub total_tokens: u64,
    /// Token budget
    pub max_tokens: u32,
    /// Usage as a percentage of the budget
    pub usage_percent: f64,
    /// Pinned items currently stored
    pub pinned_items: usize,
    /// Optimization passes run so far
    pub optimizations_performed: u64,
    /// Tokens released by all passes so far
    pub total_tokens_freed: u64,
    /// Token totals per content kind
    pub tokens_by_kind: HashMap<ContentKind, u64>,
}

// =============================================================================
// Bounded Context Store
// =============================================================================

/// Token-budgeted working set with relevance-weighted eviction.
///
/// # Example
///
/// ```
/// use engram_memory::clock::Clock;
/// use engram_memory::context::{BoundedContextStore, ContentKind, ContextStoreConfig};
///
/// let config = ContextStoreConfig { max_tokens: 1000, ..Default::default() };
/// let mut store = BoundedContextStore::with_config(config, Clock::manual_at_ms(0));
///
/// assert!(store.add("read:src/main.rs", "fn main() {}", ContentKind::FileContent, 400, false));
/// assert_eq!(store.usage_percent(), 40.0);
/// ```
#[derive(Debug)]
pub struct BoundedContextStore {
    config: ContextStoreConfig,
    clock: Clock,
    scorer: RelevanceScorer,
    items: HashMap<String, ContextItem>,
    total_tokens: u64,
    optimizations_performed: u64,
    total_tokens_freed: u64,
}

impl BoundedContextStore {
    /// Create a store with the default configuration and a system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ContextStoreConfig::default(), Clock::system())
    }

    /// Create a store with a custom configuration and clock.
    ///
    /// # Panics
    /// Panics if the configuration thresholds are not ordered
    /// `target < warn < critical <= 1.0` or the budget is zero.
    #[must_use]
    pub fn with_config(config: ContextStoreConfig, clock: Clock) -> Self {
        // Preconditions
        assert!(config.max_tokens > 0, "max_tokens must be > 0");
        assert!(
            config.target_ratio > 0.0 && config.target_ratio < config.warn_ratio,
            "target_ratio {} must be in (0, warn_ratio)",
            config.target_ratio
        );
        assert!(
            config.warn_ratio < config.critical_ratio && config.critical_ratio <= 1.0,
            "thresholds must satisfy warn < critical <= 1.0"
        );

        Self {
            config,
            clock,
            scorer: RelevanceScorer::new(),
            items: HashMap::new(),
            total_tokens: 0,
            optimizations_performed: 0,
            total_tokens_freed: 0,
        }
    }

    /// Add an item, optimizing first if it would not otherwise fit.
    ///
    /// Re-adding an existing id replaces it; the old item's tokens are
    /// released before the capacity check. A pinned item that cannot fit is
    /// rejected without evicting anything. Returns `false` on rejection with
    /// no state change.
    pub fn add(
        &mut self,
        id: &str,
        content: &str,
        kind: ContentKind,
        token_count: u32,
        pinned: bool,
    ) -> bool {
        // Precondition
        assert!(!id.is_empty(), "item id cannot be empty");

        if self.projected_tokens(id, token_count) > u64::from(self.config.max_tokens) && !pinned {
            self.auto_optimize(token_count, self.config.target_ratio);
        }

        // Re-check: optimization may have evicted the prior version of `id`
        if self.projected_tokens(id, token_count) > u64::from(self.config.max_tokens) {
            tracing::debug!(id, token_count, "context add rejected: over budget");
            return false;
        }

        if let Some(old) = self.items.remove(id) {
            self.total_tokens -= u64::from(old.token_count);
        }

        let now_ms = self.clock.now_ms();
        self.items.insert(
            id.to_string(),
            ContextItem {
                id: id.to_string(),
                content: content.to_string(),
                kind,
                token_count,
                created_at_ms: now_ms,
                last_accessed_ms: now_ms,
                access_count: 0,
                pinned,
            },
        );
        self.total_tokens += u64::from(token_count);

        // Postcondition
        assert!(
            self.total_tokens <= u64::from(self.config.max_tokens),
            "token budget invariant violated"
        );

        true
    }

    /// Token total if `id` were replaced by an item of `token_count` tokens.
    fn projected_tokens(&self, id: &str, token_count: u32) -> u64 {
        let old = self
            .items
            .get(id)
            .map(|item| u64::from(item.token_count))
            .unwrap_or(0);
        self.total_tokens - old + u64::from(token_count)
    }

    /// Record an access to an item. No-op if the id is absent.
    pub fn access(&mut self, id: &str) {
        let now_ms = self.clock.now_ms();
        if let Some(item) = self.items.get_mut(id) {
            item.access_count += 1;
            item.last_accessed_ms = now_ms;
        }
    }

    /// Remove an item by id.
    ///
    /// Returns `true` if the item existed.
    pub fn remove(&mut self, id: &str) -> bool {
        if let Some(item) = self.items.remove(id) {
            self.total_tokens -= u64::from(item.token_count);
            true
        } else {
            false
        }
    }

    /// Get an item by id without touching its access counters.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ContextItem> {
        self.items.get(id)
    }

    /// Check whether an id is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Current usage as a percentage of the budget.
    #[must_use]
    pub fn usage_percent(&self) -> f64 {
        100.0 * self.total_tokens as f64 / f64::from(self.config.max_tokens)
    }

    /// Advisory: usage has crossed the warning threshold.
    #[must_use]
    pub fn should_optimize(&self) -> bool {
        self.usage_percent() >= self.config.warn_ratio * 100.0
    }

    /// Advisory: usage has crossed the critical threshold.
    #[must_use]
    pub fn must_optimize(&self) -> bool {
        self.usage_percent() >= self.config.critical_ratio * 100.0
    }

    /// Evict lowest-relevance unpinned items until usage falls to target.
    ///
    /// `target_tokens = max_tokens * target_usage - tokens_needed` (floored
    /// at zero). Pinned items are never candidates, so the store may remain
    /// above target when pinned content alone exceeds it; that is expected.
    ///
    /// # Panics
    /// Panics if `target_usage` is outside (0.0, 1.0].
    pub fn auto_optimize(&mut self, tokens_needed: u32, target_usage: f64) -> OptimizeReport {
        // Precondition
        assert!(
            target_usage > 0.0 && target_usage <= 1.0,
            "target_usage {} outside (0.0, 1.0]",
            target_usage
        );

        let started = std::time::Instant::now();
        let items_before = self.items.len();
        let tokens_before = self.total_tokens;
        let now_ms = self.clock.now_ms();

        let target_tokens = ((f64::from(self.config.max_tokens) * target_usage)
            - f64::from(tokens_needed))
        .max(0.0) as u64;

        // Score unpinned items, lowest relevance first
        let mut candidates: Vec<(f64, String, u32)> = self
            .items
            .values()
            .filter(|item| !item.pinned)
            .map(|item| {
                (
                    self.scorer.score_item(item, now_ms),
                    item.id.clone(),
                    item.token_count,
                )
            })
            .collect();
        candidates
            .sort_by(|(a, ..), (b, ..)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut items_removed = 0usize;
        let mut tokens_freed = 0u64;
        for (_, id, token_count) in candidates {
            if self.total_tokens <= target_tokens {
                break;
            }
            self.items.remove(&id);
            self.total_tokens -= u64::from(token_count);
            tokens_freed += u64::from(token_count);
            items_removed += 1;
        }

        self.optimizations_performed += 1;
        self.total_tokens_freed += tokens_freed;

        let report = OptimizeReport {
            items_before,
            items_after: self.items.len(),
            tokens_before,
            tokens_after: self.total_tokens,
            items_removed,
            tokens_freed,
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        };

        tracing::debug!(
            items_removed = report.items_removed,
            tokens_freed = report.tokens_freed,
            tokens_after = report.tokens_after,
            target_tokens,
            "context store optimized"
        );

        report
    }

    /// Run an optimization pass with the configured defaults.
    pub fn optimize(&mut self) -> OptimizeReport {
        self.auto_optimize(0, self.config.target_ratio)
    }

    /// Number of items currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Tokens currently charged against the budget.
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    /// Remove all items.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_tokens = 0;
    }

    /// Get configuration.
    #[must_use]
    pub fn config(&self) -> &ContextStoreConfig {
        &self.config
    }

    /// Aggregate statistics, including per-kind token distribution.
    #[must_use]
    pub fn stats(&self) -> ContextStats {
        let mut tokens_by_kind: HashMap<ContentKind, u64> = HashMap::new();
        for item in self.items.values() {
            *tokens_by_kind.entry(item.kind).or_insert(0) += u64::from(item.token_count);
        }

        ContextStats {
            total_items: self.items.len(),
            total_tokens: self.total_tokens,
            max_tokens: self.config.max_tokens,
            usage_percent: self.usage_percent(),
            pinned_items: self.items.values().filter(|i| i.pinned).count(),
            optimizations_performed: self.optimizations_performed,
            total_tokens_freed: self.total_tokens_freed,
            tokens_by_kind,
        }
    }

    /// Advisory findings a caller may act on: threshold crossings, stale
    /// unpinned items, and low-relevance items.
    #[must_use]
    pub fn recommendations(&self) -> Vec<String> {
        let mut recommendations = Vec::new();
        let usage = self.usage_percent();

        if self.must_optimize() {
            recommendations.push(format!(
                "context {:.0}% full: optimization required before the next add",
                usage
            ));
        } else if self.should_optimize() {
            recommendations.push(format!(
                "context {:.0}% full: consider optimizing",
                usage
            ));
        }

        let now_ms = self.clock.now_ms();
        let stale_count = self
            .items
            .values()
            .filter(|item| {
                !item.pinned
                    && now_ms.saturating_sub(item.last_accessed_ms)
                        > CONTEXT_ITEM_STALE_SECS * TIME_MS_PER_SEC
            })
            .count();
        if stale_count > 0 {
            recommendations.push(format!(
                "{} items idle for over {} seconds",
                stale_count, CONTEXT_ITEM_STALE_SECS
            ));
        }

        let low_relevance_count = self
            .items
            .values()
            .filter(|item| {
                !item.pinned
                    && self.scorer.score_item(item, now_ms)
                        < CONTEXT_ITEM_LOW_RELEVANCE_THRESHOLD
            })
            .count();
        if low_relevance_count > 0 {
            recommendations.push(format!(
                "{} low-relevance items could be removed",
                low_relevance_count
            ));
        }

        recommendations
    }
}

impl Default for BoundedContextStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Content Compression
// =============================================================================

/// Compress content to roughly `target_length` characters.
///
/// Content at or under the target is returned unchanged. Otherwise the head
/// and tail (40% of the target each) are kept and joined by a truncation
/// marker, preserving the context surrounding edits at both ends.
#[must_use]
pub fn compress(content: &str, target_length: usize) -> String {
    let char_count = content.chars().count();
    if char_count <= target_length {
        return content.to_string();
    }

    let keep_head = (target_length as f64 * COMPRESS_HEAD_RATIO) as usize;
    let keep_tail = (target_length as f64 * COMPRESS_TAIL_RATIO) as usize;

    let head: String = content.chars().take(keep_head).collect();
    let tail: String = content.chars().skip(char_count - keep_tail).collect();

    format!("{}{}{}", head, COMPRESS_TRUNCATION_MARKER, tail)
}

// =============================================================================
// Tests
// =============================================================================


// =============================================================================
// Property-Based Tests
// =============================================================================
