//! `TigerStyle` Constants
//!
//! All limits use big-endian naming: `CATEGORY_SPECIFICS_UNIT_BOUND`
//! Example: `CONTEXT_TOKENS_COUNT_MAX_DEFAULT` (not `DEFAULT_MAX_TOKENS`)
//!
//! Every constant includes units or kind in the name:
//! - `_TOKENS_*` for token budgets
//! - `_SECS_*` / `_MS_*` for durations
//! - `_COUNT_*` for quantities
//! - `_RATIO_*` / `_WEIGHT_*` for unitless [0,1] factors

// =============================================================================
// Context Store Limits
// =============================================================================

/// Default token budget for the bounded context store
pub const CONTEXT_TOKENS_COUNT_MAX_DEFAULT: u32 = 100_000;

/// Usage ratio at which optimization is advised
pub const CONTEXT_USAGE_WARN_RATIO: f64 = 0.8;

/// Usage ratio at which optimization is critical
pub const CONTEXT_USAGE_CRITICAL_RATIO: f64 = 0.9;

/// Default post-optimization usage target
pub const CONTEXT_OPTIMIZE_TARGET_RATIO_DEFAULT: f64 = 0.7;

/// Idle time after which an unpinned item is reported as stale
pub const CONTEXT_ITEM_STALE_SECS: u64 = 600;

/// Relevance below which an item is reported as low-value
pub const CONTEXT_ITEM_LOW_RELEVANCE_THRESHOLD: f64 = 0.3;

// =============================================================================
// Working-Set Relevance Scoring
// =============================================================================

/// Weight of the recency term in the working-set score
pub const CONTEXT_SCORE_WEIGHT_RECENCY: f64 = 0.4;

/// Weight of the access-frequency term in the working-set score
pub const CONTEXT_SCORE_WEIGHT_FREQUENCY: f64 = 0.3;

/// Weight of the content-kind term in the working-set score
pub const CONTEXT_SCORE_WEIGHT_KIND: f64 = 0.3;

/// Recency half-life for working-set items (5 minutes)
pub const CONTEXT_RECENCY_HALFLIFE_SECS: u64 = 300;

/// Access count at which the frequency term saturates at 1.0
pub const CONTEXT_FREQUENCY_SATURATION_COUNT: u64 = 10;

/// Content-kind weight: conversation turns (highest)
pub const CONTENT_KIND_WEIGHT_CONVERSATION: f64 = 1.0;

/// Content-kind weight: error messages
pub const CONTENT_KIND_WEIGHT_ERROR_MESSAGE: f64 = 0.9;

/// Content-kind weight: code snippets
pub const CONTENT_KIND_WEIGHT_CODE_SNIPPET: f64 = 0.8;

/// Content-kind weight: tool results
pub const CONTENT_KIND_WEIGHT_TOOL_RESULT: f64 = 0.7;

/// Content-kind weight: file contents (lowest named kind)
pub const CONTENT_KIND_WEIGHT_FILE_CONTENT: f64 = 0.6;

/// Content-kind weight fallback
pub const CONTENT_KIND_WEIGHT_DEFAULT: f64 = 0.5;

// =============================================================================
// Content Compression
// =============================================================================

/// Fraction of the target length kept from the head when compressing
pub const COMPRESS_HEAD_RATIO: f64 = 0.4;

/// Fraction of the target length kept from the tail when compressing
pub const COMPRESS_TAIL_RATIO: f64 = 0.4;

/// Marker inserted between head and tail of compressed content
pub const COMPRESS_TRUNCATION_MARKER: &str = "\n... [truncated] ...\n";

// =============================================================================
// Long-Term Entry Scoring
// =============================================================================

/// Minimum importance for memory entries
pub const ENTRY_IMPORTANCE_MIN: f64 = 0.0;

/// Maximum importance for memory entries
pub const ENTRY_IMPORTANCE_MAX: f64 = 1.0;

/// Default importance for memory entries
pub const ENTRY_IMPORTANCE_DEFAULT: f64 = 0.5;

/// Default weight of the recency term in long-term relevance
pub const ENTRY_RECENCY_WEIGHT_DEFAULT: f64 = 0.3;

/// Exponential decay rate of the recency term, per day since access
pub const ENTRY_RECENCY_DECAY_PER_DAY: f64 = 0.1;

// =============================================================================
// Episodic Memory Limits
// =============================================================================

/// Default episodic entry capacity before prune-by-relevance
pub const EPISODIC_ENTRIES_COUNT_MAX_DEFAULT: usize = 1000;

/// Weight of Jaccard similarity in the combined recall score
pub const RECALL_SIMILARITY_WEIGHT: f64 = 0.6;

/// Weight of entry relevance in the combined recall score
pub const RECALL_RELEVANCE_WEIGHT: f64 = 0.4;

/// Default number of results for recall/search operations
pub const RECALL_RESULTS_COUNT_DEFAULT: usize = 5;

// =============================================================================
// Keyword Index Limits
// =============================================================================

/// Minimum word length admitted to keyword indexes (words of 1-2 chars skipped)
pub const KEYWORD_LENGTH_MIN: usize = 3;

// =============================================================================
// Procedural Memory Limits
// =============================================================================

/// EMA weight for the first few executions (reactive phase)
pub const PROCEDURE_EMA_ALPHA_EARLY: f64 = 0.5;

/// EMA weight once execution history is established (stable phase)
pub const PROCEDURE_EMA_ALPHA_LATE: f64 = 0.2;

/// Execution count above which the EMA switches to the stable alpha
pub const PROCEDURE_EMA_EARLY_EXECUTIONS_COUNT: u64 = 5;

// =============================================================================
// Knowledge Vault Limits
// =============================================================================

/// Minimum procedure success rate for vault consolidation (exclusive)
pub const VAULT_PROCEDURE_SUCCESS_RATE_MIN: f64 = 0.8;

/// Minimum fact confidence for vault consolidation (exclusive)
pub const VAULT_FACT_CONFIDENCE_MIN: f64 = 0.9;

// =============================================================================
// Resource Cache Limits
// =============================================================================

/// Default TTL for cached external resources
pub const RESOURCE_CACHE_TTL_SECS_DEFAULT: u64 = 3600;

// =============================================================================
// Task Context Limits
// =============================================================================

/// Experiences included in a task context
pub const TASK_CONTEXT_EXPERIENCES_COUNT: usize = 3;

/// Facts included in a task context
pub const TASK_CONTEXT_FACTS_COUNT: usize = 3;

/// Procedures included in a task context
pub const TASK_CONTEXT_PROCEDURES_COUNT: usize = 3;

/// Vault entries included in a task context
pub const TASK_CONTEXT_VAULT_COUNT: usize = 2;

/// Failures included in a learning context
pub const LEARNING_CONTEXT_FAILURES_COUNT: usize = 5;

/// Successes included in a learning context
pub const LEARNING_CONTEXT_SUCCESSES_COUNT: usize = 3;

/// Success rate above which a skill counts as mastered (exclusive)
pub const LEARNING_SKILL_MASTERED_RATE_MIN: f64 = 0.8;

/// Success-rate band (exclusive bounds) marking a skill as improvable
pub const LEARNING_SKILL_IMPROVE_RATE_MIN: f64 = 0.3;

/// Upper bound of the improvable band
pub const LEARNING_SKILL_IMPROVE_RATE_MAX: f64 = 0.7;

// =============================================================================
// Snapshot Persistence
// =============================================================================

/// Current snapshot format version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

// =============================================================================
// DST (Deterministic Simulation Testing) Limits
// =============================================================================

/// Maximum number of property-test operations per run
pub const DST_OPERATIONS_COUNT_MAX: u64 = 1_000_000;

/// Maximum time advance per step in milliseconds (24 hours)
pub const DST_TIME_ADVANCE_MS_MAX: u64 = 86_400_000;

// =============================================================================
// Time Constants
// =============================================================================

/// Milliseconds per second
pub const TIME_MS_PER_SEC: u64 = 1000;

/// Milliseconds per minute
pub const TIME_MS_PER_MIN: u64 = 60 * TIME_MS_PER_SEC;

/// Milliseconds per hour
pub const TIME_MS_PER_HOUR: u64 = 60 * TIME_MS_PER_MIN;

/// Milliseconds per day
pub const TIME_MS_PER_DAY: u64 = 24 * TIME_MS_PER_HOUR;

// =============================================================================
// Tests
// =============================================================================
