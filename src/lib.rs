//! # Engram Memory
//!
//! Bounded working context and tiered long-term memory for AI coding agents.
//!
//! ## Features
//!
//! - **Token-budgeted working set**: [`context::BoundedContextStore`] keeps
//!   transient artifacts (file reads, tool output, conversation turns) within
//!   a fixed token budget, evicting the least relevant unpinned items first
//! - **Tiered long-term memory**: episodic experiences, semantic facts with a
//!   relation graph, and procedural skills with success-rate tracking
//! - **Knowledge vault**: high-confidence knowledge is consolidated
//!   (copied, idempotently) into a long-term vault
//! - **Lossless persistence**: the full state round-trips through a
//!   validated serde snapshot
//! - **Deterministic testing**: a manual [`clock::Clock`] plus the [`dst`]
//!   property-test framework reproduce any failure from a seed
//!
//! The crate is a passive core: it never calls a language model, performs no
//! I/O beyond (de)serializing its own state, and renders nothing. The
//! orchestration loop, LLM client, and tool sandbox are external
//! collaborators that talk to [`system::MemorySystem`] and
//! [`context::BoundedContextStore`].
//!
//! ## Quick Start
//!
//! ```
//! use engram_memory::context::{BoundedContextStore, ContentKind};
//! use engram_memory::system::{MemorySystem, MemorySystemConfig};
//! use std::collections::BTreeMap;
//!
//! // Working set: push artifacts before each model call
//! let mut context = BoundedContextStore::new();
//! context.add("read:src/lib.rs", "pub fn answer() -> u32 { 42 }",
//!     ContentKind::FileContent, 12, false);
//!
//! // Long-term memory: write after each task, read before the next one
//! let memory = MemorySystem::new(MemorySystemConfig::default());
//! memory.remember_experience("added the answer function", "tests passed",
//!     BTreeMap::new(), 0.7);
//!
//! let task_context = memory.get_context_for_task("extend the answer function");
//! assert_eq!(task_context.relevant_experiences.len(), 1);
//! ```
//!
//! ## Control Flow
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Orchestrator (external)              │
//! ├──────────────────────────────────────────────────────────┤
//! │  before model call:  get_context_for_task / context.add  │
//! │  after model call:   remember_experience / learn_fact /  │
//! │                      learn_procedure / record_outcome    │
//! ├──────────────────────────────────────────────────────────┤
//! │  BoundedContextStore │ token budget, scored eviction     │
//! │  EpisodicMemory      │ experiences, Jaccard recall       │
//! │  SemanticMemory      │ facts, relations, keyword index   │
//! │  ProceduralMemory    │ skills, EMA success rate          │
//! │  KnowledgeVault      │ consolidated high-confidence copy │
//! └──────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod constants;
pub mod context;
pub mod dst;
pub mod memory;
pub mod scoring;
pub mod system;
pub mod telemetry;

pub use clock::Clock;
pub use context::{
    compress, BoundedContextStore, ContentKind, ContextItem, ContextStats, ContextStoreConfig,
    OptimizeReport,
};
pub use memory::{
    EntryDetails, EpisodicConfig, EpisodicMemory, MemoryEntry, MemoryKind, OutcomeClass,
    ProceduralMemory, SemanticMemory,
};
pub use scoring::RelevanceScorer;
pub use system::{
    KnowledgeHit, LearningContext, MemoryCounters, MemorySnapshot, MemoryStats, MemorySystem,
    MemorySystemConfig, ProcedureHit, SemanticState, SnapshotError, TaskContext,
};
