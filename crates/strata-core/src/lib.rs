//! strata-core - Core library for strata.
//!
//! This crate provides the memory hierarchy engine for strata: analyzers
//! over recorded coding-assistant sessions produce observations,
//! observations aggregate and promote into long-term memories, and
//! long-term memories graduate into core memory files.
//!
//! # Example
//!
//! ```ignore
//! use strata_core::{MemoryQuery, PromotionEngine, QueryEngine, Scope, StrataConfig};
//!
//! let config = StrataConfig::default();
//! let promotion = PromotionEngine::new(
//!     observations.clone(),
//!     memories.clone(),
//!     config.promotion.clone(),
//!     config.memory_targets,
//! );
//!
//! // Promote everything eligible
//! let result = promotion.run_observation_promotions().await?;
//!
//! // Query at session scope with inheritance
//! let queries = QueryEngine::new(memories, config.query, config.promotion);
//! let page = queries
//!     .query(&MemoryQuery::new().with_scope(Scope::Session))
//!     .await?;
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod promotion;
pub mod pruning;
pub mod query;
pub mod scoring;
pub mod similarity;
pub mod stats;
pub mod store;
pub mod testing;
pub mod types;

// Re-export commonly used types
pub use aggregate::{
    AggregationConfig, AggregationResult, AnalyzerBatch, AnalyzerCount, PatternAggregator,
    RankedObservation,
};
pub use config::StrataConfig;
pub use error::{StrataError, StrataResult};
pub use promotion::{
    EventLog, MemoryTargets, PromotionConfig, PromotionEngine, PromotionEvent, PromotionLevel,
    PromotionPreview, PromotionRunResult,
};
pub use pruning::{PruneConfig, PrunedItem, PruneReason, PruneReport, PruneResult, PruningEngine};
pub use query::{
    group_by_category, MemoryQuery, QueryConfig, QueryEngine, QueryResult, ScopeLevels,
    ScopePartition, ScoredMemory,
};
pub use scoring::{RelevanceScore, RelevanceScorer, ScoreNorm, ScoreWeights};
pub use stats::{collect_hierarchy_stats, HierarchyStats};
pub use store::{CoreTarget, MemoryQueryFilter, MemoryStore, ObservationStore, PromoteOutcome};
pub use types::{
    LongTermMemory, MemoryStatus, Observation, ObservationCategory, ObservationStatus, Scope,
    ScopedMemory,
};
