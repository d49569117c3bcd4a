//! Counters describing the current state of the hierarchy.

use chrono::Utc;
use futures::future;
use serde::{Deserialize, Serialize};

use crate::error::StrataResult;
use crate::query::QueryEngine;
use crate::store::{MemoryStore, ObservationStore};
use crate::types::{MemoryStatus, ObservationStatus, Scope};

/// Snapshot of record counts across both stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HierarchyStats {
    /// Observations awaiting review.
    pub pending_observations: usize,
    /// Observations approved but not yet promoted.
    pub approved_observations: usize,
    /// Observations denied during review.
    pub denied_observations: usize,
    /// Observations promoted into long-term memory.
    pub promoted_observations: usize,
    /// Observations whose memory reached core.
    pub core_promoted_observations: usize,
    /// Long-term memories in the approved state.
    pub approved_memories: usize,
    /// Long-term memories denied during review.
    pub denied_memories: usize,
    /// Long-term memories scheduled into core files.
    pub scheduled_memories: usize,
    /// Memories classified at session scope.
    pub session_scoped: usize,
    /// Memories classified at project scope.
    pub project_scoped: usize,
    /// Memories classified at global scope.
    pub global_scoped: usize,
}

impl HierarchyStats {
    /// Total observations across all statuses.
    pub fn total_observations(&self) -> usize {
        self.pending_observations
            + self.approved_observations
            + self.denied_observations
            + self.promoted_observations
            + self.core_promoted_observations
    }

    /// Total long-term memories across all statuses.
    pub fn total_memories(&self) -> usize {
        self.approved_memories + self.denied_memories + self.scheduled_memories
    }
}

/// Count both stores in one pass each, reading them concurrently.
///
/// Scope buckets reuse the query engine's classification so stats and
/// query results agree on scope.
pub async fn collect_hierarchy_stats(
    observations: &dyn ObservationStore,
    memories: &dyn MemoryStore,
    classifier: &QueryEngine,
) -> StrataResult<HierarchyStats> {
    let mut stats = HierarchyStats::default();
    let (all_observations, all_memories) =
        future::try_join(observations.get_all(), memories.get_all()).await?;

    for observation in all_observations {
        match observation.status {
            ObservationStatus::Pending => stats.pending_observations += 1,
            ObservationStatus::Approved => stats.approved_observations += 1,
            ObservationStatus::Denied => stats.denied_observations += 1,
            ObservationStatus::PromotedToLongTerm => stats.promoted_observations += 1,
            ObservationStatus::PromotedToCore => stats.core_promoted_observations += 1,
        }
    }

    let reference = Utc::now();
    for memory in all_memories {
        match memory.status {
            MemoryStatus::Approved => stats.approved_memories += 1,
            MemoryStatus::Denied => stats.denied_memories += 1,
            MemoryStatus::ScheduledForCore => stats.scheduled_memories += 1,
        }
        match classifier.classify_at(&memory, reference) {
            Scope::Session => stats.session_scoped += 1,
            Scope::Project => stats.project_scoped += 1,
            Scope::Global => stats.global_scoped += 1,
        }
    }

    Ok(stats)
}
