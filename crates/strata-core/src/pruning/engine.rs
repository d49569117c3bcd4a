//! Pruning engine.
//!
//! Evaluates deletion rules in a fixed priority order so each item reports
//! exactly one reason: denied, then stale, then low-significance. Every bulk
//! pass can run dry, and the read-only views never delete under any
//! configuration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::{debug, info, warn};

use crate::error::StrataResult;
use crate::store::{MemoryStore, ObservationStore};
use crate::types::{LongTermMemory, MemoryStatus, Observation, ObservationStatus};

/// Characters of item text carried into prune previews.
const PREVIEW_CHARS: usize = 100;

/// Configuration for pruning rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Days without a sighting after which an item is stale. Default: 90
    pub stale_days: u32,
    /// Count floor below which a memory is low-significance. Default: 2
    pub min_retain_count: u32,
    /// Remove denied items. Default: true
    pub prune_denied: bool,
    /// Evaluate everything but delete nothing. Default: false
    pub dry_run: bool,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            stale_days: 90,
            min_retain_count: 2,
            prune_denied: true,
            dry_run: false,
        }
    }
}

/// Why an item was pruned. Each pruned item carries exactly one reason.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PruneReason {
    /// The item was denied during review.
    Denied,
    /// No sighting for longer than `stale_days`.
    Stale,
    /// Detection count below `min_retain_count`.
    LowSignificance,
    /// Deleted through an explicit by-id call.
    Manual,
}

/// One pruned (or would-be-pruned) item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrunedItem {
    /// Id of the removed record.
    pub id: String,
    /// The single rule that matched.
    pub reason: PruneReason,
    /// Leading characters of the item text, for operator review.
    pub preview: String,
}

impl PrunedItem {
    fn new(id: &str, reason: PruneReason, text: &str) -> Self {
        Self {
            id: id.to_string(),
            reason,
            preview: text.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// Result of one pruning pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneResult {
    /// Items removed, or that would be removed under dry-run.
    pub pruned: Vec<PrunedItem>,
    /// Items evaluated against the rules.
    pub total_evaluated: usize,
    /// Whether this pass skipped deletions.
    pub is_dry_run: bool,
    /// When the pass ran.
    pub timestamp: DateTime<Utc>,
}

impl PruneResult {
    fn new(is_dry_run: bool) -> Self {
        Self {
            pruned: Vec::new(),
            total_evaluated: 0,
            is_dry_run,
            timestamp: Utc::now(),
        }
    }

    /// Number of items pruned in this pass.
    pub fn pruned_count(&self) -> usize {
        self.pruned.len()
    }
}

/// Combined dry-run view over both stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneReport {
    /// What a memory pass would remove.
    pub memories: PruneResult,
    /// What an observation pass would remove.
    pub observations: PruneResult,
}

/// Removes denied, stale, and low-significance records from both stores.
pub struct PruningEngine {
    observations: Arc<dyn ObservationStore>,
    memories: Arc<dyn MemoryStore>,
    config: PruneConfig,
}

impl PruningEngine {
    /// Create an engine over the two stores.
    pub fn new(
        observations: Arc<dyn ObservationStore>,
        memories: Arc<dyn MemoryStore>,
        config: PruneConfig,
    ) -> Self {
        Self {
            observations,
            memories,
            config,
        }
    }

    /// Create an engine with default configuration.
    pub fn with_defaults(
        observations: Arc<dyn ObservationStore>,
        memories: Arc<dyn MemoryStore>,
    ) -> Self {
        Self::new(observations, memories, PruneConfig::default())
    }

    /// Get the configuration.
    pub fn config(&self) -> &PruneConfig {
        &self.config
    }

    /// Evaluate every long-term memory and delete the matches.
    ///
    /// Honors the instance `dry_run` flag. Deletions run one at a time so a
    /// single store failure skips only that item.
    pub async fn prune_memories(&self) -> StrataResult<PruneResult> {
        self.prune_memories_inner(self.config.dry_run).await
    }

    /// Evaluate every observation and delete the matches.
    ///
    /// Only denied observations and stale pending observations are targeted.
    /// Approved and promoted observations are never auto-pruned.
    pub async fn prune_observations(&self) -> StrataResult<PruneResult> {
        self.prune_observations_inner(self.config.dry_run).await
    }

    /// Evaluate both stores without deleting, regardless of the instance
    /// `dry_run` flag.
    pub async fn dry_run_report(&self) -> StrataResult<PruneReport> {
        let (memories, observations) = future::try_join(
            self.prune_memories_inner(true),
            self.prune_observations_inner(true),
        )
        .await?;
        Ok(PruneReport {
            memories,
            observations,
        })
    }

    /// Memories whose last sighting is older than `stale_days`. Read-only.
    pub async fn stale_memories(&self) -> StrataResult<Vec<LongTermMemory>> {
        let now = Utc::now();
        let all = self.memories.get_all().await?;
        Ok(all
            .into_iter()
            .filter(|m| self.is_stale(m.observation.last_seen, now))
            .collect())
    }

    /// Memories whose detection count is below `min_retain_count`. Read-only.
    pub async fn low_significance_memories(&self) -> StrataResult<Vec<LongTermMemory>> {
        let all = self.memories.get_all().await?;
        Ok(all
            .into_iter()
            .filter(|m| m.observation.count < self.config.min_retain_count)
            .collect())
    }

    /// Delete one memory by id, bypassing rule evaluation.
    ///
    /// Reports reason `manual`. Honors the instance `dry_run` flag. An
    /// absent id reports zero pruned items against one evaluated.
    pub async fn prune_memory_by_id(&self, memory_id: &str) -> StrataResult<PruneResult> {
        let mut result = PruneResult::new(self.config.dry_run);
        result.total_evaluated = 1;

        let memory = match self.memories.get_by_id(memory_id).await? {
            Some(memory) => memory,
            None => {
                debug!(memory_id = %memory_id, "manual prune target not found");
                return Ok(result);
            }
        };

        if !self.config.dry_run && !self.memories.delete(&memory.id).await? {
            return Ok(result);
        }
        result.pruned.push(PrunedItem::new(
            &memory.id,
            PruneReason::Manual,
            &memory.observation.text,
        ));
        Ok(result)
    }

    /// Delete one observation by id, bypassing rule evaluation.
    pub async fn prune_observation_by_id(&self, observation_id: &str) -> StrataResult<PruneResult> {
        let mut result = PruneResult::new(self.config.dry_run);
        result.total_evaluated = 1;

        let observation = match self.observations.get_by_id(observation_id).await? {
            Some(observation) => observation,
            None => {
                debug!(observation_id = %observation_id, "manual prune target not found");
                return Ok(result);
            }
        };

        if !self.config.dry_run && !self.observations.delete(&observation.id).await? {
            return Ok(result);
        }
        result.pruned.push(PrunedItem::new(
            &observation.id,
            PruneReason::Manual,
            &observation.text,
        ));
        Ok(result)
    }

    async fn prune_memories_inner(&self, dry_run: bool) -> StrataResult<PruneResult> {
        let mut result = PruneResult::new(dry_run);
        let now = Utc::now();
        let all = self.memories.get_all().await?;
        result.total_evaluated = all.len();

        for memory in all {
            let reason = match self.memory_prune_reason(&memory, now) {
                Some(reason) => reason,
                None => continue,
            };
            debug!(memory_id = %memory.id, reason = %reason, dry_run, "memory matched prune rule");

            if !dry_run {
                match self.memories.delete(&memory.id).await {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        warn!(memory_id = %memory.id, error = %e, "memory deletion failed");
                        continue;
                    }
                }
            }
            result.pruned.push(PrunedItem::new(
                &memory.id,
                reason,
                &memory.observation.text,
            ));
        }

        info!(
            evaluated = result.total_evaluated,
            pruned = result.pruned.len(),
            dry_run,
            "memory prune pass complete"
        );
        Ok(result)
    }

    async fn prune_observations_inner(&self, dry_run: bool) -> StrataResult<PruneResult> {
        let mut result = PruneResult::new(dry_run);
        let now = Utc::now();
        let all = self.observations.get_all().await?;
        result.total_evaluated = all.len();

        for observation in all {
            let reason = match self.observation_prune_reason(&observation, now) {
                Some(reason) => reason,
                None => continue,
            };
            debug!(
                observation_id = %observation.id,
                reason = %reason,
                dry_run,
                "observation matched prune rule"
            );

            if !dry_run {
                match self.observations.delete(&observation.id).await {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        warn!(observation_id = %observation.id, error = %e, "observation deletion failed");
                        continue;
                    }
                }
            }
            result
                .pruned
                .push(PrunedItem::new(&observation.id, reason, &observation.text));
        }

        info!(
            evaluated = result.total_evaluated,
            pruned = result.pruned.len(),
            dry_run,
            "observation prune pass complete"
        );
        Ok(result)
    }

    fn memory_prune_reason(&self, memory: &LongTermMemory, now: DateTime<Utc>) -> Option<PruneReason> {
        if self.config.prune_denied && memory.status == MemoryStatus::Denied {
            return Some(PruneReason::Denied);
        }
        if self.is_stale(memory.observation.last_seen, now) {
            return Some(PruneReason::Stale);
        }
        if memory.observation.count < self.config.min_retain_count {
            return Some(PruneReason::LowSignificance);
        }
        None
    }

    fn observation_prune_reason(
        &self,
        observation: &Observation,
        now: DateTime<Utc>,
    ) -> Option<PruneReason> {
        if self.config.prune_denied && observation.status == ObservationStatus::Denied {
            return Some(PruneReason::Denied);
        }
        if observation.status == ObservationStatus::Pending
            && self.is_stale(observation.last_seen, now)
        {
            return Some(PruneReason::Stale);
        }
        None
    }

    /// Strictly greater: an item seen exactly `stale_days` ago is kept.
    fn is_stale(&self, last_seen: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let days = (now - last_seen).num_seconds() as f32 / 86_400.0;
        days > self.config.stale_days as f32
    }
}
