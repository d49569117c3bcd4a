//! Promotion engine for moving records up the hierarchy.
//!
//! Observations that accumulate enough evidence move into the long-term
//! tier; long-term memories that stay approved long enough are scheduled
//! into core memory files. Every attempt lands in the audit log, and one
//! record's failure never stops a run.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::StrataResult;
use crate::promotion::{EventLog, PromotionEvent, PromotionLevel};
use crate::store::{CoreTarget, MemoryStore, ObservationStore};
use crate::types::{LongTermMemory, MemoryStatus, Observation, ObservationStatus};

/// Distinct-session count at which an approved observation is promotable
/// regardless of its detection count. A pattern confirmed across this many
/// sessions is project-level behavior even when each sighting was brief.
pub const PROJECT_SESSION_OVERRIDE: usize = 5;

/// Configuration for promotion thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
    /// Detection count at which an approved observation becomes promotable.
    /// Also the count floor for core promotion. Default: 3
    pub observation_count_threshold: u32,
    /// Days a memory must stay in the long-term tier before core promotion.
    /// Default: 7
    pub long_term_days_threshold: u32,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            observation_count_threshold: 3,
            long_term_days_threshold: 7,
        }
    }
}

impl PromotionConfig {
    /// Create a config with custom thresholds. The count threshold has a
    /// floor of 1.
    pub fn new(observation_count_threshold: u32, long_term_days_threshold: u32) -> Self {
        Self {
            observation_count_threshold: observation_count_threshold.max(1),
            long_term_days_threshold,
        }
    }
}

/// Which core memory files promotions render into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryTargets {
    /// Schedule into CLAUDE.md. Default: true
    pub claude_md: bool,
    /// Schedule into AGENTS.md. Default: false
    pub agents_md: bool,
}

impl Default for MemoryTargets {
    fn default() -> Self {
        Self {
            claude_md: true,
            agents_md: false,
        }
    }
}

impl MemoryTargets {
    /// The enabled targets, in rendering order.
    pub fn enabled(&self) -> Vec<CoreTarget> {
        let mut targets = Vec::new();
        if self.claude_md {
            targets.push(CoreTarget::ClaudeMd);
        }
        if self.agents_md {
            targets.push(CoreTarget::AgentsMd);
        }
        targets
    }
}

/// Result of one promotion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionRunResult {
    /// Tier boundary this run worked.
    pub level: PromotionLevel,
    /// Candidates considered.
    pub evaluated: usize,
    /// Candidates promoted.
    pub promoted: usize,
    /// Candidates that failed, with an event each.
    pub failed: usize,
    /// Store-supplied candidates below the thresholds, no events recorded.
    pub skipped: usize,
    /// Events recorded during this run, in order.
    pub events: Vec<PromotionEvent>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl PromotionRunResult {
    /// Create a result with a start timestamp.
    pub fn new(level: PromotionLevel) -> Self {
        Self {
            level,
            evaluated: 0,
            promoted: 0,
            failed: 0,
            skipped: 0,
            events: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Mark the run as complete.
    pub fn complete(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }

    /// Duration of the run.
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// One candidate in a dry-run preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionCandidate {
    /// Id of the record that would be promoted.
    pub id: String,
    /// Its observation text.
    pub text: String,
    /// Why it qualifies, in operator-readable form.
    pub reason: String,
}

/// Dry-run view of what the next promotion runs would do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionPreview {
    /// Observations that would enter the long-term tier.
    pub observation_candidates: Vec<PromotionCandidate>,
    /// Memories that would be scheduled for core.
    pub core_candidates: Vec<PromotionCandidate>,
    /// When the preview was computed.
    pub generated_at: DateTime<Utc>,
}

/// Moves observations to long-term memory and long-term memories to core.
pub struct PromotionEngine {
    observations: Arc<dyn ObservationStore>,
    memories: Arc<dyn MemoryStore>,
    config: PromotionConfig,
    targets: MemoryTargets,
    events: Mutex<EventLog>,
}

impl PromotionEngine {
    /// Create an engine over the two stores.
    pub fn new(
        observations: Arc<dyn ObservationStore>,
        memories: Arc<dyn MemoryStore>,
        config: PromotionConfig,
        targets: MemoryTargets,
    ) -> Self {
        Self {
            observations,
            memories,
            config,
            targets,
            events: Mutex::new(EventLog::new()),
        }
    }

    /// Create an engine with default configuration and targets.
    pub fn with_defaults(
        observations: Arc<dyn ObservationStore>,
        memories: Arc<dyn MemoryStore>,
    ) -> Self {
        Self::new(
            observations,
            memories,
            PromotionConfig::default(),
            MemoryTargets::default(),
        )
    }

    /// Get the configuration.
    pub fn config(&self) -> &PromotionConfig {
        &self.config
    }

    /// Get the configured targets.
    pub fn targets(&self) -> &MemoryTargets {
        &self.targets
    }

    /// Promote every eligible approved observation into the long-term tier.
    ///
    /// Candidates are the store's promotable set plus approved observations
    /// qualifying solely through the session override. Items process
    /// one at a time so event order matches candidate order.
    pub async fn run_observation_promotions(&self) -> StrataResult<PromotionRunResult> {
        let mut result = PromotionRunResult::new(PromotionLevel::ObservationToLongTerm);
        let candidates = self.collect_observation_candidates().await?;

        for observation in candidates {
            result.evaluated += 1;
            let event = match self.promote_observation(&observation).await {
                Ok(event) => event,
                Err(e) => {
                    warn!(
                        observation_id = %observation.id,
                        error = %e,
                        "observation promotion errored"
                    );
                    PromotionEvent::failure(
                        PromotionLevel::ObservationToLongTerm,
                        observation.id.as_str(),
                        e.to_string(),
                    )
                }
            };

            if event.success {
                result.promoted += 1;
            } else {
                result.failed += 1;
            }
            let recorded = self.events.lock().await.append(event);
            result.events.push(recorded);
        }

        info!(
            evaluated = result.evaluated,
            promoted = result.promoted,
            failed = result.failed,
            "observation promotion run complete"
        );
        Ok(result.complete())
    }

    /// Schedule every eligible long-term memory into the configured core
    /// targets.
    ///
    /// Eligibility needs both thresholds: residency days and observation
    /// count. There is no session override at this boundary. With no
    /// targets configured, eligible candidates are recorded as failures
    /// rather than silently skipped.
    pub async fn run_core_promotions(&self) -> StrataResult<PromotionRunResult> {
        let mut result = PromotionRunResult::new(PromotionLevel::LongTermToCore);
        let candidates = self.memories.get_promotable_to_core().await?;
        let targets = self.targets.enabled();
        let now = Utc::now();

        for memory in candidates {
            result.evaluated += 1;

            if !self.meets_core_thresholds(&memory, now) {
                result.skipped += 1;
                debug!(memory_id = %memory.id, "core candidate below thresholds");
                continue;
            }

            let event = if targets.is_empty() {
                PromotionEvent::failure(
                    PromotionLevel::LongTermToCore,
                    memory.id.as_str(),
                    "no promotion targets configured",
                )
            } else {
                match self.promote_memory(&memory, &targets).await {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(memory_id = %memory.id, error = %e, "core promotion errored");
                        PromotionEvent::failure(
                            PromotionLevel::LongTermToCore,
                            memory.id.as_str(),
                            e.to_string(),
                        )
                    }
                }
            };

            if event.success {
                result.promoted += 1;
            } else {
                result.failed += 1;
            }
            let recorded = self.events.lock().await.append(event);
            result.events.push(recorded);
        }

        info!(
            evaluated = result.evaluated,
            promoted = result.promoted,
            failed = result.failed,
            skipped = result.skipped,
            "core promotion run complete"
        );
        Ok(result.complete())
    }

    /// Preview both promotion runs without mutating anything.
    pub async fn preview_promotions(&self) -> StrataResult<PromotionPreview> {
        let now = Utc::now();
        let mut preview = PromotionPreview {
            observation_candidates: Vec::new(),
            core_candidates: Vec::new(),
            generated_at: now,
        };

        for observation in self.collect_observation_candidates().await? {
            let reason = if observation.count >= self.config.observation_count_threshold {
                format!(
                    "count {} reached threshold {}",
                    observation.count, self.config.observation_count_threshold
                )
            } else {
                format!(
                    "seen in {} distinct sessions, project-level override",
                    observation.unique_session_count()
                )
            };
            preview.observation_candidates.push(PromotionCandidate {
                id: observation.id.clone(),
                text: observation.text.clone(),
                reason,
            });
        }

        for memory in self.memories.get_promotable_to_core().await? {
            if !self.meets_core_thresholds(&memory, now) {
                continue;
            }
            let reason = format!(
                "resident {:.1} days (threshold {}), observation count {} (threshold {})",
                memory.days_since_promotion(now),
                self.config.long_term_days_threshold,
                memory.observation.count,
                self.config.observation_count_threshold
            );
            preview.core_candidates.push(PromotionCandidate {
                id: memory.id.clone(),
                text: memory.observation.text.clone(),
                reason,
            });
        }

        Ok(preview)
    }

    /// Whether a stored memory currently passes the core thresholds.
    ///
    /// Unknown ids report `false`.
    pub async fn is_memory_core_eligible(&self, memory_id: &str) -> StrataResult<bool> {
        let memory = match self.memories.get_by_id(memory_id).await? {
            Some(memory) => memory,
            None => return Ok(false),
        };
        let days = match self.memories.days_since_long_term_promotion(memory_id).await? {
            Some(days) => days,
            None => return Ok(false),
        };

        Ok(memory.status == MemoryStatus::Approved
            && days >= self.config.long_term_days_threshold as f32
            && memory.observation.count >= self.config.observation_count_threshold)
    }

    /// All recorded events, in append order.
    pub async fn events(&self) -> Vec<PromotionEvent> {
        self.events.lock().await.all().to_vec()
    }

    /// Recorded events for one tier boundary.
    pub async fn events_for_level(&self, level: PromotionLevel) -> Vec<PromotionEvent> {
        self.events.lock().await.by_level(level)
    }

    /// Number of recorded events.
    pub async fn event_count(&self) -> usize {
        self.events.lock().await.len()
    }

    /// Discard the event log and restart ids at 1. Store state is untouched.
    pub async fn clear_events(&self) {
        self.events.lock().await.clear();
    }

    /// Promotable observations: the store's threshold set unioned with
    /// approved observations qualifying through the session override,
    /// deduplicated by id.
    async fn collect_observation_candidates(&self) -> StrataResult<Vec<Observation>> {
        let mut candidates = self
            .observations
            .get_promotable(self.config.observation_count_threshold)
            .await?;
        let mut seen: HashSet<String> = candidates.iter().map(|o| o.id.clone()).collect();

        let approved = self
            .observations
            .get_by_status(ObservationStatus::Approved)
            .await?;
        for observation in approved {
            if observation.unique_session_count() >= PROJECT_SESSION_OVERRIDE
                && seen.insert(observation.id.clone())
            {
                candidates.push(observation);
            }
        }

        Ok(candidates)
    }

    async fn promote_observation(&self, observation: &Observation) -> StrataResult<PromotionEvent> {
        let outcome = self.memories.promote_to_long_term(&observation.id).await?;
        if !outcome.success {
            let reason = outcome
                .reason
                .unwrap_or_else(|| "promotion declined".to_string());
            return Ok(PromotionEvent::failure(
                PromotionLevel::ObservationToLongTerm,
                observation.id.as_str(),
                reason,
            ));
        }

        self.observations
            .set_status(&observation.id, ObservationStatus::PromotedToLongTerm)
            .await?;

        let memory_id = outcome.id.unwrap_or_else(|| observation.id.clone());
        Ok(PromotionEvent::success(
            PromotionLevel::ObservationToLongTerm,
            observation.id.as_str(),
            memory_id,
        ))
    }

    async fn promote_memory(
        &self,
        memory: &LongTermMemory,
        targets: &[CoreTarget],
    ) -> StrataResult<PromotionEvent> {
        let outcome = self.memories.promote_to_core(&memory.id, targets).await?;
        if !outcome.success {
            let reason = outcome
                .reason
                .unwrap_or_else(|| "promotion declined".to_string());
            return Ok(PromotionEvent::failure(
                PromotionLevel::LongTermToCore,
                memory.id.as_str(),
                reason,
            ));
        }

        self.observations
            .set_status(&memory.observation.id, ObservationStatus::PromotedToCore)
            .await?;

        let result_id = outcome.id.unwrap_or_else(|| memory.id.clone());
        Ok(PromotionEvent::success(
            PromotionLevel::LongTermToCore,
            memory.id.as_str(),
            result_id,
        ))
    }

    fn meets_core_thresholds(&self, memory: &LongTermMemory, now: DateTime<Utc>) -> bool {
        memory.days_since_promotion(now) >= self.config.long_term_days_threshold as f32
            && memory.observation.count >= self.config.observation_count_threshold
    }
}
