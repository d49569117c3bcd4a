//! Memory store trait and boundary types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::StrataResult;
use crate::types::{LongTermMemory, MemoryStatus};

/// Core memory files a long-term memory can be scheduled into.
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
pub enum CoreTarget {
    /// The CLAUDE.md context file.
    ClaudeMd,
    /// The AGENTS.md context file.
    AgentsMd,
}

impl CoreTarget {
    /// File name the target renders into.
    pub fn file_name(&self) -> &'static str {
        match self {
            CoreTarget::ClaudeMd => "CLAUDE.md",
            CoreTarget::AgentsMd => "AGENTS.md",
        }
    }
}

/// Result of a promotion attempt, as a value.
///
/// A declined promotion (duplicate, missing source, ineligible) is a
/// business outcome the caller inspects; store and IO failures surface as
/// errors instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoteOutcome {
    /// Whether the promotion happened.
    pub success: bool,
    /// Id of the created or affected record, when successful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Why the promotion was declined, when unsuccessful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PromoteOutcome {
    /// A successful promotion producing `id`.
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: Some(id.into()),
            reason: None,
        }
    }

    /// A declined promotion with a reason.
    pub fn declined(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            reason: Some(reason.into()),
        }
    }
}

/// Filter executed by the memory store, ahead of in-engine filtering.
///
/// All fields are optional; an empty filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryQueryFilter {
    /// Keep only memories with this status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MemoryStatus>,
    /// Keep only memories promoted at or after this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted_after: Option<DateTime<Utc>>,
    /// Keep only memories promoted at or before this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted_before: Option<DateTime<Utc>>,
    /// Keep only memories whose observation count is at least this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_count: Option<u32>,
    /// Keep only memories resident in the long-term tier at least this many days.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_days_since_promotion: Option<f32>,
}

impl MemoryQueryFilter {
    /// Create an empty filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only memories with the given status.
    pub fn with_status(mut self, status: MemoryStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Keep only memories promoted at or after `at`.
    pub fn with_promoted_after(mut self, at: DateTime<Utc>) -> Self {
        self.promoted_after = Some(at);
        self
    }

    /// Keep only memories promoted at or before `at`.
    pub fn with_promoted_before(mut self, at: DateTime<Utc>) -> Self {
        self.promoted_before = Some(at);
        self
    }

    /// Keep only memories with at least this observation count.
    pub fn with_min_count(mut self, min_count: u32) -> Self {
        self.min_count = Some(min_count);
        self
    }

    /// Keep only memories resident at least this many days.
    pub fn with_min_days_since_promotion(mut self, days: f32) -> Self {
        self.min_days_since_promotion = Some(days);
        self
    }

    /// Whether a memory passes every set field, with residency measured
    /// against `reference`.
    pub fn matches(&self, memory: &LongTermMemory, reference: DateTime<Utc>) -> bool {
        if let Some(status) = self.status {
            if memory.status != status {
                return false;
            }
        }
        if let Some(after) = self.promoted_after {
            if memory.promoted_at < after {
                return false;
            }
        }
        if let Some(before) = self.promoted_before {
            if memory.promoted_at > before {
                return false;
            }
        }
        if let Some(min_count) = self.min_count {
            if memory.observation.count < min_count {
                return false;
            }
        }
        if let Some(min_days) = self.min_days_since_promotion {
            if memory.days_since_promotion(reference) < min_days {
                return false;
            }
        }
        true
    }
}

/// Core memory store trait - all long-term memory backends implement this.
///
/// Deletes are idempotent, as on [`crate::store::ObservationStore`].
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Get all long-term memories.
    async fn get_all(&self) -> StrataResult<Vec<LongTermMemory>>;

    /// Get a memory by id.
    async fn get_by_id(&self, id: &str) -> StrataResult<Option<LongTermMemory>>;

    /// Get memories passing the filter.
    async fn query(&self, filter: &MemoryQueryFilter) -> StrataResult<Vec<LongTermMemory>>;

    /// Get approved memories not yet scheduled for core.
    async fn get_promotable_to_core(&self) -> StrataResult<Vec<LongTermMemory>>;

    /// Promote an observation into a new long-term memory.
    ///
    /// Declines when the observation is unknown or already promoted. On
    /// success the outcome carries the new memory id; the caller advances
    /// the observation's status.
    async fn promote_to_long_term(&self, observation_id: &str) -> StrataResult<PromoteOutcome>;

    /// Schedule a memory into the given core targets.
    ///
    /// Declines when the memory is unknown, not approved, or `targets` is
    /// empty. On success the memory's status becomes scheduled-for-core;
    /// the caller advances the underlying observation's status.
    async fn promote_to_core(
        &self,
        memory_id: &str,
        targets: &[CoreTarget],
    ) -> StrataResult<PromoteOutcome>;

    /// Days a memory has been resident in the long-term tier, or `None`
    /// for an absent id.
    async fn days_since_long_term_promotion(&self, memory_id: &str)
        -> StrataResult<Option<f32>>;

    /// Set the status of a memory. Returns `false` if the id is absent.
    async fn set_status(&self, id: &str, status: MemoryStatus) -> StrataResult<bool>;

    /// Delete a memory. Returns `false` if the id was absent.
    async fn delete(&self, id: &str) -> StrataResult<bool>;

    /// Delete many memories. Returns how many existed and were removed.
    async fn delete_many(&self, ids: &[String]) -> StrataResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Observation;
    use chrono::Duration;

    fn memory(count: u32, promoted_days_ago: i64) -> LongTermMemory {
        LongTermMemory::new(Observation::new("test").with_count(count))
            .with_promoted_at(Utc::now() - Duration::days(promoted_days_ago))
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = MemoryQueryFilter::new();
        assert!(filter.matches(&memory(1, 0), Utc::now()));
    }

    #[test]
    fn test_filter_by_status() {
        let filter = MemoryQueryFilter::new().with_status(MemoryStatus::Approved);
        let now = Utc::now();

        assert!(filter.matches(&memory(1, 0), now));

        let denied = memory(1, 0).with_status(MemoryStatus::Denied);
        assert!(!filter.matches(&denied, now));
    }

    #[test]
    fn test_filter_by_promotion_window() {
        let now = Utc::now();
        let filter = MemoryQueryFilter::new()
            .with_promoted_after(now - Duration::days(10))
            .with_promoted_before(now - Duration::days(2));

        assert!(filter.matches(&memory(1, 5), now));
        assert!(!filter.matches(&memory(1, 20), now));
        assert!(!filter.matches(&memory(1, 0), now));
    }

    #[test]
    fn test_filter_by_count_and_residency() {
        let now = Utc::now();
        let filter = MemoryQueryFilter::new()
            .with_min_count(3)
            .with_min_days_since_promotion(7.0);

        assert!(filter.matches(&memory(3, 8), now));
        assert!(!filter.matches(&memory(2, 8), now));
        assert!(!filter.matches(&memory(3, 6), now));
    }

    #[test]
    fn test_promote_outcome_constructors() {
        let ok = PromoteOutcome::ok("mem-1");
        assert!(ok.success);
        assert_eq!(ok.id.as_deref(), Some("mem-1"));
        assert!(ok.reason.is_none());

        let declined = PromoteOutcome::declined("already promoted");
        assert!(!declined.success);
        assert!(declined.id.is_none());
        assert_eq!(declined.reason.as_deref(), Some("already promoted"));
    }

    #[test]
    fn test_core_target_file_names() {
        assert_eq!(CoreTarget::ClaudeMd.file_name(), "CLAUDE.md");
        assert_eq!(CoreTarget::AgentsMd.file_name(), "AGENTS.md");
        assert_eq!(CoreTarget::ClaudeMd.to_string(), "claude-md");
    }
}
