//! Long-term memory types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use super::observation::Observation;

/// Status of a long-term memory.
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
pub enum MemoryStatus {
    /// Active long-term memory, eligible for core promotion once aged.
    Approved,
    /// Rejected after promotion; removable only by pruning.
    Denied,
    /// Selected for rendering into a core memory file.
    ScheduledForCore,
}

impl MemoryStatus {
    /// Whether the status lattice permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: MemoryStatus) -> bool {
        use MemoryStatus::*;
        matches!((self, next), (Approved, Denied) | (Approved, ScheduledForCore))
    }
}

/// An observation promoted into the long-term tier.
///
/// The embedded observation is an owned copy taken at promotion time; it
/// keeps accumulating evidence through store updates, and its `count` feeds
/// core-promotion eligibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermMemory {
    /// Unique identifier, distinct from the observation id.
    pub id: String,
    /// The promoted observation.
    pub observation: Observation,
    /// When the observation entered the long-term tier.
    pub promoted_at: DateTime<Utc>,
    /// Current status.
    pub status: MemoryStatus,
}

impl LongTermMemory {
    /// Create a long-term memory from a promoted observation.
    pub fn new(observation: Observation) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            observation,
            promoted_at: Utc::now(),
            status: MemoryStatus::Approved,
        }
    }

    /// Set the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the promotion timestamp.
    pub fn with_promoted_at(mut self, at: DateTime<Utc>) -> Self {
        self.promoted_at = at;
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: MemoryStatus) -> Self {
        self.status = status;
        self
    }

    /// Fractional days since this memory entered the long-term tier,
    /// measured against `reference`. Negative elapsed time clamps to zero.
    pub fn days_since_promotion(&self, reference: DateTime<Utc>) -> f32 {
        let seconds = (reference - self.promoted_at).num_seconds();
        if seconds <= 0 {
            0.0
        } else {
            seconds as f32 / 86_400.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::ObservationStatus;

    #[test]
    fn test_memory_status_serde() {
        let json = serde_json::to_string(&MemoryStatus::ScheduledForCore).unwrap();
        assert_eq!(json, "\"scheduled-for-core\"");
    }

    #[test]
    fn test_memory_status_lattice() {
        use MemoryStatus::*;

        assert!(Approved.can_transition_to(ScheduledForCore));
        assert!(Approved.can_transition_to(Denied));
        assert!(!Denied.can_transition_to(Approved));
        assert!(!ScheduledForCore.can_transition_to(Approved));
    }

    #[test]
    fn test_new_memory_defaults() {
        let obs = Observation::new("always squashes commits")
            .with_status(ObservationStatus::PromotedToLongTerm);
        let memory = LongTermMemory::new(obs);

        assert_eq!(memory.status, MemoryStatus::Approved);
        assert_eq!(memory.observation.text, "always squashes commits");
        assert_ne!(memory.id, memory.observation.id);
    }

    #[test]
    fn test_days_since_promotion() {
        let promoted = Utc::now();
        let memory = LongTermMemory::new(Observation::new("x")).with_promoted_at(promoted);

        let eight_days = promoted + chrono::Duration::days(8);
        let days = memory.days_since_promotion(eight_days);
        assert!((days - 8.0).abs() < 0.01);

        // Reference before promotion clamps to zero.
        let earlier = promoted - chrono::Duration::days(2);
        assert_eq!(memory.days_since_promotion(earlier), 0.0);
    }
}
