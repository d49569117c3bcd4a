//! Promotion audit events.
//!
//! Every promotion attempt, successful or not, is recorded in an in-process
//! append-only log so operators can answer "why is this in my context file"
//! after the fact. The log never mutates store state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Which tier boundary a promotion event crossed.
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
pub enum PromotionLevel {
    /// Observation tier into long-term tier.
    ObservationToLongTerm,
    /// Long-term tier into a core memory file.
    LongTermToCore,
}

/// One recorded promotion attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionEvent {
    /// Monotonic id assigned by the log, starting at 1.
    pub event_id: u64,
    /// Tier boundary the attempt crossed.
    pub level: PromotionLevel,
    /// Id of the record being promoted.
    pub source_id: String,
    /// Id of the created or affected record, when successful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
    /// Whether the promotion happened.
    pub success: bool,
    /// Why the promotion did not happen, when unsuccessful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the attempt was recorded.
    pub timestamp: DateTime<Utc>,
}

impl PromotionEvent {
    /// A successful promotion. The event id is assigned on append.
    pub fn success(
        level: PromotionLevel,
        source_id: impl Into<String>,
        result_id: impl Into<String>,
    ) -> Self {
        Self {
            event_id: 0,
            level,
            source_id: source_id.into(),
            result_id: Some(result_id.into()),
            success: true,
            reason: None,
            timestamp: Utc::now(),
        }
    }

    /// A failed promotion with a reason. The event id is assigned on append.
    pub fn failure(
        level: PromotionLevel,
        source_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            event_id: 0,
            level,
            source_id: source_id.into(),
            result_id: None,
            success: false,
            reason: Some(reason.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only promotion event log with monotonic ids.
#[derive(Debug)]
pub struct EventLog {
    events: Vec<PromotionEvent>,
    next_id: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Create an empty log. The first event receives id 1.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Append an event, assigning it the next id. Returns the stored event.
    pub fn append(&mut self, mut event: PromotionEvent) -> PromotionEvent {
        event.event_id = self.next_id;
        self.next_id += 1;
        self.events.push(event.clone());
        event
    }

    /// All events in append order.
    pub fn all(&self) -> &[PromotionEvent] {
        &self.events
    }

    /// Events for one tier boundary, in append order.
    pub fn by_level(&self, level: PromotionLevel) -> Vec<PromotionEvent> {
        self.events
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Discard all events and restart ids at 1.
    pub fn clear(&mut self) {
        self.events.clear();
        self.next_id = 1;
    }
}
