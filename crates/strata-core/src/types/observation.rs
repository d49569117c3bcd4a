//! Observation types.
//!
//! An observation is a behavioral pattern detected in recorded assistant
//! sessions. Observations accumulate evidence (count, source sessions) until
//! they are approved and promoted into long-term memory, or denied and
//! eventually pruned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Metadata key under which the owning project is recorded.
pub const PROJECT_METADATA_KEY: &str = "project";

/// Category of a detected behavioral pattern.
///
/// Categories serialize to kebab-case for storage compatibility.
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
pub enum ObservationCategory {
    /// Stated or revealed user preference.
    Preference,
    /// Recurring code or interaction pattern.
    Pattern,
    /// Multi-step process the user follows.
    Workflow,
    /// Tool or command the user reaches for.
    ToolChoice,
    /// Formatting or stylistic convention.
    Style,
    /// Anything that fits no other category.
    Other,
}

/// Review and promotion status of an observation.
///
/// Transitions follow a fixed lattice: `pending` moves to `approved` or
/// `denied`; `approved` moves to `promoted-to-long-term`; the underlying
/// observation of a core-scheduled memory moves to `promoted-to-core`.
/// `denied` has no outgoing transitions.
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
pub enum ObservationStatus {
    /// Awaiting review.
    Pending,
    /// Reviewed and accepted; eligible for long-term promotion.
    Approved,
    /// Reviewed and rejected; removable only by pruning.
    Denied,
    /// Promoted into a long-term memory.
    PromotedToLongTerm,
    /// Underlying memory was scheduled into a core memory file.
    PromotedToCore,
}

impl ObservationStatus {
    /// Whether the status lattice permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ObservationStatus) -> bool {
        use ObservationStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Denied)
                | (Approved, PromotedToLongTerm)
                | (PromotedToLongTerm, PromotedToCore)
        )
    }
}

/// A detected behavioral pattern with its accumulated evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Unique identifier.
    pub id: String,
    /// Human-readable description of the pattern.
    pub text: String,
    /// Category, when the analyzer assigned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ObservationCategory>,
    /// Number of times the pattern was detected.
    pub count: u32,
    /// Review and promotion status.
    pub status: ObservationStatus,
    /// Session ids the pattern was seen in, in first-seen order, no duplicates.
    pub source_session_ids: Vec<String>,
    /// When the pattern was first detected.
    pub first_seen: DateTime<Utc>,
    /// When the pattern was most recently detected. Never before `first_seen`.
    pub last_seen: DateTime<Utc>,
    /// Free-form labels, order-preserving set semantics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Custom metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Observation {
    /// Create a new pending observation with a generated id.
    pub fn new(text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            category: None,
            count: 1,
            status: ObservationStatus::Pending,
            source_session_ids: Vec::new(),
            first_seen: now,
            last_seen: now,
            tags: Vec::new(),
            metadata: None,
        }
    }

    /// Set the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: ObservationCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Set the detection count.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: ObservationStatus) -> Self {
        self.status = status;
        self
    }

    /// Add a source session id, preserving order and uniqueness.
    pub fn with_source_session(mut self, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        if !self.source_session_ids.contains(&session_id) {
            self.source_session_ids.push(session_id);
        }
        self
    }

    /// Set the first-seen timestamp.
    pub fn with_first_seen(mut self, at: DateTime<Utc>) -> Self {
        self.first_seen = at;
        self
    }

    /// Set the last-seen timestamp.
    pub fn with_last_seen(mut self, at: DateTime<Utc>) -> Self {
        self.last_seen = at;
        self
    }

    /// Add a tag, preserving order and uniqueness.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Set the metadata map.
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Associate the owning project via metadata.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.metadata.get_or_insert_with(HashMap::new).insert(
            PROJECT_METADATA_KEY.to_string(),
            serde_json::Value::String(project.into()),
        );
        self
    }

    /// Record another sighting of this pattern.
    ///
    /// Increments the count, registers the session if unseen, and advances
    /// `last_seen` when `at` is later than the current value.
    pub fn record_sighting(&mut self, session_id: impl Into<String>, at: DateTime<Utc>) {
        self.count = self.count.saturating_add(1);
        let session_id = session_id.into();
        if !self.source_session_ids.contains(&session_id) {
            self.source_session_ids.push(session_id);
        }
        if at > self.last_seen {
            self.last_seen = at;
        }
    }

    /// Number of distinct sessions this pattern was seen in.
    pub fn unique_session_count(&self) -> usize {
        self.source_session_ids.len()
    }

    /// Project associated via metadata, if any.
    pub fn project(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(PROJECT_METADATA_KEY))
            .and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_category_display_kebab_case() {
        assert_eq!(ObservationCategory::Preference.to_string(), "preference");
        assert_eq!(ObservationCategory::ToolChoice.to_string(), "tool-choice");
        assert_eq!(ObservationCategory::Style.to_string(), "style");
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!(
            ObservationCategory::from_str("tool-choice").unwrap(),
            ObservationCategory::ToolChoice
        );
        assert!(ObservationCategory::from_str("nonsense").is_err());
    }

    #[test]
    fn test_status_serde_kebab_case() {
        let json = serde_json::to_string(&ObservationStatus::PromotedToLongTerm).unwrap();
        assert_eq!(json, "\"promoted-to-long-term\"");

        let parsed: ObservationStatus = serde_json::from_str("\"promoted-to-core\"").unwrap();
        assert_eq!(parsed, ObservationStatus::PromotedToCore);
    }

    #[test]
    fn test_status_lattice() {
        use ObservationStatus::*;

        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Denied));
        assert!(Approved.can_transition_to(PromotedToLongTerm));
        assert!(PromotedToLongTerm.can_transition_to(PromotedToCore));

        // Denied is terminal.
        assert!(!Denied.can_transition_to(Approved));
        assert!(!Denied.can_transition_to(Pending));
        // No skipping review.
        assert!(!Pending.can_transition_to(PromotedToLongTerm));
        // No demotion.
        assert!(!Approved.can_transition_to(Pending));
    }

    #[test]
    fn test_record_sighting() {
        let start = Utc::now();
        let mut obs = Observation::new("prefers rebase over merge")
            .with_source_session("s1")
            .with_first_seen(start)
            .with_last_seen(start);

        let later = start + chrono::Duration::hours(2);
        obs.record_sighting("s2", later);
        obs.record_sighting("s2", later);

        assert_eq!(obs.count, 3);
        assert_eq!(obs.source_session_ids, vec!["s1", "s2"]);
        assert_eq!(obs.last_seen, later);
    }

    #[test]
    fn test_record_sighting_never_rewinds_last_seen() {
        let start = Utc::now();
        let mut obs = Observation::new("runs tests before commit").with_last_seen(start);

        obs.record_sighting("s1", start - chrono::Duration::days(3));

        assert_eq!(obs.last_seen, start);
        assert_eq!(obs.count, 2);
    }

    #[test]
    fn test_session_and_tag_uniqueness() {
        let obs = Observation::new("uses fish shell")
            .with_source_session("s1")
            .with_source_session("s1")
            .with_tag("shell")
            .with_tag("shell");

        assert_eq!(obs.unique_session_count(), 1);
        assert_eq!(obs.tags, vec!["shell"]);
    }

    #[test]
    fn test_project_metadata_lookup() {
        let mut meta = HashMap::new();
        meta.insert("editor".to_string(), serde_json::json!("helix"));
        let obs = Observation::new("prefers tabs")
            .with_metadata(meta)
            .with_project("acme-api");

        assert_eq!(obs.project(), Some("acme-api"));
        // Stamping a project extends existing metadata rather than replacing it.
        assert_eq!(
            obs.metadata.as_ref().unwrap().get("editor"),
            Some(&serde_json::json!("helix"))
        );
        assert_eq!(Observation::new("no metadata").project(), None);
    }

    #[test]
    fn test_serialization_omits_empty() {
        let obs = Observation::new("minimal");
        let json = serde_json::to_string(&obs).unwrap();

        assert!(!json.contains("category"));
        assert!(!json.contains("tags"));
        assert!(!json.contains("metadata"));

        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text, "minimal");
        assert_eq!(back.status, ObservationStatus::Pending);
    }
}
