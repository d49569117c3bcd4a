//! Relevance scoring across the memory hierarchy.
//!
//! One scorer serves the aggregator's ranking, the query engine's ordering,
//! and context rendering. The score combines three normalized components:
//! how often a pattern was seen, how recently, and across how many distinct
//! sessions. Normalization denominators always come from the result set
//! being scored, so a score is only comparable within its own batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{LongTermMemory, Observation};

/// Half-life used when ranking during aggregation and querying.
///
/// A pattern unseen for seven days contributes half its recency signal;
/// ranking reacts quickly to what the user is doing right now.
pub const AGGREGATION_HALF_LIFE_DAYS: f32 = 7.0;

/// Half-life used when selecting memories for context rendering.
///
/// Rendered context decays at half the aggregation rate so the memories a
/// user sees in their context files stay stable across a fortnight rather
/// than churning with every session.
pub const CONTEXT_HALF_LIFE_DAYS: f32 = 14.0;

/// Component weights for the combined relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Weight of the frequency component.
    pub frequency: f32,
    /// Weight of the recency component.
    pub recency: f32,
    /// Weight of the session-spread component.
    pub session_spread: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            frequency: 0.5,
            recency: 0.3,
            session_spread: 0.2,
        }
    }
}

/// Normalization denominators for one scoring batch.
///
/// Derived from the result set being scored. An item scored alone
/// normalizes against itself.
#[derive(Debug, Clone, Copy)]
pub struct ScoreNorm {
    /// Highest detection count in the batch.
    pub max_count: u32,
    /// Widest session spread in the batch.
    pub max_sessions: usize,
    /// Timestamp recency is measured against.
    pub reference_time: DateTime<Utc>,
}

impl ScoreNorm {
    /// Derive denominators from a batch of observations.
    pub fn from_observations(observations: &[Observation], reference_time: DateTime<Utc>) -> Self {
        Self {
            max_count: observations.iter().map(|o| o.count).max().unwrap_or(0),
            max_sessions: observations
                .iter()
                .map(|o| o.unique_session_count())
                .max()
                .unwrap_or(0),
            reference_time,
        }
    }

    /// Derive denominators from a batch of long-term memories.
    pub fn from_memories(memories: &[LongTermMemory], reference_time: DateTime<Utc>) -> Self {
        Self {
            max_count: memories.iter().map(|m| m.observation.count).max().unwrap_or(0),
            max_sessions: memories
                .iter()
                .map(|m| m.observation.unique_session_count())
                .max()
                .unwrap_or(0),
            reference_time,
        }
    }

    /// Denominators for scoring one item in isolation.
    pub fn single(count: u32, sessions: usize, reference_time: DateTime<Utc>) -> Self {
        Self {
            max_count: count,
            max_sessions: sessions,
            reference_time,
        }
    }
}

/// A relevance score with its component breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceScore {
    /// Detection count relative to the batch maximum.
    pub frequency: f32,
    /// Exponential decay on time since last sighting.
    pub recency: f32,
    /// Session spread relative to the batch maximum, square-root damped.
    pub session_spread: f32,
    /// Weighted combination, clamped to [0.0, 1.0].
    pub total: f32,
}

/// Computes relevance scores from detection evidence.
///
/// The half-life is a per-caller choice; see [`AGGREGATION_HALF_LIFE_DAYS`]
/// and [`CONTEXT_HALF_LIFE_DAYS`].
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    weights: ScoreWeights,
    half_life_days: f32,
}

impl RelevanceScorer {
    /// Create a scorer with default weights and the given half-life.
    pub fn new(half_life_days: f32) -> Self {
        Self {
            weights: ScoreWeights::default(),
            half_life_days,
        }
    }

    /// Create a scorer with custom weights.
    pub fn with_weights(half_life_days: f32, weights: ScoreWeights) -> Self {
        Self {
            weights,
            half_life_days,
        }
    }

    /// The configured half-life in days.
    pub fn half_life_days(&self) -> f32 {
        self.half_life_days
    }

    /// Score an observation against batch denominators.
    pub fn score_observation(&self, observation: &Observation, norm: &ScoreNorm) -> RelevanceScore {
        self.score_parts(
            observation.count,
            observation.unique_session_count(),
            observation.last_seen,
            norm,
        )
    }

    /// Score a long-term memory against batch denominators.
    ///
    /// Evidence lives on the embedded observation; the memory's own
    /// promotion timestamp plays no part in relevance.
    pub fn score_memory(&self, memory: &LongTermMemory, norm: &ScoreNorm) -> RelevanceScore {
        self.score_observation(&memory.observation, norm)
    }

    fn score_parts(
        &self,
        count: u32,
        sessions: usize,
        last_seen: DateTime<Utc>,
        norm: &ScoreNorm,
    ) -> RelevanceScore {
        let frequency = count as f32 / norm.max_count.max(1) as f32;

        // A last_seen in the future counts as seen just now.
        let elapsed_seconds = (norm.reference_time - last_seen).num_seconds();
        let days = (elapsed_seconds as f32 / 86_400.0).max(0.0);
        let recency = (-std::f32::consts::LN_2 / self.half_life_days * days).exp();

        let session_spread =
            (sessions as f32).sqrt() / (norm.max_sessions.max(1) as f32).sqrt();

        let total = self.weights.frequency * frequency
            + self.weights.recency * recency
            + self.weights.session_spread * session_spread;

        RelevanceScore {
            frequency,
            recency,
            session_spread,
            total: total.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn observation(count: u32, sessions: usize, last_seen: DateTime<Utc>) -> Observation {
        let mut obs = Observation::new("test pattern")
            .with_count(count)
            .with_last_seen(last_seen);
        for i in 0..sessions {
            obs = obs.with_source_session(format!("s{}", i));
        }
        obs
    }

    #[test]
    fn test_default_weights() {
        let w = ScoreWeights::default();
        assert_eq!(w.frequency, 0.5);
        assert_eq!(w.recency, 0.3);
        assert_eq!(w.session_spread, 0.2);
    }

    #[test]
    fn test_frequency_normalized_against_batch_max() {
        let now = Utc::now();
        let scorer = RelevanceScorer::new(AGGREGATION_HALF_LIFE_DAYS);
        let norm = ScoreNorm {
            max_count: 10,
            max_sessions: 1,
            reference_time: now,
        };

        let score = scorer.score_observation(&observation(5, 1, now), &norm);
        assert!((score.frequency - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_recency_halves_at_half_life() {
        let now = Utc::now();
        let scorer = RelevanceScorer::new(7.0);
        let norm = ScoreNorm::single(1, 1, now);

        let week_old = observation(1, 1, now - Duration::days(7));
        let score = scorer.score_observation(&week_old, &norm);
        assert!((score.recency - 0.5).abs() < 0.01);

        let fresh = observation(1, 1, now);
        let score = scorer.score_observation(&fresh, &norm);
        assert!((score.recency - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_future_last_seen_clamps_to_full_recency() {
        let now = Utc::now();
        let scorer = RelevanceScorer::new(7.0);
        let norm = ScoreNorm::single(1, 1, now);

        let future = observation(1, 1, now + Duration::days(3));
        let score = scorer.score_observation(&future, &norm);
        assert_eq!(score.recency, 1.0);
        assert!(score.total <= 1.0);
    }

    #[test]
    fn test_session_spread_square_root_damped() {
        let now = Utc::now();
        let scorer = RelevanceScorer::new(7.0);
        let norm = ScoreNorm {
            max_count: 1,
            max_sessions: 16,
            reference_time: now,
        };

        let score = scorer.score_observation(&observation(1, 4, now), &norm);
        // sqrt(4)/sqrt(16) = 2/4
        assert!((score.session_spread - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_total_is_clamped() {
        let now = Utc::now();
        let heavy = ScoreWeights {
            frequency: 2.0,
            recency: 2.0,
            session_spread: 2.0,
        };
        let scorer = RelevanceScorer::with_weights(7.0, heavy);
        let norm = ScoreNorm::single(3, 2, now);

        let score = scorer.score_observation(&observation(3, 2, now), &norm);
        assert_eq!(score.total, 1.0);
    }

    #[test]
    fn test_empty_batch_norm_uses_unit_denominators() {
        let now = Utc::now();
        let norm = ScoreNorm::from_observations(&[], now);
        assert_eq!(norm.max_count, 0);

        let scorer = RelevanceScorer::new(7.0);
        let score = scorer.score_observation(&observation(3, 2, now), &norm);
        // max(0, 1) denominator keeps the math finite.
        assert_eq!(score.frequency, 3.0);
        assert_eq!(score.total, 1.0);
    }

    #[test]
    fn test_norm_from_memories_reads_embedded_observations() {
        let now = Utc::now();
        let memories = vec![
            LongTermMemory::new(observation(4, 2, now)),
            LongTermMemory::new(observation(9, 5, now)),
        ];

        let norm = ScoreNorm::from_memories(&memories, now);
        assert_eq!(norm.max_count, 9);
        assert_eq!(norm.max_sessions, 5);
    }

    #[test]
    fn test_single_norm_scores_item_as_its_own_maximum() {
        let now = Utc::now();
        let scorer = RelevanceScorer::new(7.0);
        let obs = observation(6, 3, now);
        let norm = ScoreNorm::single(obs.count, obs.unique_session_count(), now);

        let score = scorer.score_observation(&obs, &norm);
        assert_eq!(score.frequency, 1.0);
        assert_eq!(score.session_spread, 1.0);
        assert!((score.total - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_context_half_life_decays_slower() {
        let now = Utc::now();
        let aggregation = RelevanceScorer::new(AGGREGATION_HALF_LIFE_DAYS);
        let context = RelevanceScorer::new(CONTEXT_HALF_LIFE_DAYS);
        let norm = ScoreNorm::single(1, 1, now);

        let week_old = observation(1, 1, now - Duration::days(7));
        let fast = aggregation.score_observation(&week_old, &norm);
        let slow = context.score_observation(&week_old, &norm);

        assert!(slow.recency > fast.recency);
        assert!((slow.recency - 0.7071).abs() < 0.01);
    }
}
