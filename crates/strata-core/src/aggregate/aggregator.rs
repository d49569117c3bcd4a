//! Merges near-duplicate observations across analyzer outputs.
//!
//! Analyzers run independently and frequently report the same behavioral
//! pattern in slightly different words. The aggregator clusters those
//! reports by token overlap, merges each cluster's evidence into one
//! observation, and ranks the survivors by relevance.

use std::collections::HashSet;

use chrono::Utc;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scoring::{
    RelevanceScore, RelevanceScorer, ScoreNorm, AGGREGATION_HALF_LIFE_DAYS,
};
use crate::similarity::{jaccard_of_sets, tokenize};
use crate::types::Observation;

/// Configuration for observation aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Jaccard similarity at or above which two observations merge.
    /// Range: 0.0-1.0. Default: 0.7
    pub similarity_threshold: f32,
    /// Maximum ranked observations to return. 0 means unlimited. Default: 0
    pub max_results: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            max_results: 0,
        }
    }
}

impl AggregationConfig {
    /// Create a config with custom values. The threshold is clamped to 0.0-1.0.
    pub fn new(similarity_threshold: f32, max_results: usize) -> Self {
        Self {
            similarity_threshold: similarity_threshold.clamp(0.0, 1.0),
            max_results,
        }
    }
}

/// One analyzer's output for an aggregation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerBatch {
    /// Name of the analyzer that produced these observations.
    pub analyzer: String,
    /// Observations in detection order.
    pub observations: Vec<Observation>,
}

impl AnalyzerBatch {
    /// Create a batch for the named analyzer.
    pub fn new(analyzer: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            analyzer: analyzer.into(),
            observations,
        }
    }
}

/// Input observations contributed per analyzer, in first-seen order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerCount {
    /// Analyzer name.
    pub analyzer: String,
    /// Number of input observations it contributed.
    pub count: usize,
}

/// An observation with its relevance score breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedObservation {
    /// The (possibly merged) observation.
    pub observation: Observation,
    /// Score components and total used for ranking.
    pub score: RelevanceScore,
}

/// Result of an aggregation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Merged observations, ranked by relevance descending.
    pub observations: Vec<RankedObservation>,
    /// Total observations across all input batches.
    pub total_inputs: usize,
    /// How many inputs were merged into an existing representative.
    pub duplicates_merged: usize,
    /// Inputs contributed per analyzer, in first-seen analyzer order.
    pub analyzer_breakdown: Vec<AnalyzerCount>,
}

/// Clusters and ranks observations from multiple analyzers.
pub struct PatternAggregator {
    config: AggregationConfig,
    scorer: RelevanceScorer,
}

impl PatternAggregator {
    /// Create an aggregator with the given configuration.
    pub fn new(config: AggregationConfig) -> Self {
        Self {
            config,
            scorer: RelevanceScorer::new(AGGREGATION_HALF_LIFE_DAYS),
        }
    }

    /// Create an aggregator with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(AggregationConfig::default())
    }

    /// Create an aggregator using a caller-provided scorer.
    pub fn with_scorer(config: AggregationConfig, scorer: RelevanceScorer) -> Self {
        Self { config, scorer }
    }

    /// Get the configuration.
    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Cluster, merge, and rank the batches.
    ///
    /// A single greedy pass walks inputs in batch order; each observation
    /// joins the first accepted representative it is similar enough to, or
    /// becomes a representative itself. Representatives are copies; caller
    /// data is never aliased or mutated.
    pub fn aggregate(&self, batches: &[AnalyzerBatch]) -> AggregationResult {
        let mut breakdown: Vec<AnalyzerCount> = Vec::new();
        let mut representatives: Vec<Observation> = Vec::new();
        let mut representative_tokens: Vec<HashSet<String>> = Vec::new();
        let mut total_inputs = 0;
        let mut duplicates_merged = 0;

        for batch in batches {
            record_analyzer(&mut breakdown, &batch.analyzer, batch.observations.len());
            total_inputs += batch.observations.len();

            for observation in &batch.observations {
                let tokens = tokenize(&observation.text);

                let matched = (0..representatives.len()).find(|&i| {
                    !categories_conflict(&representatives[i], observation)
                        && jaccard_of_sets(&representative_tokens[i], &tokens)
                            >= self.config.similarity_threshold
                });

                match matched {
                    Some(index) => {
                        merge_into(&mut representatives[index], observation);
                        duplicates_merged += 1;
                    }
                    None => {
                        representatives.push(observation.clone());
                        representative_tokens.push(tokens);
                    }
                }
            }
        }

        debug!(
            total_inputs,
            duplicates_merged,
            representatives = representatives.len(),
            "aggregation pass complete"
        );

        let now = Utc::now();
        let norm = ScoreNorm::from_observations(&representatives, now);
        let mut ranked: Vec<RankedObservation> = representatives
            .into_iter()
            .map(|observation| {
                let score = self.scorer.score_observation(&observation, &norm);
                RankedObservation { observation, score }
            })
            .collect();

        // Stable sort keeps first-seen order among equal totals.
        ranked.sort_by(|a, b| OrderedFloat(b.score.total).cmp(&OrderedFloat(a.score.total)));

        if self.config.max_results > 0 && ranked.len() > self.config.max_results {
            ranked.truncate(self.config.max_results);
        }

        AggregationResult {
            observations: ranked,
            total_inputs,
            duplicates_merged,
            analyzer_breakdown: breakdown,
        }
    }
}

/// Two stated categories that differ never merge; an uncategorized
/// observation compares with anything.
fn categories_conflict(a: &Observation, b: &Observation) -> bool {
    match (a.category, b.category) {
        (Some(ca), Some(cb)) => ca != cb,
        _ => false,
    }
}

fn record_analyzer(breakdown: &mut Vec<AnalyzerCount>, analyzer: &str, count: usize) {
    if let Some(entry) = breakdown.iter_mut().find(|e| e.analyzer == analyzer) {
        entry.count += count;
    } else {
        breakdown.push(AnalyzerCount {
            analyzer: analyzer.to_string(),
            count,
        });
    }
}

/// Fold an incoming duplicate into its representative.
fn merge_into(representative: &mut Observation, incoming: &Observation) {
    representative.count = representative.count.saturating_add(incoming.count);

    for session_id in &incoming.source_session_ids {
        if !representative.source_session_ids.contains(session_id) {
            representative.source_session_ids.push(session_id.clone());
        }
    }

    if incoming.last_seen > representative.last_seen {
        representative.last_seen = incoming.last_seen;
    }
    if incoming.first_seen < representative.first_seen {
        representative.first_seen = incoming.first_seen;
    }

    for tag in &incoming.tags {
        if !representative.tags.contains(tag) {
            representative.tags.push(tag.clone());
        }
    }

    // Shallow merge; the incoming observation's keys win.
    if let Some(incoming_meta) = &incoming.metadata {
        let merged = representative.metadata.get_or_insert_with(Default::default);
        for (key, value) in incoming_meta {
            merged.insert(key.clone(), value.clone());
        }
    }
}
