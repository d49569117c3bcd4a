//! Integration tests for the full promotion lifecycle.
//!
//! Walks observations from analyzer output through aggregation, review,
//! long-term promotion, and core scheduling, using the in-memory stores.

use std::sync::Arc;

use chrono::{Duration, Utc};

use strata_core::testing::{InMemoryMemoryStore, InMemoryObservationStore};
use strata_core::{
    AnalyzerBatch, CoreTarget, LongTermMemory, MemoryQuery, MemoryStatus, MemoryStore,
    Observation, ObservationStatus, ObservationStore, PatternAggregator, PromotionEngine,
    PromotionLevel, QueryEngine, StrataConfig,
};

fn stores() -> (Arc<InMemoryObservationStore>, Arc<InMemoryMemoryStore>) {
    let observations = Arc::new(InMemoryObservationStore::new());
    let memories = Arc::new(InMemoryMemoryStore::new(observations.clone()));
    (observations, memories)
}

/// Near-duplicate analyzer output merges into one observation whose pooled
/// evidence clears the promotion threshold.
#[tokio::test]
async fn test_aggregation_feeds_promotion() {
    let (observations, memories) = stores();

    let batches = vec![
        AnalyzerBatch::new(
            "style-analyzer",
            vec![
                Observation::new("user prefers snake case naming").with_source_session("s1"),
                Observation::new("user prefers snake case naming always")
                    .with_source_session("s2"),
            ],
        ),
        AnalyzerBatch::new(
            "review-analyzer",
            vec![Observation::new("user prefers snake case naming").with_source_session("s3")],
        ),
    ];

    let result = PatternAggregator::with_defaults().aggregate(&batches);
    assert_eq!(result.observations.len(), 1);
    assert_eq!(result.duplicates_merged, 2);

    let merged = result.observations[0].observation.clone();
    assert_eq!(merged.count, 3);
    assert_eq!(merged.unique_session_count(), 3);

    // Review approves the merged observation; promotion picks it up.
    observations
        .insert(merged.with_status(ObservationStatus::Approved))
        .await;

    let engine = PromotionEngine::with_defaults(observations.clone(), memories.clone());
    let run = engine.run_observation_promotions().await.unwrap();
    assert_eq!(run.level, PromotionLevel::ObservationToLongTerm);
    assert_eq!(run.promoted, 1);

    // The new memory is queryable with the pooled evidence intact.
    let queries = QueryEngine::with_defaults(memories.clone());
    let page = queries
        .query(&MemoryQuery::new().with_keyword("snake"))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].memory.observation.count, 3);
}

/// An approved observation travels the whole hierarchy: long-term first,
/// then core once it has both residency and evidence.
#[tokio::test]
async fn test_full_lifecycle_reaches_core() {
    let (observations, memories) = stores();
    observations
        .insert(
            Observation::new("always run clippy before pushing")
                .with_id("obs-clippy")
                .with_status(ObservationStatus::Approved)
                .with_count(4)
                .with_source_session("s1")
                .with_source_session("s2"),
        )
        .await;

    let engine = PromotionEngine::with_defaults(observations.clone(), memories.clone());

    let first = engine.run_observation_promotions().await.unwrap();
    assert_eq!(first.promoted, 1);
    let memory_id = first.events[0].result_id.clone().unwrap();

    let observation = observations.get_by_id("obs-clippy").await.unwrap().unwrap();
    assert_eq!(observation.status, ObservationStatus::PromotedToLongTerm);

    // Too young for core on day one: skipped without an event.
    let young = engine.run_core_promotions().await.unwrap();
    assert_eq!(young.evaluated, 1);
    assert_eq!(young.skipped, 1);
    assert_eq!(young.promoted, 0);

    // Age the memory past the residency threshold.
    let memory = memories.get_by_id(&memory_id).await.unwrap().unwrap();
    memories
        .insert(memory.with_promoted_at(Utc::now() - Duration::days(8)))
        .await;

    let aged = engine.run_core_promotions().await.unwrap();
    assert_eq!(aged.promoted, 1);

    let memory = memories.get_by_id(&memory_id).await.unwrap().unwrap();
    assert_eq!(memory.status, MemoryStatus::ScheduledForCore);
    assert_eq!(
        memories.scheduled_targets(&memory_id).await,
        Some(vec![CoreTarget::ClaudeMd])
    );
    let observation = observations.get_by_id("obs-clippy").await.unwrap().unwrap();
    assert_eq!(observation.status, ObservationStatus::PromotedToCore);

    // Event ids stay monotonic across runs; the skipped pass added none.
    let events = engine.events().await;
    let ids: Vec<u64> = events.iter().map(|e| e.event_id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(
        engine
            .events_for_level(PromotionLevel::LongTermToCore)
            .await
            .len(),
        1
    );
}

/// Breadth across sessions promotes even when the raw count never would.
#[tokio::test]
async fn test_session_breadth_override() {
    let (observations, memories) = stores();
    let mut observation = Observation::new("asks for conventional commit messages")
        .with_id("obs-breadth")
        .with_status(ObservationStatus::Approved);
    for i in 0..5 {
        observation = observation.with_source_session(format!("session-{}", i));
    }
    // Count stays at 1, well under the threshold of 3.
    observations.insert(observation).await;

    let engine = PromotionEngine::with_defaults(observations.clone(), memories.clone());
    let run = engine.run_observation_promotions().await.unwrap();

    assert_eq!(run.promoted, 1);
    assert_eq!(memories.count().await, 1);
}

/// A memory whose observation stayed at count 2 never reaches core, no
/// matter how long it sits in the long-term tier.
#[tokio::test]
async fn test_low_count_memory_never_reaches_core() {
    let (observations, memories) = stores();
    memories
        .insert(
            LongTermMemory::new(
                Observation::new("rarely seen preference")
                    .with_id("obs-rare")
                    .with_status(ObservationStatus::PromotedToLongTerm)
                    .with_count(2),
            )
            .with_id("mem-rare")
            .with_promoted_at(Utc::now() - Duration::days(30)),
        )
        .await;

    let engine = PromotionEngine::with_defaults(observations.clone(), memories.clone());
    let run = engine.run_core_promotions().await.unwrap();

    assert_eq!(run.evaluated, 1);
    assert_eq!(run.skipped, 1);
    assert!(run.events.is_empty());

    let memory = memories.get_by_id("mem-rare").await.unwrap().unwrap();
    assert_eq!(memory.status, MemoryStatus::Approved);
}

/// Engines honor thresholds and targets loaded from a config file.
#[tokio::test]
async fn test_config_file_drives_promotion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strata.toml");
    std::fs::write(
        &path,
        r#"
[promotion]
observation_count_threshold = 2

[memory_targets]
claude_md = false
agents_md = true
"#,
    )
    .unwrap();
    let config = StrataConfig::from_file(&path).unwrap();

    let (observations, memories) = stores();
    observations
        .insert(
            Observation::new("uses just for task running")
                .with_id("obs-just")
                .with_status(ObservationStatus::Approved)
                .with_count(2),
        )
        .await;

    let engine = PromotionEngine::new(
        observations.clone(),
        memories.clone(),
        config.promotion.clone(),
        config.memory_targets,
    );
    assert_eq!(engine.targets().enabled(), vec![CoreTarget::AgentsMd]);

    // Count 2 promotes under the lowered threshold.
    let run = engine.run_observation_promotions().await.unwrap();
    assert_eq!(run.promoted, 1);
}
