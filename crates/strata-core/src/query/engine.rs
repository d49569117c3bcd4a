//! Query engine orchestrating scope inheritance and relevance ranking.
//!
//! Queries run a fixed pipeline: store filter, scope narrowing, category
//! and keyword filters, relevance scoring, threshold, sort, pagination.
//! Scoring normalizes against the filtered set rather than the full store,
//! so relevance thresholds stay calibrated to what the caller is looking at.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StrataResult;
use crate::promotion::PromotionConfig;
use crate::scoring::{RelevanceScore, RelevanceScorer, ScoreNorm, AGGREGATION_HALF_LIFE_DAYS};
use crate::similarity::matches_keyword;
use crate::store::{MemoryQueryFilter, MemoryStore};
use crate::types::{LongTermMemory, ObservationCategory, Scope, ScopedMemory};

/// Configuration for query behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Page size when a query sets no limit. Default: 50
    pub default_limit: usize,
    /// Which levels scope inheritance may include.
    pub scope_levels: ScopeLevels,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            scope_levels: ScopeLevels::default(),
        }
    }
}

/// Per-level toggles for the inheritance chain.
///
/// Disabling a level removes it from chains that would inherit it. The
/// scope a query explicitly asks for always stays in its own chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeLevels {
    /// Include session-scoped results. Default: true
    pub session: bool,
    /// Include project-scoped results. Default: true
    pub project: bool,
    /// Include global-scoped results. Default: true
    pub global: bool,
}

impl Default for ScopeLevels {
    fn default() -> Self {
        Self {
            session: true,
            project: true,
            global: true,
        }
    }
}

impl ScopeLevels {
    /// Whether a level participates in inheritance.
    pub fn allows(&self, scope: Scope) -> bool {
        match scope {
            Scope::Session => self.session,
            Scope::Project => self.project,
            Scope::Global => self.global,
        }
    }
}

/// A memory query. All filters are optional and combine conjunctively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryQuery {
    /// Base filter executed by the store.
    pub filter: MemoryQueryFilter,
    /// Scope to query at; inherited scopes are merged in per the chain.
    pub scope: Option<Scope>,
    /// Session the caller is querying from. Restricts session-scoped items.
    pub session_id: Option<String>,
    /// Project the caller is querying from. Restricts project-scoped items.
    pub project: Option<String>,
    /// Keep only this category.
    pub category: Option<ObservationCategory>,
    /// Token-overlap keyword match against text and tags.
    pub keyword: Option<String>,
    /// Drop items whose total relevance falls below this value.
    pub relevance_threshold: Option<f32>,
    /// Items to skip before the page.
    pub offset: usize,
    /// Page size; the engine default applies when unset.
    pub limit: Option<usize>,
}

impl MemoryQuery {
    /// Create an empty query matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base store filter.
    pub fn with_filter(mut self, filter: MemoryQueryFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Query at a scope, inheriting broader scopes per the chain.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Set the calling session.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the calling project.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Keep only one category.
    pub fn with_category(mut self, category: ObservationCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Require a keyword match.
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Require a minimum total relevance.
    pub fn with_relevance_threshold(mut self, threshold: f32) -> Self {
        self.relevance_threshold = Some(threshold);
        self
    }

    /// Skip this many items before the page.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Set the page size.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A memory with its derived scope and relevance breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMemory {
    /// The stored memory.
    pub memory: LongTermMemory,
    /// Scope derived at query time.
    pub scope: Scope,
    /// Relevance against the filtered set.
    pub score: RelevanceScore,
}

/// One page of query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// The page, sorted by descending total relevance.
    pub items: Vec<ScoredMemory>,
    /// Matching items before pagination.
    pub total: usize,
    /// Offset this page started at.
    pub offset: usize,
    /// Limit applied to this page.
    pub limit: usize,
}

/// Flat memory collection partitioned by derived scope.
#[derive(Debug, Clone, Default)]
pub struct ScopePartition {
    /// Memories applying to a single session.
    pub session: Vec<LongTermMemory>,
    /// Memories spanning several sessions of one project.
    pub project: Vec<LongTermMemory>,
    /// Memories meeting the global thresholds.
    pub global: Vec<LongTermMemory>,
}

/// Resolves inheritance chains and runs the query pipeline.
pub struct QueryEngine {
    memories: Arc<dyn MemoryStore>,
    config: QueryConfig,
    promotion: PromotionConfig,
    scorer: RelevanceScorer,
}

impl QueryEngine {
    /// Create an engine over a memory store.
    ///
    /// Promotion thresholds double as the global-scope classification
    /// thresholds.
    pub fn new(
        memories: Arc<dyn MemoryStore>,
        config: QueryConfig,
        promotion: PromotionConfig,
    ) -> Self {
        Self {
            memories,
            config,
            promotion,
            scorer: RelevanceScorer::new(AGGREGATION_HALF_LIFE_DAYS),
        }
    }

    /// Create an engine with default configuration.
    pub fn with_defaults(memories: Arc<dyn MemoryStore>) -> Self {
        Self::new(memories, QueryConfig::default(), PromotionConfig::default())
    }

    /// Replace the scorer.
    pub fn with_scorer(mut self, scorer: RelevanceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// The scopes a query at `requested` includes, walking toward global.
    ///
    /// The requested scope always heads its own chain; `ScopeLevels`
    /// toggles gate only the inherited levels.
    pub fn resolve_chain(&self, requested: Scope) -> Vec<Scope> {
        requested
            .inheritance_chain()
            .iter()
            .copied()
            .filter(|&scope| scope == requested || self.config.scope_levels.allows(scope))
            .collect()
    }

    /// Derive the scope of a memory at the current instant.
    pub fn classify(&self, memory: &LongTermMemory) -> Scope {
        self.classify_at(memory, Utc::now())
    }

    /// Derive the scope of a memory against a fixed reference time.
    ///
    /// Pure: the same memory, thresholds, and reference always yield the
    /// same scope. Global needs both thresholds; project needs more than
    /// one source session; everything else is session.
    pub fn classify_at(&self, memory: &LongTermMemory, reference: DateTime<Utc>) -> Scope {
        if memory.observation.count >= self.promotion.observation_count_threshold
            && memory.days_since_promotion(reference) >= self.promotion.long_term_days_threshold as f32
        {
            return Scope::Global;
        }
        if memory.observation.unique_session_count() > 1 {
            return Scope::Project;
        }
        Scope::Session
    }

    /// Classify a memory and attach its session/project associations.
    pub fn classify_with_context(&self, memory: &LongTermMemory) -> ScopedMemory {
        let scope = self.classify(memory);
        let mut scoped = ScopedMemory::new(memory.clone(), scope);
        if scope == Scope::Session {
            if let Some(session_id) = memory.observation.source_session_ids.first() {
                scoped = scoped.with_session_id(session_id.clone());
            }
        }
        if let Some(project) = memory.observation.project() {
            scoped = scoped.with_project(project);
        }
        scoped
    }

    /// Bucket a flat collection by derived scope.
    ///
    /// One reference instant covers the whole collection, so repeated
    /// calls on the same input agree.
    pub fn partition_by_scope(&self, memories: Vec<LongTermMemory>) -> ScopePartition {
        let reference = Utc::now();
        let mut partition = ScopePartition::default();
        for memory in memories {
            match self.classify_at(&memory, reference) {
                Scope::Session => partition.session.push(memory),
                Scope::Project => partition.project.push(memory),
                Scope::Global => partition.global.push(memory),
            }
        }
        partition
    }

    /// Run the query pipeline.
    ///
    /// Order is fixed: store filter, scope narrowing, category, keyword,
    /// scoring over the filtered set, threshold, descending sort,
    /// pagination. `total` counts matches before pagination.
    pub async fn query(&self, query: &MemoryQuery) -> StrataResult<QueryResult> {
        let now = Utc::now();
        let mut memories = self.memories.query(&query.filter).await?;

        if let Some(requested) = query.scope {
            let chain = self.resolve_chain(requested);
            let mut seen = HashSet::new();
            memories.retain(|m| seen.insert(m.id.clone()));
            memories.retain(|m| self.in_scope(m, &chain, query, now));
        }

        if let Some(category) = query.category {
            memories.retain(|m| m.observation.category == Some(category));
        }

        if let Some(keyword) = &query.keyword {
            memories.retain(|m| matches_keyword(&m.observation.text, &m.observation.tags, keyword));
        }

        let mut items = self.score_set(memories, now);

        if let Some(threshold) = query.relevance_threshold {
            items.retain(|item| item.score.total >= threshold);
        }

        items.sort_by(|a, b| OrderedFloat(b.score.total).cmp(&OrderedFloat(a.score.total)));

        let total = items.len();
        let limit = query.limit.unwrap_or(self.config.default_limit);
        let items: Vec<ScoredMemory> = items.into_iter().skip(query.offset).take(limit).collect();

        debug!(total, returned = items.len(), "memory query complete");
        Ok(QueryResult {
            items,
            total,
            offset: query.offset,
            limit,
        })
    }

    /// Keyword search over the full store.
    ///
    /// Same tokenizer and ranking as `query`, with a result-count limit
    /// instead of offset pagination.
    pub async fn search_by_keyword(
        &self,
        keyword: &str,
        limit: usize,
    ) -> StrataResult<Vec<ScoredMemory>> {
        let now = Utc::now();
        let mut memories = self.memories.get_all().await?;
        memories.retain(|m| matches_keyword(&m.observation.text, &m.observation.tags, keyword));

        let mut items = self.score_set(memories, now);
        items.sort_by(|a, b| OrderedFloat(b.score.total).cmp(&OrderedFloat(a.score.total)));
        items.truncate(limit);
        Ok(items)
    }

    fn score_set(&self, memories: Vec<LongTermMemory>, now: DateTime<Utc>) -> Vec<ScoredMemory> {
        let norm = ScoreNorm::from_memories(&memories, now);
        memories
            .into_iter()
            .map(|memory| {
                let score = self.scorer.score_memory(&memory, &norm);
                let scope = self.classify_at(&memory, now);
                ScoredMemory {
                    memory,
                    scope,
                    score,
                }
            })
            .collect()
    }

    fn in_scope(
        &self,
        memory: &LongTermMemory,
        chain: &[Scope],
        query: &MemoryQuery,
        reference: DateTime<Utc>,
    ) -> bool {
        let scope = self.classify_at(memory, reference);
        if !chain.contains(&scope) {
            return false;
        }
        match scope {
            Scope::Session => match &query.session_id {
                Some(session_id) => memory
                    .observation
                    .source_session_ids
                    .iter()
                    .any(|s| s == session_id),
                None => true,
            },
            Scope::Project => match &query.project {
                Some(project) => match memory.observation.project() {
                    Some(assigned) => assigned == project,
                    None => {
                        debug!(
                            memory_id = %memory.id,
                            "memory has no project association, kept in project scope"
                        );
                        true
                    }
                },
                None => true,
            },
            Scope::Global => true,
        }
    }
}

/// Group scored memories by category, preserving first-seen category order.
pub fn group_by_category(
    items: &[ScoredMemory],
) -> Vec<(Option<ObservationCategory>, Vec<ScoredMemory>)> {
    let mut groups: Vec<(Option<ObservationCategory>, Vec<ScoredMemory>)> = Vec::new();
    for item in items {
        let category = item.memory.observation.category;
        match groups.iter_mut().find(|(c, _)| *c == category) {
            Some((_, bucket)) => bucket.push(item.clone()),
            None => groups.push((category, vec![item.clone()])),
        }
    }
    groups
}
