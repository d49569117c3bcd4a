//! In-memory reference stores.
//!
//! These implement the store traits over plain vectors behind async locks.
//! They back the crate's own tests and give downstream adapters a working
//! model of the trait contracts, promotion outcome semantics included.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StrataResult;
use crate::store::{CoreTarget, MemoryQueryFilter, MemoryStore, ObservationStore, PromoteOutcome};
use crate::types::{LongTermMemory, MemoryStatus, Observation, ObservationStatus};

/// Observation store backed by a vector.
#[derive(Default)]
pub struct InMemoryObservationStore {
    observations: RwLock<Vec<Observation>>,
}

impl InMemoryObservationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observation, replacing any existing one with the same id.
    pub async fn insert(&self, observation: Observation) {
        let mut observations = self.observations.write().await;
        if let Some(existing) = observations.iter_mut().find(|o| o.id == observation.id) {
            *existing = observation;
        } else {
            observations.push(observation);
        }
    }

    /// Number of stored observations.
    pub async fn count(&self) -> usize {
        self.observations.read().await.len()
    }
}

#[async_trait]
impl ObservationStore for InMemoryObservationStore {
    async fn get_all(&self) -> StrataResult<Vec<Observation>> {
        Ok(self.observations.read().await.clone())
    }

    async fn get_by_id(&self, id: &str) -> StrataResult<Option<Observation>> {
        Ok(self
            .observations
            .read()
            .await
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn get_by_status(&self, status: ObservationStatus) -> StrataResult<Vec<Observation>> {
        Ok(self
            .observations
            .read()
            .await
            .iter()
            .filter(|o| o.status == status)
            .cloned()
            .collect())
    }

    async fn get_promotable(&self, min_count: u32) -> StrataResult<Vec<Observation>> {
        Ok(self
            .observations
            .read()
            .await
            .iter()
            .filter(|o| o.status == ObservationStatus::Approved && o.count >= min_count)
            .cloned()
            .collect())
    }

    async fn set_status(&self, id: &str, status: ObservationStatus) -> StrataResult<bool> {
        let mut observations = self.observations.write().await;
        match observations.iter_mut().find(|o| o.id == id) {
            Some(observation) => {
                observation.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_status_many(
        &self,
        ids: &[String],
        status: ObservationStatus,
    ) -> StrataResult<usize> {
        let mut observations = self.observations.write().await;
        let mut updated = 0;
        for observation in observations.iter_mut() {
            if ids.contains(&observation.id) {
                observation.status = status;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> StrataResult<bool> {
        let mut observations = self.observations.write().await;
        let before = observations.len();
        observations.retain(|o| o.id != id);
        Ok(observations.len() < before)
    }

    async fn delete_many(&self, ids: &[String]) -> StrataResult<usize> {
        let mut observations = self.observations.write().await;
        let before = observations.len();
        observations.retain(|o| !ids.contains(&o.id));
        Ok(before - observations.len())
    }
}

/// Memory store backed by a vector.
///
/// Holds the observation store it promotes from, the way a SQL adapter
/// would join the two tables.
pub struct InMemoryMemoryStore {
    memories: RwLock<Vec<LongTermMemory>>,
    observations: Arc<InMemoryObservationStore>,
    scheduled_targets: RwLock<HashMap<String, Vec<CoreTarget>>>,
}

impl InMemoryMemoryStore {
    /// Create an empty store promoting from the given observation store.
    pub fn new(observations: Arc<InMemoryObservationStore>) -> Self {
        Self {
            memories: RwLock::new(Vec::new()),
            observations,
            scheduled_targets: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a memory, replacing any existing one with the same id.
    pub async fn insert(&self, memory: LongTermMemory) {
        let mut memories = self.memories.write().await;
        if let Some(existing) = memories.iter_mut().find(|m| m.id == memory.id) {
            *existing = memory;
        } else {
            memories.push(memory);
        }
    }

    /// Number of stored memories.
    pub async fn count(&self) -> usize {
        self.memories.read().await.len()
    }

    /// Core targets a memory was scheduled into, if any.
    pub async fn scheduled_targets(&self, memory_id: &str) -> Option<Vec<CoreTarget>> {
        self.scheduled_targets.read().await.get(memory_id).cloned()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn get_all(&self) -> StrataResult<Vec<LongTermMemory>> {
        Ok(self.memories.read().await.clone())
    }

    async fn get_by_id(&self, id: &str) -> StrataResult<Option<LongTermMemory>> {
        Ok(self
            .memories
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn query(&self, filter: &MemoryQueryFilter) -> StrataResult<Vec<LongTermMemory>> {
        let now = Utc::now();
        Ok(self
            .memories
            .read()
            .await
            .iter()
            .filter(|m| filter.matches(m, now))
            .cloned()
            .collect())
    }

    async fn get_promotable_to_core(&self) -> StrataResult<Vec<LongTermMemory>> {
        Ok(self
            .memories
            .read()
            .await
            .iter()
            .filter(|m| m.status == MemoryStatus::Approved)
            .cloned()
            .collect())
    }

    async fn promote_to_long_term(&self, observation_id: &str) -> StrataResult<PromoteOutcome> {
        {
            let memories = self.memories.read().await;
            if memories.iter().any(|m| m.observation.id == observation_id) {
                return Ok(PromoteOutcome::declined("observation already promoted"));
            }
        }

        let observation = match self.observations.get_by_id(observation_id).await? {
            Some(observation) => observation,
            None => return Ok(PromoteOutcome::declined("observation not found")),
        };

        let memory = LongTermMemory::new(observation);
        let memory_id = memory.id.clone();
        self.memories.write().await.push(memory);
        Ok(PromoteOutcome::ok(memory_id))
    }

    async fn promote_to_core(
        &self,
        memory_id: &str,
        targets: &[CoreTarget],
    ) -> StrataResult<PromoteOutcome> {
        if targets.is_empty() {
            return Ok(PromoteOutcome::declined("no promotion targets configured"));
        }

        let mut memories = self.memories.write().await;
        let memory = match memories.iter_mut().find(|m| m.id == memory_id) {
            Some(memory) => memory,
            None => return Ok(PromoteOutcome::declined("memory not found")),
        };

        if memory.status != MemoryStatus::Approved {
            return Ok(PromoteOutcome::declined("memory is not approved"));
        }

        memory.status = MemoryStatus::ScheduledForCore;
        self.scheduled_targets
            .write()
            .await
            .insert(memory_id.to_string(), targets.to_vec());
        Ok(PromoteOutcome::ok(memory_id))
    }

    async fn days_since_long_term_promotion(
        &self,
        memory_id: &str,
    ) -> StrataResult<Option<f32>> {
        let now = Utc::now();
        Ok(self
            .memories
            .read()
            .await
            .iter()
            .find(|m| m.id == memory_id)
            .map(|m| m.days_since_promotion(now)))
    }

    async fn set_status(&self, id: &str, status: MemoryStatus) -> StrataResult<bool> {
        let mut memories = self.memories.write().await;
        match memories.iter_mut().find(|m| m.id == id) {
            Some(memory) => {
                memory.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> StrataResult<bool> {
        let mut memories = self.memories.write().await;
        let before = memories.len();
        memories.retain(|m| m.id != id);
        Ok(memories.len() < before)
    }

    async fn delete_many(&self, ids: &[String]) -> StrataResult<usize> {
        let mut memories = self.memories.write().await;
        let before = memories.len();
        memories.retain(|m| !ids.contains(&m.id));
        Ok(before - memories.len())
    }
}
