//! Observation store trait.

use async_trait::async_trait;

use crate::error::StrataResult;
use crate::types::{Observation, ObservationStatus};

/// Core observation store trait - all observation backends implement this.
///
/// Deletes are idempotent: removing an absent id reports `false` (or a
/// lower count for bulk deletes) instead of erroring.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Get all observations.
    async fn get_all(&self) -> StrataResult<Vec<Observation>>;

    /// Get an observation by id.
    async fn get_by_id(&self, id: &str) -> StrataResult<Option<Observation>>;

    /// Get all observations with the given status.
    async fn get_by_status(&self, status: ObservationStatus) -> StrataResult<Vec<Observation>>;

    /// Get approved observations whose count has reached `min_count`.
    async fn get_promotable(&self, min_count: u32) -> StrataResult<Vec<Observation>>;

    /// Set the status of an observation. Returns `false` if the id is absent.
    async fn set_status(&self, id: &str, status: ObservationStatus) -> StrataResult<bool>;

    /// Set the status of many observations. Returns how many were updated.
    async fn set_status_many(
        &self,
        ids: &[String],
        status: ObservationStatus,
    ) -> StrataResult<usize>;

    /// Delete an observation. Returns `false` if the id was absent.
    async fn delete(&self, id: &str) -> StrataResult<bool>;

    /// Delete many observations. Returns how many existed and were removed.
    async fn delete_many(&self, ids: &[String]) -> StrataResult<usize>;
}
