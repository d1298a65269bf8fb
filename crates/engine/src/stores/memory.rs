//! In-memory store backed by dashmap.
//!
//! Serves the engine's tests and embedders that do not need durable
//! persistence. Each map entry is replaced wholesale on update, which
//! is what gives the read-modify-write path its atomicity here.

use async_trait::async_trait;
use dashmap::DashMap;

use runbook_domain::{Condition, ConditionId, PlaybookId, Run, RunId};

use crate::ports::{ConditionStore, RunStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    runs: DashMap<RunId, Run>,
    conditions: DashMap<ConditionId, Condition>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn get(&self, id: RunId) -> Result<Option<Run>, StoreError> {
        Ok(self.runs.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, run: &Run) -> Result<(), StoreError> {
        if self.runs.contains_key(&run.id()) {
            return Err(StoreError::Storage(format!(
                "run {} already exists",
                run.id()
            )));
        }
        self.runs.insert(run.id(), run.clone());
        Ok(())
    }

    async fn update(&self, run: &Run) -> Result<(), StoreError> {
        if !self.runs.contains_key(&run.id()) {
            return Err(StoreError::NotFound);
        }
        self.runs.insert(run.id(), run.clone());
        Ok(())
    }
}

#[async_trait]
impl ConditionStore for MemoryStore {
    async fn get(&self, id: ConditionId) -> Result<Option<Condition>, StoreError> {
        Ok(self.conditions.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, condition: &Condition) -> Result<(), StoreError> {
        self.conditions.insert(condition.id(), condition.clone());
        Ok(())
    }

    async fn list_for_playbook(
        &self,
        playbook_id: PlaybookId,
    ) -> Result<Vec<Condition>, StoreError> {
        Ok(self
            .conditions
            .iter()
            .filter(|entry| entry.playbook_id() == playbook_id && entry.run_id().is_none())
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list_for_run(&self, run_id: RunId) -> Result<Vec<Condition>, StoreError> {
        Ok(self
            .conditions
            .iter()
            .filter(|entry| entry.run_id() == Some(run_id))
            .map(|entry| entry.value().clone())
            .collect())
    }
}
