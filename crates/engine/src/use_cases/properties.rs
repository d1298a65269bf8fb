//! Property value use cases.
//!
//! Writing a property value is what makes conditions move: every write
//! that actually changes the stored value triggers the reconciliation
//! fan-out for that field, within the same load-modify-save so the
//! value and the resulting visibility land atomically.

use std::sync::Arc;

use serde_json::Value;

use runbook_domain::{ConditionEvaluationResult, DomainError, PropertyFieldId, RunId};

use crate::ports::{ClockPort, RunStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct PropertyOps {
    runs: Arc<dyn RunStore>,
    clock: Arc<dyn ClockPort>,
}

impl PropertyOps {
    pub fn new(runs: Arc<dyn RunStore>, clock: Arc<dyn ClockPort>) -> Self {
        Self { runs, clock }
    }

    /// Writes one property value on a run. When the stored value
    /// changes, affected items are reconciled before the run is saved;
    /// an unchanged write persists nothing.
    pub async fn set_run_property_value(
        &self,
        run_id: RunId,
        field_id: PropertyFieldId,
        value: Value,
    ) -> Result<ConditionEvaluationResult, PropertyError> {
        let mut run = self
            .runs
            .get(run_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Run", run_id.to_string()))?;

        let now = self.clock.now();
        if !run.set_property_value(field_id, value, now) {
            return Ok(ConditionEvaluationResult::new());
        }

        let result = run.evaluate_conditions(&[field_id], now);
        self.runs.update(&run).await?;
        tracing::info!(
            %run_id,
            %field_id,
            visibility_changed = result.anything_changed(),
            "property value changed"
        );
        Ok(result)
    }
}
