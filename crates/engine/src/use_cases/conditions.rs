//! Condition lifecycle use cases.
//!
//! Playbook conditions are the editable source of truth; the copies a
//! run receives at creation are frozen and never accept writes. The
//! re-evaluation fan-out lives here too: it is invoked whenever a
//! property value changes and reconciles every affected item.

use std::sync::Arc;

use runbook_domain::{
    Condition, ConditionEvaluationResult, ConditionExpr, ConditionId, DomainError, PlaybookId,
    PropertyFieldId, Run, RunId,
};

use crate::ports::{ClockPort, ConditionStore, RunStore, StoreError};

/// Editable conditions allowed per playbook.
pub const MAX_CONDITIONS_PER_PLAYBOOK: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConditionError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ConditionOps {
    conditions: Arc<dyn ConditionStore>,
    runs: Arc<dyn RunStore>,
    clock: Arc<dyn ClockPort>,
}

impl ConditionOps {
    pub fn new(
        conditions: Arc<dyn ConditionStore>,
        runs: Arc<dyn RunStore>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            conditions,
            runs,
            clock,
        }
    }

    /// Creates a playbook condition after validating and sanitizing
    /// the expression.
    pub async fn create(
        &self,
        playbook_id: PlaybookId,
        mut condition_expr: ConditionExpr,
    ) -> Result<Condition, ConditionError> {
        condition_expr.validate()?;
        condition_expr.sanitize();

        let existing = self.conditions.list_for_playbook(playbook_id).await?;
        let active = existing.iter().filter(|c| !c.is_deleted()).count();
        if active >= MAX_CONDITIONS_PER_PLAYBOOK {
            return Err(DomainError::invalid_state(format!(
                "playbook already has the maximum of {} conditions",
                MAX_CONDITIONS_PER_PLAYBOOK
            ))
            .into());
        }

        let condition = Condition::new(playbook_id, condition_expr, self.clock.now());
        self.conditions.save(&condition).await?;
        tracing::info!(%playbook_id, condition_id = %condition.id(), "created condition");
        Ok(condition)
    }

    pub async fn get(&self, condition_id: ConditionId) -> Result<Condition, ConditionError> {
        self.load(condition_id).await
    }

    /// Replaces a playbook condition's expression, bumping its edit
    /// version. Run conditions are read-only.
    pub async fn update(
        &self,
        condition_id: ConditionId,
        mut condition_expr: ConditionExpr,
    ) -> Result<Condition, ConditionError> {
        let mut condition = self.load(condition_id).await?;
        self.writable_guard(&condition)?;

        condition_expr.validate()?;
        condition_expr.sanitize();
        condition.set_expr(condition_expr, self.clock.now());
        self.conditions.save(&condition).await?;
        tracing::info!(%condition_id, version = condition.version(), "updated condition");
        Ok(condition)
    }

    /// Soft-deletes a playbook condition. Run conditions are read-only.
    pub async fn delete(&self, condition_id: ConditionId) -> Result<(), ConditionError> {
        let mut condition = self.load(condition_id).await?;
        self.writable_guard(&condition)?;

        condition.mark_deleted(self.clock.now());
        self.conditions.save(&condition).await?;
        tracing::info!(%condition_id, "deleted condition");
        Ok(())
    }

    /// Live (non-deleted) playbook conditions.
    pub async fn list_for_playbook(
        &self,
        playbook_id: PlaybookId,
    ) -> Result<Vec<Condition>, ConditionError> {
        let conditions = self.conditions.list_for_playbook(playbook_id).await?;
        Ok(conditions.into_iter().filter(|c| !c.is_deleted()).collect())
    }

    /// The frozen condition set of a run (read-only to everyone).
    pub async fn list_for_run(&self, run_id: RunId) -> Result<Vec<Condition>, ConditionError> {
        let conditions = self.conditions.list_for_run(run_id).await?;
        Ok(conditions.into_iter().filter(|c| !c.is_deleted()).collect())
    }

    /// Freezes a playbook's live conditions onto a new run. Called by
    /// the (external) run-creation path; the returned set is what the
    /// run aggregate embeds as its snapshot.
    pub async fn copy_playbook_conditions_to_run(
        &self,
        playbook_id: PlaybookId,
        run_id: RunId,
    ) -> Result<Vec<Condition>, ConditionError> {
        let now = self.clock.now();
        let frozen: Vec<Condition> = self
            .conditions
            .list_for_playbook(playbook_id)
            .await?
            .iter()
            .filter(|c| !c.is_deleted())
            .map(|c| c.frozen_for_run(run_id, now))
            .collect();

        for condition in &frozen {
            self.conditions.save(condition).await?;
        }
        tracing::info!(%playbook_id, %run_id, count = frozen.len(), "froze conditions onto run");
        Ok(frozen)
    }

    /// Re-evaluates conditions for every item of the run whose
    /// condition references one of `changed_fields` (all
    /// condition-bearing items when empty), persisting the run only
    /// when something actually moved.
    pub async fn evaluate_conditions_for_run(
        &self,
        run_id: RunId,
        changed_fields: &[PropertyFieldId],
    ) -> Result<ConditionEvaluationResult, ConditionError> {
        let mut run = self.load_run(run_id).await?;
        let result = run.evaluate_conditions(changed_fields, self.clock.now());
        if result.anything_changed() {
            self.runs.update(&run).await?;
        }
        tracing::debug!(
            %run_id,
            changed = result.anything_changed(),
            shown = result.anything_shown(),
            "evaluated run conditions"
        );
        Ok(result)
    }

    fn writable_guard(&self, condition: &Condition) -> Result<(), ConditionError> {
        if condition.is_run_condition() {
            return Err(DomainError::invalid_state(
                "conditions associated with a run are read-only",
            )
            .into());
        }
        Ok(())
    }

    async fn load(&self, condition_id: ConditionId) -> Result<Condition, ConditionError> {
        let condition = self
            .conditions
            .get(condition_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Condition", condition_id.to_string()))?;
        if condition.is_deleted() {
            return Err(DomainError::not_found("Condition", condition_id.to_string()).into());
        }
        Ok(condition)
    }

    async fn load_run(&self, run_id: RunId) -> Result<Run, ConditionError> {
        self.runs
            .get(run_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Run", run_id.to_string()).into())
    }
}
