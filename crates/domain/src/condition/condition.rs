//! Condition entity - a named boolean rule owned by a playbook
//!
//! Playbook conditions are editable; when a run is created they are
//! copied onto the run and frozen. A condition with a `run_id` is
//! read-only from then on, so later playbook edits never change the
//! behavior of runs already in flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{to_millis, Millis, NEVER};
use crate::condition::expr::ConditionExpr;
use crate::ids::{ConditionId, PlaybookId, RunId};

/// A boolean rule over property field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    id: ConditionId,
    playbook_id: PlaybookId,
    /// Set on the frozen copy a run receives at creation. Run
    /// conditions are system managed and immutable.
    run_id: Option<RunId>,
    /// Incremented on every edit.
    version: u32,
    condition_expr: ConditionExpr,
    create_at: Millis,
    update_at: Millis,
    delete_at: Millis,
}

impl Condition {
    pub fn new(playbook_id: PlaybookId, condition_expr: ConditionExpr, now: DateTime<Utc>) -> Self {
        let now = to_millis(now);
        Self {
            id: ConditionId::new(),
            playbook_id,
            run_id: None,
            version: 1,
            condition_expr,
            create_at: now,
            update_at: now,
            delete_at: NEVER,
        }
    }

    // Read accessors

    pub fn id(&self) -> ConditionId {
        self.id
    }

    pub fn playbook_id(&self) -> PlaybookId {
        self.playbook_id
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn condition_expr(&self) -> &ConditionExpr {
        &self.condition_expr
    }

    pub fn create_at(&self) -> Millis {
        self.create_at
    }

    pub fn update_at(&self) -> Millis {
        self.update_at
    }

    pub fn delete_at(&self) -> Millis {
        self.delete_at
    }

    /// True for the frozen copies attached to a run.
    pub fn is_run_condition(&self) -> bool {
        self.run_id.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.delete_at != NEVER
    }

    // Builder methods (for loading from storage)

    pub fn with_id(mut self, id: ConditionId) -> Self {
        self.id = id;
        self
    }

    // Mutation methods

    /// Replaces the expression, bumping the edit version.
    pub fn set_expr(&mut self, condition_expr: ConditionExpr, now: DateTime<Utc>) {
        self.condition_expr = condition_expr;
        self.version += 1;
        self.update_at = to_millis(now);
    }

    /// Soft-deletes the condition.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        let now = to_millis(now);
        self.delete_at = now;
        self.update_at = now;
    }

    /// Produces the read-only copy a newly created run receives.
    ///
    /// The copy gets a fresh ID so run and playbook conditions can
    /// evolve independently in storage; the expression is carried over
    /// verbatim.
    pub fn frozen_for_run(&self, run_id: RunId, now: DateTime<Utc>) -> Self {
        let now = to_millis(now);
        Self {
            id: ConditionId::new(),
            playbook_id: self.playbook_id,
            run_id: Some(run_id),
            version: self.version,
            condition_expr: self.condition_expr.clone(),
            create_at: now,
            update_at: now,
            delete_at: NEVER,
        }
    }
}
