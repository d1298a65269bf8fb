//! Checklist tree mutation use cases.
//!
//! Each operation maps 1:1 to a transport endpoint: load the run,
//! apply one domain mutation, save. A failed domain operation leaves
//! the aggregate untouched and nothing is persisted, so the store
//! never sees a partially applied change.

use std::sync::Arc;

use serde::Serialize;

use runbook_domain::common::Millis;
use runbook_domain::{
    ChecklistId, ChecklistItem, ChecklistItemId, DomainError, ItemState, PostId, Run, RunId, UserId,
};

use crate::ports::{ClockPort, RunStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ChecklistError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Progress summary consumed by presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunProgress {
    pub num_tasks: usize,
    pub num_tasks_closed: usize,
}

pub struct ChecklistOps {
    runs: Arc<dyn RunStore>,
    clock: Arc<dyn ClockPort>,
}

impl ChecklistOps {
    pub fn new(runs: Arc<dyn RunStore>, clock: Arc<dyn ClockPort>) -> Self {
        Self { runs, clock }
    }

    // =========================================================================
    // Checklist operations
    // =========================================================================

    pub async fn add_checklist(
        &self,
        run_id: RunId,
        title: &str,
    ) -> Result<ChecklistId, ChecklistError> {
        let mut run = self.load(run_id).await?;
        let checklist_id = run.add_checklist(title, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, %checklist_id, "added checklist");
        Ok(checklist_id)
    }

    pub async fn remove_checklist(
        &self,
        run_id: RunId,
        checklist: usize,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        let removed = run.remove_checklist(checklist, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist_id = %removed.id(), "removed checklist");
        Ok(())
    }

    pub async fn skip_checklist(
        &self,
        run_id: RunId,
        checklist: usize,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.skip_checklist(checklist, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, "skipped checklist");
        Ok(())
    }

    pub async fn restore_checklist(
        &self,
        run_id: RunId,
        checklist: usize,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.restore_checklist(checklist, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, "restored checklist");
        Ok(())
    }

    pub async fn rename_checklist(
        &self,
        run_id: RunId,
        checklist: usize,
        new_title: &str,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.rename_checklist(checklist, new_title, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, "renamed checklist");
        Ok(())
    }

    pub async fn move_checklist(
        &self,
        run_id: RunId,
        source: usize,
        dest: usize,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.move_checklist(source, dest, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, source, dest, "moved checklist");
        Ok(())
    }

    pub async fn duplicate_checklist(
        &self,
        run_id: RunId,
        checklist: usize,
    ) -> Result<ChecklistId, ChecklistError> {
        let mut run = self.load(run_id).await?;
        let checklist_id = run.duplicate_checklist(checklist, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, %checklist_id, "duplicated checklist");
        Ok(checklist_id)
    }

    // =========================================================================
    // Item operations
    // =========================================================================

    pub async fn add_checklist_item(
        &self,
        run_id: RunId,
        checklist: usize,
        item: ChecklistItem,
    ) -> Result<ChecklistItemId, ChecklistError> {
        let mut run = self.load(run_id).await?;
        let item_id = run.add_checklist_item(checklist, item, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, %item_id, "added checklist item");
        Ok(item_id)
    }

    pub async fn remove_checklist_item(
        &self,
        run_id: RunId,
        checklist: usize,
        item: usize,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.remove_checklist_item(checklist, item, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, item, "removed checklist item");
        Ok(())
    }

    pub async fn skip_checklist_item(
        &self,
        run_id: RunId,
        checklist: usize,
        item: usize,
        post_id: Option<PostId>,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.skip_checklist_item(checklist, item, self.clock.now(), post_id)?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, item, "skipped checklist item");
        Ok(())
    }

    pub async fn restore_checklist_item(
        &self,
        run_id: RunId,
        checklist: usize,
        item: usize,
        post_id: Option<PostId>,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.restore_checklist_item(checklist, item, self.clock.now(), post_id)?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, item, "restored checklist item");
        Ok(())
    }

    pub async fn edit_checklist_item(
        &self,
        run_id: RunId,
        checklist: usize,
        item: usize,
        new_title: &str,
        new_command: Option<String>,
        new_description: &str,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.edit_checklist_item(
            checklist,
            item,
            new_title,
            new_command,
            new_description,
            self.clock.now(),
        )?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, item, "edited checklist item");
        Ok(())
    }

    pub async fn set_assignee(
        &self,
        run_id: RunId,
        checklist: usize,
        item: usize,
        assignee_id: Option<UserId>,
        post_id: Option<PostId>,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        let changed = run.set_assignee(checklist, item, assignee_id, self.clock.now(), post_id)?;
        if changed {
            self.runs.update(&run).await?;
            tracing::info!(%run_id, checklist, item, "changed assignee");
        }
        Ok(())
    }

    pub async fn set_due_date(
        &self,
        run_id: RunId,
        checklist: usize,
        item: usize,
        due_date: Millis,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.set_due_date(checklist, item, due_date, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, item, due_date, "set due date");
        Ok(())
    }

    pub async fn set_command_to_checklist_item(
        &self,
        run_id: RunId,
        checklist: usize,
        item: usize,
        new_command: Option<String>,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.set_command(checklist, item, new_command, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, item, "set item command");
        Ok(())
    }

    /// Records that the item's slash command was executed by the
    /// command collaborator.
    pub async fn mark_command_run(
        &self,
        run_id: RunId,
        checklist: usize,
        item: usize,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.mark_command_run(checklist, item, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, item, "marked item command run");
        Ok(())
    }

    /// Idempotent: persists nothing when the item is already in the
    /// requested state.
    pub async fn modify_checked_state(
        &self,
        run_id: RunId,
        checklist: usize,
        item: usize,
        new_state: ItemState,
        post_id: Option<PostId>,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        let changed =
            run.modify_checked_state(checklist, item, new_state, self.clock.now(), post_id)?;
        if changed {
            self.runs.update(&run).await?;
            tracing::info!(%run_id, checklist, item, ?new_state, "modified item state");
        }
        Ok(())
    }

    pub async fn move_checklist_item(
        &self,
        run_id: RunId,
        source_checklist: usize,
        source_item: usize,
        dest_checklist: usize,
        dest_item: usize,
    ) -> Result<(), ChecklistError> {
        let mut run = self.load(run_id).await?;
        run.move_checklist_item(
            source_checklist,
            source_item,
            dest_checklist,
            dest_item,
            self.clock.now(),
        )?;
        self.runs.update(&run).await?;
        tracing::info!(
            %run_id,
            source_checklist,
            source_item,
            dest_checklist,
            dest_item,
            "moved checklist item"
        );
        Ok(())
    }

    pub async fn duplicate_checklist_item(
        &self,
        run_id: RunId,
        checklist: usize,
        item: usize,
    ) -> Result<ChecklistItemId, ChecklistError> {
        let mut run = self.load(run_id).await?;
        let item_id = run.duplicate_checklist_item(checklist, item, self.clock.now())?;
        self.runs.update(&run).await?;
        tracing::info!(%run_id, checklist, item, %item_id, "duplicated checklist item");
        Ok(item_id)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_run(&self, run_id: RunId) -> Result<Run, ChecklistError> {
        self.load(run_id).await
    }

    pub async fn progress(&self, run_id: RunId) -> Result<RunProgress, ChecklistError> {
        let run = self.load(run_id).await?;
        Ok(RunProgress {
            num_tasks: run.num_tasks(),
            num_tasks_closed: run.num_tasks_closed(),
        })
    }

    async fn load(&self, run_id: RunId) -> Result<Run, ChecklistError> {
        self.runs
            .get(run_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Run", run_id.to_string()).into())
    }
}
