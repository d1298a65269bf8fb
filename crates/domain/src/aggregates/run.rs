//! Run aggregate - a live instance of a playbook's checklist structure
//!
//! # Rustic DDD Design
//!
//! - **Private fields**: all state is encapsulated; mutations go
//!   through the operations below
//! - **No partial mutation**: every operation validates positions and
//!   payloads against the current state before touching anything, so a
//!   failed operation leaves the aggregate exactly as it was
//! - **No I/O, no clock**: time is always passed in; persistence and
//!   concurrency control (at-most-one writer per run) live at the
//!   boundary
//!
//! Positional indices address live (non-soft-deleted) entries and are
//! only meaningful against the aggregate version they were read from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checklist::checklist::Checklist;
use crate::checklist::item::{ChecklistItem, ItemState};
use crate::common::{is_blank, to_millis, Millis};
use crate::condition::condition::Condition;
use crate::condition::evaluation::ConditionEvaluationResult;
use crate::condition::properties::PropertyValues;
use crate::condition::reconcile;
use crate::error::DomainError;
use crate::ids::{
    ChecklistId, ChecklistItemId, ConditionId, PlaybookId, PostId, PropertyFieldId, RunId, UserId,
};

/// Aggregate root for the checklist engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    id: RunId,
    playbook_id: PlaybookId,
    name: String,
    checklists: Vec<Checklist>,
    property_values: PropertyValues,
    /// Frozen copies of the playbook's conditions, taken at run
    /// creation. Playbook edits never reach in-flight runs.
    conditions: Vec<Condition>,
    create_at: Millis,
    update_at: Millis,
}

impl Run {
    pub fn new(playbook_id: PlaybookId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        let now = to_millis(now);
        Self {
            id: RunId::new(),
            playbook_id,
            name: name.into(),
            checklists: Vec::new(),
            property_values: PropertyValues::new(),
            conditions: Vec::new(),
            create_at: now,
            update_at: now,
        }
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn playbook_id(&self) -> PlaybookId {
        self.playbook_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn checklists(&self) -> &[Checklist] {
        &self.checklists
    }

    pub fn property_values(&self) -> &PropertyValues {
        &self.property_values
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn create_at(&self) -> Millis {
        self.create_at
    }

    pub fn update_at(&self) -> Millis {
        self.update_at
    }

    pub fn checklist(&self, index: usize) -> Result<&Checklist, DomainError> {
        self.checklists
            .get(index)
            .ok_or_else(|| DomainError::index_out_of_range("checklist", index, self.checklists.len()))
    }

    /// Looks up a frozen condition by ID, ignoring soft-deleted ones.
    pub fn condition(&self, id: ConditionId) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.id() == id && !c.is_deleted())
    }

    // =========================================================================
    // Builder methods (for run creation / loading from storage)
    // =========================================================================

    pub fn with_id(mut self, id: RunId) -> Self {
        self.id = id;
        self
    }

    pub fn with_checklists(mut self, checklists: Vec<Checklist>) -> Self {
        self.checklists = checklists;
        self
    }

    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_property_values(mut self, property_values: PropertyValues) -> Self {
        self.property_values = property_values;
        self
    }

    // =========================================================================
    // Checklist operations
    // =========================================================================

    /// Appends a new checklist. Rejects blank titles.
    pub fn add_checklist(
        &mut self,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<ChecklistId, DomainError> {
        if is_blank(title) {
            return Err(DomainError::invalid_argument("checklist title cannot be empty"));
        }
        let mut checklist = Checklist::new(title.trim());
        checklist.touch(now);
        let id = checklist.id();
        self.checklists.push(checklist);
        self.update_at = to_millis(now);
        Ok(id)
    }

    /// Physically removes the checklist at `index` and returns it.
    pub fn remove_checklist(
        &mut self,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<Checklist, DomainError> {
        self.checklist(index)?;
        self.update_at = to_millis(now);
        Ok(self.checklists.remove(index))
    }

    /// Marks the checklist skipped; its children are untouched.
    pub fn skip_checklist(&mut self, index: usize, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.checklist(index)?.is_skipped() {
            return Err(DomainError::invalid_state("checklist is already skipped"));
        }
        self.checklists[index].skip(now);
        self.update_at = to_millis(now);
        Ok(())
    }

    /// Clears the skip flag.
    pub fn restore_checklist(
        &mut self,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.checklist(index)?.is_skipped() {
            return Err(DomainError::invalid_state("checklist is not skipped"));
        }
        self.checklists[index].restore(now);
        self.update_at = to_millis(now);
        Ok(())
    }

    /// Renames the checklist. Rejects blank titles.
    pub fn rename_checklist(
        &mut self,
        index: usize,
        new_title: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if is_blank(new_title) {
            return Err(DomainError::invalid_argument("checklist title cannot be empty"));
        }
        self.checklist(index)?;
        self.checklists[index].rename(new_title.trim(), now);
        self.update_at = to_millis(now);
        Ok(())
    }

    /// Moves the checklist at `source` to `dest`. `dest == len` means
    /// move to the end; a no-op move (`source == dest`) is legal.
    pub fn move_checklist(
        &mut self,
        source: usize,
        dest: usize,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let len = self.checklists.len();
        self.checklist(source)?;
        if dest > len {
            return Err(DomainError::index_out_of_range("destination checklist", dest, len));
        }
        if source == dest {
            return Ok(());
        }

        let moved = self.checklists.remove(source);
        // dest addresses the pre-removal sequence; after removal the
        // slot for "end" is len - 1
        let insert_at = dest.min(self.checklists.len());
        self.checklists.insert(insert_at, moved);
        self.update_at = to_millis(now);
        Ok(())
    }

    /// Deep-copies the checklist at `index`, inserting the copy
    /// immediately after it.
    pub fn duplicate_checklist(
        &mut self,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<ChecklistId, DomainError> {
        let mut copy = self.checklist(index)?.duplicate();
        copy.touch(now);
        let id = copy.id();
        self.checklists.insert(index + 1, copy);
        self.update_at = to_millis(now);
        Ok(id)
    }

    // =========================================================================
    // Item operations
    // =========================================================================

    /// Appends an item to the checklist at `checklist_index`.
    ///
    /// Rejects blank titles and skipped parents. The item's governing
    /// condition is evaluated immediately; since adding is a direct
    /// user mutation, a false condition surfaces the item as
    /// `ShownBecauseModified` rather than hiding it.
    pub fn add_checklist_item(
        &mut self,
        checklist_index: usize,
        item: ChecklistItem,
        now: DateTime<Utc>,
    ) -> Result<ChecklistItemId, DomainError> {
        if is_blank(item.title()) {
            return Err(DomainError::invalid_argument("item title cannot be empty"));
        }
        self.mutable_checklist_guard(checklist_index)?;

        let id = item.id();
        self.checklists[checklist_index].push_item(item, now);
        let position = self.checklists[checklist_index].live_len() - 1;
        self.apply_item_visibility(checklist_index, position, true)?;
        self.update_at = to_millis(now);
        Ok(id)
    }

    /// Soft-deletes the item; audit history survives, positions close
    /// up over it.
    pub fn remove_checklist_item(
        &mut self,
        checklist_index: usize,
        item_position: usize,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.mutable_checklist_guard(checklist_index)?;
        self.checklists[checklist_index]
            .item_mut(item_position)?
            .mark_deleted(now);
        self.checklists[checklist_index].touch(now);
        self.update_at = to_millis(now);
        Ok(())
    }

    pub fn skip_checklist_item(
        &mut self,
        checklist_index: usize,
        item_position: usize,
        now: DateTime<Utc>,
        post_id: Option<PostId>,
    ) -> Result<(), DomainError> {
        self.modify_checked_state(checklist_index, item_position, ItemState::Skipped, now, post_id)
            .map(|_| ())
    }

    pub fn restore_checklist_item(
        &mut self,
        checklist_index: usize,
        item_position: usize,
        now: DateTime<Utc>,
        post_id: Option<PostId>,
    ) -> Result<(), DomainError> {
        self.modify_checked_state(checklist_index, item_position, ItemState::Open, now, post_id)
            .map(|_| ())
    }

    /// Changes title, command, and description; completion state,
    /// assignee, and due date are untouched. Rejects blank titles.
    pub fn edit_checklist_item(
        &mut self,
        checklist_index: usize,
        item_position: usize,
        new_title: &str,
        new_command: Option<String>,
        new_description: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if is_blank(new_title) {
            return Err(DomainError::invalid_argument("item title cannot be empty"));
        }
        self.mutable_checklist_guard(checklist_index)?;
        self.checklists[checklist_index]
            .item_mut(item_position)?
            .edit(new_title.trim(), new_command, new_description);
        self.apply_item_visibility(checklist_index, item_position, true)?;
        self.checklists[checklist_index].touch(now);
        self.update_at = to_millis(now);
        Ok(())
    }

    /// Sets or clears the assignee. Idempotent; returns whether the
    /// assignee actually changed.
    pub fn set_assignee(
        &mut self,
        checklist_index: usize,
        item_position: usize,
        assignee_id: Option<UserId>,
        now: DateTime<Utc>,
        post_id: Option<PostId>,
    ) -> Result<bool, DomainError> {
        self.mutable_checklist_guard(checklist_index)?;
        let changed = self.checklists[checklist_index]
            .item_mut(item_position)?
            .set_assignee(assignee_id, now, post_id);
        self.apply_item_visibility(checklist_index, item_position, true)?;
        if changed {
            self.checklists[checklist_index].touch(now);
            self.update_at = to_millis(now);
        }
        Ok(changed)
    }

    /// Sets the absolute due date (epoch millis; 0 clears it).
    pub fn set_due_date(
        &mut self,
        checklist_index: usize,
        item_position: usize,
        due_date: Millis,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.mutable_checklist_guard(checklist_index)?;
        self.checklists[checklist_index]
            .item_mut(item_position)?
            .set_due_date(due_date);
        self.apply_item_visibility(checklist_index, item_position, true)?;
        self.checklists[checklist_index].touch(now);
        self.update_at = to_millis(now);
        Ok(())
    }

    /// Attaches, replaces, or clears the item's slash command.
    pub fn set_command(
        &mut self,
        checklist_index: usize,
        item_position: usize,
        command: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.mutable_checklist_guard(checklist_index)?;
        self.checklists[checklist_index]
            .item_mut(item_position)?
            .set_command(command);
        self.apply_item_visibility(checklist_index, item_position, true)?;
        self.checklists[checklist_index].touch(now);
        self.update_at = to_millis(now);
        Ok(())
    }

    /// Records that the item's command was executed. The execution
    /// itself is the command collaborator's job.
    pub fn mark_command_run(
        &mut self,
        checklist_index: usize,
        item_position: usize,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.mutable_checklist_guard(checklist_index)?;
        self.checklists[checklist_index]
            .item_mut(item_position)?
            .mark_command_run(now);
        self.update_at = to_millis(now);
        Ok(())
    }

    /// Transitions the item's completion state. Idempotent; returns
    /// whether the state actually changed.
    pub fn modify_checked_state(
        &mut self,
        checklist_index: usize,
        item_position: usize,
        new_state: ItemState,
        now: DateTime<Utc>,
        post_id: Option<PostId>,
    ) -> Result<bool, DomainError> {
        self.mutable_checklist_guard(checklist_index)?;
        let changed = self.checklists[checklist_index]
            .item_mut(item_position)?
            .set_state(new_state, now, post_id);
        self.apply_item_visibility(checklist_index, item_position, true)?;
        if changed {
            self.checklists[checklist_index].touch(now);
            self.update_at = to_millis(now);
        }
        Ok(changed)
    }

    /// Moves an item between positions, possibly across checklists.
    ///
    /// Within one checklist the destination addresses the sequence
    /// after removal (so `dest` must be `< len`); across checklists
    /// `dest` may equal the destination length to append. A no-op move
    /// leaves the tree identical.
    pub fn move_checklist_item(
        &mut self,
        source_checklist: usize,
        source_item: usize,
        dest_checklist: usize,
        dest_item: usize,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.mutable_checklist_guard(source_checklist)?;
        self.mutable_checklist_guard(dest_checklist)?;
        self.checklist(source_checklist)?.item(source_item)?;

        let dest_len = self.checklists[dest_checklist].live_len();
        let max_dest = if source_checklist == dest_checklist {
            // the removal frees one slot first
            dest_len.saturating_sub(1)
        } else {
            dest_len
        };
        if dest_item > max_dest {
            return Err(DomainError::index_out_of_range("destination item", dest_item, dest_len));
        }

        if source_checklist == dest_checklist && source_item == dest_item {
            return Ok(());
        }

        let moved = self.checklists[source_checklist].extract_item(source_item, now)?;
        // validated above; insertion cannot fail
        self.checklists[dest_checklist].insert_item(dest_item, moved, now)?;
        self.update_at = to_millis(now);
        Ok(())
    }

    /// Deep-copies the item, inserting the copy immediately after the
    /// source with completion-derived fields reset.
    pub fn duplicate_checklist_item(
        &mut self,
        checklist_index: usize,
        item_position: usize,
        now: DateTime<Utc>,
    ) -> Result<ChecklistItemId, DomainError> {
        self.mutable_checklist_guard(checklist_index)?;
        let copy = self.checklist(checklist_index)?.item(item_position)?.duplicate();
        let id = copy.id();
        self.checklists[checklist_index].insert_after(item_position, copy, now);
        self.update_at = to_millis(now);
        Ok(id)
    }

    // =========================================================================
    // Property values & condition reconciliation
    // =========================================================================

    /// Writes a property value. Returns true if the stored value
    /// changed; the caller is expected to follow up with
    /// [`Run::evaluate_conditions`] for the field.
    pub fn set_property_value(
        &mut self,
        field_id: PropertyFieldId,
        value: Value,
        now: DateTime<Utc>,
    ) -> bool {
        let changed = self.property_values.set(field_id, value);
        if changed {
            self.update_at = to_millis(now);
        }
        changed
    }

    /// Passive re-evaluation over every live item whose condition
    /// references one of `changed_fields` (all condition-bearing items
    /// when the slice is empty).
    ///
    /// Only ever moves items between `None` and `Hidden`; the
    /// `ShownBecauseModified` override is untouchable here. Idempotent:
    /// a second pass with the same inputs reports no changes.
    pub fn evaluate_conditions(
        &mut self,
        changed_fields: &[PropertyFieldId],
        now: DateTime<Utc>,
    ) -> ConditionEvaluationResult {
        let mut result = ConditionEvaluationResult::new();

        let conditions = &self.conditions;
        let values = &self.property_values;
        for checklist in &mut self.checklists {
            let title = checklist.title().to_string();
            for item in checklist.live_items_mut() {
                let Some(condition_id) = item.condition_id() else {
                    continue;
                };
                let condition = conditions
                    .iter()
                    .find(|c| c.id() == condition_id && !c.is_deleted());
                if let Some(condition) = condition {
                    if !condition.condition_expr().references_any(changed_fields) {
                        continue;
                    }
                }

                // a dangling condition reference reconciles as "no
                // condition attached"
                let outcome = condition.map(|c| c.condition_expr().evaluate(values));
                let current = item.condition_action();
                let next = reconcile::reconcile(current, outcome);
                if next == current {
                    continue;
                }
                item.set_condition_action(next);
                if current.is_hidden() {
                    result.record_shown(&title);
                } else if next.is_hidden() {
                    result.record_hidden(&title);
                }
            }
        }

        if result.anything_changed() {
            self.update_at = to_millis(now);
        }
        result
    }

    // =========================================================================
    // Progress queries
    // =========================================================================

    /// Total tasks across all checklists, excluding hidden and
    /// soft-deleted items.
    pub fn num_tasks(&self) -> usize {
        self.checklists
            .iter()
            .flat_map(|c| c.live_items())
            .filter(|i| i.is_counted())
            .count()
    }

    /// Closed-or-skipped tasks, under the same exclusions.
    pub fn num_tasks_closed(&self) -> usize {
        self.checklists
            .iter()
            .flat_map(|c| c.live_items())
            .filter(|i| i.is_counted() && i.state().is_done())
            .count()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Index must be in range and the checklist must not be skipped;
    /// mutating children of a skipped checklist is rejected.
    fn mutable_checklist_guard(&self, index: usize) -> Result<(), DomainError> {
        if self.checklist(index)?.is_skipped() {
            return Err(DomainError::invalid_state(
                "checklist is skipped; restore it before modifying its items",
            ));
        }
        Ok(())
    }

    /// Re-derives one item's visibility after a mutation. `touched`
    /// marks direct user mutations, which surface hidden items
    /// permanently.
    fn apply_item_visibility(
        &mut self,
        checklist_index: usize,
        item_position: usize,
        touched: bool,
    ) -> Result<(), DomainError> {
        let item = self.checklist(checklist_index)?.item(item_position)?;
        let outcome = item
            .condition_id()
            .and_then(|id| self.condition(id))
            .map(|c| c.condition_expr().evaluate(&self.property_values));

        let mut next = reconcile::reconcile(item.condition_action(), outcome);
        if touched {
            next = reconcile::on_user_touch(next);
        }
        self.checklists[checklist_index]
            .item_mut(item_position)?
            .set_condition_action(next);
        Ok(())
    }
}
