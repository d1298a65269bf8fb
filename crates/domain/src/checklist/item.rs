//! ChecklistItem entity - one task in a checklist
//!
//! An item carries two independent dimensions of state: its completion
//! `State` (what the user has done with the task) and its
//! `ConditionAction` visibility overlay (what its governing condition
//! says about showing it). The two never collapse into each other: a
//! hidden item keeps its completion history, and completing an item
//! does not change what its condition evaluates to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{to_millis, Millis, NEVER};
use crate::ids::{ChecklistItemId, ConditionId, PostId, UserId};

/// Completion state of a checklist item.
///
/// Every state is reachable from every other via an explicit
/// operation; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    #[default]
    Open,
    Closed,
    Skipped,
}

impl ItemState {
    /// Closed and Skipped both count as done for progress totals.
    pub fn is_done(self) -> bool {
        matches!(self, ItemState::Closed | ItemState::Skipped)
    }
}

/// The visibility overlay derived from condition evaluation and
/// interaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionAction {
    /// No governing condition, or the condition is satisfied.
    #[default]
    None,
    /// Condition currently false; suppressed from default views and
    /// progress counts.
    Hidden,
    /// Condition is/was false but the user already interacted with the
    /// item. One-way: passive re-evaluation never reverts this.
    ShownBecauseModified,
}

impl ConditionAction {
    pub fn is_hidden(self) -> bool {
        matches!(self, ConditionAction::Hidden)
    }
}

/// An item in a checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    id: ChecklistItemId,
    title: String,
    description: String,

    state: ItemState,
    state_modified: Millis,
    state_modified_post_id: Option<PostId>,

    assignee_id: Option<UserId>,
    assignee_modified: Millis,
    assignee_modified_post_id: Option<PostId>,

    command: Option<String>,
    command_last_run: Millis,

    /// Absolute epoch millis; resolved from any playbook-relative
    /// offset before the item reaches this engine. 0 = no due date.
    due_date: Millis,

    condition_id: Option<ConditionId>,
    condition_action: ConditionAction,

    delete_at: Millis,
}

impl ChecklistItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ChecklistItemId::new(),
            title: title.into(),
            description: String::new(),
            state: ItemState::Open,
            state_modified: NEVER,
            state_modified_post_id: None,
            assignee_id: None,
            assignee_modified: NEVER,
            assignee_modified_post_id: None,
            command: None,
            command_last_run: NEVER,
            due_date: NEVER,
            condition_id: None,
            condition_action: ConditionAction::None,
            delete_at: NEVER,
        }
    }

    // Read accessors

    pub fn id(&self) -> ChecklistItemId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn state_modified(&self) -> Millis {
        self.state_modified
    }

    pub fn state_modified_post_id(&self) -> Option<PostId> {
        self.state_modified_post_id
    }

    pub fn assignee_id(&self) -> Option<UserId> {
        self.assignee_id
    }

    pub fn assignee_modified(&self) -> Millis {
        self.assignee_modified
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn command_last_run(&self) -> Millis {
        self.command_last_run
    }

    pub fn due_date(&self) -> Millis {
        self.due_date
    }

    pub fn condition_id(&self) -> Option<ConditionId> {
        self.condition_id
    }

    pub fn condition_action(&self) -> ConditionAction {
        self.condition_action
    }

    pub fn delete_at(&self) -> Millis {
        self.delete_at
    }

    pub fn is_deleted(&self) -> bool {
        self.delete_at != NEVER
    }

    /// Counted in progress totals: not soft-deleted and not hidden.
    pub fn is_counted(&self) -> bool {
        !self.is_deleted() && !self.condition_action.is_hidden()
    }

    // Builder methods (for construction)

    pub fn with_id(mut self, id: ChecklistItemId) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_assignee(mut self, assignee_id: UserId) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }

    pub fn with_due_date(mut self, due_date: Millis) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_condition(mut self, condition_id: ConditionId) -> Self {
        self.condition_id = Some(condition_id);
        self
    }

    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }

    pub fn with_condition_action(mut self, action: ConditionAction) -> Self {
        self.condition_action = action;
        self
    }

    // Mutation methods

    /// Transitions the completion state, stamping the audit fields.
    ///
    /// Idempotent: returns false and leaves timestamps alone when the
    /// item is already in the requested state.
    pub fn set_state(
        &mut self,
        state: ItemState,
        now: DateTime<Utc>,
        post_id: Option<PostId>,
    ) -> bool {
        if self.state == state {
            return false;
        }
        self.state = state;
        self.state_modified = to_millis(now);
        self.state_modified_post_id = post_id;
        true
    }

    /// Changes the assignee, stamping the audit fields.
    ///
    /// Idempotent: returns false when the assignee is unchanged.
    pub fn set_assignee(
        &mut self,
        assignee_id: Option<UserId>,
        now: DateTime<Utc>,
        post_id: Option<PostId>,
    ) -> bool {
        if self.assignee_id == assignee_id {
            return false;
        }
        self.assignee_id = assignee_id;
        self.assignee_modified = to_millis(now);
        self.assignee_modified_post_id = post_id;
        true
    }

    /// Replaces title, command, and description. Completion state,
    /// assignee, and due date are untouched.
    pub fn edit(
        &mut self,
        title: impl Into<String>,
        command: Option<String>,
        description: impl Into<String>,
    ) {
        self.title = title.into();
        self.command = command;
        self.description = description.into();
    }

    pub fn set_command(&mut self, command: Option<String>) {
        self.command = command;
    }

    /// Records that the attached command was executed.
    pub fn mark_command_run(&mut self, now: DateTime<Utc>) {
        self.command_last_run = to_millis(now);
    }

    pub fn set_due_date(&mut self, due_date: Millis) {
        self.due_date = due_date;
    }

    pub fn set_condition_action(&mut self, action: ConditionAction) {
        self.condition_action = action;
    }

    /// Soft-deletes the item; it stays in its checklist for audit but
    /// disappears from positional addressing and progress counts.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.delete_at = to_millis(now);
    }

    /// Deep copy with a fresh ID and completion-derived fields reset.
    pub fn duplicate(&self) -> Self {
        Self {
            id: ChecklistItemId::new(),
            title: self.title.clone(),
            description: self.description.clone(),
            state: ItemState::Open,
            state_modified: NEVER,
            state_modified_post_id: None,
            assignee_id: None,
            assignee_modified: NEVER,
            assignee_modified_post_id: None,
            command: self.command.clone(),
            command_last_run: NEVER,
            due_date: self.due_date,
            condition_id: self.condition_id,
            condition_action: self.condition_action,
            delete_at: NEVER,
        }
    }
}
