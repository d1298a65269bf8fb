//! Visibility reconciliation - condition results against interaction history
//!
//! The only place prior-state history matters. Passive re-evaluation
//! moves an item between `None` and `Hidden`; the promotion to
//! `ShownBecauseModified` happens exclusively through a direct user
//! mutation on a currently-hidden item, and is one-way.

use crate::checklist::item::ConditionAction;

/// Applies one passive re-evaluation step.
///
/// `condition_result` is `None` when the item has no governing
/// condition (or its condition no longer resolves). Idempotent:
/// re-running with unchanged inputs never changes the outcome.
///
/// | current                | true   | false                  | no condition |
/// |------------------------|--------|------------------------|--------------|
/// | `None`                 | `None` | `Hidden`               | `None`       |
/// | `Hidden`               | `None` | `Hidden`               | `None`       |
/// | `ShownBecauseModified` | `None` | `ShownBecauseModified` | `None`       |
pub fn reconcile(current: ConditionAction, condition_result: Option<bool>) -> ConditionAction {
    match (current, condition_result) {
        (_, None) => ConditionAction::None,
        (_, Some(true)) => ConditionAction::None,
        (ConditionAction::ShownBecauseModified, Some(false)) => {
            ConditionAction::ShownBecauseModified
        }
        (_, Some(false)) => ConditionAction::Hidden,
    }
}

/// Applies the user-touch promotion: a direct mutation (add, edit,
/// state change, assignee, due date, command) on a hidden item
/// surfaces it permanently.
pub fn on_user_touch(current: ConditionAction) -> ConditionAction {
    match current {
        ConditionAction::Hidden => ConditionAction::ShownBecauseModified,
        other => other,
    }
}
