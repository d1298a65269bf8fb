//! Result of a run-level condition re-evaluation
//!
//! The fan-out over a run's items reports, per checklist, how many
//! items became visible and how many became hidden. Layers above the
//! engine use this to decide whether anything is worth announcing.

use std::collections::HashMap;

use serde::Serialize;

/// Visibility changes within a single checklist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChecklistConditionChanges {
    /// Items whose condition came true and are visible again.
    pub shown: u32,
    /// Items whose condition came false and were suppressed.
    pub hidden: u32,
}

/// Aggregated outcome of one reconciliation pass, keyed by checklist
/// title (the key the notification copy needs).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConditionEvaluationResult {
    checklist_changes: HashMap<String, ChecklistConditionChanges>,
}

impl ConditionEvaluationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_shown(&mut self, checklist_title: &str) {
        self.entry(checklist_title).shown += 1;
    }

    pub fn record_hidden(&mut self, checklist_title: &str) {
        self.entry(checklist_title).hidden += 1;
    }

    fn entry(&mut self, checklist_title: &str) -> &mut ChecklistConditionChanges {
        self.checklist_changes
            .entry(checklist_title.to_string())
            .or_default()
    }

    /// True if any item's visibility moved in either direction.
    pub fn anything_changed(&self) -> bool {
        self.checklist_changes
            .values()
            .any(|c| c.shown > 0 || c.hidden > 0)
    }

    /// True if any previously hidden item became visible.
    pub fn anything_shown(&self) -> bool {
        self.checklist_changes.values().any(|c| c.shown > 0)
    }

    pub fn changes(&self) -> &HashMap<String, ChecklistConditionChanges> {
        &self.checklist_changes
    }
}
