//! Checklists and their items.

pub mod checklist;
pub mod item;

pub use checklist::Checklist;
pub use item::{ChecklistItem, ConditionAction, ItemState};
