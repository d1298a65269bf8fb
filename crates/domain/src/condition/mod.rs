//! Conditions - declarative visibility rules for checklist items
//!
//! A condition is a boolean expression over a run's property values.
//! Evaluation is pure; reconciliation is where condition results meet
//! the item's interaction history.

pub mod condition;
pub mod evaluation;
pub mod expr;
pub mod properties;
pub mod reconcile;

pub use condition::Condition;
pub use evaluation::{ChecklistConditionChanges, ConditionEvaluationResult};
pub use expr::{validate_field_reference, Comparison, ConditionExpr, MAX_CONDITION_DEPTH};
pub use properties::{PropertyField, PropertyValues};
pub use reconcile::{on_user_touch, reconcile};
