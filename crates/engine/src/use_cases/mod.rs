//! Use cases - transport-facing orchestration.
//!
//! Each module owns one concern; all of them follow the same shape:
//! load the aggregate through a port, apply domain operations, persist
//! on success, and surface the domain's error classification untouched
//! for the transport layer to translate.

pub mod checklists;
pub mod conditions;
pub mod properties;

pub use checklists::{ChecklistError, ChecklistOps, RunProgress};
pub use conditions::{ConditionError, ConditionOps, MAX_CONDITIONS_PER_PLAYBOOK};
pub use properties::{PropertyError, PropertyOps};
