//! Runbook engine - use cases and ports around the checklist domain
//!
//! The HTTP/GraphQL layer above calls one use case per endpoint; the
//! persistence layer below implements the store ports and guarantees
//! at-most-one concurrent mutation per run. Everything in between -
//! loading, domain mutation, reconciliation, persistence, logging -
//! lives here.

pub mod ports;
pub mod stores;
pub mod use_cases;

pub use ports::{ClockPort, ConditionStore, FixedClock, RunStore, StoreError, SystemClock};
pub use stores::MemoryStore;
pub use use_cases::{
    ChecklistError, ChecklistOps, ConditionError, ConditionOps, PropertyError, PropertyOps,
    RunProgress, MAX_CONDITIONS_PER_PLAYBOOK,
};
