//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Ports exist for:
//! - Run and condition persistence (SQL store in production)
//! - Clock (for testing)
//!
//! The store owns the concurrency contract from the domain: a
//! read-modify-write of a run must be atomic with respect to other
//! writers of the same run. The use cases simply load, transform, and
//! save inside that guarantee.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use runbook_domain::{Condition, ConditionId, PlaybookId, Run, RunId};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found")]
    NotFound,
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// Persistence Ports
// =============================================================================

#[async_trait]
pub trait RunStore: Send + Sync {
    async fn get(&self, id: RunId) -> Result<Option<Run>, StoreError>;
    async fn create(&self, run: &Run) -> Result<(), StoreError>;
    async fn update(&self, run: &Run) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ConditionStore: Send + Sync {
    async fn get(&self, id: ConditionId) -> Result<Option<Condition>, StoreError>;
    async fn save(&self, condition: &Condition) -> Result<(), StoreError>;
    async fn list_for_playbook(&self, playbook_id: PlaybookId)
        -> Result<Vec<Condition>, StoreError>;
    async fn list_for_run(&self, run_id: RunId) -> Result<Vec<Condition>, StoreError>;
}

// =============================================================================
// Clock Port
// =============================================================================

pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
