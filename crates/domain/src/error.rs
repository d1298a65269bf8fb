//! Unified error types for the domain layer
//!
//! Every engine operation classifies its failure with one of these
//! variants so the transport layer can choose an HTTP status or GraphQL
//! error code without inspecting message text.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Blank or malformed input; the caller can re-prompt and retry
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Positional index outside the current live length; the caller
    /// should reload the run and retry with fresh positions
    #[error("Index out of range: {kind} index {index} (length {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    /// Operation not legal in the current soft-delete/lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Referenced entity absent
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
}

impl DomainError {
    /// Creates an invalid-argument error for blank or malformed input.
    ///
    /// # Example
    /// ```ignore
    /// if title.trim().is_empty() {
    ///     return Err(DomainError::invalid_argument("checklist title cannot be empty"));
    /// }
    /// ```
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an index-out-of-range error; `kind` names the collection
    /// being addressed ("checklist", "item", "destination item", ...)
    pub fn index_out_of_range(kind: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { kind, index, len }
    }

    /// Create an invalid-state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }
}
