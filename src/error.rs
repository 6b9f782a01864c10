//! Engine error taxonomy.
//!
//! Only malformed input and violated invariants are errors. Infeasible
//! variants and allocation conflicts are ordinary results and never
//! surface here.

use thiserror::Error;

/// Errors raised by the matching engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    // ===== malformed input =====
    #[error("invalid interval: start={start_ms} must be before end={end_ms}")]
    InvalidInterval { start_ms: i64, end_ms: i64 },

    #[error("invalid quantity for skill '{skill_type}': {quantity} (must be >= 1)")]
    InvalidQuantity { skill_type: String, quantity: u32 },

    #[error("invalid duration for variant '{variant_id}': {minutes} minutes (must be > 0)")]
    InvalidDuration { variant_id: String, minutes: u32 },

    #[error("invalid capacity for '{resource_id}': {capacity} (must be >= 1)")]
    InvalidCapacity { resource_id: String, capacity: u32 },

    #[error("unknown skill level: '{0}'")]
    UnknownSkillLevel(String),

    #[error("unknown allocation status: '{0}'")]
    UnknownStatus(String),

    #[error("malformed skill requirement: '{0}'")]
    MalformedRequirement(String),

    #[error("malformed allocation rows: {0}")]
    MalformedRow(String),

    // ===== upstream data integrity =====
    #[error("execution variant set is empty")]
    EmptyVariantSet,

    #[error("unknown task: '{0}'")]
    UnknownTask(String),

    // ===== ledger =====
    #[error("allocation record not found: '{0}'")]
    RecordNotFound(String),

    #[error("allocation record already exists: '{0}'")]
    DuplicateRecord(String),

    #[error("invalid status transition for '{id}': from={from} to={to}")]
    InvalidStatusTransition { id: String, from: String, to: String },

    #[error("allocation '{id}' still overlaps beyond the concurrency limit of '{resource_id}'")]
    UnresolvedConflict { id: String, resource_id: String },

    #[error("concurrent modification on '{resource_id}': expected revision={expected}, actual revision={actual}")]
    ConcurrentModification {
        resource_id: String,
        expected: u64,
        actual: u64,
    },

    // ===== configuration =====
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
