//! Input validation for variant sets and resource pools.
//!
//! Checks structural integrity of registry data before matching.
//! Detects:
//! - Duplicate IDs
//! - Variants filed under the wrong task
//! - Tasks without exactly one primary variant
//! - Cell references no pool resource can serve
//! - Zero concurrency limits
//!
//! Matching tolerates all of these; validation exists so that loaders can
//! reject bad snapshots instead of producing surprising selections.

use crate::models::{CapabilityProfile, ExecutionVariant, ResourceKind};
use std::collections::{BTreeMap, HashSet};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A task has no execution variants.
    EmptyVariantSet,
    /// A variant's task id differs from the task it was listed under.
    TaskMismatch,
    /// A task has zero or several primary variants.
    PrimaryCount,
    /// A variant lists a cell that no pool resource serves.
    InvalidCellReference,
    /// A resource declares a concurrency limit of zero.
    ZeroCapacity,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the variants of one task.
///
/// Checks:
/// 1. The set is non-empty
/// 2. No duplicate variant IDs
/// 3. Every variant belongs to `task_id`
/// 4. Exactly one variant is primary
pub fn validate_variants(task_id: &str, variants: &[ExecutionVariant]) -> ValidationResult {
    let mut errors = Vec::new();

    if variants.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyVariantSet,
            format!("Task '{task_id}' has no execution variants"),
        ));
    }

    let mut ids = HashSet::new();
    for v in variants {
        if !ids.insert(v.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate variant ID: {}", v.id),
            ));
        }
        if v.task_id != task_id {
            errors.push(ValidationError::new(
                ValidationErrorKind::TaskMismatch,
                format!(
                    "Variant '{}' belongs to task '{}', listed under '{}'",
                    v.id, v.task_id, task_id
                ),
            ));
        }
    }

    let primaries = variants.iter().filter(|v| v.is_primary).count();
    if !variants.is_empty() && primaries != 1 {
        errors.push(ValidationError::new(
            ValidationErrorKind::PrimaryCount,
            format!("Task '{task_id}' has {primaries} primary variants, expected 1"),
        ));
    }

    into_result(errors)
}

/// Validates a resource pool.
///
/// Checks:
/// 1. No duplicate profile IDs
/// 2. No zero concurrency limits
pub fn validate_pool(pool: &[CapabilityProfile]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut ids = HashSet::new();
    for p in pool {
        if !ids.insert(p.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate resource ID: {}", p.id),
            ));
        }
        if p.max_concurrent_tasks == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroCapacity,
                format!("Resource '{}' has a concurrency limit of 0", p.id),
            ));
        }
    }

    into_result(errors)
}

/// Validates every task's variants against a pool.
///
/// Runs [`validate_pool`], [`validate_variants`] per task (variants
/// grouped by `task_id`), and checks that every acceptable cell is
/// served by some cell or machine in the pool. Errors are ordered by
/// task id.
pub fn validate_input(variants: &[ExecutionVariant], pool: &[CapabilityProfile]) -> ValidationResult {
    let mut errors = validate_pool(pool).err().unwrap_or_default();

    let mut by_task: BTreeMap<&str, Vec<ExecutionVariant>> = BTreeMap::new();
    for v in variants {
        by_task.entry(v.task_id.as_str()).or_default().push(v.clone());
    }
    for (task_id, group) in &by_task {
        if let Err(mut task_errors) = validate_variants(task_id, group) {
            errors.append(&mut task_errors);
        }
    }

    let serves = |cell: &str| {
        pool.iter()
            .any(|p| p.kind != ResourceKind::Operator && p.serves_cell(cell))
    };
    for v in variants {
        for cell in v.acceptable_cells.iter().filter(|c| !serves(c.as_str())) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidCellReference,
                format!("Variant '{}' references unknown cell '{}'", v.id, cell),
            ));
        }
    }

    into_result(errors)
}

fn into_result(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
