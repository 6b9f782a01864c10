//! Execution variant model.
//!
//! A task can usually be performed in more than one way: a faster run on
//! a dedicated cell with an expert operator, or a slower run elsewhere
//! with a less specialised crew. Each way is an `ExecutionVariant`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::SkillRequirement;
use crate::error::{EngineError, Result};

/// One interchangeable way to perform a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVariant")]
pub struct ExecutionVariant {
    /// Unique variant identifier.
    pub id: String,
    /// Owning task identifier.
    pub task_id: String,
    /// Processing time (minutes, > 0).
    pub duration_minutes: u32,
    /// Operator skills needed, in declaration order.
    pub skill_requirements: Vec<SkillRequirement>,
    /// Cells this variant runs on.
    pub acceptable_cells: BTreeSet<String>,
    /// The task's preferred variant.
    pub is_primary: bool,
}

#[derive(Deserialize)]
struct RawVariant {
    id: String,
    task_id: String,
    duration_minutes: u32,
    #[serde(default)]
    skill_requirements: Vec<SkillRequirement>,
    #[serde(default)]
    acceptable_cells: BTreeSet<String>,
    #[serde(default)]
    is_primary: bool,
}

impl TryFrom<RawVariant> for ExecutionVariant {
    type Error = EngineError;

    fn try_from(raw: RawVariant) -> Result<Self> {
        let mut variant = Self::new(raw.id, raw.task_id, raw.duration_minutes)?;
        variant.skill_requirements = raw.skill_requirements;
        variant.acceptable_cells = raw.acceptable_cells;
        variant.is_primary = raw.is_primary;
        Ok(variant)
    }
}

impl ExecutionVariant {
    /// Creates a variant.
    ///
    /// # Errors
    /// `InvalidDuration` when `duration_minutes` is zero.
    pub fn new(
        id: impl Into<String>,
        task_id: impl Into<String>,
        duration_minutes: u32,
    ) -> Result<Self> {
        let id = id.into();
        if duration_minutes == 0 {
            return Err(EngineError::InvalidDuration {
                variant_id: id,
                minutes: duration_minutes,
            });
        }
        Ok(Self {
            id,
            task_id: task_id.into(),
            duration_minutes,
            skill_requirements: Vec::new(),
            acceptable_cells: BTreeSet::new(),
            is_primary: false,
        })
    }

    /// Adds a skill requirement.
    pub fn with_requirement(mut self, requirement: SkillRequirement) -> Self {
        self.skill_requirements.push(requirement);
        self
    }

    /// Adds an acceptable cell.
    pub fn with_cell(mut self, cell_id: impl Into<String>) -> Self {
        self.acceptable_cells.insert(cell_id.into());
        self
    }

    /// Marks this variant as the task's primary.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Total operator headcount across requirements.
    pub fn headcount(&self) -> u32 {
        self.skill_requirements.iter().map(|r| r.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkillLevel;

    #[test]
    fn test_variant_builder() {
        let v = ExecutionVariant::new("V1", "T1", 60)
            .unwrap()
            .with_requirement(SkillRequirement::single("welding", SkillLevel::Expert))
            .with_requirement(SkillRequirement::new("fitting", SkillLevel::Basic, 2).unwrap())
            .with_cell("Cell-1")
            .primary();

        assert_eq!(v.id, "V1");
        assert_eq!(v.task_id, "T1");
        assert_eq!(v.duration_minutes, 60);
        assert_eq!(v.skill_requirements.len(), 2);
        assert_eq!(v.headcount(), 3);
        assert!(v.acceptable_cells.contains("Cell-1"));
        assert!(v.is_primary);
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert_eq!(
            ExecutionVariant::new("V0", "T1", 0),
            Err(EngineError::InvalidDuration {
                variant_id: "V0".into(),
                minutes: 0
            })
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let v: ExecutionVariant = serde_json::from_str(
            r#"{"id":"V1","task_id":"T1","duration_minutes":45,
                "skill_requirements":[{"skill_type":"welding","min_level":"basic","quantity":1}]}"#,
        )
        .unwrap();
        assert_eq!(v.headcount(), 1);
        assert!(v.acceptable_cells.is_empty());
        assert!(!v.is_primary);

        let round: ExecutionVariant =
            serde_json::from_str(&serde_json::to_string(&v.clone().primary()).unwrap()).unwrap();
        assert!(round.is_primary);

        let zero: std::result::Result<ExecutionVariant, _> =
            serde_json::from_str(r#"{"id":"V0","task_id":"T1","duration_minutes":0}"#);
        assert!(zero.is_err());

        let bad_requirement: std::result::Result<ExecutionVariant, _> = serde_json::from_str(
            r#"{"id":"V2","task_id":"T1","duration_minutes":5,
                "skill_requirements":[{"skill_type":"welding","min_level":"basic","quantity":0}]}"#,
        );
        assert!(bad_requirement.is_err());
    }
}
