//! Capability profile model.
//!
//! A profile is a read-only snapshot of what a resource (operator,
//! production cell, machine) declares it can do, and when it cannot.
//! Profiles are owned by the resource registry; the engine never
//! mutates them.
//!
//! # Availability
//! A profile is available during a window iff it is active and none of
//! its unavailable windows (maintenance, shift gaps) overlaps it.
//! Current booking load is a separate concern handled by the ledger.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::window::covered_ms;
use super::{SkillLevel, SkillRequirement, TimeWindow};

/// Resource classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Human resource holding skills.
    Operator,
    /// Production cell.
    Cell,
    /// Equipment, optionally bound to compatible cells.
    Machine,
}

/// Declared capabilities and unavailability of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityProfile {
    /// Unique resource identifier.
    pub id: String,
    /// Resource classification.
    pub kind: ResourceKind,
    /// Highest level held per skill type.
    pub skills: BTreeMap<String, SkillLevel>,
    /// Cell ids this resource can serve (equipment-bound variants).
    pub compatible_cells: BTreeSet<String>,
    /// Periods when the resource is unavailable.
    pub unavailable: Vec<TimeWindow>,
    /// Inactive resources are never available.
    pub active: bool,
    /// Number of allocations the resource can carry at once.
    pub max_concurrent_tasks: u32,
}

impl CapabilityProfile {
    /// Creates an active profile with no skills and a concurrency limit of 1.
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            skills: BTreeMap::new(),
            compatible_cells: BTreeSet::new(),
            unavailable: Vec::new(),
            active: true,
            max_concurrent_tasks: 1,
        }
    }

    /// Creates an operator profile.
    pub fn operator(id: impl Into<String>) -> Self {
        Self::new(id, ResourceKind::Operator)
    }

    /// Creates a cell profile.
    pub fn cell(id: impl Into<String>) -> Self {
        Self::new(id, ResourceKind::Cell)
    }

    /// Creates a machine profile.
    pub fn machine(id: impl Into<String>) -> Self {
        Self::new(id, ResourceKind::Machine)
    }

    /// Declares a skill. Keeps the highest level if declared twice.
    pub fn with_skill(mut self, skill_type: impl Into<String>, level: SkillLevel) -> Self {
        let entry = self.skills.entry(skill_type.into()).or_insert(level);
        *entry = (*entry).max(level);
        self
    }

    /// Declares a compatible cell.
    pub fn with_compatible_cell(mut self, cell_id: impl Into<String>) -> Self {
        self.compatible_cells.insert(cell_id.into());
        self
    }

    /// Adds an unavailable window.
    pub fn with_unavailable(mut self, window: TimeWindow) -> Self {
        self.unavailable.push(window);
        self
    }

    /// Sets the concurrency limit.
    pub fn with_max_concurrent(mut self, max_concurrent_tasks: u32) -> Self {
        self.max_concurrent_tasks = max_concurrent_tasks;
        self
    }

    /// Marks the profile inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Level held for a skill, if any.
    pub fn skill_level(&self, skill_type: &str) -> Option<SkillLevel> {
        self.skills.get(skill_type).copied()
    }

    /// Whether this profile alone meets a requirement's skill and level.
    ///
    /// Quantity is not considered here; see [`crate::matching::SkillCatalog`].
    pub fn meets(&self, requirement: &SkillRequirement) -> bool {
        self.skill_level(&requirement.skill_type)
            .is_some_and(|level| level >= requirement.min_level)
    }

    /// Whether this profile can serve `cell_id` (it is the cell, or lists it).
    pub fn serves_cell(&self, cell_id: &str) -> bool {
        match self.kind {
            ResourceKind::Operator => false,
            ResourceKind::Cell | ResourceKind::Machine => {
                self.id == cell_id || self.compatible_cells.contains(cell_id)
            }
        }
    }

    /// Whether the resource is declared available for the whole window.
    pub fn is_available_during(&self, window: &TimeWindow) -> bool {
        self.active && !self.unavailable.iter().any(|u| u.overlaps(window))
    }

    /// Declared available time inside `window`, in minutes.
    ///
    /// Overlapping unavailable windows are merged before subtracting.
    pub fn available_minutes_in(&self, window: &TimeWindow) -> f64 {
        if !self.active {
            return 0.0;
        }
        let blocked = covered_ms(window, &self.unavailable);
        (window.duration_ms() - blocked) as f64 / 60_000.0
    }
}
