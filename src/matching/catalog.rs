//! Skill satisfaction and covering.
//!
//! # Algorithm
//! Covering a requirement set against a pool is a bipartite assignment
//! problem. The catalog solves it greedily by scarcity:
//!
//! 1. Sort requirements by descending `min_level` (stable).
//! 2. For each requirement, take the `quantity` most qualified remaining
//!    holders (highest level in the skill, then lowest id).
//! 3. Remove them from the pool; fail fast when a requirement falls short.
//!
//! A profile is counted toward at most one requirement slot.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::models::{CapabilityProfile, SkillLevel, SkillRequirement};

/// Profiles assigned to one requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementCover {
    /// Requirement covered.
    pub requirement: SkillRequirement,
    /// Distinct profile ids assigned to it.
    pub profile_ids: Vec<String>,
}

/// A successful covering of a requirement set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCoverage {
    /// One entry per requirement, strictest first.
    pub covers: Vec<RequirementCover>,
}

impl SkillCoverage {
    /// All assigned profile ids.
    pub fn assigned_ids(&self) -> impl Iterator<Item = &str> {
        self.covers
            .iter()
            .flat_map(|c| c.profile_ids.iter().map(String::as_str))
    }

    /// Number of profiles assigned across all requirements.
    pub fn assigned_count(&self) -> usize {
        self.covers.iter().map(|c| c.profile_ids.len()).sum()
    }
}

/// The first requirement a pool could not cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillShortfall {
    /// Requirement that fell short.
    pub requirement: SkillRequirement,
    /// Qualified holders left after stricter requirements were served.
    pub found: u32,
}

/// Skill satisfaction checks. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillCatalog;

impl SkillCatalog {
    /// Whether one profile meets one requirement's skill and level.
    pub fn satisfies(requirement: &SkillRequirement, profile: &CapabilityProfile) -> bool {
        profile.meets(requirement)
    }

    /// Whether `pool` can cover every requirement with distinct profiles.
    pub fn satisfies_all<'p, I>(requirements: &[SkillRequirement], pool: I) -> bool
    where
        I: IntoIterator<Item = &'p CapabilityProfile>,
    {
        Self::cover(requirements, pool).is_ok()
    }

    /// Covers `requirements` from `pool`, returning the assignment.
    ///
    /// Profiles with duplicate ids are counted once.
    pub fn cover<'p, I>(
        requirements: &[SkillRequirement],
        pool: I,
    ) -> Result<SkillCoverage, SkillShortfall>
    where
        I: IntoIterator<Item = &'p CapabilityProfile>,
    {
        let mut remaining: Vec<&CapabilityProfile> = pool.into_iter().collect();
        remaining.sort_by(|a, b| a.id.cmp(&b.id));
        remaining.dedup_by(|a, b| a.id == b.id);

        let mut order: Vec<&SkillRequirement> = requirements.iter().collect();
        order.sort_by_key(|r| Reverse(r.min_level));

        let mut coverage = SkillCoverage::default();
        for requirement in order {
            let mut candidates: Vec<(usize, SkillLevel)> = remaining
                .iter()
                .enumerate()
                .filter_map(|(idx, p)| {
                    p.skill_level(&requirement.skill_type)
                        .filter(|level| *level >= requirement.min_level)
                        .map(|level| (idx, level))
                })
                .collect();

            let needed = requirement.quantity as usize;
            if candidates.len() < needed {
                return Err(SkillShortfall {
                    requirement: requirement.clone(),
                    found: candidates.len() as u32,
                });
            }

            // `remaining` is id-sorted, so a stable sort keeps lowest id first among equals.
            candidates.sort_by_key(|&(_, level)| Reverse(level));
            let mut taken: Vec<usize> = candidates[..needed].iter().map(|&(idx, _)| idx).collect();

            let profile_ids = taken.iter().map(|&idx| remaining[idx].id.clone()).collect();
            taken.sort_unstable_by(|a, b| b.cmp(a));
            for idx in taken {
                remaining.remove(idx);
            }

            coverage.covers.push(RequirementCover {
                requirement: requirement.clone(),
                profile_ids,
            });
        }

        Ok(coverage)
    }
}
