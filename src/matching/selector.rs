//! Execution-variant selection.
//!
//! # Algorithm
//!
//! 1. Reject an empty variant set (`EmptyVariantSet`).
//! 2. Keep variants whose cells and operator skills can be served by
//!    profiles available during the requested window.
//! 3. None left → [`Selection::NoFeasibleVariant`] with per-variant reasons.
//! 4. Otherwise rank by the [`TieBreakPolicy`] (speed → primary → id by default).
//!
//! Selection is pure: identical inputs always yield the same variant.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::{SkillCatalog, SkillCoverage, SkillShortfall};
use super::rules::TieBreakPolicy;
use crate::error::{EngineError, Result};
use crate::models::{CapabilityProfile, ExecutionVariant, ResourceKind, TimeWindow};

/// How a variant's acceptable cells must be matched against the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellMatch {
    /// Every listed cell needs an available profile.
    #[default]
    AllListed,
    /// At least one listed cell needs an available profile.
    AnyListed,
}

/// Caller-supplied selection options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOptions {
    /// Rank shorter variants first.
    pub prioritize_speed: bool,
    /// Cell matching mode.
    pub cell_match: CellMatch,
}

impl SelectionOptions {
    /// Options preferring the fastest feasible variant.
    pub fn fastest() -> Self {
        Self {
            prioritize_speed: true,
            ..Self::default()
        }
    }

    /// Sets the cell matching mode.
    pub fn with_cell_match(mut self, cell_match: CellMatch) -> Self {
        self.cell_match = cell_match;
        self
    }
}

/// Why a variant cannot run in the requested window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Infeasibility {
    /// A required cell has no available profile.
    CellUnavailable { cell_id: String },
    /// None of the acceptable cells has an available profile.
    NoCellAvailable,
    /// Available operators cannot cover a skill requirement.
    SkillShortfall(SkillShortfall),
}

/// A rejected variant and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRejection {
    pub variant_id: String,
    pub reason: Infeasibility,
}

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'v> {
    /// A feasible variant was chosen.
    Selected {
        variant: &'v ExecutionVariant,
        /// Number of feasible candidates considered.
        feasible_count: usize,
        /// Operator assignment proving the chosen variant feasible.
        coverage: SkillCoverage,
    },
    /// Nothing can run; an ordinary business outcome.
    NoFeasibleVariant { rejections: Vec<VariantRejection> },
}

impl<'v> Selection<'v> {
    /// The chosen variant, if any.
    pub fn variant(&self) -> Option<&'v ExecutionVariant> {
        match self {
            Selection::Selected { variant, .. } => Some(variant),
            Selection::NoFeasibleVariant { .. } => None,
        }
    }

    /// Whether a variant was chosen.
    pub fn is_selected(&self) -> bool {
        matches!(self, Selection::Selected { .. })
    }
}

/// Chooses the execution variant to run.
///
/// Holds no mutable state; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct VariantSelector {
    policy: Option<TieBreakPolicy>,
}

impl VariantSelector {
    /// Creates a selector using the standard policy derived from options.
    pub fn new() -> Self {
        Self { policy: None }
    }

    /// Uses a custom tie-break policy instead of the standard one.
    ///
    /// `SelectionOptions::prioritize_speed` is then ignored; the policy
    /// decides ordering alone.
    pub fn with_policy(mut self, policy: TieBreakPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Checks one variant against the pool during `window`.
    ///
    /// `operators` must already be filtered to available operators.
    pub fn check_feasibility(
        variant: &ExecutionVariant,
        pool: &[CapabilityProfile],
        operators: &[&CapabilityProfile],
        window: &TimeWindow,
        cell_match: CellMatch,
    ) -> std::result::Result<SkillCoverage, Infeasibility> {
        let cell_ok = |cell_id: &str| {
            pool.iter()
                .any(|p| p.serves_cell(cell_id) && p.is_available_during(window))
        };

        match cell_match {
            CellMatch::AllListed => {
                if let Some(cell_id) = variant.acceptable_cells.iter().find(|c| !cell_ok(c.as_str())) {
                    return Err(Infeasibility::CellUnavailable {
                        cell_id: cell_id.clone(),
                    });
                }
            }
            CellMatch::AnyListed => {
                if !variant.acceptable_cells.is_empty()
                    && !variant.acceptable_cells.iter().any(|c| cell_ok(c.as_str()))
                {
                    return Err(Infeasibility::NoCellAvailable);
                }
            }
        }

        SkillCatalog::cover(&variant.skill_requirements, operators.iter().copied())
            .map_err(Infeasibility::SkillShortfall)
    }

    /// Selects the optimal feasible variant.
    ///
    /// # Errors
    /// `EmptyVariantSet` when `variants` is empty. Infeasibility is
    /// reported as [`Selection::NoFeasibleVariant`], not as an error.
    pub fn select_optimal<'v>(
        &self,
        variants: &'v [ExecutionVariant],
        pool: &[CapabilityProfile],
        window: &TimeWindow,
        options: &SelectionOptions,
    ) -> Result<Selection<'v>> {
        if variants.is_empty() {
            return Err(EngineError::EmptyVariantSet);
        }

        let operators: Vec<&CapabilityProfile> = pool
            .iter()
            .filter(|p| p.kind == ResourceKind::Operator && p.is_available_during(window))
            .collect();

        let mut feasible: Vec<(&'v ExecutionVariant, SkillCoverage)> = Vec::new();
        let mut rejections = Vec::new();
        for variant in variants {
            match Self::check_feasibility(variant, pool, &operators, window, options.cell_match) {
                Ok(coverage) => feasible.push((variant, coverage)),
                Err(reason) => rejections.push(VariantRejection {
                    variant_id: variant.id.clone(),
                    reason,
                }),
            }
        }

        if feasible.is_empty() {
            debug!(
                variants = variants.len(),
                "no feasible execution variant"
            );
            return Ok(Selection::NoFeasibleVariant { rejections });
        }

        let feasible_count = feasible.len();
        let standard;
        let policy = match &self.policy {
            Some(policy) => policy,
            None => {
                standard = TieBreakPolicy::standard(options.prioritize_speed);
                &standard
            }
        };

        let best = feasible
            .into_iter()
            .min_by(|(a, _), (b, _)| policy.compare(a, b));

        match best {
            Some((variant, coverage)) => {
                debug!(
                    variant_id = %variant.id,
                    feasible_count,
                    "execution variant selected"
                );
                Ok(Selection::Selected {
                    variant,
                    feasible_count,
                    coverage,
                })
            }
            None => Ok(Selection::NoFeasibleVariant { rejections }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::rules::FastestFirst;
    use crate::models::{SkillLevel, SkillRequirement};

    fn window() -> TimeWindow {
        TimeWindow::from_minutes(9 * 3_600_000, 60).unwrap()
    }

    fn welding_variant(id: &str, minutes: u32, level: SkillLevel) -> ExecutionVariant {
        ExecutionVariant::new(id, "T1", minutes)
            .unwrap()
            .with_requirement(SkillRequirement::single("welding", level))
    }

    #[test]
    fn test_empty_variant_set() {
        let selector = VariantSelector::new();
        let result = selector.select_optimal(&[], &[], &window(), &SelectionOptions::default());
        assert_eq!(result, Err(EngineError::EmptyVariantSet));
    }

    #[test]
    fn test_infeasible_primary_skipped() {
        let variants = vec![
            welding_variant("V1", 60, SkillLevel::Expert).primary(),
            welding_variant("V2", 30, SkillLevel::Basic),
        ];
        let pool = vec![CapabilityProfile::operator("W1").with_skill("welding", SkillLevel::Basic)];

        let selection = VariantSelector::new()
            .select_optimal(&variants, &pool, &window(), &SelectionOptions::default())
            .unwrap();
        assert_eq!(selection.variant().map(|v| v.id.as_str()), Some("V2"));
        match selection {
            Selection::Selected {
                feasible_count,
                coverage,
                ..
            } => {
                assert_eq!(feasible_count, 1);
                assert_eq!(coverage.assigned_ids().collect::<Vec<_>>(), vec!["W1"]);
            }
            Selection::NoFeasibleVariant { .. } => panic!("expected a selection"),
        }
    }

    #[test]
    fn test_primary_preferred_without_speed() {
        let variants = vec![
            welding_variant("V1", 60, SkillLevel::Basic).primary(),
            welding_variant("V2", 30, SkillLevel::Basic),
        ];
        let pool = vec![CapabilityProfile::operator("W1").with_skill("welding", SkillLevel::Expert)];
        let selector = VariantSelector::new();

        let slow = selector
            .select_optimal(&variants, &pool, &window(), &SelectionOptions::default())
            .unwrap();
        assert_eq!(slow.variant().map(|v| v.id.as_str()), Some("V1"));

        let fast = selector
            .select_optimal(&variants, &pool, &window(), &SelectionOptions::fastest())
            .unwrap();
        assert_eq!(fast.variant().map(|v| v.id.as_str()), Some("V2"));
    }

    #[test]
    fn test_no_feasible_variant_reasons() {
        let variants = vec![
            welding_variant("V1", 60, SkillLevel::Master),
            ExecutionVariant::new("V2", "T1", 30).unwrap().with_cell("Cell-9"),
        ];
        let pool = vec![
            CapabilityProfile::operator("W1").with_skill("welding", SkillLevel::Basic),
            CapabilityProfile::cell("Cell-1"),
        ];

        let selection = VariantSelector::new()
            .select_optimal(&variants, &pool, &window(), &SelectionOptions::default())
            .unwrap();
        match selection {
            Selection::NoFeasibleVariant { rejections } => {
                assert_eq!(rejections.len(), 2);
                assert!(matches!(
                    rejections[0].reason,
                    Infeasibility::SkillShortfall(SkillShortfall { found: 0, .. })
                ));
                assert_eq!(
                    rejections[1].reason,
                    Infeasibility::CellUnavailable {
                        cell_id: "Cell-9".into()
                    }
                );
            }
            Selection::Selected { .. } => panic!("expected no feasible variant"),
        }
    }

    #[test]
    fn test_cell_under_maintenance() {
        let variants = vec![ExecutionVariant::new("V1", "T1", 30).unwrap().with_cell("Cell-1")];
        let pool = vec![CapabilityProfile::cell("Cell-1").with_unavailable(window())];

        let selection = VariantSelector::new()
            .select_optimal(&variants, &pool, &window(), &SelectionOptions::default())
            .unwrap();
        assert!(!selection.is_selected());
    }

    #[test]
    fn test_machine_serves_compatible_cell() {
        let variants = vec![ExecutionVariant::new("V1", "T1", 30).unwrap().with_cell("Cell-2")];
        let pool = vec![CapabilityProfile::machine("Press-7").with_compatible_cell("Cell-2")];

        let selection = VariantSelector::new()
            .select_optimal(&variants, &pool, &window(), &SelectionOptions::default())
            .unwrap();
        assert!(selection.is_selected());
    }

    #[test]
    fn test_cell_match_modes() {
        let variants = vec![ExecutionVariant::new("V1", "T1", 30)
            .unwrap()
            .with_cell("Cell-1")
            .with_cell("Cell-2")];
        let pool = vec![CapabilityProfile::cell("Cell-1")];
        let selector = VariantSelector::new();

        let all = selector
            .select_optimal(&variants, &pool, &window(), &SelectionOptions::default())
            .unwrap();
        assert!(!all.is_selected());

        let any_opts = SelectionOptions::default().with_cell_match(CellMatch::AnyListed);
        let any = selector
            .select_optimal(&variants, &pool, &window(), &any_opts)
            .unwrap();
        assert!(any.is_selected());
    }

    #[test]
    fn test_unavailable_operator_not_counted() {
        let variants = vec![welding_variant("V1", 30, SkillLevel::Basic)];
        let pool = vec![CapabilityProfile::operator("W1")
            .with_skill("welding", SkillLevel::Expert)
            .with_unavailable(window())];

        let selection = VariantSelector::new()
            .select_optimal(&variants, &pool, &window(), &SelectionOptions::default())
            .unwrap();
        assert!(!selection.is_selected());
    }

    #[test]
    fn test_custom_policy_overrides_options() {
        let variants = vec![
            welding_variant("V1", 60, SkillLevel::Basic).primary(),
            welding_variant("V2", 30, SkillLevel::Basic),
        ];
        let pool = vec![CapabilityProfile::operator("W1").with_skill("welding", SkillLevel::Basic)];
        let selector =
            VariantSelector::new().with_policy(TieBreakPolicy::new().with_rule(FastestFirst));

        let selection = selector
            .select_optimal(&variants, &pool, &window(), &SelectionOptions::default())
            .unwrap();
        assert_eq!(selection.variant().map(|v| v.id.as_str()), Some("V2"));
    }

    #[test]
    fn test_deterministic_regardless_of_input_order() {
        let a = welding_variant("A", 30, SkillLevel::Basic);
        let b = welding_variant("B", 30, SkillLevel::Basic);
        let pool = vec![CapabilityProfile::operator("W1").with_skill("welding", SkillLevel::Basic)];
        let selector = VariantSelector::new();
        let opts = SelectionOptions::fastest();

        let forward = vec![a.clone(), b.clone()];
        let backward = vec![b, a];
        let x = selector.select_optimal(&forward, &pool, &window(), &opts).unwrap();
        let y = selector.select_optimal(&backward, &pool, &window(), &opts).unwrap();
        assert_eq!(x.variant().map(|v| &v.id), y.variant().map(|v| &v.id));
        assert_eq!(x.variant().map(|v| v.id.as_str()), Some("A"));
    }
}
