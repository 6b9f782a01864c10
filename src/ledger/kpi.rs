//! Ledger roll-up metrics for dashboards.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Utilization | Occupied fraction of the horizon per resource (clamped) |
//! | Avg Utilization | Mean of per-resource utilization |
//! | Overloaded | Resources whose occupying records exceed the concurrency limit |
//! | Conflicts | Conflicted records across the measured resources |
//! | Over-capacity slots | Matrix cells flagged over capacity |

use std::collections::HashMap;

use super::AllocationLedger;
use crate::error::Result;
use crate::models::TimeWindow;

/// Ledger performance indicators over a horizon.
#[derive(Debug, Clone)]
pub struct LedgerKpi {
    /// Per-resource clamped utilization (0.0..1.0).
    pub utilization_by_resource: HashMap<String, f64>,
    /// Mean utilization across measured resources.
    pub avg_utilization: f64,
    /// Resources over their concurrency limit somewhere in the horizon, sorted.
    pub overloaded_resources: Vec<String>,
    /// Conflicted records across measured resources.
    pub conflict_count: usize,
    /// Slots flagged over capacity in the utilization matrix.
    pub over_capacity_slots: usize,
}

impl LedgerKpi {
    /// Computes KPIs for `resource_ids` over `horizon`, slotted by `slot_minutes`.
    pub fn calculate(
        ledger: &AllocationLedger,
        resource_ids: &[String],
        horizon: &TimeWindow,
        slot_minutes: u32,
    ) -> Result<Self> {
        let mut utilization_by_resource = HashMap::new();
        let mut overloaded_resources = Vec::new();
        let mut conflict_count = 0;

        for rid in resource_ids {
            let units = ledger.limit_for(rid)?;
            let sample = ledger.utilization(rid, horizon, units)?;
            if sample.is_over_capacity {
                overloaded_resources.push(rid.clone());
            }
            utilization_by_resource.insert(rid.clone(), sample.occupied_fraction);
            conflict_count += ledger.conflict_count(rid);
        }
        overloaded_resources.sort();

        let over_capacity_slots = ledger
            .utilization_matrix(resource_ids, horizon, slot_minutes)?
            .iter()
            .flatten()
            .filter(|s| s.is_over_capacity)
            .count();

        let avg_utilization = if utilization_by_resource.is_empty() {
            0.0
        } else {
            let sum: f64 = utilization_by_resource.values().sum();
            sum / utilization_by_resource.len() as f64
        };

        Ok(Self {
            utilization_by_resource,
            avg_utilization,
            overloaded_resources,
            conflict_count,
            over_capacity_slots,
        })
    }

    /// Whether the ledger meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_conflicts: usize, min_utilization: f64) -> bool {
        self.conflict_count <= max_conflicts && self.avg_utilization >= min_utilization
    }
}
