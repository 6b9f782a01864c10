//! Synchronous service surface.
//!
//! `MatchingEngine` wires the registries, the selector and the ledger
//! together and reports decisions to an optional event sink. It holds
//! no state besides the ledger; every method may be called from many
//! threads at once.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::cache::BatchDecoder;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::{BufferedEventSink, EngineEvent, EventSink, OptionalEventSink};
use crate::ledger::{AllocationLedger, ConflictReport, LedgerKpi};
use crate::matching::{Selection, SelectionOptions, SkillCoverage, VariantRejection, VariantSelector};
use crate::models::{
    AllocationRecord, AllocationStatus, CapabilityProfile, ExecutionVariant, SkillRequirement,
    TimeWindow, UtilizationSample,
};
use crate::registry::{CapacityLookup, ResourceRegistry, VariantRegistry};

/// Owned outcome of [`MatchingEngine::select_variant`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VariantResult {
    /// A feasible variant was chosen.
    Selected {
        variant: ExecutionVariant,
        feasible_count: usize,
        coverage: SkillCoverage,
    },
    /// No variant can run in the window.
    NoFeasibleVariant { rejections: Vec<VariantRejection> },
}

impl VariantResult {
    pub fn variant(&self) -> Option<&ExecutionVariant> {
        match self {
            VariantResult::Selected { variant, .. } => Some(variant),
            VariantResult::NoFeasibleVariant { .. } => None,
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, VariantResult::Selected { .. })
    }
}

impl From<Selection<'_>> for VariantResult {
    fn from(selection: Selection<'_>) -> Self {
        match selection {
            Selection::Selected {
                variant,
                feasible_count,
                coverage,
            } => VariantResult::Selected {
                variant: variant.clone(),
                feasible_count,
                coverage,
            },
            Selection::NoFeasibleVariant { rejections } => {
                VariantResult::NoFeasibleVariant { rejections }
            }
        }
    }
}

/// Matching and allocation service.
pub struct MatchingEngine {
    resources: Arc<dyn ResourceRegistry>,
    variants: Arc<dyn VariantRegistry>,
    ledger: AllocationLedger,
    selector: VariantSelector,
    events: OptionalEventSink,
    decoder: BatchDecoder,
    config: EngineConfig,
}

impl MatchingEngine {
    /// Creates an engine over the given registries.
    ///
    /// Concurrency limits are read from `resources`; resources it does
    /// not know get `config.default_max_concurrent`.
    ///
    /// # Errors
    /// `Config` when `config` fails validation.
    pub fn new<R>(
        resources: Arc<R>,
        variants: Arc<dyn VariantRegistry>,
        config: EngineConfig,
    ) -> Result<Self>
    where
        R: ResourceRegistry + 'static,
    {
        config.validate()?;
        let capacity: Arc<dyn CapacityLookup> = resources.clone();
        let ledger =
            AllocationLedger::new(capacity).with_default_limit(config.default_max_concurrent);
        Ok(Self {
            resources,
            variants,
            ledger,
            selector: VariantSelector::new(),
            events: OptionalEventSink::none(),
            decoder: BatchDecoder::new(config.cache_capacity),
            config,
        })
    }

    /// Reports decisions to `sink`.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = OptionalEventSink::with_sink(sink);
        self
    }

    /// Reports decisions to a new [`BufferedEventSink`] holding
    /// `config.event_buffer` events, returned for the consumer.
    pub fn with_buffered_events(self) -> (Self, Arc<BufferedEventSink>) {
        let sink = Arc::new(BufferedEventSink::new(self.config.event_buffer));
        let engine = self.with_event_sink(sink.clone());
        (engine, sink)
    }

    /// Replaces the selector (e.g. one with a custom tie-break policy).
    pub fn with_selector(mut self, selector: VariantSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &AllocationLedger {
        &self.ledger
    }

    /// Selection options from configuration.
    pub fn default_options(&self) -> SelectionOptions {
        self.config.selection_options()
    }

    /// Selects the variant of `task_id` to run in `window` against `pool`.
    ///
    /// # Errors
    /// - `UnknownTask` when the variant registry does not know the task
    /// - `EmptyVariantSet` when it knows the task but has no variants
    #[instrument(level = "debug", skip(self, pool), fields(pool = pool.len()))]
    pub fn select_variant(
        &self,
        task_id: &str,
        window: &TimeWindow,
        pool: &[CapabilityProfile],
        options: &SelectionOptions,
    ) -> Result<VariantResult> {
        let variants = self
            .variants
            .variants_for(task_id)
            .ok_or_else(|| EngineError::UnknownTask(task_id.to_string()))?;

        let result: VariantResult = self
            .selector
            .select_optimal(&variants, pool, window, options)?
            .into();

        let event = match &result {
            VariantResult::Selected {
                variant,
                feasible_count,
                ..
            } => EngineEvent::VariantSelected {
                task_id: task_id.to_string(),
                variant_id: variant.id.clone(),
                feasible_count: *feasible_count,
                window_start_ms: window.start_ms(),
                window_end_ms: window.end_ms(),
            },
            VariantResult::NoFeasibleVariant { rejections } => {
                debug!(task_id, rejected = rejections.len(), "task infeasible in window");
                EngineEvent::VariantInfeasible {
                    task_id: task_id.to_string(),
                    rejected: rejections.len(),
                    window_start_ms: window.start_ms(),
                    window_end_ms: window.end_ms(),
                }
            }
        };
        self.events.emit(event);

        Ok(result)
    }

    /// [`select_variant`](Self::select_variant) against every registered
    /// profile with the configured options.
    pub fn select_variant_from_registry(
        &self,
        task_id: &str,
        window: &TimeWindow,
    ) -> Result<VariantResult> {
        let pool = self.resources.profiles();
        self.select_variant(task_id, window, &pool, &self.default_options())
    }

    /// Records an allocation and reports conflicts it caused.
    #[instrument(level = "debug", skip(self, record), fields(record_id = %record.id, resource_id = %record.resource_id))]
    pub fn add_allocation(&self, record: AllocationRecord) -> Result<ConflictReport> {
        let report = self.ledger.add(record)?;
        self.report_conflict(&report);
        Ok(report)
    }

    /// [`add_allocation`](Self::add_allocation) guarded by the resource revision.
    pub fn add_allocation_expecting(
        &self,
        record: AllocationRecord,
        expected_revision: u64,
    ) -> Result<ConflictReport> {
        let report = self.ledger.add_expecting(record, expected_revision)?;
        self.report_conflict(&report);
        Ok(report)
    }

    /// Moves an allocation to a new status.
    pub fn transition_allocation(
        &self,
        id: &str,
        next: AllocationStatus,
    ) -> Result<AllocationRecord> {
        self.ledger.transition(id, next)
    }

    /// Deletes an allocation.
    pub fn remove_allocation(&self, id: &str) -> Result<AllocationRecord> {
        self.ledger.remove(id)
    }

    /// Occupancy of a resource over `window`, measured against its concurrency limit.
    pub fn get_utilization(&self, resource_id: &str, window: &TimeWindow) -> Result<UtilizationSample> {
        let units = self.ledger.limit_for(resource_id)?;
        self.ledger.utilization(resource_id, window, units)
    }

    /// Utilization matrix using the configured slot width.
    pub fn utilization_matrix(
        &self,
        resource_ids: &[String],
        horizon: &TimeWindow,
    ) -> Result<Vec<Vec<UtilizationSample>>> {
        self.ledger
            .utilization_matrix(resource_ids, horizon, self.config.utilization_slot_minutes)
    }

    /// Ledger KPIs over every resource with allocations.
    pub fn kpi(&self, horizon: &TimeWindow) -> Result<LedgerKpi> {
        let ids = self.ledger.resource_ids();
        LedgerKpi::calculate(&self.ledger, &ids, horizon, self.config.utilization_slot_minutes)
    }

    /// Decodes a requirement list such as `welding:expert, fitting:basic*2`.
    pub fn decode_requirements(&self, text: &str) -> Result<Vec<SkillRequirement>> {
        self.decoder.requirements(text)
    }

    /// Loads a JSON array of allocation rows in order.
    ///
    /// Stops at the first row that fails to decode or insert; earlier
    /// rows stay recorded.
    pub fn load_allocations_json(&self, json: &str) -> Result<Vec<ConflictReport>> {
        let records = self.decoder.allocations_from_json(json)?;
        records
            .into_iter()
            .map(|record| self.add_allocation(record))
            .collect()
    }

    fn report_conflict(&self, report: &ConflictReport) {
        let affected: Vec<String> = report
            .affected_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        if affected.is_empty() {
            return;
        }
        self.events.emit(EngineEvent::AllocationConflictDetected {
            resource_id: report.resource_id.clone(),
            record_id: report.record_id.clone(),
            affected_ids: affected,
            peak_concurrency: report.peak_concurrency,
            limit: report.limit,
        });
    }
}

impl std::fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchingEngine")
            .field("ledger", &self.ledger)
            .field("events", &self.events)
            .field("config", &self.config)
            .finish()
    }
}
