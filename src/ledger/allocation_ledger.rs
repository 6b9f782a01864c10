//! Per-resource allocation ledger.
//!
//! # Single Writer
//! Each resource's records live in one `DashMap` entry. Every mutation
//! holds that entry's write guard across the whole check-and-act, so two
//! allocations on the same resource cannot both pass a concurrency
//! check against a stale view. Different resources proceed in parallel.
//!
//! Lock order is always book → id index; no path acquires a book while
//! holding an index guard.
//!
//! # Conflicts
//! When an insertion pushes peak concurrency over the resource's limit,
//! the new record and every overlapping occupying record are flagged
//! `conflicted`. Flags are cleared only by explicit reconfirmation, so
//! adding never lowers a resource's conflict count and removing never
//! raises it.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::sweep::peak_concurrency;
use crate::error::{EngineError, Result};
use crate::models::{AllocationRecord, AllocationStatus, TimeWindow, UtilizationSample};
use crate::registry::CapacityLookup;

/// Outcome of inserting an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Inserted allocation.
    pub record_id: String,
    /// Its resource.
    pub resource_id: String,
    /// Concurrency limit applied.
    pub limit: u32,
    /// Peak concurrency over the inserted interval, including itself.
    pub peak_concurrency: u32,
    /// Whether the inserted record ended up conflicted.
    pub conflicted: bool,
    /// Other records flagged conflicted by this insertion.
    pub newly_conflicted: Vec<String>,
    /// Conflicted records on the resource after insertion.
    pub conflict_count: usize,
    /// Resource revision after insertion.
    pub revision: u64,
}

impl ConflictReport {
    /// Ids of every record this insertion left in conflict, including itself.
    pub fn affected_ids(&self) -> Vec<&str> {
        let own = self.conflicted.then_some(self.record_id.as_str());
        own.into_iter()
            .chain(self.newly_conflicted.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Default)]
struct ResourceBook {
    records: Vec<AllocationRecord>,
    revision: u64,
}

impl ResourceBook {
    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn conflict_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == AllocationStatus::Conflicted)
            .count()
    }

    /// Peak concurrency over `interval` among occupying records, skipping `exclude`.
    fn peak_over(&self, interval: &TimeWindow, exclude: Option<usize>) -> u32 {
        let others = self
            .records
            .iter()
            .enumerate()
            .filter(|&(idx, r)| Some(idx) != exclude && r.status.is_occupying())
            .map(|(_, r)| &r.interval);
        peak_concurrency(interval, others)
    }
}

/// The sole owner and writer of allocation records.
pub struct AllocationLedger {
    books: DashMap<String, ResourceBook>,
    index: DashMap<String, String>,
    capacity: Arc<dyn CapacityLookup>,
    default_limit: u32,
}

impl AllocationLedger {
    /// Creates a ledger reading concurrency limits from `capacity`.
    ///
    /// Resources unknown to `capacity` get a limit of 1.
    pub fn new(capacity: Arc<dyn CapacityLookup>) -> Self {
        Self {
            books: DashMap::new(),
            index: DashMap::new(),
            capacity,
            default_limit: 1,
        }
    }

    /// Sets the limit used for resources unknown to the capacity lookup.
    pub fn with_default_limit(mut self, default_limit: u32) -> Self {
        self.default_limit = default_limit;
        self
    }

    /// Effective concurrency limit of a resource.
    ///
    /// # Errors
    /// `InvalidCapacity` when the declared limit is zero.
    pub fn limit_for(&self, resource_id: &str) -> Result<u32> {
        let limit = self
            .capacity
            .max_concurrent_tasks(resource_id)
            .unwrap_or(self.default_limit);
        if limit == 0 {
            return Err(EngineError::InvalidCapacity {
                resource_id: resource_id.to_string(),
                capacity: limit,
            });
        }
        Ok(limit)
    }

    /// Inserts a record and flags conflicts on its resource.
    pub fn add(&self, record: AllocationRecord) -> Result<ConflictReport> {
        self.insert(record, None)
    }

    /// Inserts a record only if the resource is still at `expected_revision`.
    ///
    /// # Errors
    /// `ConcurrentModification` when another writer got there first.
    pub fn add_expecting(
        &self,
        record: AllocationRecord,
        expected_revision: u64,
    ) -> Result<ConflictReport> {
        self.insert(record, Some(expected_revision))
    }

    fn insert(
        &self,
        mut record: AllocationRecord,
        expected_revision: Option<u64>,
    ) -> Result<ConflictReport> {
        let limit = self.limit_for(&record.resource_id)?;
        let resource_id = record.resource_id.clone();

        let mut book = self.books.entry(resource_id.clone()).or_default();

        if let Some(expected) = expected_revision {
            if book.revision != expected {
                return Err(EngineError::ConcurrentModification {
                    resource_id,
                    expected,
                    actual: book.revision,
                });
            }
        }

        match self.index.entry(record.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(EngineError::DuplicateRecord(record.id));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(resource_id.clone());
            }
        }

        let mut peak = 0;
        let mut newly_conflicted = Vec::new();
        if record.status.is_occupying() {
            let overlapping: Vec<usize> = book
                .records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.status.is_occupying() && r.interval.overlaps(&record.interval))
                .map(|(idx, _)| idx)
                .collect();

            // The new record spans its whole interval, so it adds one everywhere.
            peak = book.peak_over(&record.interval, None) + 1;

            if peak > limit {
                record.status = AllocationStatus::Conflicted;
                for idx in overlapping {
                    let other = &mut book.records[idx];
                    if other.status != AllocationStatus::Conflicted {
                        other.status = AllocationStatus::Conflicted;
                        newly_conflicted.push(other.id.clone());
                    }
                }
            }
        }

        let conflicted = record.status == AllocationStatus::Conflicted;
        let record_id = record.id.clone();
        book.records.push(record);
        book.revision += 1;

        let report = ConflictReport {
            record_id,
            resource_id,
            limit,
            peak_concurrency: peak,
            conflicted,
            newly_conflicted,
            conflict_count: book.conflict_count(),
            revision: book.revision,
        };

        if conflicted {
            warn!(
                resource_id = %report.resource_id,
                record_id = %report.record_id,
                peak = report.peak_concurrency,
                limit = report.limit,
                "allocation conflict detected"
            );
        } else {
            debug!(
                resource_id = %report.resource_id,
                record_id = %report.record_id,
                "allocation added"
            );
        }

        Ok(report)
    }

    fn resource_of(&self, id: &str) -> Result<String> {
        self.index
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| EngineError::RecordNotFound(id.to_string()))
    }

    /// Moves a record to `next` status.
    ///
    /// Reconfirming a conflicted record requires its interval to be back
    /// within the resource's limit.
    pub fn transition(&self, id: &str, next: AllocationStatus) -> Result<AllocationRecord> {
        let resource_id = self.resource_of(id)?;
        let limit = self.limit_for(&resource_id)?;

        let mut book = self
            .books
            .get_mut(&resource_id)
            .ok_or_else(|| EngineError::RecordNotFound(id.to_string()))?;
        let pos = book
            .position(id)
            .ok_or_else(|| EngineError::RecordNotFound(id.to_string()))?;

        let current = book.records[pos].status;
        if !current.can_transition_to(next) {
            return Err(EngineError::InvalidStatusTransition {
                id: id.to_string(),
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        if current == AllocationStatus::Conflicted {
            let interval = book.records[pos].interval;
            if book.peak_over(&interval, Some(pos)) + 1 > limit {
                return Err(EngineError::UnresolvedConflict {
                    id: id.to_string(),
                    resource_id,
                });
            }
        }

        book.records[pos].status = next;
        book.revision += 1;
        debug!(record_id = id, from = %current, to = %next, "allocation status changed");
        Ok(book.records[pos].clone())
    }

    /// Removes (cancels) a non-completed record.
    pub fn remove(&self, id: &str) -> Result<AllocationRecord> {
        let resource_id = self.resource_of(id)?;

        let mut book = self
            .books
            .get_mut(&resource_id)
            .ok_or_else(|| EngineError::RecordNotFound(id.to_string()))?;
        let pos = book
            .position(id)
            .ok_or_else(|| EngineError::RecordNotFound(id.to_string()))?;

        if book.records[pos].status == AllocationStatus::Completed {
            return Err(EngineError::InvalidStatusTransition {
                id: id.to_string(),
                from: AllocationStatus::Completed.to_string(),
                to: "removed".to_string(),
            });
        }

        let removed = book.records.remove(pos);
        book.revision += 1;
        self.index.remove(id);
        debug!(record_id = id, resource_id = %resource_id, "allocation removed");
        Ok(removed)
    }

    /// Snapshot of one record.
    pub fn get(&self, id: &str) -> Option<AllocationRecord> {
        let resource_id = self.resource_of(id).ok()?;
        let book = self.books.get(&resource_id)?;
        book.records.iter().find(|r| r.id == id).cloned()
    }

    /// All records of a resource, ordered by interval start then id.
    pub fn records_for(&self, resource_id: &str) -> Vec<AllocationRecord> {
        let mut records = self
            .books
            .get(resource_id)
            .map(|b| b.records.clone())
            .unwrap_or_default();
        sort_by_start(&mut records);
        records
    }

    /// Conflicted records of a resource, ordered by interval start.
    pub fn conflicts_for(&self, resource_id: &str) -> Vec<AllocationRecord> {
        let mut conflicts: Vec<AllocationRecord> = self
            .books
            .get(resource_id)
            .map(|b| {
                b.records
                    .iter()
                    .filter(|r| r.status == AllocationStatus::Conflicted)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        sort_by_start(&mut conflicts);
        conflicts
    }

    /// Number of conflicted records on a resource.
    pub fn conflict_count(&self, resource_id: &str) -> usize {
        self.books
            .get(resource_id)
            .map_or(0, |b| b.conflict_count())
    }

    /// Mutation counter of a resource (0 if never touched).
    pub fn revision(&self, resource_id: &str) -> u64 {
        self.books.get(resource_id).map_or(0, |b| b.revision)
    }

    /// Resources with at least one record, ordered by id.
    pub fn resource_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .books
            .iter()
            .filter(|b| !b.records.is_empty())
            .map(|b| b.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Occupancy of a resource over `window`.
    ///
    /// `occupied_fraction = Σ overlap / (window × capacity_units)`, clamped
    /// to [0, 1]; `raw_fraction` keeps the unclamped demand. Booked time
    /// counts every record, completed ones included. `concurrent_count`
    /// and `is_over_capacity` count occupying records only, matching
    /// conflict detection.
    pub fn utilization(
        &self,
        resource_id: &str,
        window: &TimeWindow,
        capacity_units: u32,
    ) -> Result<UtilizationSample> {
        if capacity_units == 0 {
            return Err(EngineError::InvalidCapacity {
                resource_id: resource_id.to_string(),
                capacity: capacity_units,
            });
        }
        let limit = self.limit_for(resource_id)?;

        let (occupied_ms, concurrent) = match self.books.get(resource_id) {
            Some(book) => {
                // i128: many full-window overlaps can exceed i64
                let occupied: i128 = book
                    .records
                    .iter()
                    .map(|r| i128::from(r.interval.overlap_ms(window)))
                    .sum();
                let occupying = book
                    .records
                    .iter()
                    .filter(|r| r.status.is_occupying())
                    .map(|r| &r.interval);
                let concurrent = peak_concurrency(window, occupying);
                (occupied, concurrent)
            }
            None => (0, 0),
        };

        let denominator = window.duration_ms() as f64 * f64::from(capacity_units);
        let raw_fraction = occupied_ms as f64 / denominator;

        Ok(UtilizationSample {
            resource_id: resource_id.to_string(),
            slot: *window,
            occupied_fraction: raw_fraction.clamp(0.0, 1.0),
            raw_fraction,
            concurrent_count: concurrent,
            is_over_capacity: concurrent > limit,
        })
    }

    /// Resource-by-slot utilization matrix over `horizon`.
    ///
    /// Each resource's capacity units are its concurrency limit. Rows
    /// follow `resource_ids` order; columns are consecutive slots.
    pub fn utilization_matrix(
        &self,
        resource_ids: &[String],
        horizon: &TimeWindow,
        slot_minutes: u32,
    ) -> Result<Vec<Vec<UtilizationSample>>> {
        let slots = horizon.split(slot_minutes);
        resource_ids
            .iter()
            .map(|rid| -> Result<Vec<UtilizationSample>> {
                let units = self.limit_for(rid)?;
                slots
                    .iter()
                    .map(|slot| self.utilization(rid, slot, units))
                    .collect()
            })
            .collect()
    }

    /// Count of records per status across all resources.
    pub fn status_counts(&self) -> HashMap<AllocationStatus, usize> {
        let mut counts = HashMap::new();
        for book in self.books.iter() {
            for r in &book.records {
                *counts.entry(r.status).or_insert(0) += 1;
            }
        }
        counts
    }
}

impl std::fmt::Debug for AllocationLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationLedger")
            .field("resources", &self.books.len())
            .field("records", &self.index.len())
            .field("default_limit", &self.default_limit)
            .finish()
    }
}

fn sort_by_start(records: &mut [AllocationRecord]) {
    records.sort_by(|a, b| {
        a.interval
            .start_ms()
            .cmp(&b.interval.start_ms())
            .then_with(|| a.id.cmp(&b.id))
    });
}
