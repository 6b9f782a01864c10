//! Interning cache for immutable catalog values.
//!
//! Bulk loads reference a handful of distinct skill requirements and
//! status tags thousands of times. `CatalogCache` hands out shared
//! `Arc`s keyed by canonical text instead of re-parsing each row.
//! Dropping the cache changes throughput only, never results.

use dashmap::DashMap;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::models::{AllocationRecord, AllocationStatus, SkillRequirement, TimeWindow};

/// Cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Bounded memoizing map: canonical string → shared immutable value.
///
/// Once `capacity` entries are held, new values are still built and
/// returned but not retained. Concurrent misses may overshoot the bound
/// by the number of racing writers.
#[derive(Debug)]
pub struct CatalogCache<T> {
    entries: DashMap<String, Arc<T>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> CatalogCache<T> {
    /// Creates a cache retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached value for `key`, building it on a miss.
    pub fn get_or_insert_with<F>(&self, key: &str, build: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        if let Some(hit) = self.lookup(key) {
            return hit;
        }
        self.store(key, build())
    }

    /// Like [`get_or_insert_with`](Self::get_or_insert_with) with a fallible builder.
    /// Failures are not cached.
    pub fn get_or_try_insert_with<F>(&self, key: &str, build: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(hit) = self.lookup(key) {
            return Ok(hit);
        }
        Ok(self.store(key, build()?))
    }

    fn lookup(&self, key: &str) -> Option<Arc<T>> {
        let hit = self.entries.get(key).map(|e| Arc::clone(e.value()));
        let counter = if hit.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        hit
    }

    fn store(&self, key: &str, value: T) -> Arc<T> {
        let value = Arc::new(value);
        // len() read-locks every shard; no entry guard may be held here
        if self.entries.len() >= self.capacity {
            return value;
        }
        let stored = self.entries.entry(key.to_string()).or_insert(value);
        Arc::clone(stored.value())
    }

    /// Drops every entry and resets counters.
    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

impl<T> CatalogCache<T>
where
    T: FromStr<Err = EngineError>,
{
    /// Parses `text` through the cache.
    pub fn get_or_parse(&self, text: &str) -> Result<Arc<T>> {
        self.get_or_try_insert_with(text, || text.parse())
    }
}

/// One allocation row as exported by the dashboard store.
#[derive(Debug, Clone, Deserialize)]
pub struct AllocationRow {
    pub id: String,
    pub resource_id: String,
    pub start_ms: i64,
    pub end_ms: i64,
    #[serde(default)]
    pub payload_ref: String,
    pub status: String,
}

/// Decodes bulk rows through shared caches.
#[derive(Debug)]
pub struct BatchDecoder {
    requirements: CatalogCache<SkillRequirement>,
    statuses: CatalogCache<AllocationStatus>,
}

impl BatchDecoder {
    /// Creates a decoder whose caches each retain at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            requirements: CatalogCache::new(capacity),
            statuses: CatalogCache::new(capacity),
        }
    }

    /// Decodes one `skill:level[*N]` requirement.
    pub fn requirement(&self, text: &str) -> Result<Arc<SkillRequirement>> {
        self.requirements.get_or_parse(text.trim())
    }

    /// Decodes a comma- or semicolon-separated requirement list.
    pub fn requirements(&self, text: &str) -> Result<Vec<SkillRequirement>> {
        text.split([',', ';'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| self.requirement(part).map(|r| (*r).clone()))
            .collect()
    }

    /// Decodes a status tag (case-insensitive).
    pub fn status(&self, text: &str) -> Result<AllocationStatus> {
        let key = text.trim().to_ascii_lowercase();
        self.statuses.get_or_parse(&key).map(|s| *s)
    }

    /// Decodes one allocation row.
    pub fn allocation(&self, row: &AllocationRow) -> Result<AllocationRecord> {
        let interval = TimeWindow::new(row.start_ms, row.end_ms)?;
        Ok(AllocationRecord::new(&row.id, &row.resource_id, interval)
            .with_payload(&row.payload_ref)
            .with_status(self.status(&row.status)?))
    }

    /// Decodes a JSON array of allocation rows.
    pub fn allocations_from_json(&self, json: &str) -> Result<Vec<AllocationRecord>> {
        let rows: Vec<AllocationRow> =
            serde_json::from_str(json).map_err(|e| EngineError::MalformedRow(e.to_string()))?;
        rows.iter().map(|row| self.allocation(row)).collect()
    }

    /// Requirement cache counters.
    pub fn requirement_stats(&self) -> CacheStats {
        self.requirements.stats()
    }

    /// Status cache counters.
    pub fn status_stats(&self) -> CacheStats {
        self.statuses.stats()
    }

    /// Drops both caches.
    pub fn clear(&self) {
        self.requirements.clear();
        self.statuses.clear();
    }
}
