//! Time window model.
//!
//! # Time Model
//! All times are in milliseconds relative to a scheduling epoch.
//! The consumer defines what epoch means (shift start, midnight UTC, ...).
//!
//! Windows are half-open `[start, end)`: touching endpoints do not overlap.
//! Instants are bounded to ±[`MAX_INSTANT_MS`] so durations, sums of a
//! few durations, and slot arithmetic never overflow `i64`.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

const MS_PER_MINUTE: i64 = 60_000;

/// Largest accepted instant magnitude (about 73 million years).
pub const MAX_INSTANT_MS: i64 = i64::MAX / 4;

/// An immutable time interval [start, end).
///
/// Construction rejects empty and inverted intervals, so every
/// `TimeWindow` in the engine has a strictly positive duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct TimeWindow {
    start_ms: i64,
    end_ms: i64,
}

#[derive(Deserialize)]
struct RawWindow {
    start_ms: i64,
    end_ms: i64,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = EngineError;

    fn try_from(raw: RawWindow) -> Result<Self> {
        Self::new(raw.start_ms, raw.end_ms)
    }
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Errors
    /// `InvalidInterval` when `start_ms >= end_ms` or either instant lies
    /// outside ±[`MAX_INSTANT_MS`].
    pub fn new(start_ms: i64, end_ms: i64) -> Result<Self> {
        let in_range = |t: i64| (-MAX_INSTANT_MS..=MAX_INSTANT_MS).contains(&t);
        if start_ms >= end_ms || !in_range(start_ms) || !in_range(end_ms) {
            return Err(EngineError::InvalidInterval { start_ms, end_ms });
        }
        Ok(Self { start_ms, end_ms })
    }

    /// Creates a window of `minutes` starting at `start_ms`.
    pub fn from_minutes(start_ms: i64, minutes: u32) -> Result<Self> {
        let end_ms = start_ms
            .checked_add(i64::from(minutes) * MS_PER_MINUTE)
            .ok_or(EngineError::InvalidInterval {
                start_ms,
                end_ms: i64::MAX,
            })?;
        Self::new(start_ms, end_ms)
    }

    /// Interval start (ms, inclusive).
    #[inline]
    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    /// Interval end (ms, exclusive).
    #[inline]
    pub fn end_ms(&self) -> i64 {
        self.end_ms
    }

    /// Duration of this window (ms).
    #[inline]
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Duration of this window in minutes.
    #[inline]
    pub fn duration_minutes(&self) -> f64 {
        self.duration_ms() as f64 / MS_PER_MINUTE as f64
    }

    /// Whether a timestamp falls within this window.
    #[inline]
    pub fn contains(&self, time_ms: i64) -> bool {
        time_ms >= self.start_ms && time_ms < self.end_ms
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_ms < other.end_ms && other.start_ms < self.end_ms
    }

    /// Intersection of two windows, or `None` if they are disjoint.
    pub fn clamp(&self, other: &Self) -> Option<Self> {
        let start = self.start_ms.max(other.start_ms);
        let end = self.end_ms.min(other.end_ms);
        (end > start).then_some(Self {
            start_ms: start,
            end_ms: end,
        })
    }

    /// Overlap duration in ms (0 if disjoint).
    pub fn overlap_ms(&self, other: &Self) -> i64 {
        self.clamp(other).map_or(0, |w| w.duration_ms())
    }

    /// Splits the window into consecutive slots of `slot_minutes`.
    ///
    /// The last slot is truncated at `end_ms`. A zero slot size yields
    /// the whole window as a single slot.
    pub fn split(&self, slot_minutes: u32) -> Vec<Self> {
        let step = i64::from(slot_minutes) * MS_PER_MINUTE;
        if step == 0 {
            return vec![*self];
        }

        let mut slots = Vec::new();
        let mut cursor = self.start_ms;
        while cursor < self.end_ms {
            let end = (cursor + step).min(self.end_ms);
            slots.push(Self {
                start_ms: cursor,
                end_ms: end,
            });
            cursor = end;
        }
        slots
    }
}

/// Total length (ms) covered by the union of `windows`, restricted to `range`.
///
/// Overlapping windows are merged first so shared time is counted once.
pub(crate) fn covered_ms(range: &TimeWindow, windows: &[TimeWindow]) -> i64 {
    let mut parts: Vec<TimeWindow> = windows.iter().filter_map(|w| w.clamp(range)).collect();
    parts.sort_by_key(|w| w.start_ms);

    let mut total = 0;
    let mut current: Option<(i64, i64)> = None;
    for w in parts {
        current = match current {
            Some((s, e)) if w.start_ms <= e => Some((s, e.max(w.end_ms))),
            Some((s, e)) => {
                total += e - s;
                Some((w.start_ms, w.end_ms))
            }
            None => Some((w.start_ms, w.end_ms)),
        };
    }
    if let Some((s, e)) = current {
        total += e - s;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(start: i64, end: i64) -> TimeWindow {
        TimeWindow::new(start, end).unwrap()
    }

    #[test]
    fn test_time_window() {
        let tw = w(100, 200);
        assert_eq!(tw.duration_ms(), 100);
        assert!(tw.contains(100));
        assert!(tw.contains(199));
        assert!(!tw.contains(200)); // exclusive end
        assert!(!tw.contains(50));
    }

    #[test]
    fn test_invalid_interval() {
        assert_eq!(
            TimeWindow::new(200, 100),
            Err(EngineError::InvalidInterval {
                start_ms: 200,
                end_ms: 100
            })
        );
        assert!(TimeWindow::new(100, 100).is_err());
    }

    #[test]
    fn test_time_window_overlap() {
        let a = w(0, 100);
        let b = w(50, 150);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(a.overlaps(&a));

        let c = w(100, 200); // touching but not overlapping
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn test_duration_minutes() {
        let tw = TimeWindow::from_minutes(0, 90).unwrap();
        assert_eq!(tw.end_ms(), 5_400_000);
        assert!((tw.duration_minutes() - 90.0).abs() < 1e-10);
        assert!(TimeWindow::from_minutes(0, 0).is_err());
    }

    #[test]
    fn test_clamp() {
        let a = w(0, 100);
        assert_eq!(a.clamp(&w(50, 150)), Some(w(50, 100)));
        assert_eq!(a.clamp(&w(20, 30)), Some(w(20, 30)));
        assert_eq!(a.clamp(&w(100, 150)), None);
        assert_eq!(a.overlap_ms(&w(90, 150)), 10);
        assert_eq!(a.overlap_ms(&w(200, 300)), 0);
    }

    #[test]
    fn test_split() {
        let tw = TimeWindow::from_minutes(0, 150).unwrap();
        let slots = tw.split(60);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0], TimeWindow::from_minutes(0, 60).unwrap());
        assert!((slots[2].duration_minutes() - 30.0).abs() < 1e-10);
        assert_eq!(slots[2].end_ms(), tw.end_ms());

        assert_eq!(tw.split(0), vec![tw]);
    }

    #[test]
    fn test_covered_ms_merges_overlaps() {
        let range = w(0, 100);
        let windows = [w(10, 30), w(20, 40), w(90, 150), w(200, 300)];
        // [10,40) + [90,100)
        assert_eq!(covered_ms(&range, &windows), 40);
        assert_eq!(covered_ms(&range, &[]), 0);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: TimeWindow = serde_json::from_str(r#"{"start_ms":0,"end_ms":10}"#).unwrap();
        assert_eq!(ok, w(0, 10));

        let bad: std::result::Result<TimeWindow, _> =
            serde_json::from_str(r#"{"start_ms":10,"end_ms":10}"#);
        assert!(bad.is_err());

        let wide: std::result::Result<TimeWindow, _> =
            serde_json::from_str(&format!(r#"{{"start_ms":{},"end_ms":{}}}"#, i64::MIN, i64::MAX));
        assert!(wide.is_err());
    }

    #[test]
    fn test_extreme_instants() {
        assert!(TimeWindow::new(i64::MIN, i64::MAX).is_err());
        assert!(TimeWindow::new(0, MAX_INSTANT_MS + 1).is_err());
        assert!(TimeWindow::from_minutes(i64::MAX - 1, 1).is_err());
        assert!(TimeWindow::from_minutes(MAX_INSTANT_MS, 1).is_err());

        let widest = w(-MAX_INSTANT_MS, MAX_INSTANT_MS);
        assert_eq!(widest.duration_ms(), 2 * MAX_INSTANT_MS);
        assert!(widest.duration_minutes() > 0.0);
        assert_eq!(widest.overlap_ms(&widest), widest.duration_ms());
        assert_eq!(covered_ms(&widest, &[widest, widest]), widest.duration_ms());

        let near_end = w(MAX_INSTANT_MS - 90 * MS_PER_MINUTE, MAX_INSTANT_MS);
        let slots = near_end.split(u32::MAX);
        assert_eq!(slots, vec![near_end]);
        assert_eq!(near_end.split(60).len(), 2);
    }
}
