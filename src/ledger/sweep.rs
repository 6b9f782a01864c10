//! Concurrency sweep over half-open intervals.

use crate::models::TimeWindow;

/// Peak number of simultaneously open intervals inside `range`.
///
/// Intervals are clipped to `range` first. Ends are processed before
/// starts at the same instant, so touching intervals never stack.
pub(crate) fn peak_concurrency<'a, I>(range: &TimeWindow, intervals: I) -> u32
where
    I: IntoIterator<Item = &'a TimeWindow>,
{
    let mut events: Vec<(i64, i32)> = Vec::new();
    for w in intervals {
        if let Some(c) = w.clamp(range) {
            events.push((c.start_ms(), 1));
            events.push((c.end_ms(), -1));
        }
    }
    // (-1) sorts before (+1) at equal times
    events.sort_unstable();

    let mut open: i32 = 0;
    let mut peak: i32 = 0;
    for (_, delta) in events {
        open += delta;
        peak = peak.max(open);
    }
    peak as u32
}
