//! Multi-threaded ledger stress tests.

use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use u_match::error::EngineError;
use u_match::ledger::AllocationLedger;
use u_match::models::{AllocationRecord, AllocationStatus, TimeWindow};

const THREADS: usize = 8;
const PER_THREAD: usize = 250;
const RESOURCES: [&str; 4] = ["Cell-1", "Cell-2", "Cell-3", "Robot-7"];

fn limits() -> Arc<HashMap<String, u32>> {
    Arc::new(
        RESOURCES
            .iter()
            .zip([1u32, 2, 3, 1])
            .map(|(id, limit)| (id.to_string(), limit))
            .collect(),
    )
}

/// Peak overlap among non-conflicted occupying records.
fn clean_peak(records: &[AllocationRecord]) -> u32 {
    let clean: Vec<&AllocationRecord> = records
        .iter()
        .filter(|r| r.status.is_occupying() && r.status != AllocationStatus::Conflicted)
        .collect();
    clean
        .iter()
        .map(|candidate| {
            let t = candidate.interval.start_ms();
            clean.iter().filter(|r| r.interval.contains(t)).count() as u32
        })
        .max()
        .unwrap_or(0)
}

#[test]
fn parallel_adds_keep_clean_records_within_limit() {
    u_match::logging::init_test();
    let ledger = Arc::new(AllocationLedger::new(limits()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(0x5EED + t as u64);
                barrier.wait();
                for i in 0..PER_THREAD {
                    let resource = RESOURCES[rng.random_range(0..RESOURCES.len())];
                    let start = rng.random_range(0..24 * 60) as i64 * 60_000;
                    let len = rng.random_range(5..120) as i64 * 60_000;
                    let window = TimeWindow::new(start, start + len).unwrap();
                    ledger
                        .add(AllocationRecord::new(format!("T{t}-{i}"), resource, window))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(ledger.len(), THREADS * PER_THREAD);
    let mut total = 0;
    for rid in RESOURCES {
        let records = ledger.records_for(rid);
        let limit = ledger.limit_for(rid).unwrap();
        assert!(clean_peak(&records) <= limit, "{rid} over limit");
        assert_eq!(ledger.revision(rid), records.len() as u64);
        total += records.len();
    }
    assert_eq!(total, THREADS * PER_THREAD);
}

#[test]
fn revision_guard_admits_one_writer() {
    let ledger = Arc::new(AllocationLedger::new(limits()));
    let window = TimeWindow::new(0, 3_600_000).unwrap();

    for round in 0..50 {
        let expected = ledger.revision("Cell-2");
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|w| {
                let ledger = Arc::clone(&ledger);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    ledger.add_expecting(
                        AllocationRecord::new(format!("R{round}-{w}"), "Cell-2", window),
                        expected,
                    )
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let stale = results
            .iter()
            .filter(|r| matches!(r, Err(EngineError::ConcurrentModification { .. })))
            .count();
        assert_eq!((ok, stale), (1, 1), "round {round}");
        assert_eq!(ledger.revision("Cell-2"), expected + 1);
    }
}
