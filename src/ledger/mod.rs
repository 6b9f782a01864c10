//! Allocation ledger: the one piece of shared mutable state.
//!
//! Records committed resources to time slots, flags conflicts against
//! each resource's concurrency limit, and answers utilization queries.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use u_match::ledger::AllocationLedger;
//! use u_match::models::{AllocationRecord, AllocationStatus, TimeWindow};
//! use u_match::registry::UniformCapacity;
//!
//! let ledger = AllocationLedger::new(Arc::new(UniformCapacity(1)));
//! let hour = 3_600_000;
//! ledger.add(AllocationRecord::new("A1", "Cell-1", TimeWindow::new(9 * hour, 10 * hour).unwrap())).unwrap();
//! let report = ledger
//!     .add(AllocationRecord::new("A2", "Cell-1", TimeWindow::new(9 * hour + hour / 2, 11 * hour).unwrap()))
//!     .unwrap();
//! assert!(report.conflicted);
//! assert_eq!(ledger.get("A1").unwrap().status, AllocationStatus::Conflicted);
//! ```

mod allocation_ledger;
mod kpi;
mod sweep;

pub use allocation_ledger::{AllocationLedger, ConflictReport};
pub use kpi::LedgerKpi;
