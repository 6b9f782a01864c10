//! Allocation record model.
//!
//! An allocation commits a resource to a time slot for some payload
//! (typically a task/variant pair). Records are owned by the
//! [`AllocationLedger`](crate::ledger::AllocationLedger); only status
//! changes after creation.
//!
//! # Lifecycle
//! ```text
//! planned → confirmed → active → completed
//!    │          │         │
//!    └──────────┴─────────┴──→ conflicted ──→ confirmed
//! ```
//! Any non-completed record may be removed (cancellation).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::TimeWindow;
use crate::error::{EngineError, Result};

/// Allocation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    Planned,
    Confirmed,
    Active,
    Completed,
    Conflicted,
}

impl AllocationStatus {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Planned => "planned",
            AllocationStatus::Confirmed => "confirmed",
            AllocationStatus::Active => "active",
            AllocationStatus::Completed => "completed",
            AllocationStatus::Conflicted => "conflicted",
        }
    }

    /// Whether the record still holds its resource (everything but completed).
    pub fn is_occupying(&self) -> bool {
        !matches!(self, AllocationStatus::Completed)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: AllocationStatus) -> bool {
        use AllocationStatus::*;
        matches!(
            (self, next),
            (Planned, Confirmed)
                | (Confirmed, Active)
                | (Active, Completed)
                | (Planned | Confirmed | Active, Conflicted)
                | (Conflicted, Confirmed)
        )
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planned" => Ok(AllocationStatus::Planned),
            "confirmed" => Ok(AllocationStatus::Confirmed),
            "active" => Ok(AllocationStatus::Active),
            "completed" => Ok(AllocationStatus::Completed),
            "conflicted" => Ok(AllocationStatus::Conflicted),
            _ => Err(EngineError::UnknownStatus(s.to_string())),
        }
    }
}

/// A resource committed to a time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    /// Unique allocation identifier.
    pub id: String,
    /// Allocated resource.
    pub resource_id: String,
    /// Occupied interval.
    pub interval: TimeWindow,
    /// Opaque reference to what is being done (task/variant id, order line...).
    pub payload_ref: String,
    /// Lifecycle status.
    pub status: AllocationStatus,
}

impl AllocationRecord {
    /// Creates a planned allocation.
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        interval: TimeWindow,
    ) -> Self {
        Self {
            id: id.into(),
            resource_id: resource_id.into(),
            interval,
            payload_ref: String::new(),
            status: AllocationStatus::Planned,
        }
    }

    /// Sets the payload reference.
    pub fn with_payload(mut self, payload_ref: impl Into<String>) -> Self {
        self.payload_ref = payload_ref.into();
        self
    }

    /// Sets the initial status.
    pub fn with_status(mut self, status: AllocationStatus) -> Self {
        self.status = status;
        self
    }
}

/// Derived occupancy of one resource over one slot. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationSample {
    /// Resource measured.
    pub resource_id: String,
    /// Slot measured.
    pub slot: TimeWindow,
    /// Occupied fraction clamped to [0, 1] for reporting.
    pub occupied_fraction: f64,
    /// Unclamped occupied fraction; above 1.0 means overload.
    pub raw_fraction: f64,
    /// Peak number of simultaneous allocations inside the slot.
    pub concurrent_count: u32,
    /// Peak concurrency exceeds the limit, or demand exceeds capacity.
    pub is_over_capacity: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use AllocationStatus::*;

    #[test]
    fn test_transitions() {
        assert!(Planned.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Planned.can_transition_to(Conflicted));
        assert!(Active.can_transition_to(Conflicted));
        assert!(Conflicted.can_transition_to(Confirmed));

        assert!(!Planned.can_transition_to(Active));
        assert!(!Completed.can_transition_to(Conflicted));
        assert!(!Completed.can_transition_to(Planned));
        assert!(!Conflicted.can_transition_to(Active));
        assert!(!Conflicted.can_transition_to(Conflicted));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Confirmed".parse::<AllocationStatus>(), Ok(Confirmed));
        assert!("cancelled".parse::<AllocationStatus>().is_err());
        for s in [Planned, Confirmed, Active, Completed, Conflicted] {
            assert_eq!(s.as_str().parse::<AllocationStatus>(), Ok(s));
        }
    }

    #[test]
    fn test_record_builder() {
        let r = AllocationRecord::new("A1", "Cell-1", TimeWindow::new(0, 10).unwrap())
            .with_payload("T1/V2")
            .with_status(Confirmed);
        assert_eq!(r.resource_id, "Cell-1");
        assert_eq!(r.payload_ref, "T1/V2");
        assert_eq!(r.status, Confirmed);
        assert!(r.status.is_occupying());
        assert!(!Completed.is_occupying());
    }
}
