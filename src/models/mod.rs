//! Matching domain models.
//!
//! Plain immutable value types describing what a task needs and what a
//! resource offers. Every type is serde-serializable so registries can
//! hand snapshots across process boundaries.
//!
//! # Domain Mappings
//!
//! | u-match | Manufacturing | Healthcare | Logistics |
//! |---------|--------------|------------|-----------|
//! | ExecutionVariant | Routing alternative | Procedure protocol | Transport mode |
//! | CapabilityProfile | Operator/Cell/Machine | Staff/Room | Driver/Truck |
//! | AllocationRecord | Booked slot | Room booking | Dispatch |

mod allocation;
mod profile;
mod skill;
mod variant;
mod window;

pub use allocation::{AllocationRecord, AllocationStatus, UtilizationSample};
pub use profile::{CapabilityProfile, ResourceKind};
pub use skill::{SkillLevel, SkillRequirement};
pub use variant::ExecutionVariant;
pub use window::{TimeWindow, MAX_INSTANT_MS};
