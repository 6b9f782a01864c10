//! Capability matching and allocation conflict engine.
//!
//! Decides which execution variant of a manufacturing task can run in a
//! time window given the skills and availability of a resource pool,
//! and keeps a per-resource ledger of committed allocations that flags
//! concurrency-limit conflicts.
//!
//! # Modules
//!
//! - **`models`**: Value types: `TimeWindow`, `SkillLevel`, `SkillRequirement`,
//!   `CapabilityProfile`, `ExecutionVariant`, `AllocationRecord`
//! - **`matching`**: Skill covering and variant selection (pure, lock-free)
//! - **`ledger`**: `AllocationLedger`, conflict detection, utilization and KPIs
//! - **`registry`**: Read-only resource/variant collaborator traits
//! - **`service`**: `MatchingEngine`, the synchronous service surface
//! - **`cache`**: Interning cache and bulk row decoder
//! - **`events`**: Advisory engine events and non-blocking sinks
//! - **`config`**, **`logging`**, **`validation`**, **`error`**
//!
//! # Architecture
//!
//! Matching is a pure function of immutable snapshots. The ledger is the
//! only shared mutable state and serializes writers per resource.
//! Persistence and event delivery belong to the embedding application.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Kuhn (1955), "The Hungarian Method for the Assignment Problem"

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod logging;
pub mod matching;
pub mod models;
pub mod registry;
pub mod service;
pub mod validation;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use service::{MatchingEngine, VariantResult};
