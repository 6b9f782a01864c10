//! Capability matching: skill covering and execution-variant selection.
//!
//! Everything here is a pure function of immutable snapshots passed in
//! by the caller, so it can run concurrently without locking.
//!
//! # Usage
//!
//! ```
//! use u_match::matching::{SelectionOptions, VariantSelector};
//! use u_match::models::{
//!     CapabilityProfile, ExecutionVariant, SkillLevel, SkillRequirement, TimeWindow,
//! };
//!
//! let variants = vec![ExecutionVariant::new("V1", "T1", 30)
//!     .unwrap()
//!     .with_requirement(SkillRequirement::single("welding", SkillLevel::Basic))];
//! let pool = vec![CapabilityProfile::operator("W1").with_skill("welding", SkillLevel::Expert)];
//! let window = TimeWindow::from_minutes(0, 30).unwrap();
//!
//! let selection = VariantSelector::new()
//!     .select_optimal(&variants, &pool, &window, &SelectionOptions::default())
//!     .unwrap();
//! assert_eq!(selection.variant().map(|v| v.id.as_str()), Some("V1"));
//! ```

mod catalog;
pub mod rules;
mod selector;

pub use catalog::{RequirementCover, SkillCatalog, SkillCoverage, SkillShortfall};
pub use rules::{TieBreakPolicy, VariantRule};
pub use selector::{
    CellMatch, Infeasibility, Selection, SelectionOptions, VariantRejection, VariantSelector,
};
