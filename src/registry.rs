//! Read-only collaborator interfaces and in-memory implementations.
//!
//! The engine never owns resources or variants: a persistence layer
//! supplies snapshots through these traits. The in-memory registries
//! are suitable for tests, batch tools and embedding; production
//! deployments back the traits with their own store.

use dashmap::DashMap;
use std::collections::HashMap;

use crate::models::{CapabilityProfile, ExecutionVariant};

/// Concurrency limits per resource, as declared by the capability registry.
pub trait CapacityLookup: Send + Sync {
    /// Declared `max_concurrent_tasks`, or `None` if the resource is unknown.
    fn max_concurrent_tasks(&self, resource_id: &str) -> Option<u32>;
}

/// Supplies capability profile snapshots.
pub trait ResourceRegistry: CapacityLookup {
    /// Snapshot of one profile.
    fn profile(&self, resource_id: &str) -> Option<CapabilityProfile>;

    /// Snapshot of every profile, ordered by id.
    fn profiles(&self) -> Vec<CapabilityProfile>;
}

/// Supplies the execution variants of a task.
pub trait VariantRegistry: Send + Sync {
    /// Variants of `task_id`, or `None` if the task is unknown.
    fn variants_for(&self, task_id: &str) -> Option<Vec<ExecutionVariant>>;
}

impl CapacityLookup for HashMap<String, u32> {
    fn max_concurrent_tasks(&self, resource_id: &str) -> Option<u32> {
        self.get(resource_id).copied()
    }
}

/// Same limit for every resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformCapacity(pub u32);

impl CapacityLookup for UniformCapacity {
    fn max_concurrent_tasks(&self, _resource_id: &str) -> Option<u32> {
        Some(self.0)
    }
}

/// In-memory resource registry.
#[derive(Debug, Default)]
pub struct InMemoryResourceRegistry {
    profiles: DashMap<String, CapabilityProfile>,
}

impl InMemoryResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a profile; returns the previous snapshot.
    pub fn upsert(&self, profile: CapabilityProfile) -> Option<CapabilityProfile> {
        self.profiles.insert(profile.id.clone(), profile)
    }

    /// Removes a profile.
    pub fn remove(&self, resource_id: &str) -> Option<CapabilityProfile> {
        self.profiles.remove(resource_id).map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<CapabilityProfile> for InMemoryResourceRegistry {
    fn from_iter<I: IntoIterator<Item = CapabilityProfile>>(iter: I) -> Self {
        let registry = Self::new();
        for profile in iter {
            registry.upsert(profile);
        }
        registry
    }
}

impl CapacityLookup for InMemoryResourceRegistry {
    fn max_concurrent_tasks(&self, resource_id: &str) -> Option<u32> {
        self.profiles
            .get(resource_id)
            .map(|p| p.max_concurrent_tasks)
    }
}

impl ResourceRegistry for InMemoryResourceRegistry {
    fn profile(&self, resource_id: &str) -> Option<CapabilityProfile> {
        self.profiles.get(resource_id).map(|p| p.clone())
    }

    fn profiles(&self) -> Vec<CapabilityProfile> {
        let mut all: Vec<CapabilityProfile> =
            self.profiles.iter().map(|p| p.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

/// In-memory variant registry keyed by task id.
#[derive(Debug, Default)]
pub struct InMemoryVariantRegistry {
    by_task: DashMap<String, Vec<ExecutionVariant>>,
}

impl InMemoryVariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variant under its `task_id`, replacing one with the same id.
    pub fn register(&self, variant: ExecutionVariant) {
        let mut variants = self.by_task.entry(variant.task_id.clone()).or_default();
        variants.retain(|v| v.id != variant.id);
        variants.push(variant);
    }

    /// Registers a task with no variants (an upstream integrity problem).
    pub fn register_task(&self, task_id: impl Into<String>) {
        self.by_task.entry(task_id.into()).or_default();
    }
}

impl FromIterator<ExecutionVariant> for InMemoryVariantRegistry {
    fn from_iter<I: IntoIterator<Item = ExecutionVariant>>(iter: I) -> Self {
        let registry = Self::new();
        for variant in iter {
            registry.register(variant);
        }
        registry
    }
}

impl VariantRegistry for InMemoryVariantRegistry {
    fn variants_for(&self, task_id: &str) -> Option<Vec<ExecutionVariant>> {
        self.by_task.get(task_id).map(|v| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkillLevel;

    #[test]
    fn test_resource_registry() {
        let registry: InMemoryResourceRegistry = [
            CapabilityProfile::cell("Cell-2").with_max_concurrent(2),
            CapabilityProfile::operator("W1").with_skill("welding", SkillLevel::Basic),
        ]
        .into_iter()
        .collect();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.max_concurrent_tasks("Cell-2"), Some(2));
        assert_eq!(registry.max_concurrent_tasks("W1"), Some(1));
        assert_eq!(registry.max_concurrent_tasks("nope"), None);
        assert_eq!(
            registry.profiles().iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            vec!["Cell-2", "W1"]
        );

        let previous = registry.upsert(CapabilityProfile::cell("Cell-2"));
        assert_eq!(previous.map(|p| p.max_concurrent_tasks), Some(2));
        assert!(registry.remove("W1").is_some());
        assert!(registry.profile("W1").is_none());
    }

    #[test]
    fn test_variant_registry() {
        let registry: InMemoryVariantRegistry = [
            ExecutionVariant::new("V1", "T1", 60).unwrap().primary(),
            ExecutionVariant::new("V2", "T1", 30).unwrap(),
            ExecutionVariant::new("V1", "T1", 45).unwrap(),
        ]
        .into_iter()
        .collect();

        let variants = registry.variants_for("T1").unwrap();
        assert_eq!(variants.len(), 2);
        assert!(variants.iter().any(|v| v.id == "V1" && v.duration_minutes == 45));
        assert!(registry.variants_for("T2").is_none());

        registry.register_task("T2");
        assert_eq!(registry.variants_for("T2"), Some(Vec::new()));
    }

    #[test]
    fn test_hashmap_capacity() {
        let mut limits = HashMap::new();
        limits.insert("Cell-1".to_string(), 3);
        assert_eq!(limits.max_concurrent_tasks("Cell-1"), Some(3));
        assert_eq!(UniformCapacity(2).max_concurrent_tasks("anything"), Some(2));
    }
}
