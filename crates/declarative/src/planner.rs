//! Execution planner - holds the ordered resource graph for one pass

use crate::resource::{BoxedResource, Resource};

/// An ordered execution plan
///
/// Resources are applied strictly in insertion order, so a resource may
/// rely on everything added before it (a directory before the files in it,
/// a user before the files it owns).
pub struct ExecutionPlan {
    resources: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
        }
    }

    /// Append a resource to the plan
    ///
    /// A resource is identified by its type and id together: a user and a
    /// group may share a name, a directory and the install in it a path.
    pub fn add(&mut self, resource: BoxedResource) {
        debug_assert!(
            !self.resources.iter().any(|r| {
                r.resource_type() == resource.resource_type() && r.id() == resource.id()
            }),
            "duplicate resource {}[{}]",
            resource.resource_type(),
            resource.id()
        );
        self.resources.push(resource);
    }

    /// Resources in execution order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Resource> {
        self.resources.iter().map(AsRef::as_ref)
    }

    /// Resource ids in execution order
    pub fn ids(&self) -> Vec<String> {
        self.iter().map(Resource::id).collect()
    }

    /// Total number of resources in the plan
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::new()
    }
}
