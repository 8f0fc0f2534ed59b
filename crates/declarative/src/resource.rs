//! Resource trait for declarative state management
//!
//! A Resource represents something that can be in a certain state,
//! and can be changed to reach a desired state.

use crate::context::ApplyContext;
use crate::types::{ApplyResult, ResourceState};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource in the system implements this trait, which provides:
/// - Identity (id, description, type)
/// - State detection (current vs desired)
/// - State convergence (apply)
/// - Trigger edges to services that must restart when it changes
///
/// # Example
///
/// ```ignore
/// use declarative::{Resource, ResourceState, ApplyResult, ApplyContext};
///
/// #[derive(Debug)]
/// struct FileResource {
///     path: String,
///     content: String,
/// }
///
/// impl Resource for FileResource {
///     fn id(&self) -> String {
///         self.path.clone()
///     }
///
///     fn description(&self) -> String {
///         format!("Ensure file exists at {}", self.path)
///     }
///
///     fn resource_type(&self) -> &'static str {
///         "file"
///     }
///
///     fn current_state(&self) -> Result<ResourceState> {
///         if std::path::Path::new(&self.path).exists() {
///             Ok(ResourceState::Present { details: None })
///         } else {
///             Ok(ResourceState::Absent)
///         }
///     }
///
///     fn desired_state(&self) -> ResourceState {
///         ResourceState::Present { details: None }
///     }
///
///     fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
///         std::fs::write(&self.path, &self.content)?;
///         Ok(ApplyResult::Created)
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identifier for this resource
    ///
    /// This should be stable and uniquely identify the resource
    /// within a plan. Examples:
    /// - "/opt/tomcat/conf/server.xml" for a rendered file
    /// - "tomcat" for a system user
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category
    ///
    /// Used for grouping and error reporting. Examples:
    /// - "directory", "template", "link"
    /// - "user", "group"
    fn resource_type(&self) -> &'static str;

    /// Detect the current state of this resource
    ///
    /// This should query the system to determine what state
    /// the resource is currently in.
    fn current_state(&self) -> Result<ResourceState>;

    /// Get the desired state for this resource
    ///
    /// This is typically derived from configuration.
    fn desired_state(&self) -> ResourceState;

    /// Check if the resource needs changes to reach desired state
    ///
    /// Default implementation compares current and desired states.
    fn needs_apply(&self) -> Result<bool> {
        let current = self.current_state()?;
        let desired = self.desired_state();
        Ok(current != desired)
    }

    /// Apply changes to reach the desired state
    ///
    /// This method should:
    /// 1. Check if already in desired state (return NoChange)
    /// 2. Make the necessary changes
    /// 3. Return the appropriate ApplyResult
    ///
    /// It is never called during a dry run.
    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;

    /// Services to signal when this resource changes
    fn triggers(&self) -> Vec<Trigger> {
        Vec::new()
    }

    /// Whether creating this resource lays down a fresh install
    ///
    /// Once such a resource reports `Created`, the rest of the pass is
    /// first provisioning: see [`crate::SignalSet::begin_provisioning`].
    fn provisions(&self) -> bool {
        false
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// A declared "restart on change" edge from a resource to a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Identity of the service to restart
    pub target: String,
}

impl Trigger {
    pub fn restart(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}
