//! # Declarative
//!
//! A framework for declarative resource management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, converging a host to match the desired state,
//! and collapsing the restart requests raised along the way into a single
//! service action.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed (files, directories, users)
//! - **ResourceState**: The current or desired state of a resource
//! - **Trigger**: A declared edge from a resource to a service it must restart on change
//! - **ExecutionPlan**: The ordered resource graph for one convergence pass
//! - **SignalSet**: Per-pass accumulator of start/restart requests
//! - **RestartCoordinator**: Reduces a service's requests to its final action list
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     ApplyContext, ApplyResult, ExecuteOptions, ExecutionPlan, NoProgress, Resource,
//!     ResourceState, RestartCoordinator, ServiceStatus, SignalSet, Trigger, converge,
//! };
//!
//! #[derive(Debug)]
//! struct FileResource { path: String, content: String }
//!
//! impl Resource for FileResource {
//!     fn id(&self) -> String { self.path.clone() }
//!     fn description(&self) -> String { format!("File: {}", self.path) }
//!     fn resource_type(&self) -> &'static str { "file" }
//!
//!     fn current_state(&self) -> anyhow::Result<ResourceState> {
//!         if std::path::Path::new(&self.path).exists() {
//!             Ok(ResourceState::Present { details: None })
//!         } else {
//!             Ok(ResourceState::Absent)
//!         }
//!     }
//!
//!     fn desired_state(&self) -> ResourceState {
//!         ResourceState::Present { details: None }
//!     }
//!
//!     fn apply(&self, _ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
//!         std::fs::write(&self.path, &self.content)?;
//!         Ok(ApplyResult::Created)
//!     }
//!
//!     fn triggers(&self) -> Vec<Trigger> {
//!         vec![Trigger::restart("web")]
//!     }
//! }
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add(Box::new(FileResource { path: "/tmp/app.conf".into(), content: "x".into() }));
//!
//! let mut signals = SignalSet::default();
//! signals.request_start("web");
//! converge(&plan, &ExecuteOptions::default(), &mut signals, &mut NoProgress)?;
//!
//! let actions = RestartCoordinator::resolve(signals.pending("web"), ServiceStatus::default());
//! ```
//!
//! ## Provider Traits
//!
//! - [`ProgressCallback`]: Receives progress updates during a pass
//!
//! Resources carry their own handles to whatever host capabilities they
//! need, so the engine itself never touches the filesystem or services.

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod signals;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyContext, NoProgress, ProgressCallback};
pub use diff::ResourceDiff;
pub use error::{ConvergeError, Phase};
pub use executor::converge;
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Resource, Trigger};
pub use signals::{
    Pending, RestartCoordinator, RestartRequest, ServiceAction, ServiceStatus, SignalCause,
    SignalSet,
};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, ResourceState};
