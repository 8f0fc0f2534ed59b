//! Service step - runs once, after every other resource

use anyhow::{Context, Result};
use declarative::{Pending, RestartCoordinator, ServiceAction};
use std::sync::Arc;

use crate::host::ServiceControl;

/// The init-managed service of the instance
///
/// Unlike the file resources this is not part of the plan: its actions
/// depend on every signal raised during the pass, so it is resolved by
/// [`RestartCoordinator`] once the pass is over.
#[derive(Debug, Clone)]
pub struct ServiceUnit {
    pub name: String,
    services: Arc<dyn ServiceControl>,
}

impl ServiceUnit {
    pub fn new(name: &str, services: Arc<dyn ServiceControl>) -> Self {
        Self {
            name: name.to_string(),
            services,
        }
    }

    /// Resolve the pending requests and run the resulting actions
    ///
    /// During a dry run the actions are only returned.
    pub fn converge(&self, pending: Pending, dry_run: bool) -> Result<Vec<ServiceAction>> {
        let status = self
            .services
            .status(&self.name)
            .with_context(|| format!("Failed to query service {}", self.name))?;
        let actions = RestartCoordinator::resolve(pending, status);
        log::debug!("service {}: {:?} -> {:?}", self.name, status, actions);

        if !dry_run {
            for action in &actions {
                self.services
                    .run(&self.name, *action)
                    .with_context(|| format!("Failed to {action} service {}", self.name))?;
            }
        }
        Ok(actions)
    }
}
