//! System group and user resources

use anyhow::Result;
use std::sync::Arc;

use super::{ApplyContext, ApplyResult, Resource, ResourceState};
use crate::host::Accounts;

/// Login shell of the service account
const NO_LOGIN_SHELL: &str = "/bin/false";

#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    accounts: Arc<dyn Accounts>,
}

impl Group {
    pub fn new(name: &str, accounts: Arc<dyn Accounts>) -> Self {
        Self {
            name: name.to_string(),
            accounts,
        }
    }
}

impl Resource for Group {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        format!("System group {}", self.name)
    }

    fn resource_type(&self) -> &'static str {
        "group"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.accounts.group_exists(&self.name)? {
            Ok(ResourceState::Present { details: None })
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present { details: None }
    }

    fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if self.accounts.group_exists(&self.name)? {
            return Ok(ApplyResult::NoChange);
        }
        self.accounts.create_group(&self.name)?;
        Ok(ApplyResult::Created)
    }
}

/// A system user with no login shell
#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub group: String,
    accounts: Arc<dyn Accounts>,
}

impl User {
    pub fn new(name: &str, group: &str, accounts: Arc<dyn Accounts>) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            accounts,
        }
    }
}

impl Resource for User {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        format!("System user {} (group {})", self.name, self.group)
    }

    fn resource_type(&self) -> &'static str {
        "user"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.accounts.user_exists(&self.name)? {
            Ok(ResourceState::Present { details: None })
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present { details: None }
    }

    fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if self.accounts.user_exists(&self.name)? {
            return Ok(ApplyResult::NoChange);
        }
        self.accounts
            .create_user(&self.name, &self.group, NO_LOGIN_SHELL)?;
        Ok(ApplyResult::Created)
    }
}
