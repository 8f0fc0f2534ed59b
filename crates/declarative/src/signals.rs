//! Restart signals and the coordinator that collapses them
//!
//! Resources never act on services directly. A changed resource raises a
//! restart request against the services named by its triggers; the service
//! configuration raises a start request. Both accumulate in a [`SignalSet`]
//! for the length of one pass, and [`RestartCoordinator::resolve`] reduces a
//! service's requests to the actions actually run, once, after the last
//! resource.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why a restart was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalCause {
    /// The resource did not exist before this pass
    FirstWrite,
    /// The resource was modified or removed
    Changed,
}

/// One restart request raised by a changed resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartRequest {
    /// Id of the resource that raised it
    pub source: String,
    pub cause: SignalCause,
}

/// Requests accumulated for one service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pending {
    pub start: bool,
    pub restarts: Vec<RestartRequest>,
}

/// Per-pass accumulator of start/restart requests, keyed by service
#[derive(Debug, Clone, Default)]
pub struct SignalSet {
    services: BTreeMap<String, Pending>,
    provisioning: bool,
}

impl SignalSet {
    /// Mark the rest of the pass as first provisioning
    ///
    /// A freshly extracted distribution ships its own copies of files that
    /// are rendered later in the same pass. Rewriting them finishes the
    /// install rather than correcting drift, so from here on every request
    /// is recorded as a [`SignalCause::FirstWrite`].
    pub fn begin_provisioning(&mut self) {
        self.provisioning = true;
    }

    pub fn is_provisioning(&self) -> bool {
        self.provisioning
    }

    /// Ask for the service to be enabled and running after the pass
    pub fn request_start(&mut self, service: &str) {
        self.services.entry(service.to_string()).or_default().start = true;
    }

    /// Record that `source` changed and `service` depends on it
    pub fn request_restart(&mut self, service: &str, source: &str, cause: SignalCause) {
        let cause = if self.provisioning {
            SignalCause::FirstWrite
        } else {
            cause
        };
        log::debug!("{source} requests restart of {service} ({cause:?})");
        self.services
            .entry(service.to_string())
            .or_default()
            .restarts
            .push(RestartRequest {
                source: source.to_string(),
                cause,
            });
    }

    /// Requests for a service (empty if none were raised)
    pub fn pending(&self, service: &str) -> Pending {
        self.services.get(service).cloned().unwrap_or_default()
    }

    /// Total number of restart requests across all services
    pub fn restart_count(&self) -> usize {
        self.services.values().map(|p| p.restarts.len()).sum()
    }
}

/// An action run against a service at the end of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceAction {
    Enable,
    Start,
    /// Supported by service backends; never produced by the coordinator
    Stop,
    Restart,
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enable => write!(f, "enable"),
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Restart => write!(f, "restart"),
        }
    }
}

/// Observed state of a service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Registered to start at boot
    pub enabled: bool,
    pub running: bool,
}

/// Reduces a service's pending requests to its final action list
pub struct RestartCoordinator;

impl RestartCoordinator {
    /// Merge rule, applied once per service per pass:
    ///
    /// 1. A start request yields `[enable, start]` (enable only if needed).
    /// 2. Any effective restart request adds a single `restart` and removes
    ///    `start`; a restarted process is a fresh one.
    /// 3. A remaining `start` is dropped if the service already runs.
    ///
    /// A first write is an effective restart request only against a running
    /// service. On a stopped service it is part of first provisioning, which
    /// the start covers; that keeps a fresh install at exactly `[start]`.
    pub fn resolve(pending: Pending, status: ServiceStatus) -> Vec<ServiceAction> {
        let mut actions = Vec::new();

        if pending.start {
            if !status.enabled {
                actions.push(ServiceAction::Enable);
            }
            actions.push(ServiceAction::Start);
        }

        let restart = pending.restarts.iter().any(|r| match r.cause {
            SignalCause::Changed => true,
            SignalCause::FirstWrite => status.running,
        });

        if restart {
            actions.retain(|a| *a != ServiceAction::Start);
            actions.push(ServiceAction::Restart);
        } else if status.running {
            actions.retain(|a| *a != ServiceAction::Start);
        }

        actions
    }
}
