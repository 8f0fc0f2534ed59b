//! The `create` operation: one convergence pass over an instance

use anyhow::{Context, Result};
use declarative::{
    ExecuteOptions, ExecuteSummary, ProgressCallback, ResourceDiff, RestartRequest,
    ServiceAction, SignalSet, converge,
};

use crate::config::InstanceConfig;
use crate::descriptors::DesiredState;
use crate::graph;
use crate::host::Host;
use crate::resource::ServiceUnit;

/// Outcome of the service step
#[derive(Debug, Clone)]
pub struct ServiceReport {
    pub name: String,
    /// Actions run (or, in a dry run, that would run), in order
    pub actions: Vec<ServiceAction>,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub summary: ExecuteSummary,
    /// Restart requests raised during the pass
    pub restart_requests: Vec<RestartRequest>,
    /// `None` when `start_service` is off
    pub service: Option<ServiceReport>,
}

/// Converge the host to the instance described by `config`
///
/// The configuration is validated and every file rendered before the
/// first resource is probed. The pass stops at the first failing
/// resource; the service step runs only after a complete pass.
pub fn create<P: ProgressCallback>(
    config: &InstanceConfig,
    host: &Host,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Result<Report> {
    config.validate()?;

    let desired = DesiredState::build(config);
    let plan = graph::build(config, &desired, host)?;
    let service = desired.service_name.as_str();
    log::debug!("{} resources planned for {service}", plan.len());

    let mut signals = SignalSet::default();
    if config.start_service {
        signals.request_start(service);
    }

    let summary = converge(&plan, opts, &mut signals, progress)?;
    let pending = signals.pending(service);
    let restart_requests = pending.restarts.clone();

    let service_report = if config.start_service {
        let unit = ServiceUnit::new(service, host.services.clone());
        let actions = unit.converge(pending, opts.dry_run)?;
        Some(ServiceReport {
            name: service.to_string(),
            actions,
        })
    } else {
        if !restart_requests.is_empty() {
            log::info!(
                "start_service is off; not restarting {service} ({} change(s) pending)",
                restart_requests.len()
            );
        }
        None
    };

    Ok(Report {
        summary,
        restart_requests,
        service: service_report,
    })
}

/// Probe every planned resource and list the ones that differ
///
/// Never touches the host. Unlike a dry-run `create`, every probe runs even
/// after an earlier resource reported a difference.
pub fn diff(config: &InstanceConfig, host: &Host) -> Result<Vec<ResourceDiff>> {
    config.validate()?;

    let desired = DesiredState::build(config);
    let plan = graph::build(config, &desired, host)?;

    let mut diffs = Vec::new();
    for resource in plan.iter() {
        let diff = ResourceDiff::from_resource(resource).with_context(|| {
            format!("Failed to probe {}[{}]", resource.resource_type(), resource.id())
        })?;
        diffs.extend(diff);
    }
    Ok(diffs)
}
