//! Execution engine - walks a plan once, in order, collecting restart signals

use crate::context::{ApplyContext, ProgressCallback};
use crate::diff::ResourceDiff;
use crate::error::{ConvergeError, Phase};
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::signals::{SignalCause, SignalSet};
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};

/// Converge every resource of a plan
///
/// Resources are processed sequentially in plan order. A changed resource
/// raises a restart request on each of its triggers; the caller resolves
/// those once the pass is over. A created resource that
/// [provisions](Resource::provisions) turns every later request of the pass
/// into a first write. The first failing resource aborts the pass,
/// leaving earlier changes in place.
///
/// With `opts.dry_run`, resources are only probed: each difference is
/// reported with the result applying it would produce, and signals are
/// raised as if it had been applied.
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `opts` - Execution options (dry_run, verbose)
/// * `signals` - Accumulator for this pass
/// * `progress` - Progress callback
///
/// # Returns
/// Summary of execution results
pub fn converge<P: ProgressCallback>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    signals: &mut SignalSet,
    progress: &mut P,
) -> Result<ExecuteSummary, ConvergeError> {
    let mut summary = ExecuteSummary::default();
    progress.on_batch_start(plan.len());

    for resource in plan.iter() {
        let id = resource.id();
        progress.on_resource_start(&id, &resource.description());

        let outcome = if opts.dry_run {
            predict_resource(resource)
        } else {
            apply_resource(resource, opts.verbose)
        };
        let result = outcome.map_err(|(phase, cause)| ConvergeError {
            resource_type: resource.resource_type().to_string(),
            resource_id: id.clone(),
            phase,
            applied: summary.total_changes(),
            cause,
        })?;

        if result == ApplyResult::Created && resource.provisions() {
            signals.begin_provisioning();
        }
        if let Some(cause) = signal_cause(&result) {
            for trigger in resource.triggers() {
                signals.request_restart(&trigger.target, &id, cause);
            }
        }

        log::debug!("{}[{}]: {:?}", resource.resource_type(), id, result);
        summary.add_result(&result);
        progress.on_resource_complete(&id, &result);
    }

    progress.on_batch_complete();
    Ok(summary)
}

/// Apply a single resource, probing it first
///
/// A resource already in its desired state is not applied at all.
fn apply_resource(
    resource: &dyn Resource,
    verbose: bool,
) -> Result<ApplyResult, (Phase, anyhow::Error)> {
    if !resource.needs_apply().map_err(|e| (Phase::Probe, e))? {
        return Ok(ApplyResult::NoChange);
    }
    let mut ctx = ApplyContext::new(verbose);
    resource.apply(&mut ctx).map_err(|e| (Phase::Apply, e))
}

/// Predict what applying a single resource would do
fn predict_resource(resource: &dyn Resource) -> Result<ApplyResult, (Phase, anyhow::Error)> {
    let diff = ResourceDiff::from_resource(resource).map_err(|e| (Phase::Probe, e))?;
    Ok(diff.map_or(ApplyResult::NoChange, |d| d.predicted_result()))
}

fn signal_cause(result: &ApplyResult) -> Option<SignalCause> {
    match result {
        ApplyResult::Created => Some(SignalCause::FirstWrite),
        ApplyResult::Modified | ApplyResult::Removed => Some(SignalCause::Changed),
        ApplyResult::NoChange | ApplyResult::Skipped { .. } => None,
    }
}
