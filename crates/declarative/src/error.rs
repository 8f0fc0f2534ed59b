//! Errors raised while converging a plan

use std::fmt;

/// The step of a resource that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reading the current state
    Probe,
    /// Changing the resource
    Apply,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probe => write!(f, "probe"),
            Self::Apply => write!(f, "apply"),
        }
    }
}

/// A convergence pass aborted on a failing resource
///
/// Resources applied before the failure keep their changes; the next pass
/// re-probes them.
#[derive(Debug, thiserror::Error)]
#[error("{resource_type}[{resource_id}] failed to {phase}: {cause:#}")]
pub struct ConvergeError {
    pub resource_type: String,
    pub resource_id: String,
    pub phase: Phase,
    /// Changes applied earlier in the same pass
    pub applied: usize,
    pub cause: anyhow::Error,
}
