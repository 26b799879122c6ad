//! Progress callbacks for whoever renders the batch.
//!
//! The build core never writes to the console itself; it tells a
//! [`Reporter`], and the caller decides what that looks like.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::executor::BuildOutcome;
use crate::orchestrator::OrchestrationReport;
use crate::platform::TargetDescriptor;

/// Receives batch progress. Called from worker threads.
///
/// Every method has a no-op default.
pub trait Reporter: Send + Sync {
    fn batch_started(&self, _targets: &[TargetDescriptor], _workers: usize) {}

    fn attempt_started(&self, _target: &TargetDescriptor, _attempt: u32) {}

    fn retrying(
        &self,
        _target: &TargetDescriptor,
        _next_attempt: u32,
        _delay: Duration,
        _error: &str,
    ) {
    }

    fn warning(&self, _target: &TargetDescriptor, _message: &str) {}

    /// The final outcome of a target, after retries.
    fn target_finished(
        &self,
        _target: &TargetDescriptor,
        _outcome: &BuildOutcome,
        _attempts: u32,
    ) {
    }

    fn batch_finished(&self, _report: &OrchestrationReport) {}
}

/// Ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Turns progress into `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn batch_started(&self, targets: &[TargetDescriptor], workers: usize) {
        info!(targets = targets.len(), workers, "Starting batch");
    }

    fn attempt_started(&self, target: &TargetDescriptor, attempt: u32) {
        debug!(%target, attempt, "Building");
    }

    fn retrying(&self, target: &TargetDescriptor, next_attempt: u32, delay: Duration, error: &str) {
        warn!(%target, next_attempt, ?delay, %error, "Build failed, retrying");
    }

    fn warning(&self, target: &TargetDescriptor, message: &str) {
        warn!(%target, "{message}");
    }

    fn target_finished(&self, target: &TargetDescriptor, outcome: &BuildOutcome, attempts: u32) {
        match outcome {
            BuildOutcome::Success { output_path, duration } => {
                info!(%target, path = %output_path.display(), ?duration, attempts, "Built");
            }
            BuildOutcome::Skipped { reason } => info!(%target, %reason, "Skipped"),
            BuildOutcome::Failed { error, .. } => warn!(%target, %error, attempts, "Failed"),
        }
    }

    fn batch_finished(&self, report: &OrchestrationReport) {
        info!(
            successful = report.successful.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Batch finished"
        );
    }
}
