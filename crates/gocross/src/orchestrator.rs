//! Running a [`TargetBuilder`] over many targets with a bounded worker pool,
//! per-target retries and a single shared report.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{instrument, warn};

use crate::config::OrchestrationConfig;
use crate::error::{BatchError, CompileError};
use crate::executor::{BuildOutcome, BuildRequest, TargetBuilder};
use crate::platform::TargetDescriptor;
use crate::process::CancellationToken;
use crate::reporter::{Reporter, TracingReporter};

pub const CANCELLED_REASON: &str = "cancelled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTarget {
    pub target: TargetDescriptor,
    pub reason: String,
}

#[derive(Debug)]
pub struct TargetFailure {
    pub target: TargetDescriptor,
    pub error: CompileError,
    /// Output of the last attempt.
    pub combined_output: String,
    pub attempts: u32,
}

/// A built binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub target: TargetDescriptor,
    pub path: PathBuf,
    /// `None` if the file could not be stat'ed after the build.
    pub size: Option<u64>,
    pub duration: Duration,
}

/// Where every target of a batch ended up. Each target is in exactly one
/// of `successful`, `skipped` or `failed`.
#[derive(Debug, Default)]
pub struct OrchestrationReport {
    pub successful: Vec<TargetDescriptor>,
    pub skipped: Vec<SkippedTarget>,
    pub failed: Vec<TargetFailure>,
    pub artifacts: Vec<Artifact>,
}

impl OrchestrationReport {
    pub fn total(&self) -> usize {
        self.successful.len() + self.skipped.len() + self.failed.len()
    }

    /// Skips do not count against the batch.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// `Err` if any target failed. The error keeps the whole report.
    pub fn into_result(self) -> Result<Self, BatchError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(BatchError {
            failures: self
                .failed
                .iter()
                .map(|f| (f.target.to_string(), f.error.to_string()))
                .collect(),
            report: Box::new(self),
        })
    }

    fn record(&mut self, target: TargetDescriptor, outcome: BuildOutcome, attempts: u32) {
        match outcome {
            BuildOutcome::Success { output_path, duration } => {
                let size = std::fs::metadata(&output_path).ok().map(|m| m.len());
                self.artifacts.push(Artifact {
                    target: target.clone(),
                    path: output_path,
                    size,
                    duration,
                });
                self.successful.push(target);
            }
            BuildOutcome::Skipped { reason } => self.skipped.push(SkippedTarget { target, reason }),
            BuildOutcome::Failed {
                error: CompileError::Cancelled,
                ..
            } => self.skipped.push(SkippedTarget {
                target,
                reason: CANCELLED_REASON.to_string(),
            }),
            BuildOutcome::Failed { error, combined_output } => self.failed.push(TargetFailure {
                target,
                error,
                combined_output,
                attempts,
            }),
        }
    }

    /// Put every list back in the order targets were given.
    fn sort_by_position(&mut self, targets: &[TargetDescriptor]) {
        let position: HashMap<&TargetDescriptor, usize> =
            targets.iter().enumerate().map(|(i, t)| (t, i)).collect();
        let key = |t: &TargetDescriptor| position.get(t).copied().unwrap_or(usize::MAX);

        self.successful.sort_by_key(|t| key(t));
        self.skipped.sort_by_key(|s| key(&s.target));
        self.failed.sort_by_key(|f| key(&f.target));
        self.artifacts.sort_by_key(|a| key(&a.target));
    }
}

/// Runs a batch of targets through a [`TargetBuilder`].
pub struct BuildOrchestrator {
    builder: Arc<dyn TargetBuilder>,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
}

impl BuildOrchestrator {
    pub fn new(builder: Arc<dyn TargetBuilder>) -> Self {
        Self {
            builder,
            reporter: Arc::new(TracingReporter),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that aborts the batch when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Build every target. Never fails as a whole; see
    /// [`OrchestrationReport::into_result`] for the batch verdict.
    #[instrument(skip_all, fields(targets = targets.len()))]
    pub fn run(
        &self,
        targets: &[TargetDescriptor],
        request: &BuildRequest,
        config: &OrchestrationConfig,
    ) -> OrchestrationReport {
        if config.clean_output && request.output_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&request.output_dir) {
                warn!(
                    dir = %request.output_dir.display(),
                    error = %e,
                    "Failed to clean output directory"
                );
            }
        }

        let workers = config.worker_count(targets.len());
        self.reporter.batch_started(targets, workers);

        let report = Mutex::new(OrchestrationReport::default());
        let next = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(target) = targets.get(index) else {
                        break;
                    };

                    let (outcome, attempts) = if self.cancel.is_cancelled() {
                        (BuildOutcome::skipped(CANCELLED_REASON), 0)
                    } else {
                        self.build_with_retry(target, request, config)
                    };

                    self.reporter.target_finished(target, &outcome, attempts);
                    report
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .record(target.clone(), outcome, attempts);
                });
            }
        });

        let mut report = report.into_inner().unwrap_or_else(PoisonError::into_inner);
        report.sort_by_position(targets);
        self.reporter.batch_finished(&report);
        report
    }

    /// Attempt `target` until it stops failing, runs out of retries or the
    /// batch is cancelled. Returns the last outcome and the attempt count.
    fn build_with_retry(
        &self,
        target: &TargetDescriptor,
        request: &BuildRequest,
        config: &OrchestrationConfig,
    ) -> (BuildOutcome, u32) {
        let mut attempt = 1;
        loop {
            self.reporter.attempt_started(target, attempt);
            let outcome = self.attempt(target, request);

            let retry = outcome.is_retryable()
                && attempt <= config.max_retries
                && !self.cancel.is_cancelled();
            if !retry {
                return (outcome, attempt);
            }

            let delay = config.backoff(attempt);
            if let BuildOutcome::Failed { error, .. } = &outcome {
                self.reporter.retrying(target, attempt + 1, delay, &error.to_string());
            }
            if !self.cancel.sleep(delay) {
                return (outcome, attempt);
            }
            attempt += 1;
        }
    }

    /// One attempt, with a panicking builder turned into a failure.
    fn attempt(&self, target: &TargetDescriptor, request: &BuildRequest) -> BuildOutcome {
        panic::catch_unwind(AssertUnwindSafe(|| self.builder.build(target, request, &self.cancel)))
            .unwrap_or_else(|payload| {
                BuildOutcome::failed(CompileError::Panicked(panic_message(payload.as_ref())))
            })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
