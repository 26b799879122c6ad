//! Error taxonomy for target resolution, toolchain discovery and builds.
//!
//! Only [`ValidationError`] stops a run before any work starts. Everything
//! else is contained within the target that produced it and ends up in the
//! [`OrchestrationReport`](crate::OrchestrationReport).

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::orchestrator::OrchestrationReport;
use crate::toolchain::ToolchainFamily;

/// A target specifier could not be turned into concrete targets.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no target specifiers given")]
    Empty,

    #[error("malformed target specifier {0:?}: expected <os>/<arch>")]
    Malformed(String),

    #[error("unknown target or group {0:?}")]
    UnknownSpecifier(String),

    #[error("unsupported target {0:?}: not in the supported platform matrix")]
    Unsupported(String),

    #[error(
        "{os:?} does not support the host architecture {arch:?} \
         (pass all_arches to build every architecture)"
    )]
    HostArchUnsupported { os: String, arch: String },
}

impl ValidationError {
    /// The specifier that caused the error, if there was one.
    pub fn specifier(&self) -> Option<&str> {
        match self {
            ValidationError::Empty => None,
            ValidationError::Malformed(s)
            | ValidationError::UnknownSpecifier(s)
            | ValidationError::Unsupported(s) => Some(s),
            ValidationError::HostArchUnsupported { os, .. } => Some(os),
        }
    }
}

/// No usable cross toolchain could be found for a target.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolchainError {
    #[error("{target} does not need a cross toolchain")]
    NotRequired { target: String },

    #[error("toolchain path {} does not exist", .0.display())]
    MissingPath(PathBuf),

    #[error("{} is not a valid {family} root (missing {})", .path.display(), .missing.join(", "))]
    InvalidRoot {
        family: ToolchainFamily,
        path: PathBuf,
        missing: Vec<String>,
    },

    #[error("no {family} found for {target} (searched {})", display_paths(.searched))]
    NotFound {
        family: ToolchainFamily,
        target: String,
        searched: Vec<PathBuf>,
    },
}

/// Building one target failed.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {}", describe_exit(.exit_code))]
    NonZeroExit {
        program: String,
        exit_code: Option<i32>,
    },

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("builder panicked: {0}")]
    Panicked(String),
}

impl CompileError {
    /// Whether another attempt could reasonably produce a different result.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CompileError::Cancelled)
    }
}

/// The compression post-step failed. Logged only; never fails a target.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to compress {}: {reason}", .path.display())]
pub struct PostProcessError {
    pub path: PathBuf,
    pub reason: String,
}

/// The terminal error of a batch: one or more targets failed.
///
/// Carries the full report, so successes, skips, artifacts and build output
/// are still available to the caller.
#[derive(Debug, Error)]
#[error("{} target(s) failed: {}", .failures.len(), summarize(.failures))]
pub struct BatchError {
    /// `(target name, error summary)` for each failed target.
    pub failures: Vec<(String, String)>,
    pub report: Box<OrchestrationReport>,
}

impl BatchError {
    pub fn report(&self) -> &OrchestrationReport {
        &self.report
    }

    pub fn into_report(self) -> OrchestrationReport {
        *self.report
    }
}

/// Errors surfaced by the top-level [`build_targets`](crate::build_targets) entry point.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("go toolchain is not usable: {0:#}")]
    GoUnavailable(anyhow::Error),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

fn summarize(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(target, error)| format!("[{target}] {error}"))
        .collect::<Vec<_>>()
        .join("; ")
}
