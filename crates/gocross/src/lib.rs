//! Build a single Go program for many `GOOS`/`GOARCH` targets at once.
//!
//! Targets are given as specifiers (`linux/amd64`, `desktop`, `all`, ...),
//! expanded by [`TargetResolver`], and built by a pool of workers. Targets
//! that need cgo get a cross C toolchain (Android NDK or clang) located by
//! [`ToolchainResolver`]; targets whose toolchain cannot be found are skipped
//! rather than failed.
//!
//! ```no_run
//! use gocross::{build_targets, BuildRequest, OrchestrationConfig};
//!
//! let request = BuildRequest::new("main.go", "dist", "app");
//! let config = OrchestrationConfig::default();
//! let report = build_targets(&["desktop", "android/arm64"], request, &config)?;
//! for artifact in &report.artifacts {
//!     println!("{} -> {}", artifact.target, artifact.path.display());
//! }
//! # Ok::<(), gocross::Error>(())
//! ```

mod compiler;
mod compress;
mod config;
mod error;
mod executor;
mod host;
mod logging;
mod orchestrator;
mod platform;
mod process;
mod reporter;
mod resolve;

pub mod toolchain;

use std::sync::Arc;

use tracing::{info, instrument};

pub use compiler::{parse_dist_list, GoFlags, GoToolchain};
pub use compress::{gz_path, Compressor, GzipCompressor, UpxCompressor};
pub use config::{binary_name_from_source, BuildConfig, OrchestrationConfig, ProjectConfig};
pub use error::{BatchError, CompileError, Error, PostProcessError, ToolchainError, ValidationError};
pub use executor::{BuildOutcome, BuildRequest, SingleBuildExecutor, TargetBuilder, STATIC_LDFLAGS};
pub use host::HostPlatform;
pub use logging::{default_directive, setup_logging};
pub use orchestrator::{
    Artifact, BuildOrchestrator, OrchestrationReport, SkippedTarget, TargetFailure,
    CANCELLED_REASON,
};
pub use platform::{
    group, group_names, known_platforms, policy_for, FfiMode, PlatformPolicy, TargetDescriptor,
};
pub use process::{CancellationToken, CommandRunner, Invocation, ProcessOutput, SystemRunner};
pub use reporter::{NullReporter, Reporter, TracingReporter};
pub use resolve::{PlatformCatalog, PlatformSource, ResolveOptions, StaticPlatforms, TargetResolver};
pub use toolchain::{Interaction, ToolchainLocator, ToolchainResolver};

/// Knobs for [`build_targets_with`] that are not part of the project config.
pub struct RunOptions {
    pub interaction: Interaction,
    pub reporter: Arc<dyn Reporter>,
    pub cancel: CancellationToken,
    pub resolve: ResolveOptions,
    /// Replaces the filesystem toolchain lookup.
    pub toolchains: Option<Arc<dyn ToolchainLocator>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            interaction: Interaction::NonInteractive,
            reporter: Arc::new(TracingReporter),
            cancel: CancellationToken::new(),
            resolve: ResolveOptions::default(),
            toolchains: None,
        }
    }
}

/// Resolve `specifiers` and build every resulting target.
///
/// Fails up front on a bad specifier or an unusable `go`; otherwise every
/// target is attempted and the batch fails only if a target failed.
/// Skipped targets do not fail the batch.
pub fn build_targets<S: AsRef<str>>(
    specifiers: &[S],
    request: BuildRequest,
    orchestration: &OrchestrationConfig,
) -> Result<OrchestrationReport, Error> {
    build_targets_with(specifiers, request, orchestration, RunOptions::default())
}

/// [`build_targets`] with explicit [`RunOptions`].
#[instrument(skip_all, fields(source = %request.source.display()))]
pub fn build_targets_with<S: AsRef<str>>(
    specifiers: &[S],
    request: BuildRequest,
    orchestration: &OrchestrationConfig,
    options: RunOptions,
) -> Result<OrchestrationReport, Error> {
    let host = HostPlatform::current();
    let go = GoToolchain::from_config(&request.config);

    let resolver = TargetResolver::new(PlatformCatalog::new(go.clone()), host.clone())
        .with_options(options.resolve);
    let targets = resolver.resolve(specifiers)?;

    let version = go.verify().map_err(Error::GoUnavailable)?;
    info!(%version, targets = targets.len(), "Building");

    let mut executor = SingleBuildExecutor::new(go, host)
        .with_reporter(options.reporter.clone())
        .with_interaction(options.interaction);
    if let Some(toolchains) = options.toolchains {
        executor = executor.with_toolchains(toolchains);
    }

    let report = BuildOrchestrator::new(Arc::new(executor))
        .with_reporter(options.reporter)
        .with_cancellation(options.cancel)
        .run(&targets, &request, orchestration);

    Ok(report.into_result()?)
}
