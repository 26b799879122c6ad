//! Building one target: gatekeeping, toolchain setup, `go build`, post-step.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use crate::compiler::{GoFlags, GoToolchain};
use crate::compress::{Compressor, UpxCompressor};
use crate::config::BuildConfig;
use crate::error::CompileError;
use crate::host::HostPlatform;
use crate::platform::{FfiMode, TargetDescriptor};
use crate::process::{CancellationToken, CommandRunner, Invocation, SystemRunner};
use crate::reporter::{Reporter, TracingReporter};
use crate::toolchain::{
    Interaction, ToolchainEnv, ToolchainFamily, ToolchainLocator, ToolchainResolver,
};

/// ldflags used for targets that prefer static linking when the user gave none.
pub const STATIC_LDFLAGS: &str = "-linkmode=external -extldflags=-static";

/// Result of one build attempt.
#[derive(Debug)]
pub enum BuildOutcome {
    Success {
        output_path: PathBuf,
        duration: Duration,
    },
    /// Deliberately not built. Never retried.
    Skipped {
        reason: String,
    },
    Failed {
        error: CompileError,
        combined_output: String,
    },
}

impl BuildOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        BuildOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(error: CompileError) -> Self {
        BuildOutcome::Failed {
            error,
            combined_output: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success { .. })
    }

    /// Whether the orchestrator may try again after this outcome.
    pub fn is_retryable(&self) -> bool {
        match self {
            BuildOutcome::Failed { error, .. } => error.is_retryable(),
            _ => false,
        }
    }
}

/// What to build, shared by every target of a batch.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub binary_name: String,
    pub config: BuildConfig,
}

impl BuildRequest {
    pub fn new(
        source: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        binary_name: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            binary_name: binary_name.into(),
            config: BuildConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }
}

/// Builds a single target. One call is one attempt.
pub trait TargetBuilder: Send + Sync {
    fn build(
        &self,
        target: &TargetDescriptor,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> BuildOutcome;
}

/// The `go build` implementation of [`TargetBuilder`].
pub struct SingleBuildExecutor {
    go: GoToolchain,
    host: HostPlatform,
    toolchains: Arc<dyn ToolchainLocator>,
    runner: Arc<dyn CommandRunner>,
    /// `None` packs with UPX, using the request's `upx_binary`.
    compressor: Option<Arc<dyn Compressor>>,
    reporter: Arc<dyn Reporter>,
    interaction: Interaction,
}

impl SingleBuildExecutor {
    pub fn new(go: GoToolchain, host: HostPlatform) -> Self {
        Self {
            toolchains: Arc::new(ToolchainResolver::new(host.clone())),
            go,
            host,
            runner: Arc::new(SystemRunner),
            compressor: None,
            reporter: Arc::new(TracingReporter),
            interaction: Interaction::NonInteractive,
        }
    }

    pub fn with_toolchains(mut self, toolchains: Arc<dyn ToolchainLocator>) -> Self {
        self.toolchains = toolchains;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_interaction(mut self, interaction: Interaction) -> Self {
        self.interaction = interaction;
        self
    }

    /// Decide whether and how `target` is built. `Err` is a skip reason.
    fn prepare(
        &self,
        target: &TargetDescriptor,
        request: &BuildRequest,
    ) -> Result<Invocation, String> {
        let config = &request.config;
        let policy = target.policy();
        let family = policy.ffi_family_on(&self.host);

        if config.skip_ffi && family.is_some() {
            return Err(format!(
                "{target} needs a cross C toolchain and FFI targets are being skipped"
            ));
        }

        if !policy.host_allowed(&self.host) {
            let required = policy.required_host.unwrap_or_default();
            if !config.force {
                return Err(format!(
                    "{target} can only be built on a {required} host (this is {})",
                    self.host
                ));
            }
            self.reporter.warning(
                target,
                &format!("building {target} on a non-{required} host because force is set"),
            );
        }

        let mut toolchain_env = None;
        let cgo = match (policy.ffi, family) {
            (FfiMode::Off | FfiMode::PortableBytecode, _) => false,
            (FfiMode::Required(_), None) => true,
            (FfiMode::Required(_), Some(_)) if config.disable_ffi => false,
            (FfiMode::Required(_), Some(family)) => {
                let explicit = match family {
                    ToolchainFamily::AndroidNdk => config.toolchain_path.as_deref(),
                    ToolchainFamily::Clang => None,
                };
                let lookup = self.toolchains.find_best_toolchain(
                    target,
                    explicit,
                    &config.toolchain_policy(&self.interaction),
                );
                match lookup {
                    Ok(candidate) => {
                        if !candidate.verified {
                            self.reporter.warning(
                                target,
                                &format!(
                                    "{} at {} could not be verified",
                                    family,
                                    candidate.path.display()
                                ),
                            );
                        }
                        debug!(%target, path = %candidate.path.display(), "Using {family}");
                        toolchain_env = Some(candidate.child_env(target, &self.host));
                        true
                    }
                    Err(err) if config.force => {
                        self.reporter.warning(
                            target,
                            &format!(
                                "{err}; building without a verified toolchain because force is set"
                            ),
                        );
                        true
                    }
                    Err(err) => return Err(err.to_string()),
                }
            }
        };

        let ldflags = match config.user_ldflags() {
            Some(user) => Some(user),
            None if cgo && policy.prefer_static_link => Some(STATIC_LDFLAGS),
            None => None,
        };

        let flags = GoFlags {
            ldflags,
            tags: config.user_tags(),
            print_commands: config.verbosity >= 2,
        };
        let output = target.output_path(&request.output_dir, &request.binary_name);
        let mut inv = self
            .go
            .build_invocation(target, &request.source, &output, &flags)
            .env("CGO_ENABLED", if cgo { "1" } else { "0" });

        if let Some(env) = toolchain_env {
            apply_toolchain_env(&mut inv, env);
        }
        Ok(inv)
    }
}

fn apply_toolchain_env(inv: &mut Invocation, env: ToolchainEnv) {
    inv.env_remove.extend(env.remove);
    inv.env_remove_prefixes.extend(env.remove_prefixes);
    inv.env.extend(env.vars);

    if let Some(prefix) = env.path_prefix {
        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let paths = std::iter::once(prefix).chain(std::env::split_paths(&inherited));
        match std::env::join_paths(paths) {
            Ok(joined) => {
                inv.env.insert("PATH".into(), os_to_string(joined));
            }
            Err(e) => tracing::warn!(error = %e, "Could not extend PATH for the toolchain"),
        }
    }
}

fn os_to_string(s: OsString) -> String {
    s.into_string()
        .unwrap_or_else(|s| s.to_string_lossy().into_owned())
}

impl TargetBuilder for SingleBuildExecutor {
    #[instrument(level = "debug", skip_all, fields(target = %target))]
    fn build(
        &self,
        target: &TargetDescriptor,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> BuildOutcome {
        let started = Instant::now();

        let inv = match self.prepare(target, request) {
            Ok(inv) => inv,
            Err(reason) => return BuildOutcome::skipped(reason),
        };

        let output = target.output_path(&request.output_dir, &request.binary_name);
        if let Some(dir) = output.parent() {
            if let Err(source) = std::fs::create_dir_all(dir) {
                return BuildOutcome::failed(CompileError::OutputDir {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        }

        debug!(command = %inv, "Running go build");
        let result = match self.runner.run(&inv, request.config.attempt_timeout, cancel) {
            Ok(result) => result,
            Err(error) => return BuildOutcome::failed(error),
        };

        if !result.success {
            return BuildOutcome::Failed {
                error: CompileError::NonZeroExit {
                    program: self.go.binary().to_string(),
                    exit_code: result.exit_code,
                },
                combined_output: result.combined,
            };
        }

        if request.config.compress {
            let upx;
            let compressor: &dyn Compressor = match &self.compressor {
                Some(c) => c.as_ref(),
                None => {
                    upx = UpxCompressor::new(request.config.upx_binary.clone());
                    &upx
                }
            };
            if let Err(err) = compressor.compress(&output, self.runner.as_ref(), cancel) {
                self.reporter.warning(target, &err.to_string());
            }
        }

        BuildOutcome::Success {
            output_path: output,
            duration: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PostProcessError, ToolchainError};
    use crate::process::ProcessOutput;
    use crate::toolchain::{
        CandidateOrigin, ToolchainCandidate, ToolchainFamily, ToolchainKind, ToolchainPolicy,
    };
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<Invocation>>,
        fail_with: Option<i32>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(
            &self,
            inv: &Invocation,
            _: Option<Duration>,
            _: &CancellationToken,
        ) -> Result<ProcessOutput, CompileError> {
            self.calls.lock().unwrap().push(inv.clone());
            Ok(match self.fail_with {
                Some(code) => ProcessOutput {
                    exit_code: Some(code),
                    success: false,
                    combined: "main.go:3:1: syntax error".into(),
                },
                None => ProcessOutput {
                    exit_code: Some(0),
                    success: true,
                    combined: String::new(),
                },
            })
        }
    }

    impl RecordingRunner {
        fn only_call(&self) -> Invocation {
            let calls = self.calls.lock().unwrap();
            assert_eq!(calls.len(), 1);
            calls[0].clone()
        }
    }

    enum FakeLocator {
        Found(ToolchainCandidate),
        Missing,
    }

    impl ToolchainLocator for FakeLocator {
        fn find_best_toolchain(
            &self,
            target: &TargetDescriptor,
            _: Option<&Path>,
            _: &ToolchainPolicy,
        ) -> Result<ToolchainCandidate, ToolchainError> {
            match self {
                FakeLocator::Found(c) => Ok(c.clone()),
                FakeLocator::Missing => Err(ToolchainError::NotFound {
                    family: ToolchainFamily::AndroidNdk,
                    target: target.to_string(),
                    searched: vec![],
                }),
            }
        }
    }

    struct FailingCompressor;

    impl Compressor for FailingCompressor {
        fn compress(
            &self,
            binary: &Path,
            _: &dyn CommandRunner,
            _: &CancellationToken,
        ) -> Result<(), PostProcessError> {
            Err(PostProcessError {
                path: binary.to_path_buf(),
                reason: "disk full".into(),
            })
        }
    }

    fn executor(
        host: HostPlatform,
        runner: Arc<RecordingRunner>,
        locator: FakeLocator,
    ) -> SingleBuildExecutor {
        SingleBuildExecutor::new(GoToolchain::default(), host)
            .with_runner(runner)
            .with_toolchains(Arc::new(locator))
            .with_reporter(Arc::new(crate::reporter::NullReporter))
    }

    fn linux_host() -> HostPlatform {
        HostPlatform::new("linux", "amd64")
    }

    fn request(dir: &Path) -> BuildRequest {
        BuildRequest::new("main.go", dir.join("dist"), "app")
    }

    fn ndk_candidate(root: &Path) -> ToolchainCandidate {
        ToolchainCandidate {
            path: root.to_path_buf(),
            family: ToolchainFamily::AndroidNdk,
            kind: ToolchainKind::NdkClang,
            target_triple_prefix: "aarch64-linux-android".into(),
            host_platform: "linux-x86_64".into(),
            api_level: Some(21),
            compiler: Some(root.join("bin/aarch64-linux-android21-clang")),
            origin: CandidateOrigin::Scan,
            verified: true,
            version: None,
        }
    }

    #[test]
    fn test_plain_target_builds_without_cgo() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(linux_host(), runner.clone(), FakeLocator::Missing);

        let outcome = exec.build(
            &TargetDescriptor::new("windows", "amd64"),
            &request(tmp.path()),
            &CancellationToken::new(),
        );

        match outcome {
            BuildOutcome::Success { output_path, .. } => {
                assert_eq!(output_path, tmp.path().join("dist/windows/amd64/app.exe"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(tmp.path().join("dist/windows/amd64").is_dir());

        let inv = runner.only_call();
        assert_eq!(inv.env["GOOS"], "windows");
        assert_eq!(inv.env["GOARCH"], "amd64");
        assert_eq!(inv.env["CGO_ENABLED"], "0");
        assert!(!inv.args.contains(&"-ldflags".to_string()));
    }

    #[test]
    fn test_wasm_never_enables_cgo() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(linux_host(), runner.clone(), FakeLocator::Missing);
        let outcome = exec.build(
            &TargetDescriptor::new("js", "wasm"),
            &request(tmp.path()),
            &CancellationToken::new(),
        );
        assert!(outcome.is_success());
        assert_eq!(runner.only_call().env["CGO_ENABLED"], "0");
    }

    #[test]
    fn test_skip_ffi_gate() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(
            linux_host(),
            runner.clone(),
            FakeLocator::Found(ndk_candidate(tmp.path())),
        );
        let mut req = request(tmp.path());
        req.config.skip_ffi = true;

        let outcome = exec.build(
            &TargetDescriptor::new("android", "arm64"),
            &req,
            &CancellationToken::new(),
        );
        assert!(matches!(outcome, BuildOutcome::Skipped { .. }));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_toolchain_skips() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(linux_host(), runner.clone(), FakeLocator::Missing);

        let outcome = exec.build(
            &TargetDescriptor::new("android", "arm64"),
            &request(tmp.path()),
            &CancellationToken::new(),
        );
        match outcome {
            BuildOutcome::Skipped { reason } => assert!(reason.contains("no Android NDK found")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_only_failures_are_retryable() {
        assert!(!BuildOutcome::skipped("no toolchain").is_retryable());
        assert!(!BuildOutcome::failed(CompileError::Cancelled).is_retryable());
        let timed_out = CompileError::TimedOut(Duration::from_secs(1));
        assert!(BuildOutcome::failed(timed_out).is_retryable());
    }

    #[test]
    fn test_missing_toolchain_with_force_builds_anyway() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(linux_host(), runner.clone(), FakeLocator::Missing);
        let mut req = request(tmp.path());
        req.config.force = true;

        let outcome = exec.build(
            &TargetDescriptor::new("android", "arm64"),
            &req,
            &CancellationToken::new(),
        );
        assert!(outcome.is_success());
        let inv = runner.only_call();
        assert_eq!(inv.env["CGO_ENABLED"], "1");
        assert!(!inv.env.contains_key("CC"));
    }

    #[test]
    fn test_android_uses_toolchain_env_and_static_link() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(
            linux_host(),
            runner.clone(),
            FakeLocator::Found(ndk_candidate(tmp.path())),
        );

        let outcome = exec.build(
            &TargetDescriptor::new("android", "arm64"),
            &request(tmp.path()),
            &CancellationToken::new(),
        );
        assert!(outcome.is_success());

        let inv = runner.only_call();
        assert_eq!(inv.env["CGO_ENABLED"], "1");
        assert!(inv.env["CC"].ends_with("aarch64-linux-android21-clang"));
        assert_eq!(inv.env["ANDROID_NDK_HOME"], tmp.path().display().to_string());
        assert_eq!(inv.env_remove_prefixes, vec!["ANDROID_"]);
        let at = inv.args.iter().position(|a| a == "-ldflags").unwrap();
        assert_eq!(inv.args[at + 1], STATIC_LDFLAGS);
    }

    #[test]
    fn test_user_ldflags_win_over_static_link() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(
            linux_host(),
            runner.clone(),
            FakeLocator::Found(ndk_candidate(tmp.path())),
        );
        let mut req = request(tmp.path());
        req.config.ldflags = Some("-s -w".into());

        exec.build(&TargetDescriptor::new("android", "arm64"), &req, &CancellationToken::new());
        let inv = runner.only_call();
        let at = inv.args.iter().position(|a| a == "-ldflags").unwrap();
        assert_eq!(inv.args[at + 1], "-s -w");
    }

    #[test]
    fn test_disable_ffi_builds_android_without_cgo() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(linux_host(), runner.clone(), FakeLocator::Missing);
        let mut req = request(tmp.path());
        req.config.disable_ffi = true;

        let outcome = exec.build(
            &TargetDescriptor::new("android", "arm64"),
            &req,
            &CancellationToken::new(),
        );
        assert!(outcome.is_success());
        let inv = runner.only_call();
        assert_eq!(inv.env["CGO_ENABLED"], "0");
        assert!(!inv.args.contains(&"-ldflags".to_string()));
    }

    #[test]
    fn test_ios_needs_darwin_host() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(linux_host(), runner.clone(), FakeLocator::Missing);

        let outcome = exec.build(
            &TargetDescriptor::new("ios", "arm64"),
            &request(tmp.path()),
            &CancellationToken::new(),
        );
        match outcome {
            BuildOutcome::Skipped { reason } => assert!(reason.contains("darwin host")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_zero_exit_keeps_output() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner {
            fail_with: Some(2),
            ..Default::default()
        });
        let exec = executor(linux_host(), runner, FakeLocator::Missing);

        let outcome = exec.build(
            &TargetDescriptor::new("linux", "arm64"),
            &request(tmp.path()),
            &CancellationToken::new(),
        );
        match outcome {
            BuildOutcome::Failed { error, combined_output } => {
                assert!(matches!(error, CompileError::NonZeroExit { exit_code: Some(2), .. }));
                assert!(combined_output.contains("syntax error"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_output_dir_failure_is_failed() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("dist");
        std::fs::write(&blocker, "not a directory").unwrap();

        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(linux_host(), runner.clone(), FakeLocator::Missing);
        let outcome = exec.build(
            &TargetDescriptor::new("linux", "amd64"),
            &request(tmp.path()),
            &CancellationToken::new(),
        );

        assert!(matches!(
            outcome,
            BuildOutcome::Failed {
                error: CompileError::OutputDir { .. },
                ..
            }
        ));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_compression_failure_keeps_success() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(linux_host(), runner, FakeLocator::Missing)
            .with_compressor(Arc::new(FailingCompressor));
        let mut req = request(tmp.path());
        req.config.compress = true;

        let outcome = exec.build(
            &TargetDescriptor::new("linux", "amd64"),
            &req,
            &CancellationToken::new(),
        );
        match outcome {
            BuildOutcome::Success { output_path, .. } => {
                assert_eq!(output_path, tmp.path().join("dist/linux/amd64/app"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_default_compression_packs_binary_in_place() {
        let tmp = TempDir::new().unwrap();
        let binary = tmp.path().join("dist/linux/amd64/app");
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(&binary, "built").unwrap();

        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(linux_host(), runner.clone(), FakeLocator::Missing);
        let mut req = request(tmp.path());
        req.config.compress = true;
        req.config.upx_binary = "/opt/upx/upx".into();

        let outcome = exec.build(
            &TargetDescriptor::new("linux", "amd64"),
            &req,
            &CancellationToken::new(),
        );
        match outcome {
            BuildOutcome::Success { output_path, .. } => assert_eq!(output_path, binary),
            other => panic!("unexpected {other:?}"),
        }

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].program, "/opt/upx/upx");
        assert_eq!(calls[1].args, vec!["--best".to_string(), binary.display().to_string()]);
        assert!(binary.is_file());
    }

    /// Remembers the explicit path each lookup was given.
    #[derive(Default)]
    struct ExplicitSeen(Mutex<Vec<Option<PathBuf>>>);

    impl ToolchainLocator for ExplicitSeen {
        fn find_best_toolchain(
            &self,
            target: &TargetDescriptor,
            explicit: Option<&Path>,
            _: &ToolchainPolicy,
        ) -> Result<ToolchainCandidate, ToolchainError> {
            self.0.lock().unwrap().push(explicit.map(Path::to_path_buf));
            Err(ToolchainError::NotFound {
                family: ToolchainFamily::Clang,
                target: target.to_string(),
                searched: vec![],
            })
        }
    }

    #[test]
    fn test_toolchain_path_only_overrides_the_ndk() {
        let tmp = TempDir::new().unwrap();
        let seen = Arc::new(ExplicitSeen::default());
        let exec =
            SingleBuildExecutor::new(GoToolchain::default(), HostPlatform::new("darwin", "arm64"))
                .with_runner(Arc::new(RecordingRunner::default()))
                .with_toolchains(seen.clone())
                .with_reporter(Arc::new(crate::reporter::NullReporter));
        let mut req = request(tmp.path());
        req.config.toolchain_path = Some(tmp.path().join("ndk"));

        exec.build(&TargetDescriptor::new("ios", "arm64"), &req, &CancellationToken::new());
        exec.build(&TargetDescriptor::new("android", "arm64"), &req, &CancellationToken::new());

        assert_eq!(*seen.0.lock().unwrap(), vec![None, Some(tmp.path().join("ndk"))]);
    }

    #[test]
    fn test_high_verbosity_prints_go_commands() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let exec = executor(linux_host(), runner.clone(), FakeLocator::Missing);
        let mut req = request(tmp.path());

        req.config.verbosity = 1;
        exec.build(&TargetDescriptor::new("linux", "amd64"), &req, &CancellationToken::new());
        req.config.verbosity = 2;
        exec.build(&TargetDescriptor::new("linux", "amd64"), &req, &CancellationToken::new());

        let calls = runner.calls.lock().unwrap();
        assert!(!calls[0].args.contains(&"-x".to_string()));
        assert_eq!(calls[1].args[..2], ["build".to_string(), "-x".to_string()]);
    }

    #[test]
    fn test_mingw_prefix_goes_first_on_path() {
        let mut inv = Invocation::new("go");
        apply_toolchain_env(
            &mut inv,
            ToolchainEnv {
                path_prefix: Some(PathBuf::from("/mingw64/bin")),
                ..Default::default()
            },
        );
        assert!(inv.env["PATH"].starts_with("/mingw64/bin"));
    }
}
