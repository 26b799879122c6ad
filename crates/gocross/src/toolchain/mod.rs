//! Cross C toolchain discovery for cgo-enabled targets.
//!
//! Resolution order for a target, first hit wins:
//!
//! 1. an explicit path from the caller
//! 2. the family's environment variables
//! 3. a path the user already supplied earlier in this run
//! 4. a scan of conventional install locations, ranked by [`score_candidate`]
//! 5. an interactive prompt, when [`Interaction::Prompting`] is in effect

pub mod clang;
pub mod ndk;
pub mod prompt;

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::error::ToolchainError;
use crate::host::HostPlatform;
use crate::platform::TargetDescriptor;

pub use prompt::{Interaction, StdioPrompter, ToolchainPrompter};

/// A kind of cross toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolchainFamily {
    /// Android NDK clang wrappers.
    AndroidNdk,
    /// Host or Xcode clang.
    Clang,
}

impl ToolchainFamily {
    /// Environment variables naming this toolchain, in priority order.
    pub fn env_vars(self) -> &'static [&'static str] {
        match self {
            ToolchainFamily::AndroidNdk => ndk::ENV_VARS,
            ToolchainFamily::Clang => clang::ENV_VARS,
        }
    }

    /// The compiler triple prefix that exactly matches `target`, if one is known.
    pub fn wanted_triple(self, target: &TargetDescriptor) -> Option<&'static str> {
        match self {
            ToolchainFamily::AndroidNdk => ndk::triple_for_arch(target.arch()),
            ToolchainFamily::Clang => None,
        }
    }

    pub fn triple_matches(self, target: &TargetDescriptor, triple: &str) -> bool {
        match self {
            ToolchainFamily::AndroidNdk => self.wanted_triple(target) == Some(triple),
            ToolchainFamily::Clang => triple.contains("-apple-"),
        }
    }
}

impl fmt::Display for ToolchainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolchainFamily::AndroidNdk => f.write_str("Android NDK"),
            ToolchainFamily::Clang => f.write_str("clang"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainKind {
    NativeClang,
    NdkClang,
    /// Accepted without validation (forced).
    Unknown,
}

/// How a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    Explicit,
    Environment,
    Scan,
    Prompt,
}

/// A discovered toolchain installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainCandidate {
    /// NDK root, or the clang binary.
    pub path: PathBuf,
    pub family: ToolchainFamily,
    pub kind: ToolchainKind,
    pub target_triple_prefix: String,
    pub host_platform: String,
    pub api_level: Option<u32>,
    pub compiler: Option<PathBuf>,
    pub origin: CandidateOrigin,
    /// False when the install lacked its markers and was accepted anyway.
    pub verified: bool,
    pub version: Option<String>,
}

impl ToolchainCandidate {
    fn unverified(
        family: ToolchainFamily,
        path: &Path,
        host: &HostPlatform,
        origin: CandidateOrigin,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            family,
            kind: ToolchainKind::Unknown,
            target_triple_prefix: String::new(),
            host_platform: host.to_string(),
            api_level: None,
            compiler: None,
            origin,
            verified: false,
            version: None,
        }
    }

    /// Variables the `go build` child needs to use this toolchain.
    pub fn child_env(&self, target: &TargetDescriptor, host: &HostPlatform) -> ToolchainEnv {
        match self.family {
            ToolchainFamily::AndroidNdk => {
                ndk::cgo_env(self, self.family.wanted_triple(target), host)
            }
            ToolchainFamily::Clang => clang::cgo_env(self, host),
        }
    }
}

/// Environment changes for one child process. Never applied to this process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainEnv {
    pub vars: BTreeMap<String, String>,
    /// Inherited variables to drop before `vars` is applied.
    pub remove: Vec<String>,
    /// Inherited variables to drop by prefix (e.g. `ANDROID_`).
    pub remove_prefixes: Vec<String>,
    /// Directory to put in front of the inherited `PATH`.
    pub path_prefix: Option<PathBuf>,
}

/// Ranking of a candidate for one target. Larger is better.
///
/// Field order is the priority order: exact triple, then the API level
/// closest to (but not below) the floor, then the shorter path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CandidateScore {
    pub triple_match: bool,
    pub api_fit: Option<Reverse<u32>>,
    pub shorter_path: Reverse<usize>,
}

pub fn score_candidate(
    candidate: &ToolchainCandidate,
    target: &TargetDescriptor,
    min_api_level: u32,
) -> CandidateScore {
    CandidateScore {
        triple_match: candidate
            .family
            .triple_matches(target, &candidate.target_triple_prefix),
        api_fit: candidate
            .api_level
            .and_then(|level| level.checked_sub(min_api_level))
            .map(Reverse),
        shorter_path: Reverse(
            candidate
                .compiler
                .as_ref()
                .unwrap_or(&candidate.path)
                .as_os_str()
                .len(),
        ),
    }
}

/// The highest-scoring candidate. Ties go to the one discovered first.
pub fn pick_best(
    candidates: Vec<ToolchainCandidate>,
    target: &TargetDescriptor,
    min_api_level: u32,
) -> Option<ToolchainCandidate> {
    let mut best: Option<(CandidateScore, ToolchainCandidate)> = None;
    for candidate in candidates {
        let score = score_candidate(&candidate, target, min_api_level);
        if best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, c)| c)
}

/// Caller-controlled knobs for one lookup.
#[derive(Debug, Clone)]
pub struct ToolchainPolicy {
    /// Accept installs that fail validation.
    pub force: bool,
    pub min_api_level: u32,
    pub interaction: Interaction,
}

impl Default for ToolchainPolicy {
    fn default() -> Self {
        Self {
            force: false,
            min_api_level: 21,
            interaction: Interaction::NonInteractive,
        }
    }
}

/// Finds the toolchain a target should build with.
pub trait ToolchainLocator: Send + Sync {
    fn find_best_toolchain(
        &self,
        target: &TargetDescriptor,
        explicit_path: Option<&Path>,
        policy: &ToolchainPolicy,
    ) -> Result<ToolchainCandidate, ToolchainError>;
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Filesystem-backed [`ToolchainLocator`].
pub struct ToolchainResolver {
    host: HostPlatform,
    env: EnvLookup,
    search_paths: Option<Vec<PathBuf>>,
    /// Prompt answers per family, `None` for a decline. Also serialises prompts.
    prompted: Mutex<HashMap<ToolchainFamily, Option<PathBuf>>>,
}

impl ToolchainResolver {
    pub fn new(host: HostPlatform) -> Self {
        Self {
            host,
            env: Arc::new(|name: &str| std::env::var(name).ok()),
            search_paths: None,
            prompted: Mutex::new(HashMap::new()),
        }
    }

    /// Read environment variables from `vars` instead of the process environment.
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Arc::new(move |name: &str| vars.get(name).cloned());
        self
    }

    /// Replace the conventional install locations. For the NDK these are
    /// directories of NDK roots; for clang, directories or binaries.
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    pub fn host(&self) -> &HostPlatform {
        &self.host
    }

    /// Turn a path into the best candidate it holds, checking its markers.
    fn examine(
        &self,
        family: ToolchainFamily,
        target: &TargetDescriptor,
        path: &Path,
        origin: CandidateOrigin,
        min_api_level: u32,
    ) -> Result<ToolchainCandidate, ToolchainError> {
        if !path.exists() {
            return Err(ToolchainError::MissingPath(path.to_path_buf()));
        }

        match family {
            ToolchainFamily::AndroidNdk => {
                let missing = ndk::missing_markers(path);
                if !missing.is_empty() {
                    return Err(ToolchainError::InvalidRoot {
                        family,
                        path: path.to_path_buf(),
                        missing,
                    });
                }
                let candidates = ndk::candidates(path, &self.host, origin);
                pick_best(candidates, target, min_api_level).ok_or_else(|| {
                    ToolchainError::NotFound {
                        family,
                        target: target.to_string(),
                        searched: vec![path.to_path_buf()],
                    }
                })
            }
            ToolchainFamily::Clang => match clang::binary_in(path, &self.host) {
                Some(binary) => Ok(clang::candidate(&binary, &self.host, origin)),
                None => Err(ToolchainError::InvalidRoot {
                    family,
                    path: path.to_path_buf(),
                    missing: clang::missing_markers(&self.host),
                }),
            },
        }
    }

    /// Like [`examine`](Self::examine), but an invalid install is accepted
    /// unverified when forced.
    fn examine_or_force(
        &self,
        family: ToolchainFamily,
        target: &TargetDescriptor,
        path: &Path,
        origin: CandidateOrigin,
        policy: &ToolchainPolicy,
    ) -> Result<ToolchainCandidate, ToolchainError> {
        match self.examine(family, target, path, origin, policy.min_api_level) {
            Err(err @ ToolchainError::InvalidRoot { .. }) if policy.force => {
                warn!(%target, error = %err, "Using unverified toolchain because force is set");
                Ok(ToolchainCandidate::unverified(family, path, &self.host, origin))
            }
            other => other,
        }
    }

    fn from_env(&self, family: ToolchainFamily) -> Vec<PathBuf> {
        family
            .env_vars()
            .iter()
            .copied()
            .filter_map(|var| (self.env)(var).filter(|v| !v.is_empty()))
            .map(PathBuf::from)
            .filter(|p| family != ToolchainFamily::Clang || clang::is_clang_name(p))
            .collect()
    }

    /// Scan install locations. Returns the candidates and the places looked at.
    fn scan(&self, family: ToolchainFamily) -> (Vec<ToolchainCandidate>, Vec<PathBuf>) {
        match family {
            ToolchainFamily::AndroidNdk => {
                let bases = self.search_paths.clone().unwrap_or_else(|| {
                    ndk::default_search_bases(
                        &self.host,
                        dirs::home_dir().as_deref(),
                        self.env.as_ref(),
                    )
                });
                let candidates = ndk::discover_roots(&bases)
                    .iter()
                    .flat_map(|root| ndk::candidates(root, &self.host, CandidateOrigin::Scan))
                    .collect();
                (candidates, bases)
            }
            ToolchainFamily::Clang => {
                let mut paths = Vec::new();
                match &self.search_paths {
                    Some(custom) => paths.extend(custom.iter().cloned()),
                    None => {
                        if let Ok(found) = which::which("clang") {
                            paths.push(found);
                        }
                        paths.extend(clang::default_search_paths(&self.host));
                    }
                }

                let mut binaries: Vec<PathBuf> = Vec::new();
                for path in &paths {
                    if let Some(binary) = clang::binary_in(path, &self.host) {
                        if !binaries.contains(&binary) {
                            binaries.push(binary);
                        }
                    }
                }
                let candidates = binaries
                    .iter()
                    .map(|b| clang::candidate(b, &self.host, CandidateOrigin::Scan))
                    .collect();
                (candidates, paths)
            }
        }
    }

    /// Ask for a path at most once per family. Every answer is kept,
    /// including a decline or a path that turned out to be unusable.
    fn prompt(
        &self,
        family: ToolchainFamily,
        target: &TargetDescriptor,
        prompter: &dyn ToolchainPrompter,
        policy: &ToolchainPolicy,
    ) -> Option<ToolchainCandidate> {
        let mut prompted = self.prompted.lock().unwrap_or_else(PoisonError::into_inner);

        let remembered = prompted.get(&family).cloned();
        let path = match remembered {
            Some(answer) => answer?,
            None => {
                let answer = prompter.ask_toolchain_path(family, target);
                prompted.insert(family, answer.clone());
                answer?
            }
        };

        match self.examine_or_force(family, target, &path, CandidateOrigin::Prompt, policy) {
            Ok(candidate) => {
                info!(%target, path = %path.display(), "Using {family} supplied by the user");
                Some(candidate)
            }
            Err(err) => {
                warn!(%target, error = %err, "Supplied toolchain path is not usable");
                None
            }
        }
    }
}

impl ToolchainLocator for ToolchainResolver {
    #[tracing::instrument(level = "debug", skip(self, target, policy), fields(target = %target))]
    fn find_best_toolchain(
        &self,
        target: &TargetDescriptor,
        explicit_path: Option<&Path>,
        policy: &ToolchainPolicy,
    ) -> Result<ToolchainCandidate, ToolchainError> {
        let family = target
            .policy()
            .ffi_family_on(&self.host)
            .ok_or_else(|| ToolchainError::NotRequired {
                target: target.to_string(),
            })?;

        if let Some(path) = explicit_path {
            debug!(path = %path.display(), "Using explicit toolchain path");
            return self.examine_or_force(family, target, path, CandidateOrigin::Explicit, policy);
        }

        for path in self.from_env(family) {
            match self.examine(
                family,
                target,
                &path,
                CandidateOrigin::Environment,
                policy.min_api_level,
            ) {
                Ok(candidate) => {
                    debug!(path = %path.display(), "Using toolchain from environment");
                    return Ok(candidate);
                }
                Err(err) => warn!(error = %err, "Ignoring toolchain from environment"),
            }
        }

        let remembered = self
            .prompted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&family)
            .cloned()
            .flatten();
        if let Some(path) = remembered {
            let origin = CandidateOrigin::Prompt;
            if let Ok(candidate) = self.examine_or_force(family, target, &path, origin, policy) {
                return Ok(candidate);
            }
        }

        let (candidates, searched) = self.scan(family);
        debug!(count = candidates.len(), "Scanned for {family}");
        if let Some(best) = pick_best(candidates, target, policy.min_api_level) {
            debug!(
                path = %best.path.display(),
                compiler = ?best.compiler,
                api_level = ?best.api_level,
                "Selected {family}"
            );
            return Ok(best);
        }

        if let Some(prompter) = policy.interaction.prompter() {
            if let Some(candidate) = self.prompt(family, target, prompter, policy) {
                return Ok(candidate);
            }
        }

        Err(ToolchainError::NotFound {
            family,
            target: target.to_string(),
            searched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn linux() -> HostPlatform {
        HostPlatform::new("linux", "amd64")
    }

    fn android_arm64() -> TargetDescriptor {
        TargetDescriptor::new("android", "arm64")
    }

    fn fake_ndk(base: &Path, version: &str, compilers: &[&str]) -> PathBuf {
        let root = base.join(version);
        let bin = root.join("toolchains/llvm/prebuilt/linux-x86_64/bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(root.join("source.properties"), format!("Pkg.Revision = {version}\n")).unwrap();
        for c in compilers {
            fs::write(bin.join(c), "").unwrap();
        }
        root
    }

    fn candidate(triple: &str, api: Option<u32>, compiler: &str) -> ToolchainCandidate {
        ToolchainCandidate {
            path: PathBuf::from("/ndk"),
            family: ToolchainFamily::AndroidNdk,
            kind: ToolchainKind::NdkClang,
            target_triple_prefix: triple.to_string(),
            host_platform: "linux-x86_64".into(),
            api_level: api,
            compiler: Some(PathBuf::from(compiler)),
            origin: CandidateOrigin::Scan,
            verified: true,
            version: None,
        }
    }

    fn isolated() -> ToolchainResolver {
        ToolchainResolver::new(linux())
            .with_env(HashMap::new())
            .with_search_paths(vec![])
    }

    struct CountingPrompter {
        answer: Option<PathBuf>,
        calls: AtomicUsize,
    }

    impl ToolchainPrompter for CountingPrompter {
        fn ask_toolchain_path(&self, _: ToolchainFamily, _: &TargetDescriptor) -> Option<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    #[test]
    fn test_score_prefers_triple_then_api_then_path() {
        let target = android_arm64();
        let exact = candidate("aarch64-linux-android", Some(30), "/ndk/a");
        let wrong = candidate("x86_64-linux-android", Some(21), "/ndk/b");
        assert!(score_candidate(&exact, &target, 21) > score_candidate(&wrong, &target, 21));

        let close = candidate("aarch64-linux-android", Some(23), "/ndk/long/path/c");
        let far = candidate("aarch64-linux-android", Some(33), "/ndk/c");
        assert!(score_candidate(&close, &target, 21) > score_candidate(&far, &target, 21));

        let below = candidate("aarch64-linux-android", Some(19), "/c");
        assert!(score_candidate(&far, &target, 21) > score_candidate(&below, &target, 21));

        let short = candidate("aarch64-linux-android", Some(21), "/a");
        let long = candidate("aarch64-linux-android", Some(21), "/aaaa");
        assert!(score_candidate(&short, &target, 21) > score_candidate(&long, &target, 21));
    }

    #[test]
    fn test_pick_best_ties_keep_first() {
        let target = android_arm64();
        let first = candidate("aarch64-linux-android", Some(21), "/x/one");
        let second = candidate("aarch64-linux-android", Some(21), "/x/two");
        let best = pick_best(vec![first.clone(), second], &target, 21).unwrap();
        assert_eq!(best, first);
        assert!(pick_best(vec![], &target, 21).is_none());
    }

    #[test]
    fn test_not_required_for_plain_targets() {
        let err = isolated()
            .find_best_toolchain(
                &TargetDescriptor::new("linux", "amd64"),
                None,
                &ToolchainPolicy::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ToolchainError::NotRequired { .. }));
    }

    #[test]
    fn test_explicit_invalid_root_is_rejected_without_force() {
        let tmp = TempDir::new().unwrap();
        let err = isolated()
            .find_best_toolchain(&android_arm64(), Some(tmp.path()), &ToolchainPolicy::default())
            .unwrap_err();
        match err {
            ToolchainError::InvalidRoot { missing, .. } => {
                assert_eq!(missing, vec!["toolchains", "source.properties"])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_explicit_invalid_root_is_downgraded_with_force() {
        let tmp = TempDir::new().unwrap();
        let policy = ToolchainPolicy {
            force: true,
            ..Default::default()
        };
        let found = isolated()
            .find_best_toolchain(&android_arm64(), Some(tmp.path()), &policy)
            .unwrap();
        assert!(!found.verified);
        assert_eq!(found.kind, ToolchainKind::Unknown);
        assert_eq!(found.origin, CandidateOrigin::Explicit);
    }

    #[test]
    fn test_explicit_missing_path() {
        let err = isolated()
            .find_best_toolchain(
                &android_arm64(),
                Some(Path::new("/definitely/not/here")),
                &ToolchainPolicy::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ToolchainError::MissingPath(_)));
    }

    #[test]
    fn test_env_var_wins_over_scan() {
        let tmp = TempDir::new().unwrap();
        let from_env = fake_ndk(tmp.path(), "env-ndk", &["aarch64-linux-android21-clang"]);
        let scanned = tmp.path().join("sdk");
        fake_ndk(&scanned, "26", &["aarch64-linux-android21-clang"]);

        let resolver = ToolchainResolver::new(linux())
            .with_env(HashMap::from([(
                "ANDROID_NDK_ROOT".to_string(),
                from_env.display().to_string(),
            )]))
            .with_search_paths(vec![scanned]);

        let found = resolver
            .find_best_toolchain(&android_arm64(), None, &ToolchainPolicy::default())
            .unwrap();
        assert_eq!(found.path, from_env);
        assert_eq!(found.origin, CandidateOrigin::Environment);
    }

    #[test]
    fn test_invalid_env_var_falls_through_to_scan() {
        let tmp = TempDir::new().unwrap();
        let sdk = tmp.path().join("sdk");
        let root = fake_ndk(&sdk, "26", &["aarch64-linux-android21-clang"]);

        let resolver = ToolchainResolver::new(linux())
            .with_env(HashMap::from([(
                "ANDROID_NDK_HOME".to_string(),
                tmp.path().join("nope").display().to_string(),
            )]))
            .with_search_paths(vec![sdk]);

        let found = resolver
            .find_best_toolchain(&android_arm64(), None, &ToolchainPolicy::default())
            .unwrap();
        assert_eq!(found.path, root);
        assert_eq!(found.origin, CandidateOrigin::Scan);
    }

    #[test]
    fn test_scan_picks_closest_api_level() {
        let tmp = TempDir::new().unwrap();
        fake_ndk(
            tmp.path(),
            "25",
            &["aarch64-linux-android33-clang", "x86_64-linux-android21-clang"],
        );
        fake_ndk(
            tmp.path(),
            "26",
            &["aarch64-linux-android19-clang", "aarch64-linux-android24-clang"],
        );

        let resolver = isolated().with_search_paths(vec![tmp.path().to_path_buf()]);
        let found = resolver
            .find_best_toolchain(&android_arm64(), None, &ToolchainPolicy::default())
            .unwrap();
        assert_eq!(found.target_triple_prefix, "aarch64-linux-android");
        assert_eq!(found.api_level, Some(24));
        assert!(found.path.ends_with("26"));
    }

    #[test]
    fn test_nothing_found_non_interactive() {
        let tmp = TempDir::new().unwrap();
        let resolver = isolated().with_search_paths(vec![tmp.path().to_path_buf()]);
        let err = resolver
            .find_best_toolchain(&android_arm64(), None, &ToolchainPolicy::default())
            .unwrap_err();
        match err {
            ToolchainError::NotFound { family, searched, .. } => {
                assert_eq!(family, ToolchainFamily::AndroidNdk);
                assert_eq!(searched, vec![tmp.path().to_path_buf()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_prompted_path_is_remembered() {
        let tmp = TempDir::new().unwrap();
        let root = fake_ndk(
            tmp.path(),
            "manual",
            &["aarch64-linux-android21-clang", "armv7a-linux-androideabi21-clang"],
        );
        let prompter = Arc::new(CountingPrompter {
            answer: Some(root.clone()),
            calls: AtomicUsize::new(0),
        });
        let policy = ToolchainPolicy {
            interaction: Interaction::Prompting(prompter.clone()),
            ..Default::default()
        };

        let resolver = isolated();
        let first = resolver.find_best_toolchain(&android_arm64(), None, &policy).unwrap();
        let second = resolver
            .find_best_toolchain(&TargetDescriptor::new("android", "arm"), None, &policy)
            .unwrap();

        assert_eq!(first.origin, CandidateOrigin::Prompt);
        assert_eq!(second.path, root);
        assert_eq!(second.target_triple_prefix, "armv7a-linux-androideabi");
        assert_eq!(prompter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_declined_prompt_is_not_found() {
        let prompter = Arc::new(CountingPrompter {
            answer: None,
            calls: AtomicUsize::new(0),
        });
        let policy = ToolchainPolicy {
            interaction: Interaction::Prompting(prompter.clone()),
            ..Default::default()
        };
        let err = isolated()
            .find_best_toolchain(&android_arm64(), None, &policy)
            .unwrap_err();
        assert!(matches!(err, ToolchainError::NotFound { .. }));
        assert_eq!(prompter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_declined_prompt_is_not_asked_again() {
        let prompter = Arc::new(CountingPrompter {
            answer: None,
            calls: AtomicUsize::new(0),
        });
        let policy = ToolchainPolicy {
            interaction: Interaction::Prompting(prompter.clone()),
            ..Default::default()
        };

        let resolver = isolated();
        for arch in ["arm64", "arm", "386", "amd64"] {
            let err = resolver
                .find_best_toolchain(&TargetDescriptor::new("android", arch), None, &policy)
                .unwrap_err();
            assert!(matches!(err, ToolchainError::NotFound { .. }));
        }
        assert_eq!(prompter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unusable_prompted_path_is_not_asked_again() {
        let tmp = TempDir::new().unwrap();
        let prompter = Arc::new(CountingPrompter {
            answer: Some(tmp.path().join("not-an-ndk")),
            calls: AtomicUsize::new(0),
        });
        let policy = ToolchainPolicy {
            interaction: Interaction::Prompting(prompter.clone()),
            ..Default::default()
        };

        let resolver = isolated();
        assert!(resolver.find_best_toolchain(&android_arm64(), None, &policy).is_err());
        assert!(resolver
            .find_best_toolchain(&TargetDescriptor::new("android", "arm"), None, &policy)
            .is_err());
        assert_eq!(prompter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_native_android_host_needs_nothing() {
        let resolver =
            ToolchainResolver::new(HostPlatform::new("android", "arm64")).with_env(HashMap::new());
        let err = resolver
            .find_best_toolchain(&android_arm64(), None, &ToolchainPolicy::default())
            .unwrap_err();
        assert!(matches!(err, ToolchainError::NotRequired { .. }));
    }

    #[test]
    fn test_clang_env_var_must_name_clang() {
        let env = HashMap::from([("CC".to_string(), "/usr/bin/gcc".to_string())]);
        let resolver = ToolchainResolver::new(HostPlatform::new("darwin", "arm64")).with_env(env);
        assert!(resolver.from_env(ToolchainFamily::Clang).is_empty());
    }
}
