//! Build and orchestration settings, plus the optional `gocross.toml` file.
//!
//! ```toml
//! source = "cmd/app/main.go"
//! output-dir = "dist"
//! targets = ["desktop", "android/arm64"]
//!
//! [build]
//! ldflags = "-s -w"
//! skip-ffi = true
//! attempt-timeout = 600
//!
//! [orchestration]
//! max-retries = 1
//! retry-delay = 0.5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use crate::toolchain::{Interaction, ToolchainPolicy};

/// Per-target build settings. Read-only to the build core.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BuildConfig {
    /// Skip targets that need a cross C toolchain.
    pub skip_ffi: bool,
    /// Build cgo-requiring targets with `CGO_ENABLED=0` instead.
    pub disable_ffi: bool,
    /// 2 and above passes `-x` to `go build`.
    pub verbosity: u8,
    pub ldflags: Option<String>,
    pub tags: Option<String>,
    /// Bypass host restrictions and toolchain validation.
    pub force: bool,
    pub non_interactive: bool,
    /// Android NDK root to use instead of searching. Not used for clang.
    pub toolchain_path: Option<PathBuf>,
    /// Pack each binary in place with UPX after building.
    pub compress: bool,
    pub min_api_level: u32,
    pub go_binary: String,
    pub upx_binary: String,
    /// Seconds one `go build` attempt may run before it is killed.
    #[serde(deserialize_with = "optional_secs")]
    pub attempt_timeout: Option<Duration>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            skip_ffi: false,
            disable_ffi: false,
            verbosity: 0,
            ldflags: None,
            tags: None,
            force: false,
            non_interactive: false,
            toolchain_path: None,
            compress: false,
            min_api_level: 21,
            go_binary: "go".to_string(),
            upx_binary: "upx".to_string(),
            attempt_timeout: None,
        }
    }
}

impl BuildConfig {
    /// The toolchain lookup policy these settings imply. A non-interactive
    /// build never prompts, whatever `interaction` says.
    pub fn toolchain_policy(&self, interaction: &Interaction) -> ToolchainPolicy {
        ToolchainPolicy {
            force: self.force,
            min_api_level: self.min_api_level,
            interaction: if self.non_interactive {
                Interaction::NonInteractive
            } else {
                interaction.clone()
            },
        }
    }

    /// `ldflags` with surrounding whitespace removed, `None` if blank.
    pub fn user_ldflags(&self) -> Option<&str> {
        self.ldflags.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn user_tags(&self) -> Option<&str> {
        self.tags.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// How the batch is scheduled.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct OrchestrationConfig {
    pub parallel: bool,
    /// Extra attempts after a failed one.
    pub max_retries: u32,
    /// Base backoff; attempt `n` waits `retry_delay * n`.
    #[serde(deserialize_with = "secs")]
    pub retry_delay: Duration,
    /// Worker cap. Defaults to the number of logical cores.
    pub max_workers: Option<usize>,
    /// Remove the output directory before building.
    pub clean_output: bool,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_workers: None,
            clean_output: false,
        }
    }
}

impl OrchestrationConfig {
    /// Number of workers for `targets` targets: 1 when sequential, otherwise
    /// the cap (or core count), never more than there are targets.
    pub fn worker_count(&self, targets: usize) -> usize {
        let cap = if self.parallel {
            self.max_workers.unwrap_or_else(default_parallelism)
        } else {
            1
        };
        cap.clamp(1, targets.max(1))
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Contents of a `gocross.toml` project file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectConfig {
    pub source: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub binary_name: Option<String>,
    pub targets: Vec<String>,
    pub build: BuildConfig,
    pub orchestration: OrchestrationConfig,
}

impl ProjectConfig {
    pub const FILE_NAME: &'static str = "gocross.toml";

    /// Load `path`. A missing file is not an error and yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// `<dir>/gocross.toml`.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load(&dir.join(Self::FILE_NAME))
    }

    /// The binary name to use: the configured one, else the source file stem.
    pub fn resolved_binary_name(&self) -> Option<String> {
        self.binary_name
            .clone()
            .or_else(|| self.source.as_deref().and_then(binary_name_from_source))
    }
}

/// Default binary name for a source path: its file stem (`cmd/app/main.go` → `main`).
pub fn binary_name_from_source(source: &Path) -> Option<String> {
    source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn to_duration<E: serde::de::Error>(secs: f64) -> std::result::Result<Duration, E> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| E::custom(format!("invalid duration: {secs} seconds")))
}

fn secs<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
    to_duration(f64::deserialize(d)?)
}

fn optional_secs<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<Duration>, D::Error> {
    Option::<f64>::deserialize(d)?.map(to_duration::<D::Error>).transpose()
}
