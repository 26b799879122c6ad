use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::config::BuildConfig;
use crate::platform::TargetDescriptor;
use crate::process::Invocation;
use crate::resolve::PlatformSource;

/// Optional `go build` flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoFlags<'a> {
    pub ldflags: Option<&'a str>,
    pub tags: Option<&'a str>,
    /// `-x`: print the commands go runs.
    pub print_commands: bool,
}

/// The Go toolchain being orchestrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoToolchain {
    binary: String,
}

impl Default for GoToolchain {
    fn default() -> Self {
        Self::new("go")
    }
}

impl GoToolchain {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.go_binary.clone())
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Check that `go` is on PATH and runs. Returns the `go version` line.
    pub fn verify(&self) -> Result<String> {
        let path = which::which(&self.binary).with_context(|| {
            format!(
                "{} not found on PATH.\n\
                 Install Go from https://go.dev/dl/",
                self.binary
            )
        })?;

        let output = Command::new(&path)
            .arg("version")
            .output()
            .with_context(|| format!("failed to run {} version", path.display()))?;
        if !output.status.success() {
            bail!("{} version failed with {}", path.display(), output.status);
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(go = %path.display(), %version, "Go toolchain is usable");
        Ok(version)
    }

    /// Every `os/arch` pair this toolchain can target (`go tool dist list`).
    pub fn list_platforms(&self) -> Result<Vec<(String, String)>> {
        let output = Command::new(&self.binary)
            .args(["tool", "dist", "list"])
            .output()
            .with_context(|| format!("failed to run {} tool dist list", self.binary))?;
        if !output.status.success() {
            bail!("{} tool dist list failed with {}", self.binary, output.status);
        }

        let pairs = parse_dist_list(&String::from_utf8_lossy(&output.stdout));
        if pairs.is_empty() {
            bail!("{} tool dist list returned no platforms", self.binary);
        }
        Ok(pairs)
    }

    /// `go build [-x] [-ldflags L] [-tags T] -o <output> <source>` for `target`.
    ///
    /// Sets `GOOS`/`GOARCH` only; cgo settings are the caller's.
    pub fn build_invocation(
        &self,
        target: &TargetDescriptor,
        source: &Path,
        output: &Path,
        flags: &GoFlags<'_>,
    ) -> Invocation {
        let mut inv = Invocation::new(self.binary.clone()).arg("build");
        if flags.print_commands {
            inv = inv.arg("-x");
        }
        if let Some(ldflags) = flags.ldflags {
            inv = inv.arg("-ldflags").arg(ldflags);
        }
        if let Some(tags) = flags.tags {
            inv = inv.arg("-tags").arg(tags);
        }
        inv.arg("-o")
            .arg(output.display().to_string())
            .arg(source.display().to_string())
            .env("GOOS", target.os())
            .env("GOARCH", target.arch())
    }
}

impl PlatformSource for GoToolchain {
    fn platforms(&self) -> Result<Vec<(String, String)>> {
        self.list_platforms()
    }
}

/// Parse `go tool dist list` output: one `os/arch` per line.
pub fn parse_dist_list(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| TargetDescriptor::parse(line.trim()).ok())
        .map(|t| (t.os().to_string(), t.arch().to_string()))
        .collect()
}
