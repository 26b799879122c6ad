//! Host platform detection, expressed in Go's GOOS/GOARCH vocabulary.

use std::fmt;

/// The machine the builds run on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    pub os: String,
    pub arch: String,
}

impl HostPlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Describe the current host using GOOS/GOARCH names (e.g. "darwin"/"arm64").
    pub fn current() -> Self {
        Self::new(
            goos_for(std::env::consts::OS),
            goarch_for(std::env::consts::ARCH),
        )
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// The Android NDK prebuilt directory tag for this host (e.g. "linux-x86_64").
    ///
    /// NDK releases only ship x86_64 host binaries; Apple silicon runs them
    /// through Rosetta, so the tag does not follow the host architecture.
    pub fn ndk_tag(&self) -> String {
        format!("{}-x86_64", self.os)
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Map a Rust `std::env::consts::OS` value onto GOOS.
pub fn goos_for(rust_os: &str) -> String {
    match rust_os {
        "macos" => "darwin".to_string(),
        other => other.to_string(),
    }
}

/// Map a Rust `std::env::consts::ARCH` value onto GOARCH.
pub fn goarch_for(rust_arch: &str) -> String {
    match rust_arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "arm" => "arm",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        "wasm32" => "wasm",
        other => other,
    }
    .to_string()
}
