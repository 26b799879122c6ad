use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::error::ValidationError;
use crate::host::HostPlatform;
use crate::toolchain::ToolchainFamily;

// Generated from data/platforms.json via build.rs
include!(concat!(env!("OUT_DIR"), "/platforms_generated.rs"));

/// One concrete compilation target, e.g. `linux/amd64`.
///
/// Identity is the `(os, arch)` pair. `display_name` is derived and ignored
/// by equality and hashing.
#[derive(Debug, Clone)]
pub struct TargetDescriptor {
    os: String,
    arch: String,
    display_name: String,
}

impl TargetDescriptor {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        let os = os.into();
        let arch = arch.into();
        let display_name = format!("{os}/{arch}");
        Self {
            os,
            arch,
            display_name,
        }
    }

    /// Parse a literal `os/arch` specifier. Only checks the shape; whether
    /// the pair is supported is the resolver's business.
    pub fn parse(spec: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::Malformed(spec.to_string());
        let (os, arch) = spec.split_once('/').ok_or_else(malformed)?;
        if !is_component(os) || !is_component(arch) {
            return Err(malformed());
        }
        Ok(Self::new(os, arch))
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn policy(&self) -> &'static PlatformPolicy {
        policy_for(&self.os)
    }

    /// `base` plus the platform's executable suffix (`app.exe` on Windows).
    pub fn executable_name(&self, base: &str) -> String {
        format!("{base}{}", self.policy().executable_suffix)
    }

    /// Where the binary for this target lands: `<out_dir>/<os>/<arch>/<name>`.
    pub fn output_path(&self, out_dir: &Path, base: &str) -> PathBuf {
        out_dir
            .join(&self.os)
            .join(&self.arch)
            .join(self.executable_name(base))
    }
}

fn is_component(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

impl PartialEq for TargetDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.os == other.os && self.arch == other.arch
    }
}

impl Eq for TargetDescriptor {}

impl Hash for TargetDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.os.hash(state);
        self.arch.hash(state);
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// Members of a named platform group, or `None` if no such group exists.
/// `all` is not a static group; see [`PlatformCatalog`](crate::resolve::PlatformCatalog).
pub fn group(name: &str) -> Option<&'static [(&'static str, &'static str)]> {
    PLATFORM_GROUPS
        .iter()
        .find(|(group, _)| *group == name)
        .map(|(_, members)| *members)
}

pub fn group_names() -> impl Iterator<Item = &'static str> {
    PLATFORM_GROUPS.iter().map(|(name, _)| *name)
}

/// The built-in platform matrix, used when the Go toolchain can't be asked.
pub fn known_platforms() -> &'static [(&'static str, &'static str)] {
    KNOWN_PLATFORMS
}

/// How a platform treats cgo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiMode {
    /// cgo is not used; `CGO_ENABLED=0`.
    Off,
    /// A bytecode target (wasm). cgo can never be enabled.
    PortableBytecode,
    /// cgo needs a cross C toolchain of the given family.
    Required(ToolchainFamily),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPolicy {
    pub os: &'static str,
    pub ffi: FfiMode,
    /// The only host OS this platform can be built from, if restricted.
    pub required_host: Option<&'static str>,
    /// Link statically when the user gave no ldflags of their own.
    pub prefer_static_link: bool,
    pub executable_suffix: &'static str,
}

impl PlatformPolicy {
    /// The toolchain family this platform needs when built from `host`.
    /// A native build (host OS equals target OS) uses the host's own cgo setup.
    pub fn ffi_family_on(&self, host: &HostPlatform) -> Option<ToolchainFamily> {
        match self.ffi {
            FfiMode::Required(family) if host.os != self.os => Some(family),
            _ => None,
        }
    }

    pub fn host_allowed(&self, host: &HostPlatform) -> bool {
        self.required_host.map_or(true, |os| host.os == os)
    }
}

static DEFAULT_POLICY: PlatformPolicy = PlatformPolicy {
    os: "*",
    ffi: FfiMode::Off,
    required_host: None,
    prefer_static_link: false,
    executable_suffix: "",
};

static POLICIES: &[PlatformPolicy] = &[
    PlatformPolicy {
        os: "android",
        ffi: FfiMode::Required(ToolchainFamily::AndroidNdk),
        required_host: None,
        prefer_static_link: true,
        executable_suffix: "",
    },
    PlatformPolicy {
        os: "ios",
        ffi: FfiMode::Required(ToolchainFamily::Clang),
        required_host: Some("darwin"),
        prefer_static_link: false,
        executable_suffix: "",
    },
    PlatformPolicy {
        os: "js",
        ffi: FfiMode::PortableBytecode,
        required_host: None,
        prefer_static_link: false,
        executable_suffix: "",
    },
    PlatformPolicy {
        os: "wasip1",
        ffi: FfiMode::PortableBytecode,
        required_host: None,
        prefer_static_link: false,
        executable_suffix: "",
    },
    PlatformPolicy {
        os: "windows",
        ffi: FfiMode::Off,
        required_host: None,
        prefer_static_link: false,
        executable_suffix: ".exe",
    },
];

pub fn policy_for(os: &str) -> &'static PlatformPolicy {
    POLICIES
        .iter()
        .find(|p| p.os == os)
        .unwrap_or(&DEFAULT_POLICY)
}
