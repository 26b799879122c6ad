//! Android NDK discovery and the cgo environment for NDK clang.
//!
//! An NDK root looks like:
//!
//! ```text
//! <root>/
//!   source.properties
//!   toolchains/llvm/prebuilt/<host-tag>/
//!     bin/aarch64-linux-android21-clang
//!     sysroot/usr/{include,lib}
//! ```
//!
//! Roots are usually installed side by side under `<sdk>/ndk/<version>`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::{CandidateOrigin, ToolchainCandidate, ToolchainEnv, ToolchainFamily, ToolchainKind};
use crate::host::HostPlatform;

/// Environment variables that may point at an NDK root, in priority order.
pub const ENV_VARS: &[&str] = &["ANDROID_NDK_HOME", "ANDROID_NDK_ROOT", "NDK_ROOT"];

/// Entries every NDK root must contain.
pub const MARKERS: &[&str] = &["toolchains", "source.properties"];

static COMPILER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<triple>[a-z0-9_]+-linux-android(?:eabi)?)(?P<api>\d+)-clang(?P<ext>\.cmd|\.exe)?$")
        .expect("Invalid compiler name pattern")
});

/// The clang triple prefix NDK uses for a GOARCH.
pub fn triple_for_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "arm" => Some("armv7a-linux-androideabi"),
        "arm64" => Some("aarch64-linux-android"),
        "386" => Some("i686-linux-android"),
        "amd64" => Some("x86_64-linux-android"),
        _ => None,
    }
}

/// Markers from [`MARKERS`] that `root` lacks.
pub fn missing_markers(root: &Path) -> Vec<String> {
    MARKERS
        .iter()
        .filter(|m| !root.join(m).exists())
        .map(|m| m.to_string())
        .collect()
}

pub fn is_valid_root(root: &Path) -> bool {
    root.is_dir() && missing_markers(root).is_empty()
}

/// Conventional places an Android SDK keeps its `ndk/` directory on `host`.
pub fn default_search_bases(
    host: &HostPlatform,
    home: Option<&Path>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Vec<PathBuf> {
    let mut bases = Vec::new();

    if let Some(home) = home {
        match host.os.as_str() {
            "windows" => {
                bases.push(
                    home.join("AppData")
                        .join("Local")
                        .join("Android")
                        .join("Sdk")
                        .join("ndk"),
                );
            }
            "darwin" => {
                bases.push(home.join("Library").join("Android").join("sdk").join("ndk"));
                bases.push(home.join("Android").join("Sdk").join("ndk"));
            }
            _ => bases.push(home.join("Android").join("Sdk").join("ndk")),
        }
    }

    match host.os.as_str() {
        "windows" => bases.push(PathBuf::from(r"C:\Android\Sdk\ndk")),
        "darwin" => bases.push(PathBuf::from("/opt/android-sdk/ndk")),
        _ => {
            bases.push(PathBuf::from("/opt/android-sdk/ndk"));
            bases.push(PathBuf::from("/usr/local/android-sdk/ndk"));
        }
    }

    for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
        if let Some(sdk) = env(var).filter(|v| !v.is_empty()) {
            bases.push(PathBuf::from(sdk).join("ndk"));
        }
    }

    bases
}

/// Every valid NDK root under `bases`, sorted and without duplicates.
///
/// A base may itself be an NDK root (e.g. `/opt/android-ndk-r26`) or a
/// directory of versioned roots.
pub fn discover_roots(bases: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots = Vec::new();

    for base in bases {
        if is_valid_root(base) {
            roots.push(base.clone());
            continue;
        }
        let Ok(entries) = fs::read_dir(base) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if is_valid_root(&path) {
                tracing::debug!(path = %path.display(), "Found Android NDK");
                roots.push(path);
            }
        }
    }

    roots.sort();
    roots.dedup();
    roots
}

/// The `toolchains/llvm/prebuilt/<tag>` directory for `host`.
///
/// Tries the exact host tag first, then any directory whose name starts with
/// the host OS, then whatever single prebuilt directory exists.
pub fn prebuilt_dir(root: &Path, host: &HostPlatform) -> Option<PathBuf> {
    let base = root.join("toolchains").join("llvm").join("prebuilt");

    let exact = base.join(host.ndk_tag());
    if exact.is_dir() {
        return Some(exact);
    }

    let mut dirs: Vec<PathBuf> = fs::read_dir(&base)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    let partial = dirs.iter().find(|d| {
        d.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&host.os))
    });

    match partial {
        Some(dir) => Some(dir.clone()),
        None => {
            let any = dirs.into_iter().next();
            if let Some(dir) = &any {
                tracing::warn!(
                    dir = %dir.display(),
                    host = %host,
                    "No NDK prebuilt directory matches the host, using the first one found"
                );
            }
            any
        }
    }
}

/// Split `aarch64-linux-android21-clang` into its triple and API level.
///
/// Windows NDKs ship `.cmd` wrappers; those are the only names accepted on
/// a Windows host, and bare names the only ones accepted elsewhere.
pub fn parse_compiler_name(name: &str, windows_host: bool) -> Option<(String, u32)> {
    let caps = COMPILER_NAME.captures(name)?;
    if caps.name("ext").is_some() != windows_host {
        return None;
    }
    let api = caps["api"].parse().ok()?;
    Some((caps["triple"].to_string(), api))
}

/// The NDK release, from `Pkg.Revision` in `source.properties`.
pub fn revision(root: &Path) -> Option<String> {
    let contents = fs::read_to_string(root.join("source.properties")).ok()?;
    contents.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == "Pkg.Revision").then(|| value.trim().to_string())
    })
}

/// One candidate per `<triple><api>-clang` compiler in the root, or a single
/// compiler-less candidate when the root has none for this host.
pub fn candidates(
    root: &Path,
    host: &HostPlatform,
    origin: CandidateOrigin,
) -> Vec<ToolchainCandidate> {
    let prebuilt = prebuilt_dir(root, host);
    let host_platform = prebuilt
        .as_deref()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .map_or_else(|| host.ndk_tag(), str::to_string);
    let version = revision(root);

    let mut found = Vec::new();
    if let Some(entries) = prebuilt.as_ref().and_then(|p| fs::read_dir(p.join("bin")).ok()) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let parsed = name
                .to_str()
                .and_then(|n| parse_compiler_name(n, host.is_windows()));
            let Some((triple, api)) = parsed else {
                continue;
            };
            found.push(ToolchainCandidate {
                path: root.to_path_buf(),
                family: ToolchainFamily::AndroidNdk,
                kind: ToolchainKind::NdkClang,
                target_triple_prefix: triple,
                host_platform: host_platform.clone(),
                api_level: Some(api),
                compiler: Some(entry.path()),
                origin,
                verified: true,
                version: version.clone(),
            });
        }
    }

    if found.is_empty() {
        tracing::debug!(root = %root.display(), "NDK root has no clang wrappers for this host");
        found.push(ToolchainCandidate {
            path: root.to_path_buf(),
            family: ToolchainFamily::AndroidNdk,
            kind: ToolchainKind::NdkClang,
            target_triple_prefix: String::new(),
            host_platform,
            api_level: None,
            compiler: None,
            origin,
            verified: true,
            version,
        });
    }

    // read_dir order is platform-dependent; keep discovery order stable.
    found.sort_by(|a, b| a.compiler.cmp(&b.compiler));
    found
}

fn sysroot(root: &Path, host: &HostPlatform) -> PathBuf {
    if let Some(sysroot) = prebuilt_dir(root, host)
        .map(|p| p.join("sysroot"))
        .filter(|p| p.is_dir())
    {
        return sysroot;
    }
    let legacy = root.join("sysroot");
    if legacy.is_dir() {
        return legacy;
    }
    root.join("toolchains")
        .join("llvm")
        .join("prebuilt")
        .join(host.ndk_tag())
        .join("sysroot")
}

/// The C++ driver next to an NDK clang wrapper (`...21-clang` → `...21-clang++`).
fn cxx_for(cc: &Path) -> Option<PathBuf> {
    let name = cc.file_name()?.to_str()?;
    Some(cc.with_file_name(name.replacen("-clang", "-clang++", 1)))
}

/// The variables `go build` needs to link against this NDK.
///
/// Only the matching compiler gets wired in as `CC`/`CXX`. Without one the
/// environment falls back to pointing cgo at the NDK headers.
pub fn cgo_env(
    candidate: &ToolchainCandidate,
    wanted_triple: Option<&str>,
    host: &HostPlatform,
) -> ToolchainEnv {
    let root = candidate.path.display().to_string();
    let sysroot = sysroot(&candidate.path, host);
    let include = format!("-I{}", sysroot.join("usr").join("include").display());

    let compiler = candidate
        .compiler
        .as_deref()
        .filter(|_| wanted_triple == Some(candidate.target_triple_prefix.as_str()));

    let mut env = ToolchainEnv::default();
    match compiler {
        Some(cc) => {
            env.remove_prefixes.push("ANDROID_".to_string());
            env.remove.extend(
                ["CC", "CXX", "CGO_CFLAGS", "CGO_LDFLAGS"]
                    .iter()
                    .map(|v| v.to_string()),
            );
            env.vars.insert("ANDROID_NDK_HOME".into(), root.clone());
            env.vars.insert("ANDROID_NDK_ROOT".into(), root);
            env.vars.insert("CGO_CFLAGS".into(), include);
            env.vars.insert(
                "CGO_LDFLAGS".into(),
                format!("-L{}", sysroot.join("usr").join("lib").display()),
            );
            env.vars.insert("CC".into(), cc.display().to_string());
            if let Some(cxx) = cxx_for(cc) {
                env.vars.insert("CXX".into(), cxx.display().to_string());
            }
        }
        None => {
            tracing::warn!(
                root = %candidate.path.display(),
                "No matching NDK compiler found, using minimal NDK environment"
            );
            env.vars.insert("ANDROID_NDK_HOME".into(), root);
            env.vars.insert("CGO_CFLAGS".into(), include);
        }
    }
    env
}
