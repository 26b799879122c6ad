//! Host clang discovery (Xcode, Homebrew, distro packages, Windows installs).

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{CandidateOrigin, ToolchainCandidate, ToolchainEnv, ToolchainFamily, ToolchainKind};
use crate::host::HostPlatform;

pub const ENV_VARS: &[&str] = &["CC"];

/// Where a clang install came from. Decides which extra variables it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClangFlavor {
    System,
    VisualStudio,
    MinGw,
    Llvm,
}

impl ClangFlavor {
    pub fn of(path: &Path) -> Self {
        let p = path.to_string_lossy().to_ascii_lowercase();
        if p.contains("microsoft visual studio") {
            ClangFlavor::VisualStudio
        } else if p.contains("msys64") || p.contains("mingw") {
            ClangFlavor::MinGw
        } else if p.contains("llvm") {
            ClangFlavor::Llvm
        } else {
            ClangFlavor::System
        }
    }
}

fn exe(host: &HostPlatform, name: &str) -> String {
    if host.is_windows() {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Whether `path` looks like a clang driver (`clang`, `clang-17`, `clang.exe`).
pub fn is_clang_name(path: &Path) -> bool {
    path.file_stem()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == "clang" || n.starts_with("clang-"))
}

/// Well-known clang locations for `host`. Not all of them exist.
pub fn default_search_paths(host: &HostPlatform) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    match host.os.as_str() {
        "windows" => {
            for (year, base) in [
                ("2022", r"C:\Program Files\Microsoft Visual Studio"),
                ("2019", r"C:\Program Files (x86)\Microsoft Visual Studio"),
            ] {
                for edition in ["Community", "Professional", "Enterprise"] {
                    paths.push(
                        Path::new(base)
                            .join(year)
                            .join(edition)
                            .join(r"VC\Tools\Llvm\bin\clang.exe"),
                    );
                }
            }
            for p in [
                r"C:\Program Files\LLVM\bin\clang.exe",
                r"C:\Program Files (x86)\LLVM\bin\clang.exe",
                r"C:\LLVM\bin\clang.exe",
                r"C:\msys64\mingw64\bin\clang.exe",
                r"C:\msys64\mingw32\bin\clang.exe",
                r"C:\msys64\clang64\bin\clang.exe",
                r"C:\mingw64\bin\clang.exe",
                r"C:\mingw32\bin\clang.exe",
                r"C:\Program Files\Git\usr\bin\clang.exe",
                r"C:\Program Files (x86)\Git\usr\bin\clang.exe",
            ] {
                paths.push(PathBuf::from(p));
            }
        }
        "darwin" => {
            paths.push(PathBuf::from("/usr/bin/clang"));
            paths.push(PathBuf::from("/opt/homebrew/bin/clang"));
            paths.push(PathBuf::from("/usr/local/bin/clang"));
        }
        _ => {
            paths.push(PathBuf::from("/usr/bin/clang"));
            paths.push(PathBuf::from("/usr/local/bin/clang"));
            for v in 10..=18 {
                paths.push(PathBuf::from(format!("/usr/bin/clang-{v}")));
                paths.push(PathBuf::from(format!("/usr/local/bin/clang-{v}")));
            }
        }
    }

    paths
}

/// Resolve a user-supplied path to a clang binary. Accepts the binary itself
/// or an install directory holding `bin/clang` or `clang`.
pub fn binary_in(path: &Path, host: &HostPlatform) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let name = exe(host, "clang");
    [path.join("bin").join(&name), path.join(&name)]
        .into_iter()
        .find(|p| p.is_file())
}

/// What an invalid clang location is missing, for error messages.
pub fn missing_markers(host: &HostPlatform) -> Vec<String> {
    vec![format!("bin/{}", exe(host, "clang"))]
}

/// The default target triple of a clang binary (`clang -dumpmachine`).
pub fn dump_machine(clang: &Path) -> Option<String> {
    let output = Command::new(clang).arg("-dumpmachine").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let triple = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!triple.is_empty()).then_some(triple)
}

/// The version from the first line of `clang --version`.
pub fn version(clang: &Path) -> Option<String> {
    let output = Command::new(clang).arg("--version").output().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_version(stdout.lines().next()?)
}

fn parse_version(first_line: &str) -> Option<String> {
    let mut words = first_line.split_whitespace();
    words.find(|w| *w == "version")?;
    words.next().map(str::to_string)
}

pub fn candidate(
    binary: &Path,
    host: &HostPlatform,
    origin: CandidateOrigin,
) -> ToolchainCandidate {
    ToolchainCandidate {
        path: binary.to_path_buf(),
        family: ToolchainFamily::Clang,
        kind: ToolchainKind::NativeClang,
        target_triple_prefix: dump_machine(binary).unwrap_or_default(),
        host_platform: host.to_string(),
        api_level: None,
        compiler: Some(binary.to_path_buf()),
        origin,
        verified: true,
        version: version(binary),
    }
}

/// `CC`/`CXX` for a clang install, plus the install-specific extras.
pub fn cgo_env(candidate: &ToolchainCandidate, host: &HostPlatform) -> ToolchainEnv {
    let mut env = ToolchainEnv::default();
    let Some(cc) = candidate.compiler.as_deref() else {
        return env;
    };

    env.vars.insert("CC".into(), cc.display().to_string());
    let cxx = cc.with_file_name(exe(host, "clang++"));
    if cxx.exists() {
        env.vars.insert("CXX".into(), cxx.display().to_string());
    }

    let bin_dir = cc.parent();
    match ClangFlavor::of(cc) {
        ClangFlavor::VisualStudio => {
            // <vc>/Tools/Llvm/bin/clang.exe
            let vc = bin_dir
                .and_then(Path::parent)
                .and_then(Path::parent)
                .and_then(Path::parent);
            if let Some(vc) = vc {
                env.vars.insert("VCINSTALLDIR".into(), vc.display().to_string());
            }
        }
        ClangFlavor::MinGw => env.path_prefix = bin_dir.map(Path::to_path_buf),
        ClangFlavor::System | ClangFlavor::Llvm => {}
    }

    env
}
