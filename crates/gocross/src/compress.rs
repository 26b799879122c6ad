use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{CompileError, PostProcessError};
use crate::process::{CancellationToken, CommandRunner, Invocation};

/// Post-step run on a freshly built binary.
///
/// The binary stays at its path and stays executable; a compressor either
/// shrinks it in place or writes something next to it.
pub trait Compressor: Send + Sync {
    fn compress(
        &self,
        binary: &Path,
        runner: &dyn CommandRunner,
        cancel: &CancellationToken,
    ) -> Result<(), PostProcessError>;
}

/// Packs the binary in place with `upx --best`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpxCompressor {
    program: String,
}

impl Default for UpxCompressor {
    fn default() -> Self {
        Self::new("upx")
    }
}

impl UpxCompressor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn invocation(&self, binary: &Path) -> Invocation {
        Invocation::new(self.program.clone())
            .arg("--best")
            .arg(binary.display().to_string())
    }
}

impl Compressor for UpxCompressor {
    fn compress(
        &self,
        binary: &Path,
        runner: &dyn CommandRunner,
        cancel: &CancellationToken,
    ) -> Result<(), PostProcessError> {
        let fail = |reason: String| PostProcessError {
            path: binary.to_path_buf(),
            reason,
        };

        if !binary.is_file() {
            return Err(fail("binary does not exist".to_string()));
        }

        let output = runner
            .run(&self.invocation(binary), None, cancel)
            .map_err(|e| match e {
                CompileError::Spawn { source, .. } => {
                    fail(format!("could not run {}: {source}", self.program))
                }
                other => fail(other.to_string()),
            })?;
        if !output.success {
            return Err(fail(format!(
                "{} exited with {:?}: {}",
                self.program,
                output.exit_code,
                output.combined.trim()
            )));
        }
        tracing::debug!(binary = %binary.display(), "Packed with {}", self.program);
        Ok(())
    }
}

/// Writes a gzip copy to `<binary>.gz` and keeps the binary.
#[derive(Debug, Clone, Copy)]
pub struct GzipCompressor {
    level: Compression,
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self {
            level: Compression::best(),
        }
    }
}

impl GzipCompressor {
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    fn gzip(&self, binary: &Path, dest: &Path) -> Result<()> {
        let mut input = BufReader::new(
            File::open(binary).with_context(|| format!("opening {}", binary.display()))?,
        );
        let output = File::create(dest).with_context(|| format!("creating {}", dest.display()))?;
        let mut enc = GzEncoder::new(BufWriter::new(output), self.level);
        io::copy(&mut input, &mut enc).context("gzip write")?;
        enc.finish()
            .context("gzip finish")?
            .into_inner()
            .map_err(|e| e.into_error())
            .context("gzip flush")?;
        Ok(())
    }
}

pub fn gz_path(binary: &Path) -> PathBuf {
    let mut name = binary.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

impl Compressor for GzipCompressor {
    fn compress(
        &self,
        binary: &Path,
        _: &dyn CommandRunner,
        _: &CancellationToken,
    ) -> Result<(), PostProcessError> {
        let dest = gz_path(binary);
        if let Err(e) = self.gzip(binary, &dest) {
            let _ = fs::remove_file(&dest);
            return Err(PostProcessError {
                path: binary.to_path_buf(),
                reason: format!("{e:#}"),
            });
        }
        Ok(())
    }
}
