//! Running external tools with captured output, a deadline and cancellation.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::CompileError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Shared cancel flag. Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early on cancellation.
    /// Returns `false` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let until = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= until {
                return true;
            }
            thread::sleep((until - now).min(POLL_INTERVAL));
        }
    }
}

/// A fully described child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Set on the child after removals are applied.
    pub env: BTreeMap<String, String>,
    pub env_remove: Vec<String>,
    pub env_remove_prefixes: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        if !self.env_remove_prefixes.is_empty() {
            for (key, _) in std::env::vars_os() {
                let key_str = key.to_string_lossy();
                if self.env_remove_prefixes.iter().any(|p| key_str.starts_with(p.as_str())) {
                    cmd.env_remove(&key);
                }
            }
        }
        for key in &self.env_remove {
            cmd.env_remove(key);
        }
        cmd.envs(&self.env);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{key}={value} ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// What a finished process left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    /// stdout and stderr, interleaved as written.
    pub combined: String,
}

/// Runs invocations to completion.
pub trait CommandRunner: Send + Sync {
    /// Run `invocation`, killing it once `deadline` has elapsed or `cancel`
    /// fires. A non-zero exit is a successful run with `success == false`.
    fn run(
        &self,
        invocation: &Invocation,
        deadline: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, CompileError>;
}

/// [`CommandRunner`] backed by `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

/// Kill the child and everything it started. On Unix the child leads its
/// own process group, so compilers and linkers spawned by `go` go too.
fn kill(child: &mut Child) {
    #[cfg(unix)]
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: kill(2) takes no pointers; a negative pid names the group.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        invocation: &Invocation,
        deadline: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, CompileError> {
        if cancel.is_cancelled() {
            return Err(CompileError::Cancelled);
        }
        let spawn_error = |source: io::Error| CompileError::Spawn {
            program: invocation.program.clone(),
            source,
        };

        // stdout and stderr share one pipe so the output stays interleaved.
        let (reader, writer) = io::pipe().map_err(spawn_error)?;
        let stderr = writer.try_clone().map_err(spawn_error)?;

        let mut cmd = invocation.to_command();
        cmd.stdin(Stdio::null()).stdout(writer).stderr(stderr);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        tracing::debug!(command = %invocation, "Spawning");
        let spawned = cmd.spawn();
        // Drop our copies of the write end, or the reader never sees EOF.
        drop(cmd);
        let mut child = spawned.map_err(spawn_error)?;

        let output = drain(reader);
        let started = Instant::now();

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    kill(&mut child);
                    return Err(CompileError::Wait {
                        program: invocation.program.clone(),
                        source,
                    });
                }
            }

            // The reader thread is left to finish on its own once the pipe closes.
            if cancel.is_cancelled() {
                tracing::debug!(program = %invocation.program, "Killing cancelled process");
                kill(&mut child);
                return Err(CompileError::Cancelled);
            }
            if let Some(limit) = deadline {
                if started.elapsed() >= limit {
                    tracing::warn!(
                        program = %invocation.program,
                        ?limit,
                        "Killing process after deadline"
                    );
                    kill(&mut child);
                    return Err(CompileError::TimedOut(limit));
                }
            }

            thread::sleep(POLL_INTERVAL);
        };

        let combined = output.join().unwrap_or_default();
        Ok(ProcessOutput {
            exit_code: status.code(),
            success: status.success(),
            combined: String::from_utf8_lossy(&combined).into_owned(),
        })
    }
}
