//! Asking a person for a toolchain path when discovery comes up empty.

use std::fmt;
use std::io::{BufRead, BufReader, Stderr, Stdin, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use super::ToolchainFamily;
use crate::platform::TargetDescriptor;

/// Something that can ask for a toolchain location.
///
/// Implementations are called from worker threads, but never concurrently:
/// the resolver serialises prompts.
pub trait ToolchainPrompter: Send + Sync {
    /// Ask for a toolchain root for `family`. `None` means the user declined.
    fn ask_toolchain_path(
        &self,
        family: ToolchainFamily,
        target: &TargetDescriptor,
    ) -> Option<PathBuf>;
}

/// Whether the toolchain resolver may ask for help.
#[derive(Clone, Default)]
pub enum Interaction {
    #[default]
    NonInteractive,
    Prompting(Arc<dyn ToolchainPrompter>),
}

impl Interaction {
    pub fn prompting(prompter: impl ToolchainPrompter + 'static) -> Self {
        Interaction::Prompting(Arc::new(prompter))
    }

    pub fn prompter(&self) -> Option<&dyn ToolchainPrompter> {
        match self {
            Interaction::NonInteractive => None,
            Interaction::Prompting(p) => Some(p.as_ref()),
        }
    }
}

impl fmt::Debug for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interaction::NonInteractive => f.write_str("NonInteractive"),
            Interaction::Prompting(_) => f.write_str("Prompting(..)"),
        }
    }
}

/// Line-based prompter over any reader/writer pair.
pub struct StdioPrompter<R, W> {
    io: Mutex<(R, W)>,
}

impl<R: BufRead + Send, W: Write + Send> StdioPrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }
}

impl StdioPrompter<BufReader<Stdin>, Stderr> {
    /// Prompt on the terminal: questions go to stderr, answers come from stdin.
    pub fn terminal() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

impl<R: BufRead + Send, W: Write + Send> StdioPrompter<R, W> {
    fn ask(&self, question: &str) -> Option<String> {
        let mut io = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let (reader, writer) = &mut *io;

        write!(writer, "{question} ").ok()?;
        writer.flush().ok()?;

        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        Some(line.trim().to_string())
    }

    fn confirm(&self, question: &str) -> bool {
        self.ask(&format!("{question} [y/N]"))
            .is_some_and(|a| matches!(a.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

impl<R: BufRead + Send, W: Write + Send> ToolchainPrompter for StdioPrompter<R, W> {
    fn ask_toolchain_path(
        &self,
        family: ToolchainFamily,
        target: &TargetDescriptor,
    ) -> Option<PathBuf> {
        if !self.confirm(&format!("No {family} found for {target}. Enter its location manually?")) {
            return None;
        }
        self.ask(&format!("Path to the {family}:"))
            .filter(|a| !a.is_empty())
            .map(PathBuf::from)
    }
}
