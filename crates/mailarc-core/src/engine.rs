//! Typed invocation of the external search engine
//!
//! Everything the orchestration layer needs from notmuch goes through the
//! [`SearchEngine`] trait so tests can substitute a fake. The real
//! implementation shells out with `std::process::Command`; output formats
//! and result grouping are explicit enums rather than stringly-typed flags.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};

/// Result grouping used by a search.
///
/// Summary and identifier queries must run at the same granularity or the
/// positional pairing between them is silently wrong. Holding a single value
/// and threading it through both invocations rules that out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One result per conversation thread
    Thread,
    /// One result per individual message.
    ///
    /// notmuch has no per-message summary output, so this granularity only
    /// works for identifier searches; asking for summaries at it is an
    /// error, never a silently wrong pairing.
    Message,
}

/// Output shape requested from a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutput {
    /// One human-readable line per result group, prefixed with the group
    /// identifier
    Summary,
    /// One bare identifier per result group
    Identifiers,
}

/// Search engine operations consumed by the lister and the viewer
pub trait SearchEngine {
    /// Run a search, returning the ordered output lines
    fn search(
        &self,
        query: &str,
        output: SearchOutput,
        granularity: Granularity,
    ) -> Result<Vec<String>>;

    /// Fetch the parsed content of one thread or message
    fn show_json(&self, id: &str) -> Result<serde_json::Value>;

    /// Write one raw MIME part to `dest`, returning the number of bytes
    /// written
    fn save_part(&self, id: &str, part: u32, dest: &Path) -> Result<u64>;
}

/// The real engine: shells out to the notmuch binary
#[derive(Debug, Clone)]
pub struct Notmuch {
    program: String,
}

impl Notmuch {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Probe the binary so a missing installation is reported before the
    /// interactive loop starts
    pub fn version(&self) -> Result<String> {
        let output = self.run(&["--version"])?;
        Ok(output.lines().next().unwrap_or_default().to_string())
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        debug!(program = %self.program, ?args, "invoking search engine");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: self.program.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_raw(&self, args: &[&str]) -> Result<Vec<u8>> {
        debug!(program = %self.program, ?args, "invoking search engine (raw)");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: self.program.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    fn spawn_error(&self, err: std::io::Error) -> Error {
        if err.kind() == ErrorKind::NotFound {
            Error::MissingTool {
                tool: self.program.clone(),
            }
        } else {
            Error::Io(err)
        }
    }
}

impl SearchEngine for Notmuch {
    fn search(
        &self,
        query: &str,
        output: SearchOutput,
        granularity: Granularity,
    ) -> Result<Vec<String>> {
        let output_flag = match (output, granularity) {
            (SearchOutput::Summary, Granularity::Thread) => "--output=summary",
            // Summaries are always thread rows; pairing them with message
            // identifiers would corrupt the positional mapping.
            (SearchOutput::Summary, Granularity::Message) => {
                return Err(Error::UnsupportedGranularity)
            }
            (SearchOutput::Identifiers, Granularity::Thread) => "--output=threads",
            (SearchOutput::Identifiers, Granularity::Message) => "--output=messages",
        };

        let stdout = self.run(&["search", "--format=text", output_flag, query])?;
        Ok(stdout.lines().map(str::to_string).collect())
    }

    fn show_json(&self, id: &str) -> Result<serde_json::Value> {
        let stdout = self.run(&["show", "--format=json", "--entire-thread=false", id])?;
        Ok(serde_json::from_str(&stdout)?)
    }

    fn save_part(&self, id: &str, part: u32, dest: &Path) -> Result<u64> {
        let part_flag = format!("--part={}", part);
        let bytes = self.run_raw(&[
            "show",
            "--format=raw",
            "--entire-thread=false",
            &part_flag,
            id,
        ])?;
        std::fs::write(dest, &bytes)?;
        Ok(bytes.len() as u64)
    }
}
