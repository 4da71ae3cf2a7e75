//! Command-line interface definitions for Feed Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets are never taken as flags; they come from the environment (see
//! [`crate::config`]).

use crate::models::GroupBy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Directory the fetch step unpacks into when none is given.
pub const DEFAULT_ARTIFACT_DIR: &str = "artifacts_json";

/// Which half of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Fetch artifacts, then merge, render and send.
    Run,
    /// Only download and unpack artifacts.
    Fetch,
    /// Only merge, render and send what is already on disk.
    Digest,
}

impl Mode {
    pub fn fetches(self) -> bool {
        matches!(self, Mode::Run | Mode::Fetch)
    }

    pub fn digests(self) -> bool {
        matches!(self, Mode::Run | Mode::Digest)
    }

    /// Working directory used when no positional directory is given.
    pub fn default_dir(self) -> PathBuf {
        match self {
            Mode::Run | Mode::Fetch => PathBuf::from(DEFAULT_ARTIFACT_DIR),
            Mode::Digest => PathBuf::from("."),
        }
    }
}

/// Command-line arguments for the Feed Digest application.
///
/// # Examples
///
/// ```sh
/// # Fetch the latest artifacts and email a source-grouped digest
/// feed_digest
///
/// # Email a keyword digest from snapshots already in ./snapshots
/// feed_digest --mode digest --group-by keyword ./snapshots
///
/// # Preview the HTML without sending
/// feed_digest --mode digest --dry-run > digest.html
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Working directory for downloaded artifacts and snapshot files
    pub dir: Option<PathBuf>,

    /// Pipeline stages to run
    #[arg(short, long, value_enum, default_value_t = Mode::Run)]
    pub mode: Mode,

    /// Digest layout; overrides the settings file
    #[arg(short, long, value_enum)]
    pub group_by: Option<GroupBy>,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Repository (owner/name) whose artifacts are fetched
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Print the rendered HTML to stdout instead of sending it
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn working_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| self.mode.default_dir())
    }
}
