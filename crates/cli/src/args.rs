use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use model::{Config, DEFAULT_BUFFER_SIZE, DEFAULT_RETRIES, DuplicateMode};

/// Parsed command-line invocation.
///
/// Source enumeration is always a plain directory tree
/// ([`source::FsSource`]); device-specific enumeration backends are an
/// external collaborator this crate does not implement.
#[derive(Debug, Parser)]
#[command(
    name = "ikusync",
    version,
    about = "Resumable, crash-safe one-way file synchronizer"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// The action a single invocation performs.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Synchronize a source directory tree into a destination.
    Sync(SyncArgs),
    /// Report destination files that are byte-identical to another managed
    /// file, without modifying anything.
    Duplicates(DuplicatesArgs),
}

/// Arguments for [`Command::Sync`].
#[derive(Debug, clap::Args)]
pub struct SyncArgs {
    /// Directory tree to copy files from.
    pub source: PathBuf,

    /// Destination directory, local unless `--host` names a remote one.
    pub destination: String,

    /// SSH destination (e.g. `user@example.com`) to sync into over `ssh`,
    /// instead of a local directory.
    #[arg(long)]
    pub host: Option<String>,

    /// Stream chunk size, in bytes, for reads, writes, and hashing.
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,

    /// Write attempts made per file before the run gives up on it.
    #[arg(long, default_value_t = DEFAULT_RETRIES)]
    pub retries: u32,

    /// Delay observed between successive file copies, in seconds.
    #[arg(long, default_value_t = 0.0)]
    pub delay: f64,

    /// Remove destination files absent from the source after a successful
    /// pass.
    #[arg(short, long)]
    pub destructive: bool,

    /// Suppress progress output.
    #[arg(short, long)]
    pub silent: bool,
}

impl SyncArgs {
    /// Builds the [`Config`] this invocation describes.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            buffer_size: self.buffer_size,
            retries: self.retries,
            delay: Duration::from_secs_f64(self.delay.max(0.0)),
            destructive: self.destructive,
            silent: self.silent,
        }
    }
}

/// Arguments for [`Command::Duplicates`].
#[derive(Debug, clap::Args)]
pub struct DuplicatesArgs {
    /// Destination directory managed by a prior sync run.
    pub folder: PathBuf,

    /// Grouping strategy: `content` (bytes match) or `strict` (bytes,
    /// modification time, and size all match).
    #[arg(long, value_enum, default_value_t = DuplicateModeArg::Content)]
    pub mode: DuplicateModeArg,
}

/// Command-line mirror of [`DuplicateMode`], spelled the way a user types it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicateModeArg {
    /// See [`DuplicateMode::Content`].
    Content,
    /// See [`DuplicateMode::Strict`].
    Strict,
}

impl From<DuplicateModeArg> for DuplicateMode {
    fn from(mode: DuplicateModeArg) -> Self {
        match mode {
            DuplicateModeArg::Content => Self::Content,
            DuplicateModeArg::Strict => Self::Strict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_args(cli: Cli) -> SyncArgs {
        match cli.command {
            Command::Sync(args) => args,
            Command::Duplicates(_) => panic!("expected a sync command"),
        }
    }

    #[test]
    fn defaults_match_the_config_defaults() {
        let cli = Cli::parse_from(["ikusync", "sync", "/src", "/dst"]);
        assert_eq!(sync_args(cli).config(), Config::default());
    }

    #[test]
    fn flags_populate_the_config() {
        let cli = Cli::parse_from([
            "ikusync",
            "sync",
            "/src",
            "/dst",
            "--destructive",
            "--silent",
            "--retries",
            "5",
            "--delay",
            "0.5",
        ]);
        let config = sync_args(cli).config();
        assert!(config.destructive);
        assert!(config.silent);
        assert_eq!(config.retries, 5);
        assert_eq!(config.delay, Duration::from_millis(500));
    }

    #[test]
    fn duplicates_mode_defaults_to_content() {
        let cli = Cli::parse_from(["ikusync", "duplicates", "/dst"]);
        match cli.command {
            Command::Duplicates(args) => assert_eq!(args.mode, DuplicateModeArg::Content),
            Command::Sync(_) => panic!("expected a duplicates command"),
        }
    }

    #[test]
    fn duplicates_mode_accepts_strict() {
        let cli = Cli::parse_from(["ikusync", "duplicates", "/dst", "--mode", "strict"]);
        match cli.command {
            Command::Duplicates(args) => assert_eq!(args.mode, DuplicateModeArg::Strict),
            Command::Sync(_) => panic!("expected a duplicates command"),
        }
    }
}
