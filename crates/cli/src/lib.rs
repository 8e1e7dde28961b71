#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The thin command-line front end: parses arguments into a [`Cli`] and
//! dispatches on its [`Command`]. `sync` resolves the source directory and
//! destination filesystem, drives one [`sync::Synchronizer`] run, and
//! renders the result; `duplicates` reindexes a previously-synced
//! destination and reports the groups of files sharing content, without
//! writing anything. Argument parsing itself is a small wrapper around
//! [`clap`]; the actual device-enumeration backend a production deployment
//! would plug in here is an external collaborator this crate does not
//! implement, so the source is always a plain directory tree via
//! [`source::FsSource`].
//!
//! # Design
//!
//! [`run`] takes an argument iterator and output sinks rather than reading
//! `std::env::args` and writing directly to `stdout`/`stderr`, so the whole
//! CLI surface is exercised by ordinary tests without touching process-wide
//! state. [`exit_code_from`] converts the returned status code into an
//! [`std::process::ExitCode`] for `main` to return.
//!
//! `run_sync`/`run_duplicates` emit `tracing` events at run start and at
//! each outcome (success, interrupt, failure); like every other library
//! crate in this workspace, this one only emits events — installing a
//! subscriber is `src/bin/ikusync.rs`'s job alone.

mod args;
mod error;
mod report;

use std::ffi::OsString;
use std::io::Write;

use clap::error::ErrorKind;
use clap::Parser;
use fs::{FileSystem, LocalFileSystem, RemoteFileSystem};
use index::Indexer;
use source::FsSource;
use sync::{SyncError, Synchronizer};

pub use args::{Cli, Command, DuplicatesArgs, SyncArgs};
pub use error::ExitStatus;
pub use report::{format_duplicates, format_summary};

/// Runs the CLI against `arguments`, writing all output through `stdout`
/// and `stderr`.
///
/// Returns the process exit code the caller should use; see
/// [`exit_code_from`] to convert it into an [`std::process::ExitCode`].
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
    Out: Write,
    Err: Write,
{
    interrupt::install();

    let cli = match Cli::try_parse_from(arguments) {
        Ok(cli) => cli,
        Err(err) => {
            let rendered = err.render().to_string();
            let to_stdout = matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
            if to_stdout {
                let _ = write!(stdout, "{rendered}");
            } else {
                let _ = write!(stderr, "{rendered}");
            }
            return err.exit_code();
        }
    };

    match cli.command {
        Command::Sync(args) => run_sync(&args, stdout, stderr),
        Command::Duplicates(args) => run_duplicates(&args, stdout, stderr),
    }
}

fn run_sync<Out, Err>(args: &SyncArgs, stdout: &mut Out, stderr: &mut Err) -> i32
where
    Out: Write,
    Err: Write,
{
    let config = args.config();
    let mut source = FsSource::new(args.source.clone());
    tracing::info!(source = %args.source.display(), destination = %args.destination, host = ?args.host, "starting sync run");

    let mut backend: Box<dyn FileSystem> = match &args.host {
        Some(host) => match RemoteFileSystem::connect(host.clone(), args.destination.clone()) {
            Ok(remote) => Box::new(remote),
            Err(err) => {
                tracing::warn!(host = %host, error = %err, "failed to connect to remote destination");
                let _ = writeln!(stderr, "{err}");
                return ExitStatus::InvalidArgument.code();
            }
        },
        None => {
            let local = LocalFileSystem::new(args.destination.clone());
            Box::new(local)
        }
    };

    let dest_folder = backend.base_folder().to_string();
    if args.host.is_none() {
        if let Err(err) = backend.mkdir(&dest_folder) {
            tracing::warn!(path = %dest_folder, error = %err, "failed to create destination folder");
            let _ = writeln!(stderr, "{err}");
            return ExitStatus::InvalidArgument.code();
        }
    }

    let synchronizer = Synchronizer::new(config.clone());
    let result = synchronizer.synchronize(&mut source, backend.as_mut(), &dest_folder, || {
        if !config.silent {
            let _ = write!(stdout, ".");
        }
    });

    match result {
        Ok(result) => {
            if !config.silent {
                let _ = writeln!(stdout);
            }
            let _ = write!(stdout, "{}", format_summary(&result));
            if let Some(path) = &result.details.current_destination_path {
                tracing::warn!(path = %path.display(), "sync run ended with a fatal per-file failure");
                ExitStatus::Failed.code()
            } else {
                tracing::info!(
                    files_copied = result.details.files_copied,
                    files_skipped = result.details.files_skipped,
                    "sync run completed"
                );
                ExitStatus::Ok.code()
            }
        }
        Err(SyncError::Interrupted(interrupted)) => {
            tracing::warn!(
                files_copied = interrupted.data.details.files_copied,
                "sync run interrupted"
            );
            if !config.silent {
                let _ = writeln!(stdout);
            }
            let _ = writeln!(stderr, "interrupted");
            let _ = write!(stdout, "{}", format_summary(&interrupted.data));
            ExitStatus::Interrupted.code()
        }
        Err(err) => {
            tracing::warn!(error = %err, "sync run failed");
            let _ = writeln!(stderr, "{err}");
            ExitStatus::Failed.code()
        }
    }
}

fn run_duplicates<Out, Err>(args: &DuplicatesArgs, stdout: &mut Out, stderr: &mut Err) -> i32
where
    Out: Write,
    Err: Write,
{
    let folder = args.folder.to_string_lossy().into_owned();
    let mut backend = LocalFileSystem::new(folder.clone());
    tracing::info!(folder = %folder, mode = ?args.mode, "reindexing before duplicate scan");

    let mut indexer = Indexer::open(&mut backend, folder.clone());
    if let Err(err) = indexer.reindex(&mut backend, model::DEFAULT_BUFFER_SIZE, || {}) {
        tracing::warn!(folder = %folder, error = %err, "reindex failed");
        let _ = writeln!(stderr, "{err}");
        return ExitStatus::Failed.code();
    }
    if let Err(err) = indexer.commit(&mut backend) {
        tracing::warn!(folder = %folder, error = %err, "index commit failed");
        let _ = writeln!(stderr, "{err}");
        return ExitStatus::Failed.code();
    }

    let groups = indexer.find_duplicates(args.mode.into());
    tracing::info!(groups = groups.len(), "duplicate scan complete");
    let _ = write!(stdout, "{}", format_duplicates(&groups));
    ExitStatus::Ok.code()
}

/// Converts a numeric exit status into an [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, 255);
    std::process::ExitCode::from(u8::try_from(clamped).unwrap_or(255))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::tempdir;

    #[test]
    fn version_flag_reports_success() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(["ikusync", "--version"], &mut stdout, &mut stderr);
        assert_eq!(status, 0);
        assert!(!stdout.is_empty());
        assert!(stderr.is_empty());
    }

    #[test]
    fn missing_arguments_report_invalid_usage() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(["ikusync"], &mut stdout, &mut stderr);
        assert_eq!(status, 2);
        assert!(!stderr.is_empty());
    }

    #[test]
    fn cold_start_run_copies_every_file_and_reports_success() {
        let source_dir = tempdir().expect("source dir");
        stdfs::write(source_dir.path().join("a.jpg"), b"hello").expect("write a");
        let dest_dir = tempdir().expect("dest dir");

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(
            [
                "ikusync".to_string(),
                "sync".to_string(),
                "--silent".to_string(),
                source_dir.path().to_string_lossy().into_owned(),
                dest_dir.path().to_string_lossy().into_owned(),
            ],
            &mut stdout,
            &mut stderr,
        );

        assert_eq!(status, 0, "stderr: {}", String::from_utf8_lossy(&stderr));
        assert!(dest_dir.path().join("a.jpg").exists());
        let summary = String::from_utf8_lossy(&stdout);
        assert!(summary.contains("files copied:   1"));
    }

    #[test]
    fn duplicates_command_reports_groups_after_a_sync() {
        let source_dir = tempdir().expect("source dir");
        stdfs::write(source_dir.path().join("a.jpg"), b"same bytes").expect("write a");
        stdfs::write(source_dir.path().join("b.jpg"), b"same bytes").expect("write b");
        let dest_dir = tempdir().expect("dest dir");

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let sync_status = run(
            [
                "ikusync".to_string(),
                "sync".to_string(),
                "--silent".to_string(),
                source_dir.path().to_string_lossy().into_owned(),
                dest_dir.path().to_string_lossy().into_owned(),
            ],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(sync_status, 0, "stderr: {}", String::from_utf8_lossy(&stderr));

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(
            [
                "ikusync".to_string(),
                "duplicates".to_string(),
                dest_dir.path().to_string_lossy().into_owned(),
            ],
            &mut stdout,
            &mut stderr,
        );

        assert_eq!(status, 0, "stderr: {}", String::from_utf8_lossy(&stderr));
        let report = String::from_utf8_lossy(&stdout);
        assert!(report.contains("group 1: 2 files"));
    }
}
