#![deny(unsafe_code)]
//! Command-line entry point: parses the subset of the upstream option
//! surface this engine implements and drives one same-host transfer.
//!
//! Only local source -> local destination copies are wired up here; the
//! three-role engine itself is transport-agnostic, but no remote-shell or
//! daemon transport sits in front of it yet (see `DESIGN.md`).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use checksums::Md5Seed;
use clap::Parser;
use engine::options::{FileSelection, SessionOptions};
use engine::session::run_local_transfer;
use logging::{Logger, TracingSink, VerbosityConfig};

/// Pure-Rust rsync transfer engine (protocol 30), same-host transfers only.
#[derive(Parser, Debug)]
#[command(name = "rrsync", version, about)]
struct Cli {
    /// Source paths to copy. The trailing path is always the destination.
    #[arg(required = true, num_args = 2..)]
    paths: Vec<PathBuf>,

    /// Recurse into directories.
    #[arg(short = 'r', long)]
    recursive: bool,

    /// Equivalent to -rlptgoD: recurse and preserve links, perms, times,
    /// group, owner, and device files.
    #[arg(short = 'a', long)]
    archive: bool,

    /// Preserve permissions.
    #[arg(short = 'p', long)]
    perms: bool,

    /// Preserve modification times.
    #[arg(short = 't', long)]
    times: bool,

    /// Preserve owner (super-user only).
    #[arg(short = 'o', long)]
    owner: bool,

    /// Preserve group.
    #[arg(short = 'g', long)]
    group: bool,

    /// Copy symlinks as symlinks.
    #[arg(short = 'l', long)]
    links: bool,

    /// Preserve device and special files (super-user only).
    #[arg(short = 'D', long)]
    devices: bool,

    /// Don't skip files that match in size and mtime.
    #[arg(short = 'I', long = "ignore-times")]
    ignore_times: bool,

    /// Use numeric uid/gid instead of resolving names.
    #[arg(long)]
    numeric_ids: bool,

    /// Delete extraneous files from the destination that aren't in the
    /// source (not yet implemented by the transfer engine).
    #[arg(long)]
    delete: bool,

    /// List files that would be transferred without transferring them
    /// (not yet implemented by the transfer engine).
    #[arg(long)]
    list_only: bool,

    /// Always report itemized changes, even for unchanged files.
    #[arg(short = 'i', long = "itemize-changes")]
    itemize: bool,

    /// Skip writing blocks that match the destination file's own content
    /// in order, verifying them in place instead.
    #[arg(long = "defer-write")]
    defer_write: bool,

    /// Increase verbosity (may be repeated).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let sink = Arc::new(TracingSink);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .init();
    let logger = Logger::new(VerbosityConfig::from_verbose_level(cli.verbose), sink);

    let Some((dest, sources)) = cli.paths.split_last() else {
        eprintln!("rrsync: at least one source and a destination are required");
        return ExitCode::FAILURE;
    };

    let options = options_from_cli(&cli);
    let seed = Md5Seed::proper(process_seed());

    let anchor = common_anchor(sources);
    match run_local_transfer(sources, &anchor, dest, options, seed, logger) {
        Ok(outcome) => {
            if !outcome.io_errors.is_empty() {
                eprintln!("rrsync: completed with I/O errors (mask {:#04x})", outcome.io_errors.as_u8());
                return ExitCode::from(23);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("rrsync: {err}");
            ExitCode::FAILURE
        }
    }
}

fn options_from_cli(cli: &Cli) -> SessionOptions {
    // FileSelection::IncrementalRecursive has no wired-up stub-expansion
    // round trip yet (see DESIGN.md), so -r always walks the whole tree
    // up front rather than picking a variant the engine can't drive.
    let file_selection = if cli.recursive || cli.archive {
        FileSelection::Recursive
    } else {
        FileSelection::NonRecursive
    };

    SessionOptions {
        preserve_perms: cli.perms || cli.archive,
        preserve_times: cli.times || cli.archive,
        preserve_user: cli.owner || cli.archive,
        preserve_group: cli.group || cli.archive,
        preserve_links: cli.links || cli.archive,
        preserve_devices: cli.devices || cli.archive,
        numeric_ids: cli.numeric_ids,
        ignore_times: cli.ignore_times,
        defer_write: cli.defer_write,
        list_only: cli.list_only,
        always_itemize: cli.itemize,
        safe_file_list: true,
        interruptible: false,
        delete: cli.delete,
        file_selection,
    }
}

/// The deepest directory common to every source path, used to compute
/// each entry's relative path the way the file-list builder expects.
fn common_anchor(sources: &[PathBuf]) -> PathBuf {
    sources
        .first()
        .map(|first| {
            if first.is_dir() {
                first.clone()
            } else {
                first.parent().unwrap_or(first.as_path()).to_path_buf()
            }
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

fn process_seed() -> i32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as i32) ^ (std::process::id() as i32)
}
