//! mediacheck CLI — flag parsing, live progress, and the final report.
//!
//! The heavy lifting is in `mediacheck-core`; this crate maps flags onto a
//! `ScanPolicy`, drives the scan on a background thread, renders throttled
//! progress to stderr, and prints/export the report when the scan finishes.

pub mod report;
pub mod scan_task;

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use mediacheck_core::format::format_size;
use mediacheck_core::{ChunkMode, Preset, ScanPolicy, ScanTarget};

use scan_task::ScanProgress;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    /// Sample large files, skip known folders and media extensions.
    Fast,
    /// Full read of everything with consistency verification.
    Forensics,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChunkArg {
    Auto,
    #[value(name = "128k")]
    Chunk128k,
    #[value(name = "256k")]
    Chunk256k,
    #[value(name = "512k")]
    Chunk512k,
    #[value(name = "1m")]
    Chunk1m,
}

impl From<ChunkArg> for ChunkMode {
    fn from(value: ChunkArg) -> Self {
        match value {
            ChunkArg::Auto => ChunkMode::Auto,
            ChunkArg::Chunk128k => ChunkMode::Fixed128K,
            ChunkArg::Chunk256k => ChunkMode::Fixed256K,
            ChunkArg::Chunk512k => ChunkMode::Fixed512K,
            ChunkArg::Chunk1m => ChunkMode::Fixed1M,
        }
    }
}

/// Read-integrity diagnostic for removable storage.
#[derive(Debug, Parser)]
#[command(
    name = "mediacheck",
    version,
    about = "Read-integrity diagnostic for removable storage",
    long_about = "Walks a directory tree, reads file contents under a configurable \
                  policy, and reports I/O health: persistent vs. transient read \
                  failures, consistency mismatches, throughput behaviour, and the \
                  largest/most failure-prone paths."
)]
pub struct Args {
    /// Root directory to scan (e.g. the mount point of the card).
    pub root: PathBuf,

    /// Start from a named preset; explicit flags below still override it.
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// Read every byte of every file instead of sampling large ones.
    #[arg(long)]
    full_read: bool,

    /// Sample files larger than this many MiB (when not using --full-read).
    #[arg(long, value_name = "MIB")]
    threshold_mib: Option<u64>,

    /// Retries after a failed read (0-3).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
    retries: Option<u8>,

    /// Re-read regions and compare checksums to catch unstable reads.
    #[arg(long)]
    consistency: bool,

    /// Chunk size for full reads.
    #[arg(long, value_enum)]
    chunk: Option<ChunkArg>,

    /// Skip well-known console data folders.
    #[arg(long)]
    skip_known_folders: bool,

    /// Skip archive/media/disk-image extensions.
    #[arg(long)]
    skip_media: bool,

    /// The root is a specific folder, not the whole medium; the known-folder
    /// filter never skips a targeted root.
    #[arg(long)]
    targeted: bool,

    /// Write the full report as JSON to this path.
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Export the largest-files table as CSV to this path.
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Suppress live progress output.
    #[arg(long, short)]
    quiet: bool,
}

fn build_policy(args: &Args) -> ScanPolicy {
    let mut policy = match args.preset {
        Some(PresetArg::Fast) => ScanPolicy::from_preset(Preset::Fast),
        Some(PresetArg::Forensics) => ScanPolicy::from_preset(Preset::Forensics),
        None => ScanPolicy::default(),
    };
    if args.full_read {
        policy.full_read = true;
    }
    if let Some(mib) = args.threshold_mib {
        policy.large_file_threshold = mib * 1024 * 1024;
    }
    if let Some(retries) = args.retries {
        policy.retry_count = retries;
    }
    if args.consistency {
        policy.consistency_check = true;
    }
    if let Some(chunk) = args.chunk {
        policy.chunk_mode = chunk.into();
    }
    if args.skip_known_folders {
        policy.skip_known_folders = true;
    }
    if args.skip_media {
        policy.skip_media_extensions = true;
    }
    policy.target = if args.targeted {
        ScanTarget::Folder
    } else {
        ScanTarget::Root
    };
    policy
}

/// Entry point used by the `mediacheck` binary.
pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    run_with_args(args)
}

fn run_with_args(args: Args) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.root.is_dir(),
        "scan root {} is not a directory",
        args.root.display()
    );

    let policy = build_policy(&args);
    let started_at = chrono::Local::now();
    let start = Instant::now();

    let handle = scan_task::start_scan(args.root.clone(), policy.clone());

    let token = handle.cancel_token();
    ctrlc::set_handler(move || token.cancel()).context("failed to install Ctrl-C handler")?;

    loop {
        match handle.progress_rx.recv() {
            Ok(ScanProgress::Update {
                files_total,
                bytes_read,
                errors,
                current_path,
                ..
            }) => {
                if !args.quiet {
                    let elapsed = start.elapsed().as_secs_f64().max(0.001);
                    let mib_s = bytes_read as f64 / 1_048_576.0 / elapsed;
                    eprint!(
                        "\r\x1b[2K{} files, {} ({mib_s:.1} MiB/s), {errors} errors — {}",
                        files_total,
                        format_size(bytes_read),
                        tail_ellipsize(&current_path, 60),
                    );
                    let _ = io::stderr().flush();
                }
            }
            Ok(ScanProgress::Completed { stats, duration }) => {
                if !args.quiet {
                    eprintln!("\r\x1b[2K");
                }
                report::render(&stats, &policy, started_at, duration);
                if let Some(path) = &args.json {
                    report::write_json(path, &stats, &policy, started_at, duration)?;
                    println!("JSON report written to {}", path.display());
                }
                if let Some(path) = &args.csv {
                    report::write_csv(path, &stats)?;
                    println!("CSV export written to {}", path.display());
                }
                return Ok(());
            }
            Ok(ScanProgress::Failed { error }) => {
                return Err(error).context("scan aborted");
            }
            Err(_) => anyhow::bail!("scan thread disconnected before completing"),
        }
    }
}

/// Keep the tail of a long path, prefixed with `...`.
fn tail_ellipsize(path: &str, keep: usize) -> String {
    if path.len() <= keep || keep < 8 {
        return path.to_owned();
    }
    let tail = keep - 3;
    let start = path.len() - tail;
    // Avoid splitting a multi-byte character.
    let start = (start..path.len())
        .find(|&i| path.is_char_boundary(i))
        .unwrap_or(path.len());
    format!("...{}", &path[start..])
}
