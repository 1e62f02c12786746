//! Traversal engine — recursive directory walk driving the read strategy.
//!
//! The engine is single-threaded and cooperative: after every directory
//! entry, every file dispatch, and every region read it invokes the caller's
//! callback with the live [`ScanStats`] and the shared [`CancelToken`]. The
//! callback may do arbitrary work (render progress, block for confirmation)
//! and may set the token; cancellation is level-triggered and observed at
//! every suspension point and loop entry, after which traversal unwinds
//! without starting new directory or file work.
//!
//! Success and cancellation are both normal completions. The only error
//! return is failure to allocate the working buffers.

use std::fs::{self, File};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::buffers::ScanBuffers;
use crate::error::ScanError;
use crate::filters::{should_skip_dir, should_skip_file};
use crate::policy::{ScanPolicy, SAMPLE_REGION};
use crate::read;
use crate::stats::{FailKind, ScanStats};

/// Shared cancellation handle.
///
/// Clone it into whatever needs to request a stop (a Ctrl-C handler, a UI
/// button); the engine observes it at every suspension point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Everything one in-flight scan threads through traversal and reads.
pub(crate) struct ScanCtx<'a> {
    pub policy: &'a ScanPolicy,
    pub stats: &'a mut ScanStats,
    pub buffers: &'a mut ScanBuffers,
    pub cancel: &'a CancelToken,
    pub on_tick: &'a mut dyn FnMut(&ScanStats, &CancelToken),
}

impl ScanCtx<'_> {
    /// Suspension point: telemetry for completed work is fully applied
    /// before the callback observes the stats.
    pub(crate) fn tick(&mut self) {
        (self.on_tick)(self.stats, self.cancel);
        self.cancelled();
    }

    /// Observe the token; `cancelled` is set once and never cleared.
    pub(crate) fn cancelled(&mut self) -> bool {
        if !self.stats.cancelled && self.cancel.is_cancelled() {
            self.stats.cancelled = true;
            debug!("cancellation observed");
        }
        self.stats.cancelled
    }
}

/// Walk `root`, reading file contents under `policy` and accumulating
/// telemetry into `stats`.
///
/// `on_tick` is invoked at every suspension point with the live stats and
/// the token. `stats` must be freshly default-initialised by the caller; it
/// is populated monotonically and never retained past the call.
pub fn scan(
    root: &Path,
    policy: &ScanPolicy,
    stats: &mut ScanStats,
    cancel: &CancelToken,
    mut on_tick: impl FnMut(&ScanStats, &CancelToken),
) -> Result<(), ScanError> {
    info!(root = %root.display(), full_read = policy.full_read, "scan starting");

    let mut buffers = match ScanBuffers::new() {
        Ok(b) => b,
        Err(e) => {
            note_oom(stats, "scan buffers");
            return Err(e);
        }
    };

    let root_str = root.to_string_lossy().into_owned();
    stats.set_current_dir(&root_str);

    let mut ctx = ScanCtx {
        policy,
        stats: &mut *stats,
        buffers: &mut buffers,
        cancel,
        on_tick: &mut on_tick,
    };
    if let Err(e) = scan_dir(&mut ctx, &root_str, root, 0) {
        note_oom(stats, "chunk buffer");
        return Err(e);
    }

    info!(
        dirs = stats.dirs_total,
        files = stats.files_total,
        bytes = stats.bytes_read,
        errors = stats.total_errors(),
        cancelled = stats.cancelled,
        "scan finished"
    );
    Ok(())
}

/// Allocation failure is fatal but still a telemetry event: the ring gets
/// a line so the final report explains why the scan stopped.
fn note_oom(stats: &mut ScanStats, what: &str) {
    stats.push_error(format!("out of memory ({what})"));
}

fn scan_dir(
    ctx: &mut ScanCtx<'_>,
    root_str: &str,
    dir: &Path,
    depth: usize,
) -> Result<(), ScanError> {
    if ctx.cancelled() {
        return Ok(());
    }

    let dir_str = dir.to_string_lossy().into_owned();

    // Depth past the cap means a structural loop is more likely than a real
    // tree; the subtree is abandoned, the scan is not.
    if depth > ctx.policy.tuning.max_depth {
        ctx.stats.path_errors += 1;
        ctx.stats
            .capture_first_failure(FailKind::Path, &dir_str, 0, 0, None, "max depth exceeded");
        ctx.stats
            .push_error(format!("maximum directory depth reached (possible loop): {dir_str}"));
        ctx.stats.note_failing_path(&dir_str);
        return Ok(());
    }

    if should_skip_dir(&dir_str, root_str, ctx.policy) {
        ctx.stats.skipped_dirs += 1;
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            ctx.stats.open_errors += 1;
            ctx.stats.capture_first_failure(
                FailKind::OpenDir,
                &dir_str,
                0,
                0,
                e.raw_os_error(),
                "open dir",
            );
            ctx.stats
                .push_error(format!("open dir failed: {e} ({dir_str})"));
            ctx.stats.note_failing_path(&dir_str);
            return Ok(());
        }
    };

    for entry in entries {
        ctx.tick();
        if ctx.cancelled() {
            break;
        }

        let entry = match entry {
            Ok(en) => en,
            Err(e) => {
                ctx.stats.stat_errors += 1;
                ctx.stats.capture_first_failure(
                    FailKind::Stat,
                    &dir_str,
                    0,
                    0,
                    e.raw_os_error(),
                    "read dir entry",
                );
                ctx.stats
                    .push_error(format!("read dir entry failed: {e} ({dir_str})"));
                ctx.stats.note_failing_path(&dir_str);
                continue;
            }
        };

        let child = entry.path();
        if child.as_os_str().len() > ctx.policy.tuning.max_path_len {
            ctx.stats.path_errors += 1;
            ctx.stats
                .capture_first_failure(FailKind::Path, &dir_str, 0, 0, None, "path too long");
            ctx.stats
                .push_error(format!("path too long under {dir_str}"));
            ctx.stats.note_failing_path(&dir_str);
            continue;
        }
        let child_str = child.to_string_lossy().into_owned();

        let meta = match fs::symlink_metadata(&child) {
            Ok(m) => m,
            Err(e) => {
                ctx.stats.stat_errors += 1;
                ctx.stats.capture_first_failure(
                    FailKind::Stat,
                    &child_str,
                    0,
                    0,
                    e.raw_os_error(),
                    "stat",
                );
                ctx.stats
                    .push_error(format!("stat failed: {e} ({child_str})"));
                ctx.stats.note_failing_path(&child_str);
                continue;
            }
        };

        if meta.is_dir() {
            ctx.stats.dirs_total += 1;
            if should_skip_dir(&child_str, root_str, ctx.policy) {
                ctx.stats.skipped_dirs += 1;
                continue;
            }
            ctx.stats.set_current_dir(&child_str);
            scan_dir(ctx, root_str, &child, depth + 1)?;
            if ctx.cancelled() {
                break;
            }
        } else if meta.is_file() {
            ctx.stats.files_total += 1;
            let size = meta.len();
            // Largest-file tracking sees every regular file, filters or not.
            ctx.stats.note_largest(&child_str, size);

            if should_skip_file(&child_str, ctx.policy) {
                ctx.stats.skipped_files += 1;
                continue;
            }

            let sample = ctx.policy.is_sampled(size);
            let planned = if sample {
                let region = SAMPLE_REGION as u64;
                size.min(region) + if size > region { region } else { 0 }
            } else {
                size
            };
            ctx.stats.set_current_file(&child_str, size, planned, sample);

            ctx.tick();
            if ctx.cancelled() {
                break;
            }

            let mut file = match File::open(&child) {
                Ok(f) => f,
                Err(e) => {
                    ctx.stats.open_errors += 1;
                    ctx.stats.capture_first_failure(
                        FailKind::OpenFile,
                        &child_str,
                        0,
                        0,
                        e.raw_os_error(),
                        "open file",
                    );
                    ctx.stats
                        .push_error(format!("open file failed: {e} ({child_str})"));
                    ctx.stats.note_failing_path(&child_str);
                    continue;
                }
            };

            ctx.stats.files_read += 1;
            let clean = read::read_file(ctx, &mut file, size, sample)?;
            if !clean {
                if ctx.stats.cancelled {
                    break;
                }
                ctx.stats.note_failing_path(&child_str);
            }
        }
        // Symlinks, sockets, fifos and other non-regular entries are
        // silently ignored.
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oom_is_recorded_in_the_error_ring() {
        let mut stats = ScanStats::default();
        note_oom(&mut stats, "chunk buffer");
        assert_eq!(stats.error_ring.total(), 1);
        let lines: Vec<&str> = stats.error_ring.iter_oldest_first().collect();
        assert!(lines[0].contains("out of memory (chunk buffer)"));
    }
}
