//! Scan telemetry — counters, bounded error/failure lists, and the
//! performance block.
//!
//! `ScanStats` is the aggregate the frontend renders. It is zero-initialised
//! by the caller, passed by exclusive reference into the engine, populated
//! monotonically during the run, and read afterwards. Every list in here has
//! a fixed capacity with a documented eviction policy: memory use must stay
//! predictable no matter how pathological the medium turns out to be.

use compact_str::CompactString;
use serde::Serialize;
use tracing::{debug, warn};

use crate::policy::Tuning;

/// Capacity of the recent-error ring. Oldest entries are overwritten first.
pub const ERROR_RING_CAP: usize = 16;
/// Capacity of the largest-files list.
pub const LARGEST_CAP: usize = 10;
/// Capacity of the failing-paths list. The first distinct failures are
/// definitive for a run; later ones are dropped.
pub const FAIL_PATHS_CAP: usize = 5;

/// Classification of a failure event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailKind {
    OpenDir,
    OpenFile,
    Stat,
    Path,
    Seek,
    Read,
    Consistency,
}

impl FailKind {
    pub fn label(self) -> &'static str {
        match self {
            FailKind::OpenDir => "OPEN_DIR",
            FailKind::OpenFile => "OPEN_FILE",
            FailKind::Stat => "STAT",
            FailKind::Path => "PATH",
            FailKind::Seek => "SEEK",
            FailKind::Read => "READ",
            FailKind::Consistency => "CONSIST",
        }
    }
}

/// Fixed-capacity ring of the most recent error lines.
///
/// `count` keeps the true total so ring positions can be derived after
/// wrap-around.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorRing {
    slots: Vec<CompactString>,
    count: u64,
}

impl ErrorRing {
    pub fn push(&mut self, msg: impl Into<CompactString>) {
        let msg = msg.into();
        let idx = (self.count % ERROR_RING_CAP as u64) as usize;
        if self.slots.len() < ERROR_RING_CAP {
            self.slots.push(msg);
        } else {
            self.slots[idx] = msg;
        }
        self.count += 1;
    }

    /// Total number of errors ever pushed (not just the retained window).
    pub fn total(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Retained entries, oldest first.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &str> {
        let start = if self.count as usize > ERROR_RING_CAP {
            (self.count % ERROR_RING_CAP as u64) as usize
        } else {
            0
        };
        (0..self.slots.len()).map(move |i| {
            let idx = (start + i) % self.slots.len().max(1);
            self.slots[idx].as_str()
        })
    }
}

/// One entry in the largest-files list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargestEntry {
    pub size: u64,
    pub path: String,
}

/// Bounded list of the largest files seen, sorted descending by size.
///
/// Insertion shifts smaller entries down; on a tie the earlier-seen entry
/// stays ahead, so encounter order is preserved for equal sizes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LargestFiles {
    entries: Vec<LargestEntry>,
}

impl LargestFiles {
    pub fn insert(&mut self, path: &str, size: u64) {
        if size == 0 || path.is_empty() {
            return;
        }
        let pos = match self.entries.iter().position(|e| size > e.size) {
            Some(pos) => pos,
            None if self.entries.len() < LARGEST_CAP => self.entries.len(),
            None => return,
        };
        self.entries.insert(
            pos,
            LargestEntry {
                size,
                path: path.to_owned(),
            },
        );
        self.entries.truncate(LARGEST_CAP);
    }

    pub fn as_slice(&self) -> &[LargestEntry] {
        &self.entries
    }
}

/// Bounded, deduplicated list of the first distinct failing paths.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FailPaths {
    paths: Vec<String>,
}

impl FailPaths {
    pub fn insert(&mut self, path: &str) {
        if path.is_empty() || self.paths.iter().any(|p| p == path) {
            return;
        }
        if self.paths.len() < FAIL_PATHS_CAP {
            self.paths.push(path.to_owned());
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.paths
    }
}

/// Snapshot of the first failure of any kind in a run — the root-cause
/// indicator, never overwritten by later symptoms.
#[derive(Debug, Clone, Serialize)]
pub struct FirstFailure {
    pub kind: FailKind,
    pub path: String,
    pub offset: u64,
    pub bytes: u64,
    pub os_error: Option<i32>,
    pub note: CompactString,
}

/// Throughput histogram bucket labels, fastest first.
pub const PERF_BUCKET_LABELS: [&str; 5] = [
    ">=60 MiB/s",
    "30-60 MiB/s",
    "10-30 MiB/s",
    "1-10 MiB/s",
    "<1 MiB/s",
];

/// Per-operation performance telemetry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerfStats {
    pub ops: u64,
    pub bytes: u64,
    /// Operation counts per throughput bucket, fastest first
    /// (see [`PERF_BUCKET_LABELS`]).
    pub histogram: [u64; 5],
    pub stalls: u64,
    pub stall_total_ms: u64,
    pub longest_ms: u64,
    pub longest_mib_s: f64,
    pub longest_offset: u64,
    pub longest_bytes: u64,
    pub longest_path: String,
}

impl PerfStats {
    fn record(&mut self, bytes: u64, duration_ms: u64, offset: u64, path: &str, tuning: &Tuning) {
        if bytes == 0 {
            return;
        }
        let dt_ms = duration_ms.max(1);
        let mib_s = (bytes as f64 / 1_048_576.0) / (dt_ms as f64 / 1000.0);

        self.ops += 1;
        self.bytes += bytes;

        let bucket = if mib_s >= 60.0 {
            0
        } else if mib_s >= 30.0 {
            1
        } else if mib_s >= 10.0 {
            2
        } else if mib_s >= 1.0 {
            3
        } else {
            4
        };
        self.histogram[bucket] += 1;

        if mib_s < tuning.stall_below_mib_s || dt_ms >= tuning.stall_min_ms {
            self.stalls += 1;
            self.stall_total_ms += dt_ms;
        }

        // Strict `>`: on equal durations the first-seen operation is kept.
        if dt_ms > self.longest_ms {
            self.longest_ms = dt_ms;
            self.longest_mib_s = mib_s;
            self.longest_offset = offset;
            self.longest_bytes = bytes;
            self.longest_path = path.to_owned();
        }
    }
}

/// Aggregate result of one scan run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    pub dirs_total: u64,
    pub files_total: u64,
    pub files_read: u64,
    pub bytes_read: u64,
    /// Bytes read by consistency verification re-reads. Kept apart from
    /// `bytes_read` so primary progress stays monotonic and is never
    /// double-counted.
    pub verify_bytes: u64,

    pub open_errors: u64,
    pub read_errors: u64,
    pub read_errors_transient: u64,
    pub stat_errors: u64,
    pub path_errors: u64,
    pub consistency_errors: u64,

    pub skipped_dirs: u64,
    pub skipped_files: u64,

    /// Set exactly once when cancellation is observed; never cleared.
    pub cancelled: bool,

    // Current-item cursor, overwritten as traversal moves.
    pub current_path: String,
    pub current_size: u64,
    pub current_planned: u64,
    pub current_done: u64,
    pub current_sample: bool,

    pub error_ring: ErrorRing,
    pub largest: LargestFiles,
    pub fail_paths: FailPaths,
    pub first_failure: Option<FirstFailure>,
    pub perf: PerfStats,
}

impl ScanStats {
    /// Append an error line to the log collaborator and the bounded ring.
    pub fn push_error(&mut self, msg: impl Into<CompactString>) {
        let msg = msg.into();
        warn!("{msg}");
        self.error_ring.push(msg);
    }

    /// Record the first failure of the run; later calls are ignored.
    pub fn capture_first_failure(
        &mut self,
        kind: FailKind,
        path: &str,
        offset: u64,
        bytes: u64,
        os_error: Option<i32>,
        note: &str,
    ) {
        if self.first_failure.is_some() {
            return;
        }
        debug!(
            kind = kind.label(),
            path, offset, bytes, os_error, note, "first failure captured"
        );
        self.first_failure = Some(FirstFailure {
            kind,
            path: path.to_owned(),
            offset,
            bytes,
            os_error,
            note: CompactString::new(note),
        });
    }

    /// Record one read operation in the performance block.
    pub fn record_performance(
        &mut self,
        bytes: u64,
        duration_ms: u64,
        offset: u64,
        path: &str,
        tuning: &Tuning,
    ) {
        self.perf.record(bytes, duration_ms, offset, path, tuning);
    }

    pub fn note_largest(&mut self, path: &str, size: u64) {
        self.largest.insert(path, size);
    }

    pub fn note_failing_path(&mut self, path: &str) {
        self.fail_paths.insert(path);
    }

    /// Account bytes physically obtained by a read. Verification re-reads
    /// are tracked separately and never advance primary progress.
    pub fn account_read(&mut self, bytes: u64, verify: bool) {
        if verify {
            self.verify_bytes += bytes;
        } else {
            self.bytes_read += bytes;
            self.current_done += bytes;
        }
    }

    /// Point the cursor at a directory being entered.
    pub fn set_current_dir(&mut self, path: &str) {
        self.current_path.clear();
        self.current_path.push_str(path);
        self.current_size = 0;
        self.current_planned = 0;
        self.current_done = 0;
        self.current_sample = false;
    }

    /// Point the cursor at a file about to be read.
    pub fn set_current_file(&mut self, path: &str, size: u64, planned: u64, sample: bool) {
        self.current_path.clear();
        self.current_path.push_str(path);
        self.current_size = size;
        self.current_planned = planned;
        self.current_done = 0;
        self.current_sample = sample;
    }

    /// Total error events across all categories.
    pub fn total_errors(&self) -> u64 {
        self.open_errors
            + self.read_errors
            + self.stat_errors
            + self.path_errors
            + self.consistency_errors
    }
}
