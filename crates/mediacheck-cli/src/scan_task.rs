//! Background scan task — runs the synchronous engine on a worker thread
//! and reports progress to the terminal loop via a bounded channel.
//!
//! The engine itself is single-threaded and cooperative; the thread here
//! only exists so the frontend can keep draining progress (and reacting to
//! Ctrl-C) while the engine blocks on I/O.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use mediacheck_core::{scan, CancelToken, ScanError, ScanPolicy, ScanStats};
use tracing::info;

/// Maximum number of progress messages that may queue up in the channel.
///
/// Updates are throttled to a few per second, so this gives the terminal
/// loop minutes of headroom; if it still falls behind, updates are dropped
/// rather than blocking the scan.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Minimum interval between two progress updates.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Progress updates sent from the scan thread to the terminal loop.
///
/// The full stats travel only once, in `Completed`; updates carry
/// lightweight counters and the current cursor.
#[derive(Debug)]
pub enum ScanProgress {
    Update {
        dirs_total: u64,
        files_total: u64,
        bytes_read: u64,
        errors: u64,
        current_path: String,
        current_done: u64,
        current_planned: u64,
    },
    /// Scan finished (success or cancellation — both are normal).
    Completed {
        stats: Box<ScanStats>,
        duration: Duration,
    },
    /// The engine could not allocate its working buffers.
    Failed { error: ScanError },
}

/// Handle to a running scan: progress receiver plus cancellation.
pub struct ScanHandle {
    pub progress_rx: Receiver<ScanProgress>,
    cancel: CancelToken,
    _thread: Option<thread::JoinHandle<()>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the token, e.g. for a Ctrl-C handler.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

/// Start a scan of `root` under `policy` on a named background thread.
pub fn start_scan(root: PathBuf, policy: ScanPolicy) -> ScanHandle {
    let (tx, rx) = crossbeam_channel::bounded::<ScanProgress>(PROGRESS_CHANNEL_CAPACITY);
    let cancel = CancelToken::new();
    let cancel_clone = cancel.clone();

    let thread = thread::Builder::new()
        .name("mediacheck-scan".into())
        .spawn(move || {
            info!("starting scan of {}", root.display());
            let start = Instant::now();
            let mut stats = ScanStats::default();
            let mut last_update: Option<Instant> = None;

            let result = scan(&root, &policy, &mut stats, &cancel_clone, |st, _| {
                let due = last_update.map_or(true, |t| t.elapsed() >= PROGRESS_INTERVAL);
                if due {
                    last_update = Some(Instant::now());
                    // Dropping an update when the channel is full is fine;
                    // a fresher one follows shortly.
                    let _ = tx.try_send(ScanProgress::Update {
                        dirs_total: st.dirs_total,
                        files_total: st.files_total,
                        bytes_read: st.bytes_read,
                        errors: st.total_errors(),
                        current_path: st.current_path.clone(),
                        current_done: st.current_done,
                        current_planned: st.current_planned,
                    });
                }
            });

            match result {
                Ok(()) => {
                    let _ = tx.send(ScanProgress::Completed {
                        stats: Box::new(stats),
                        duration: start.elapsed(),
                    });
                }
                Err(error) => {
                    let _ = tx.send(ScanProgress::Failed { error });
                }
            }
        })
        .expect("failed to spawn scan thread");

    ScanHandle {
        progress_rx: rx,
        cancel,
        _thread: Some(thread),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn scan_task_completes_and_delivers_stats() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut f = fs::File::create(tmp.path().join("a.dat")).unwrap();
        f.write_all(&[7u8; 2048]).unwrap();

        let handle = start_scan(tmp.path().to_path_buf(), ScanPolicy::default());
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            assert!(Instant::now() < deadline, "scan did not complete in time");
            match handle.progress_rx.recv_timeout(Duration::from_secs(5)) {
                Ok(ScanProgress::Completed { stats, .. }) => {
                    assert_eq!(stats.files_read, 1);
                    assert_eq!(stats.bytes_read, 2048);
                    return;
                }
                Ok(ScanProgress::Failed { error }) => panic!("scan failed: {error}"),
                Ok(ScanProgress::Update { .. }) => continue,
                Err(e) => panic!("channel error: {e}"),
            }
        }
    }

    #[test]
    fn cancel_before_drain_still_completes() {
        let tmp = tempfile::TempDir::new().unwrap();
        for i in 0..20 {
            let mut f = fs::File::create(tmp.path().join(format!("f{i}.dat"))).unwrap();
            f.write_all(&[0u8; 1024]).unwrap();
        }

        let handle = start_scan(tmp.path().to_path_buf(), ScanPolicy::default());
        handle.cancel();
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            assert!(Instant::now() < deadline, "scan did not complete in time");
            match handle.progress_rx.recv_timeout(Duration::from_secs(5)) {
                Ok(ScanProgress::Completed { .. }) => return,
                Ok(_) => continue,
                Err(e) => panic!("channel error: {e}"),
            }
        }
    }
}
