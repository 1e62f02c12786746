//! Per-file read strategy — chunked full reads, head/tail sampling, retry
//! with backoff, and checksum-based consistency verification.
//!
//! Two modes exist. `full` reads every byte in chunks sized by policy and
//! keeps a running checksum plus a separately captured checksum of the first
//! <=64 KiB. `sample` reads only the head region and, for files larger than
//! one region, the tail region. Either mode may re-read regions when the
//! policy asks for consistency verification; those re-reads account into
//! `verify_bytes` so primary progress never double-counts.
//!
//! A file-level failure here is terminal for the file, never for the scan.
//! The only error that propagates is chunk-buffer growth failure.

use std::io::{self, Read, Seek, SeekFrom};
use std::thread;
use std::time::{Duration, Instant};

use crate::checksum;
use crate::engine::ScanCtx;
use crate::error::ScanError;
use crate::policy::{ScanPolicy, SAMPLE_REGION};
use crate::stats::{FailKind, ScanStats};

/// Dispatch a file to the mode selected by the traversal.
///
/// Returns `Ok(true)` when the file read out cleanly, `Ok(false)` when the
/// file failed or the scan was cancelled mid-file.
pub(crate) fn read_file<R: Read + Seek>(
    ctx: &mut ScanCtx<'_>,
    file: &mut R,
    size: u64,
    sample: bool,
) -> Result<bool, ScanError> {
    if sample {
        Ok(read_sample(ctx, file, size))
    } else {
        read_full(ctx, file, size)
    }
}

/// Seek to `off` and read up to `want` bytes into `buf`, retrying failed
/// reads with backoff. Returns the checksum of the bytes obtained, or `None`
/// when the operation failed past all retries.
///
/// Every successfully obtained burst is recorded in the performance block
/// and in the byte counters as the I/O actually happens, including bursts
/// belonging to operations that later fail. A short read at end-of-file is
/// a normal completion, not an error.
fn read_region_retry<R: Read + Seek>(
    policy: &ScanPolicy,
    stats: &mut ScanStats,
    file: &mut R,
    off: u64,
    buf: &mut [u8],
    want: usize,
    path: &str,
    verify: bool,
) -> Option<u32> {
    if let Err(e) = file.seek(SeekFrom::Start(off)) {
        stats.read_errors += 1;
        stats.capture_first_failure(
            FailKind::Seek,
            path,
            off,
            want as u64,
            e.raw_os_error(),
            "seek",
        );
        stats.push_error(format!("seek error at {off}: {e}"));
        return None;
    }

    let retries = policy.retries();
    let backoff = Duration::from_millis(policy.tuning.retry_backoff_ms);
    let mut crc = 0u32;
    let mut got = 0usize;
    let mut attempt = 0u8;
    let mut had_failure = false;

    while got < want {
        let t0 = Instant::now();
        match file.read(&mut buf[got..want]) {
            Ok(0) => break,
            Ok(n) => {
                let dt = t0.elapsed().as_millis() as u64;
                crc = checksum::update(crc, &buf[got..got + n]);
                stats.record_performance(n as u64, dt, off + got as u64, path, &policy.tuning);
                stats.account_read(n as u64, verify);
                got += n;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if attempt < retries {
                    attempt += 1;
                    had_failure = true;
                    thread::sleep(backoff);
                    continue;
                }
                stats.read_errors += 1;
                stats.capture_first_failure(
                    FailKind::Read,
                    path,
                    off + got as u64,
                    (want - got) as u64,
                    e.raw_os_error(),
                    "region read",
                );
                stats.push_error(format!("read error at {}: {e}", off + got as u64));
                return None;
            }
        }
    }

    // A failure that a later attempt recovered from counts once per
    // operation; an exhausted operation counts only as persistent above.
    if had_failure {
        stats.read_errors_transient += 1;
    }
    Some(crc)
}

/// Re-read a region and compare checksums. On mismatch the file is flagged
/// with a consistency error and abandoned.
fn verify_region<R: Read + Seek>(
    ctx: &mut ScanCtx<'_>,
    file: &mut R,
    off: u64,
    want: usize,
    expected: u32,
    path: &str,
    what: &str,
) -> bool {
    let buf = ctx.buffers.sample_mut();
    let Some(reread) =
        read_region_retry(ctx.policy, ctx.stats, file, off, buf, want, path, true)
    else {
        return false;
    };
    if reread != expected {
        ctx.stats.consistency_errors += 1;
        ctx.stats.capture_first_failure(
            FailKind::Consistency,
            path,
            off,
            want as u64,
            None,
            "checksum mismatch",
        );
        ctx.stats.push_error(format!("consistency mismatch ({what}): {path}"));
        return false;
    }
    true
}

/// Sample mode: head region plus, for larger files, the tail region.
fn read_sample<R: Read + Seek>(ctx: &mut ScanCtx<'_>, file: &mut R, size: u64) -> bool {
    let path = ctx.stats.current_path.clone();
    let region = SAMPLE_REGION as u64;

    let head_want = size.min(region) as usize;
    let buf = ctx.buffers.sample_mut();
    let Some(head_crc) =
        read_region_retry(ctx.policy, ctx.stats, file, 0, buf, head_want, &path, false)
    else {
        return false;
    };

    ctx.tick();
    if ctx.cancelled() {
        return false;
    }

    if ctx.policy.consistency_check
        && !verify_region(ctx, file, 0, head_want, head_crc, &path, "first region")
    {
        return false;
    }

    if size > region {
        let off = size - region;
        let buf = ctx.buffers.sample_mut();
        let Some(tail_crc) = read_region_retry(
            ctx.policy,
            ctx.stats,
            file,
            off,
            buf,
            SAMPLE_REGION,
            &path,
            false,
        ) else {
            return false;
        };

        ctx.tick();
        if ctx.cancelled() {
            return false;
        }

        if ctx.policy.consistency_check
            && !verify_region(ctx, file, off, SAMPLE_REGION, tail_crc, &path, "last region")
        {
            return false;
        }
    }

    !ctx.cancelled()
}

/// Full mode: sequential chunked read of the whole file.
fn read_full<R: Read + Seek>(
    ctx: &mut ScanCtx<'_>,
    file: &mut R,
    size: u64,
) -> Result<bool, ScanError> {
    let path = ctx.stats.current_path.clone();
    let chunk = ctx.policy.chunk_bytes_for(size);
    let retries = ctx.policy.retries();
    let backoff = Duration::from_millis(ctx.policy.tuning.retry_backoff_ms);

    // Growth failure is fatal to the scan, unlike any per-file error.
    ctx.buffers.chunk_mut(chunk)?;

    let mut crc = 0u32;
    // Checksum and length of the first <=64 KiB, captured once for the
    // end-of-file consistency re-read.
    let mut head: Option<(u32, usize)> = None;
    let mut offset = 0u64;
    let mut attempt = 0u8;
    let mut had_failure = false;

    while !ctx.cancelled() {
        let buf = ctx.buffers.chunk_mut(chunk)?;
        let t0 = Instant::now();
        match file.read(&mut buf[..chunk]) {
            Ok(0) => break,
            Ok(n) => {
                let dt = t0.elapsed().as_millis() as u64;
                ctx.stats
                    .record_performance(n as u64, dt, offset, &path, &ctx.policy.tuning);
                crc = checksum::update(crc, &buf[..n]);
                if head.is_none() {
                    let len = n.min(SAMPLE_REGION);
                    head = Some((checksum::hash(&buf[..len]), len));
                }
                ctx.stats.account_read(n as u64, false);
                offset += n as u64;
                if had_failure {
                    ctx.stats.read_errors_transient += 1;
                    had_failure = false;
                }
                attempt = 0;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if attempt < retries {
                    attempt += 1;
                    had_failure = true;
                    thread::sleep(backoff);
                    continue;
                }
                ctx.stats.read_errors += 1;
                ctx.stats.capture_first_failure(
                    FailKind::Read,
                    &path,
                    offset,
                    chunk as u64,
                    e.raw_os_error(),
                    "full read",
                );
                ctx.stats.push_error(format!("read error at {offset}: {e}"));
                return Ok(false);
            }
        }
        ctx.tick();
    }
    ctx.tick();

    if ctx.policy.consistency_check && !ctx.cancelled() {
        if let Some((expected, len)) = head {
            if !verify_region(ctx, file, 0, len, expected, &path, "first chunk") {
                return Ok(false);
            }
        }
    }

    tracing::debug!(path = %path, crc = format_args!("{crc:08x}"), "full read complete");
    Ok(!ctx.cancelled())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::ScanBuffers;
    use crate::engine::CancelToken;
    use std::fs::File;
    use std::io::Write;

    /// Reader that fails its first `failures_left` read calls, then serves
    /// `data` normally. Stands in for a medium with bad sectors.
    struct FlakyReader {
        data: Vec<u8>,
        pos: usize,
        failures_left: usize,
    }

    impl Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "injected read fault"));
            }
            let n = buf.len().min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    impl Seek for FlakyReader {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            match pos {
                SeekFrom::Start(off) => {
                    self.pos = (off as usize).min(self.data.len());
                    Ok(off)
                }
                _ => Err(io::Error::new(io::ErrorKind::Unsupported, "seek mode")),
            }
        }
    }

    fn run_flaky(reader: &mut FlakyReader, policy: &ScanPolicy) -> (ScanStats, bool) {
        let size = reader.data.len() as u64;
        let mut stats = ScanStats::default();
        stats.set_current_file("/flaky/data.dat", size, size, false);
        let mut buffers = ScanBuffers::new().unwrap();
        let cancel = CancelToken::new();
        let mut on_tick = |_: &ScanStats, _: &CancelToken| {};
        let mut ctx = ScanCtx {
            policy,
            stats: &mut stats,
            buffers: &mut buffers,
            cancel: &cancel,
            on_tick: &mut on_tick,
        };
        let clean = read_file(&mut ctx, reader, size, false).unwrap();
        (stats, clean)
    }

    fn write_file(dir: &std::path::Path, name: &str, len: usize) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        f.write_all(&data).unwrap();
        path
    }

    fn run_read(path: &std::path::Path, size: u64, policy: &ScanPolicy) -> (ScanStats, bool) {
        let mut stats = ScanStats::default();
        stats.set_current_file(&path.to_string_lossy(), size, size, false);
        let mut buffers = ScanBuffers::new().unwrap();
        let cancel = CancelToken::new();
        let mut on_tick = |_: &ScanStats, _: &CancelToken| {};
        let mut ctx = ScanCtx {
            policy,
            stats: &mut stats,
            buffers: &mut buffers,
            cancel: &cancel,
            on_tick: &mut on_tick,
        };
        let mut file = File::open(path).unwrap();
        let sample = policy.is_sampled(size);
        let clean = read_file(&mut ctx, &mut file, size, sample).unwrap();
        (stats, clean)
    }

    #[test]
    fn full_read_counts_every_byte() {
        let tmp = tempfile::TempDir::new().unwrap();
        let len = 300 * 1024;
        let path = write_file(tmp.path(), "data.dat", len);
        let policy = ScanPolicy::default();
        let (stats, clean) = run_read(&path, len as u64, &policy);
        assert!(clean);
        assert_eq!(stats.bytes_read, len as u64);
        assert_eq!(stats.current_done, len as u64);
        assert_eq!(stats.read_errors, 0);
        assert!(stats.perf.ops >= 1);
    }

    #[test]
    fn sample_read_covers_head_and_tail_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        let len = 512 * 1024;
        let path = write_file(tmp.path(), "big.dat", len);
        let policy = ScanPolicy {
            large_file_threshold: 256 * 1024,
            ..Default::default()
        };
        assert!(policy.is_sampled(len as u64));
        let (stats, clean) = run_read(&path, len as u64, &policy);
        assert!(clean);
        assert_eq!(stats.bytes_read, 2 * SAMPLE_REGION as u64);
        assert_eq!(stats.verify_bytes, 0);
    }

    #[test]
    fn consistency_reread_is_accounted_separately() {
        let tmp = tempfile::TempDir::new().unwrap();
        let len = 512 * 1024;
        let path = write_file(tmp.path(), "big.dat", len);
        let policy = ScanPolicy {
            large_file_threshold: 256 * 1024,
            consistency_check: true,
            ..Default::default()
        };
        let (stats, clean) = run_read(&path, len as u64, &policy);
        assert!(clean, "unchanged file must never mismatch");
        assert_eq!(stats.consistency_errors, 0);
        assert_eq!(stats.bytes_read, 2 * SAMPLE_REGION as u64);
        assert_eq!(stats.verify_bytes, 2 * SAMPLE_REGION as u64);
    }

    #[test]
    fn full_read_consistency_on_unchanged_file_is_clean() {
        let tmp = tempfile::TempDir::new().unwrap();
        let len = 200 * 1024;
        let path = write_file(tmp.path(), "data.dat", len);
        let policy = ScanPolicy {
            consistency_check: true,
            ..Default::default()
        };
        let (stats, clean) = run_read(&path, len as u64, &policy);
        assert!(clean);
        assert_eq!(stats.consistency_errors, 0);
        assert_eq!(stats.bytes_read, len as u64);
        assert_eq!(stats.verify_bytes, SAMPLE_REGION as u64);
    }

    #[test]
    fn small_file_below_one_region_samples_head_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        let len = 10 * 1024;
        let path = write_file(tmp.path(), "small.dat", len);
        let policy = ScanPolicy {
            large_file_threshold: 1024,
            ..Default::default()
        };
        let (stats, clean) = run_read(&path, len as u64, &policy);
        assert!(clean);
        assert_eq!(stats.bytes_read, len as u64);
    }

    #[test]
    fn recovered_failure_counts_exactly_one_transient() {
        let mut reader = FlakyReader {
            data: vec![0x5Au8; 4096],
            pos: 0,
            failures_left: 1,
        };
        let policy = ScanPolicy {
            retry_count: 1,
            ..Default::default()
        };
        let (stats, clean) = run_flaky(&mut reader, &policy);
        assert!(clean);
        assert_eq!(stats.read_errors_transient, 1);
        assert_eq!(stats.read_errors, 0);
        assert_eq!(stats.bytes_read, 4096);
        assert!(stats.first_failure.is_none());
    }

    #[test]
    fn exhausted_retries_count_one_persistent_error_and_no_transient() {
        let mut reader = FlakyReader {
            data: vec![0x5Au8; 4096],
            pos: 0,
            failures_left: usize::MAX,
        };
        let policy = ScanPolicy {
            retry_count: 1,
            ..Default::default()
        };
        let (stats, clean) = run_flaky(&mut reader, &policy);
        assert!(!clean);
        assert_eq!(stats.read_errors, 1);
        assert_eq!(stats.read_errors_transient, 0);
        assert_eq!(stats.bytes_read, 0);
        let ff = stats.first_failure.as_ref().unwrap();
        assert_eq!(ff.kind, FailKind::Read);
    }

    #[test]
    fn zero_retries_fail_on_first_error() {
        let mut reader = FlakyReader {
            data: vec![0x5Au8; 4096],
            pos: 0,
            failures_left: 1,
        };
        let policy = ScanPolicy {
            retry_count: 0,
            ..Default::default()
        };
        let (stats, clean) = run_flaky(&mut reader, &policy);
        assert!(!clean);
        assert_eq!(stats.read_errors, 1);
        assert_eq!(stats.read_errors_transient, 0);
    }

    #[test]
    fn empty_file_full_read_is_clean() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_file(tmp.path(), "empty.dat", 0);
        let (stats, clean) = run_read(&path, 0, &ScanPolicy::default());
        assert!(clean);
        assert_eq!(stats.bytes_read, 0);
        assert_eq!(stats.perf.ops, 0);
    }
}
