//! Scan policy — the read-only configuration for a single engine run.
//!
//! A `ScanPolicy` is built by the frontend (CLI flags or a preset) and is
//! immutable for the duration of one [`crate::engine::scan`] call.

use serde::{Deserialize, Serialize};

/// Size of the head/tail sample regions and of the fixed sample buffer.
pub const SAMPLE_REGION: usize = 64 * 1024;

/// Chunk size used for full-mode reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChunkMode {
    /// Pick a chunk size from the file size (see [`Tuning`]).
    #[default]
    Auto,
    Fixed128K,
    Fixed256K,
    Fixed512K,
    Fixed1M,
}

impl ChunkMode {
    /// Fixed chunk size in bytes, or `None` for `Auto`.
    pub fn bytes(self) -> Option<usize> {
        match self {
            ChunkMode::Auto => None,
            ChunkMode::Fixed128K => Some(128 * 1024),
            ChunkMode::Fixed256K => Some(256 * 1024),
            ChunkMode::Fixed512K => Some(512 * 1024),
            ChunkMode::Fixed1M => Some(1024 * 1024),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChunkMode::Auto => "Auto",
            ChunkMode::Fixed128K => "128 KiB",
            ChunkMode::Fixed256K => "256 KiB",
            ChunkMode::Fixed512K => "512 KiB",
            ChunkMode::Fixed1M => "1 MiB",
        }
    }
}

/// What the run's root is, from the skip-filter's point of view.
///
/// A targeted scan of a specific folder must never skip that folder via the
/// known-folder filter, so the directory filter is only active for `Root`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanTarget {
    /// The unrestricted root of the medium.
    #[default]
    Root,
    /// A specific folder explicitly chosen by the user.
    Folder,
}

/// Named policy presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Preset {
    #[default]
    Custom,
    /// Sample large files, skip known folders and media extensions.
    Fast,
    /// Full read of everything with consistency verification.
    Forensics,
}

impl Preset {
    pub fn label(self) -> &'static str {
        match self {
            Preset::Custom => "Custom",
            Preset::Fast => "Fast",
            Preset::Forensics => "Forensics",
        }
    }
}

/// Empirically tuned heuristics, exposed as configuration rather than
/// hard-coded literals. The defaults match the expected speed envelope of
/// SD-class removable media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// Files at least this large use 1 MiB auto chunks.
    pub chunk_1m_min: u64,
    /// Files at least this large use 512 KiB auto chunks.
    pub chunk_512k_min: u64,
    /// Files at least this large use 256 KiB auto chunks; smaller files
    /// use 128 KiB.
    pub chunk_256k_min: u64,
    /// A read operation below this throughput counts as a stall.
    pub stall_below_mib_s: f64,
    /// A read operation at least this long counts as a stall.
    pub stall_min_ms: u64,
    /// Pause between retry attempts of a failed read.
    pub retry_backoff_ms: u64,
    /// Child paths longer than this are rejected as path errors.
    pub max_path_len: usize,
    /// Recursion deeper than this is treated as a likely structural loop.
    pub max_depth: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            chunk_1m_min: 1024 * 1024 * 1024,
            chunk_512k_min: 256 * 1024 * 1024,
            chunk_256k_min: 64 * 1024 * 1024,
            stall_below_mib_s: 1.0,
            stall_min_ms: 500,
            retry_backoff_ms: 30,
            max_path_len: 2048,
            max_depth: 128,
        }
    }
}

/// Read-only policy for one scan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPolicy {
    /// Read every byte of every file instead of sampling large ones.
    pub full_read: bool,
    /// Files larger than this are sampled when `full_read` is off.
    pub large_file_threshold: u64,
    /// Number of retries after a failed read (clamped to 0..=3).
    pub retry_count: u8,
    /// Re-read regions and compare checksums to catch unstable reads.
    pub consistency_check: bool,
    pub chunk_mode: ChunkMode,
    /// Skip well-known console data folders.
    pub skip_known_folders: bool,
    /// Skip archive/media/disk-image extensions.
    pub skip_media_extensions: bool,
    pub target: ScanTarget,
    pub tuning: Tuning,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            full_read: false,
            large_file_threshold: 256 * 1024 * 1024,
            retry_count: 1,
            consistency_check: false,
            chunk_mode: ChunkMode::Auto,
            skip_known_folders: false,
            skip_media_extensions: false,
            target: ScanTarget::Root,
            tuning: Tuning::default(),
        }
    }
}

impl ScanPolicy {
    /// Policy produced by a named preset.
    pub fn from_preset(preset: Preset) -> Self {
        let mut p = Self::default();
        match preset {
            Preset::Custom => {}
            Preset::Fast => {
                p.full_read = false;
                p.large_file_threshold = 64 * 1024 * 1024;
                p.retry_count = 1;
                p.consistency_check = false;
                p.skip_known_folders = true;
                p.skip_media_extensions = true;
            }
            Preset::Forensics => {
                p.full_read = true;
                p.large_file_threshold = 1024 * 1024 * 1024;
                p.retry_count = 2;
                p.consistency_check = true;
                p.skip_known_folders = false;
                p.skip_media_extensions = false;
            }
        }
        p
    }

    /// Retry count with the 0..=3 contract applied.
    pub fn retries(&self) -> u8 {
        self.retry_count.min(3)
    }

    /// Chunk size for a full-mode read of a file of `size` bytes.
    pub fn chunk_bytes_for(&self, size: u64) -> usize {
        if let Some(fixed) = self.chunk_mode.bytes() {
            return fixed;
        }
        let t = &self.tuning;
        if size >= t.chunk_1m_min {
            1024 * 1024
        } else if size >= t.chunk_512k_min {
            512 * 1024
        } else if size >= t.chunk_256k_min {
            256 * 1024
        } else {
            128 * 1024
        }
    }

    /// Whether a file of `size` bytes is sampled rather than fully read.
    pub fn is_sampled(&self, size: u64) -> bool {
        !self.full_read && size > self.large_file_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_chunk_follows_file_size() {
        let p = ScanPolicy::default();
        assert_eq!(p.chunk_bytes_for(1024), 128 * 1024);
        assert_eq!(p.chunk_bytes_for(64 * 1024 * 1024), 256 * 1024);
        assert_eq!(p.chunk_bytes_for(256 * 1024 * 1024), 512 * 1024);
        assert_eq!(p.chunk_bytes_for(2 * 1024 * 1024 * 1024), 1024 * 1024);
    }

    #[test]
    fn fixed_chunk_overrides_auto() {
        let p = ScanPolicy {
            chunk_mode: ChunkMode::Fixed512K,
            ..Default::default()
        };
        assert_eq!(p.chunk_bytes_for(1024), 512 * 1024);
        assert_eq!(p.chunk_bytes_for(10 * 1024 * 1024 * 1024), 512 * 1024);
    }

    #[test]
    fn sampling_strictly_above_threshold() {
        let p = ScanPolicy {
            large_file_threshold: 1000,
            ..Default::default()
        };
        assert!(!p.is_sampled(1000));
        assert!(p.is_sampled(1001));

        let full = ScanPolicy {
            full_read: true,
            large_file_threshold: 1000,
            ..Default::default()
        };
        assert!(!full.is_sampled(5000));
    }

    #[test]
    fn presets_match_documented_values() {
        let fast = ScanPolicy::from_preset(Preset::Fast);
        assert!(!fast.full_read);
        assert_eq!(fast.large_file_threshold, 64 * 1024 * 1024);
        assert!(fast.skip_known_folders && fast.skip_media_extensions);

        let forensics = ScanPolicy::from_preset(Preset::Forensics);
        assert!(forensics.full_read);
        assert!(forensics.consistency_check);
        assert_eq!(forensics.retry_count, 2);
        assert!(!forensics.skip_known_folders);
    }

    #[test]
    fn retries_are_clamped() {
        let p = ScanPolicy {
            retry_count: 9,
            ..Default::default()
        };
        assert_eq!(p.retries(), 3);
    }
}
