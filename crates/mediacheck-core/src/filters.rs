//! Skip filters — pure predicates over a path string and the policy flags.
//!
//! The directory filter protects console data folders that are routinely
//! huge and already integrity-protected by their own tooling; the file
//! filter skips bulk archive/media/disk-image formats. Both are
//! case-insensitive because FAT-family filesystems are.

use crate::policy::{ScanPolicy, ScanTarget};

/// Folder-name segments skipped by the directory filter.
const KNOWN_FOLDERS: [&str; 3] = ["Nintendo", "emuMMC", "Emutendo"];

/// Extensions skipped by the file filter.
const SKIP_EXTENSIONS: [&str; 15] = [
    ".nsp", ".nsz", ".xci", ".xcz", ".mp4", ".mkv", ".avi", ".mov", ".webm", ".iso", ".bin",
    ".img", ".zip", ".7z", ".rar",
];

fn contains_ci(haystack: &str, needle: &str) -> bool {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return false;
    }
    h.windows(n.len()).any(|w| w.eq_ignore_ascii_case(n))
}

fn ends_with_ci(haystack: &str, suffix: &str) -> bool {
    let h = haystack.as_bytes();
    let s = suffix.as_bytes();
    h.len() >= s.len() && h[h.len() - s.len()..].eq_ignore_ascii_case(s)
}

/// True if `path` contains `seg` as a path segment: `/seg/` anywhere,
/// `/seg` as the final segment, or `seg` directly under the scan root.
fn has_segment_ci(path: &str, root: &str, seg: &str) -> bool {
    let mid = format!("/{seg}/");
    if contains_ci(path, &mid) {
        return true;
    }
    let tail = format!("/{seg}");
    if ends_with_ci(path, &tail) {
        return true;
    }
    let under_root = format!("{}/{seg}", root.trim_end_matches('/'));
    let p = path.as_bytes();
    p.len() >= under_root.len() && p[..under_root.len()].eq_ignore_ascii_case(under_root.as_bytes())
}

/// Directory-level skip decision.
///
/// Only active when the policy asks for it and the run targets the
/// unrestricted root: a targeted scan of a known folder must not skip itself.
pub fn should_skip_dir(path: &str, root: &str, policy: &ScanPolicy) -> bool {
    if !policy.skip_known_folders || policy.target != ScanTarget::Root {
        return false;
    }
    KNOWN_FOLDERS
        .iter()
        .any(|seg| has_segment_ci(path, root, seg))
}

/// File-level skip decision by extension suffix.
pub fn should_skip_file(path: &str, policy: &ScanPolicy) -> bool {
    if !policy.skip_media_extensions {
        return false;
    }
    SKIP_EXTENSIONS.iter().any(|ext| ends_with_ci(path, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ScanTarget;

    fn skipping_policy() -> ScanPolicy {
        ScanPolicy {
            skip_known_folders: true,
            skip_media_extensions: true,
            ..Default::default()
        }
    }

    #[test]
    fn dir_filter_matches_segments_case_insensitively() {
        let p = skipping_policy();
        assert!(should_skip_dir("/mnt/sd/nintendo/Album", "/mnt/sd", &p));
        assert!(should_skip_dir("/mnt/sd/backups/EMUMMC", "/mnt/sd", &p));
        assert!(should_skip_dir("/mnt/sd/Emutendo", "/mnt/sd", &p));
        assert!(!should_skip_dir("/mnt/sd/music", "/mnt/sd", &p));
        // Segment match only; a name that merely contains the word stays.
        assert!(!should_skip_dir("/mnt/sd/my-nintendo-notes", "/mnt/sd", &p));
    }

    #[test]
    fn dir_filter_inactive_for_targeted_scans() {
        let p = ScanPolicy {
            target: ScanTarget::Folder,
            ..skipping_policy()
        };
        assert!(!should_skip_dir("/mnt/sd/Nintendo", "/mnt/sd/Nintendo", &p));
    }

    #[test]
    fn dir_filter_inactive_when_policy_disables_it() {
        let p = ScanPolicy::default();
        assert!(!should_skip_dir("/mnt/sd/Nintendo", "/mnt/sd", &p));
    }

    #[test]
    fn file_filter_matches_extension_suffix() {
        let p = skipping_policy();
        assert!(should_skip_file("/mnt/sd/video/movie.MKV", &p));
        assert!(should_skip_file("/mnt/sd/backup.tar.zip", &p));
        assert!(should_skip_file("/mnt/sd/games/title.nsp", &p));
        assert!(!should_skip_file("/mnt/sd/notes.txt", &p));
        assert!(!should_skip_file("/mnt/sd/zip", &p));
    }

    #[test]
    fn file_filter_inactive_when_policy_disables_it() {
        let p = ScanPolicy::default();
        assert!(!should_skip_file("/mnt/sd/video/movie.mkv", &p));
    }
}
