//! Run verdict and advisory next steps derived from the final stats.

use serde::Serialize;

use crate::stats::ScanStats;

/// Overall health verdict for a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Passed,
    Warnings,
    Failed,
    Cancelled,
}

impl Verdict {
    /// Classify a finished run.
    ///
    /// Persistent read errors or consistency mismatches mean the medium
    /// failed; metadata/access trouble, recovered transients, or policy
    /// skips reduce confidence to a warning.
    pub fn compute(stats: &ScanStats) -> Self {
        if stats.cancelled {
            return Verdict::Cancelled;
        }
        if stats.read_errors > 0 || stats.consistency_errors > 0 {
            return Verdict::Failed;
        }
        let any_warn = stats.open_errors > 0
            || stats.stat_errors > 0
            || stats.path_errors > 0
            || stats.read_errors_transient > 0
            || stats.skipped_dirs > 0
            || stats.skipped_files > 0;
        if any_warn {
            Verdict::Warnings
        } else {
            Verdict::Passed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Passed => "PASSED",
            Verdict::Warnings => "WARNINGS",
            Verdict::Failed => "FAILED",
            Verdict::Cancelled => "CANCELLED",
        }
    }
}

/// Short advisory lines to print under the verdict.
pub fn next_steps(stats: &ScanStats) -> Vec<&'static str> {
    if stats.cancelled {
        return vec!["Scan was cancelled. Re-run for full coverage."];
    }
    if stats.read_errors > 0 || stats.consistency_errors > 0 {
        return vec![
            "Back up important data immediately.",
            "Test the medium on a PC (full surface read). Replace it if errors repeat.",
            "If the filesystem is corrupted, copy off data, reformat, and restore.",
        ];
    }
    if stats.open_errors > 0 || stats.stat_errors > 0 || stats.path_errors > 0 {
        return vec![
            "No read errors, but metadata/access issues were detected.",
            "Run a filesystem check (chkdsk/fsck).",
            "Watch for path length or permission problems.",
        ];
    }
    if stats.read_errors_transient > 0 {
        return vec![
            "Some transient read errors recovered by retry.",
            "Consider a full re-test; intermittent I/O can indicate a degrading medium.",
        ];
    }
    if stats.skipped_dirs > 0 || stats.skipped_files > 0 {
        return vec![
            "Some items were skipped by policy filters.",
            "Use the forensics preset or disable filters for full coverage.",
        ];
    }
    vec!["No issues detected. If you still suspect problems, run the forensics preset."]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_run_passes() {
        let stats = ScanStats::default();
        assert_eq!(Verdict::compute(&stats), Verdict::Passed);
    }

    #[test]
    fn read_or_consistency_errors_fail() {
        let mut stats = ScanStats::default();
        stats.read_errors = 1;
        assert_eq!(Verdict::compute(&stats), Verdict::Failed);

        let mut stats = ScanStats::default();
        stats.consistency_errors = 1;
        assert_eq!(Verdict::compute(&stats), Verdict::Failed);
    }

    #[test]
    fn metadata_trouble_and_skips_warn() {
        let cases: [fn(&mut ScanStats); 6] = [
            |s: &mut ScanStats| s.open_errors = 1,
            |s: &mut ScanStats| s.stat_errors = 1,
            |s: &mut ScanStats| s.path_errors = 1,
            |s: &mut ScanStats| s.read_errors_transient = 1,
            |s: &mut ScanStats| s.skipped_files = 1,
            |s: &mut ScanStats| s.skipped_dirs = 1,
        ];
        for set in cases {
            let mut stats = ScanStats::default();
            set(&mut stats);
            assert_eq!(Verdict::compute(&stats), Verdict::Warnings);
        }
    }

    #[test]
    fn cancellation_wins_over_everything() {
        let mut stats = ScanStats::default();
        stats.read_errors = 3;
        stats.cancelled = true;
        assert_eq!(Verdict::compute(&stats), Verdict::Cancelled);
    }

    #[test]
    fn next_steps_prioritise_hard_failures() {
        let mut stats = ScanStats::default();
        stats.read_errors = 1;
        stats.skipped_files = 5;
        let steps = next_steps(&stats);
        assert!(steps[0].contains("Back up"));
    }
}
