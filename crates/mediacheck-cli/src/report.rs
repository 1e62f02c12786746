//! Final report rendering and export.
//!
//! The terminal report mirrors what the engine aggregates: verdict,
//! counters, throughput histogram, largest files, failing paths, and the
//! first-failure snapshot. `--json` dumps the whole thing for machines;
//! `--csv` exports the largest-files table.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::Serialize;

use mediacheck_core::format::{format_count, format_hms, format_size};
use mediacheck_core::stats::PERF_BUCKET_LABELS;
use mediacheck_core::{next_steps, ScanPolicy, ScanStats, Verdict};

/// Print the full report to stdout.
pub fn render(stats: &ScanStats, policy: &ScanPolicy, started_at: DateTime<Local>, duration: Duration) {
    let verdict = Verdict::compute(stats);

    println!();
    println!("=== mediacheck report ===");
    println!("Started:  {}", started_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Duration: {}", format_hms(duration.as_millis() as u64));
    println!("Verdict:  {}", verdict.label());
    println!();
    println!(
        "Dirs: {}   Files read/total: {}/{}   Read: {}",
        format_count(stats.dirs_total),
        format_count(stats.files_read),
        format_count(stats.files_total),
        format_size(stats.bytes_read),
    );
    println!(
        "Errors: read={} (transient {})  open={}  stat={}  path={}  consistency={}",
        stats.read_errors,
        stats.read_errors_transient,
        stats.open_errors,
        stats.stat_errors,
        stats.path_errors,
        stats.consistency_errors,
    );
    println!(
        "Skipped: {} dirs, {} files",
        stats.skipped_dirs, stats.skipped_files
    );
    if stats.verify_bytes > 0 {
        println!("Verification reads: {}", format_size(stats.verify_bytes));
    }

    if stats.perf.ops > 0 {
        println!();
        println!(
            "Performance: {} ops, {}",
            format_count(stats.perf.ops),
            format_size(stats.perf.bytes)
        );
        for (label, count) in PERF_BUCKET_LABELS.iter().zip(stats.perf.histogram) {
            println!("  {label:<12} {count}");
        }
        println!(
            "Stalls: {} ({} total)",
            stats.perf.stalls,
            format_hms(stats.perf.stall_total_ms)
        );
        if stats.perf.longest_ms > 0 {
            println!(
                "Longest op: {} ms, {:.1} MiB/s, {} at offset {} ({})",
                stats.perf.longest_ms,
                stats.perf.longest_mib_s,
                format_size(stats.perf.longest_bytes),
                stats.perf.longest_offset,
                stats.perf.longest_path,
            );
        }
    }

    if !stats.largest.as_slice().is_empty() {
        println!();
        println!("Largest files:");
        for entry in stats.largest.as_slice() {
            println!("  {:>10}  {}", format_size(entry.size), entry.path);
        }
    }

    if !stats.fail_paths.as_slice().is_empty() {
        println!();
        println!("Failing paths:");
        for path in stats.fail_paths.as_slice() {
            println!("  {path}");
        }
    }

    if let Some(ff) = &stats.first_failure {
        println!();
        println!(
            "First failure: {} at {} (offset {}, {} bytes{}) — {}",
            ff.kind.label(),
            ff.path,
            ff.offset,
            ff.bytes,
            ff.os_error
                .map(|e| format!(", os error {e}"))
                .unwrap_or_default(),
            ff.note,
        );
    }

    if !stats.error_ring.is_empty() {
        println!();
        println!("Recent errors ({} total):", stats.error_ring.total());
        for line in stats.error_ring.iter_oldest_first() {
            println!("  {line}");
        }
    }

    println!();
    println!("Next steps (preset: {}):", effective_preset_label(policy));
    for step in next_steps(stats) {
        println!("  - {step}");
    }
}

fn effective_preset_label(policy: &ScanPolicy) -> &'static str {
    if policy.full_read && policy.consistency_check {
        "forensics-like"
    } else if policy.skip_known_folders && policy.skip_media_extensions {
        "fast-like"
    } else {
        "custom"
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    started_at: String,
    duration_ms: u64,
    verdict: Verdict,
    policy: &'a ScanPolicy,
    stats: &'a ScanStats,
}

/// Write the whole report as pretty JSON.
pub fn write_json(
    path: &Path,
    stats: &ScanStats,
    policy: &ScanPolicy,
    started_at: DateTime<Local>,
    duration: Duration,
) -> anyhow::Result<()> {
    let report = JsonReport {
        started_at: started_at.to_rfc3339(),
        duration_ms: duration.as_millis() as u64,
        verdict: Verdict::compute(stats),
        policy,
        stats,
    };
    let file = File::create(path)
        .with_context(|| format!("failed to create JSON report {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Export the largest-files table as CSV.
pub fn write_csv(path: &Path, stats: &ScanStats) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create CSV export {}", path.display()))?;
    writer.write_record(["rank", "size_bytes", "size", "path"])?;
    for (i, entry) in stats.largest.as_slice().iter().enumerate() {
        writer.write_record([
            (i + 1).to_string(),
            entry.size.to_string(),
            format_size(entry.size),
            entry.path.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_report_round_trips_counters() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("report.json");

        let mut stats = ScanStats::default();
        stats.files_total = 3;
        stats.files_read = 2;
        stats.bytes_read = 4096;
        stats.note_largest("/sd/a.dat", 4096);

        write_json(
            &out,
            &stats,
            &ScanPolicy::default(),
            Local::now(),
            Duration::from_millis(1234),
        )
        .unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["stats"]["files_total"], 3);
        assert_eq!(value["duration_ms"], 1234);
        assert_eq!(value["verdict"], "Passed");
    }

    #[test]
    fn csv_export_lists_largest_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("largest.csv");

        let mut stats = ScanStats::default();
        stats.note_largest("/sd/big.dat", 2048);
        stats.note_largest("/sd/small.dat", 1024);

        write_csv(&out, &stats).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "rank,size_bytes,size,path");
        assert!(lines.next().unwrap().contains("/sd/big.dat"));
        assert!(lines.next().unwrap().contains("/sd/small.dat"));
    }
}
