//! Display formatting helpers — human-readable byte counts, file counts,
//! and durations.
//!
//! All internal sizes are `u64` bytes. Floating point is used only at the
//! display-formatting boundary.

/// Format a byte count with binary units (KiB = 1024).
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    const TIB: f64 = GIB * 1024.0;

    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < MIB {
        format!("{:.1} KiB", b / KIB)
    } else if b < GIB {
        format!("{:.1} MiB", b / MIB)
    } else if b < TIB {
        format!("{:.2} GiB", b / GIB)
    } else {
        format!("{:.2} TiB", b / TIB)
    }
}

/// Format a count with thousand separators.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.char_indices() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format milliseconds as `HH:MM:SS`, clamping at 99 hours.
pub fn format_hms(ms: u64) -> String {
    let mut s = ms / 1000;
    let h = s / 3600;
    s %= 3600;
    let m = s / 60;
    s %= 60;
    if h > 99 {
        format!("99+:{m:02}:{s:02}")
    } else {
        format!("{h:02}:{m:02}:{s:02}")
    }
}
