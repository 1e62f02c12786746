//! Rolling CRC-32 over byte spans.
//!
//! The engine compares two reads of the same region by checksum, so the
//! function must be a pure, deterministic fold: identical bytes always reduce
//! to identical values. This is the standard CRC-32 (ISO-HDLC, reflected
//! polynomial 0xEDB88320) as computed by `crc32fast`, which also makes the
//! values comparable with external tools.

/// Fold `data` into a running CRC-32, returning the new value.
///
/// Start from `0` and feed spans in order; the result is identical to
/// hashing the concatenated spans in one call.
pub fn update(crc: u32, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(crc);
    hasher.update(data);
    hasher.finalize()
}

/// CRC-32 of a single span.
pub fn hash(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
