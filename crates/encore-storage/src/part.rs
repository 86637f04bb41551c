//! Multipart part sizing policy.
//!
//! S3-compatible stores require every part except the last to be at least
//! 5 MiB and cap a session at 10 000 parts. For a declared size we pick the
//! smallest part size that respects both limits.

/// Minimum part size accepted by S3-compatible stores (except the last part).
pub const MIN_PART_SIZE: i64 = 5 * 1024 * 1024;

/// Maximum number of parts in one multipart session.
pub const MAX_PARTS: i64 = 10_000;

/// Optimal part size for a declared total size. Falls back to the minimum
/// when the size is non-positive (the request layer rejects those anyway).
pub fn calculate_part_size(size_bytes: i64) -> i64 {
    if size_bytes <= 0 {
        return MIN_PART_SIZE;
    }
    // ceiling division: a trailing partial part still counts against the cap
    if (size_bytes + MIN_PART_SIZE - 1) / MIN_PART_SIZE <= MAX_PARTS {
        return MIN_PART_SIZE;
    }
    size_bytes / MAX_PARTS + 1
}

/// Number of parts needed to cover `size_bytes` at `part_size` (ceiling).
pub fn calculate_part_count(size_bytes: i64, part_size: i64) -> usize {
    let part_size = if part_size <= 0 { MIN_PART_SIZE } else { part_size };
    let mut count = size_bytes / part_size;
    if size_bytes % part_size != 0 {
        count += 1;
    }
    count.max(0) as usize
}
