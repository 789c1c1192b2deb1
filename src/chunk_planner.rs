//! Chunk Planner
//!
//! Translates a requested byte range into an aligned chunk fetch plan.
//!
//! The backing store only serves chunks at offsets that are multiples of
//! the chunk size, so every range request is widened to the chunk grid
//! and the excess is trimmed off the first and last chunks. The chunk
//! size itself is a power of two picked from the request length: bigger
//! requests get bigger chunks, bounded by per-bucket caps the backend
//! enforces.

use tracing::debug;

use crate::error::{RelayError, Result};
use crate::models::ChunkPlan;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Requests longer than this use the large bucket
const LARGE_REQUEST_BYTES: u64 = 50 * MIB;
/// Requests longer than this (but not large) use the medium bucket
const MEDIUM_REQUEST_BYTES: u64 = 10 * MIB;

/// Chunk size cap for the large bucket
const LARGE_CHUNK_CAP: u64 = 2 * MIB;
/// Chunk size cap for the medium bucket
const MEDIUM_CHUNK_CAP: u64 = MIB;
/// Chunk size cap when the object is video, regardless of bucket
const VIDEO_CHUNK_CAP: u64 = MIB;

/// ceil(log2(n)) for n >= 1
fn ceil_log2(n: u64) -> i64 {
    if n <= 1 {
        0
    } else {
        64 - i64::from((n - 1).leading_zeros())
    }
}

/// 2^exp KiB as a byte count
fn pow2_kib(exp: i64) -> u64 {
    1u64 << (exp + 10)
}

/// Pick the chunk size for a request of `length` bytes
///
/// The exponent is ceil(log2(length in KiB)), clamped to a per-bucket
/// window, and the resulting power-of-two size is capped per bucket.
/// Small requests always land between 4 KiB and 1 MiB; medium requests
/// (over 10 MiB) cap at 1 MiB; large requests (over 50 MiB) cap at 2 MiB.
///
/// `length` must be at least 1.
pub fn bucketed_chunk_size(length: u64) -> u64 {
    let exp = ceil_log2(length) - 10;

    if length > LARGE_REQUEST_BYTES {
        LARGE_CHUNK_CAP.min(pow2_kib(exp.clamp(11, 21)))
    } else if length > MEDIUM_REQUEST_BYTES {
        MEDIUM_CHUNK_CAP.min(pow2_kib(exp.clamp(10, 20)))
    } else {
        pow2_kib(exp.clamp(2, 10))
    }
}

/// Build the chunk fetch plan for one byte range
///
/// # Arguments
/// * `file_size` - Total object size in bytes
/// * `start` - First requested byte (inclusive)
/// * `end` - Last requested byte (inclusive)
/// * `video` - Whether the object is video content, which caps the chunk size
///
/// # Returns
/// A [`ChunkPlan`] whose fetches all start at multiples of the chunk size.
/// The part count is the number of chunk-grid cells the range touches, so
/// a short range straddling a chunk boundary still fetches both chunks and
/// the trimmed output is always exactly `end - start + 1` bytes.
pub fn plan(file_size: u64, start: u64, end: u64, video: bool) -> Result<ChunkPlan> {
    if file_size == 0 {
        return Err(RelayError::BadRequest(
            "cannot plan chunks for an empty object".to_string(),
        ));
    }
    if start > end {
        return Err(RelayError::BadRequest(format!(
            "range start {} is beyond range end {}",
            start, end
        )));
    }
    if end >= file_size {
        return Err(RelayError::BadRequest(format!(
            "range end {} is beyond the object size {}",
            end, file_size
        )));
    }

    let length = end - start + 1;
    let mut chunk_size = bucketed_chunk_size(length);
    if video {
        chunk_size = chunk_size.min(VIDEO_CHUNK_CAP);
    }

    let aligned_offset = start - (start % chunk_size);
    let first_part_cut = start - aligned_offset;
    let last_part_cut = (end % chunk_size) + 1;
    let part_count = end / chunk_size - start / chunk_size + 1;

    debug!(
        "Planned {} parts for range {}-{} (length={}, chunk_size={}, aligned_offset={})",
        part_count, start, end, length, chunk_size, aligned_offset
    );

    Ok(ChunkPlan {
        chunk_size,
        aligned_offset,
        first_part_cut,
        last_part_cut,
        part_count,
    })
}
