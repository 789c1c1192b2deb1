//! Core data models for the range-relay gateway

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Represents a byte range for HTTP Range requests
///
/// Both bounds are inclusive, following HTTP Range semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    /// Starting byte position (inclusive)
    pub start: u64,
    /// Ending byte position (inclusive)
    pub end: u64,
}

impl ByteRange {
    /// Create a new ByteRange
    ///
    /// # Arguments
    /// * `start` - Starting byte position (inclusive)
    /// * `end` - Ending byte position (inclusive)
    ///
    /// # Returns
    /// * `Ok(ByteRange)` if the range is valid
    /// * `Err(RelayError)` if start > end
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(RelayError::BadRequest(format!(
                "range start ({}) must be <= end ({})",
                start, end
            )));
        }
        Ok(ByteRange { start, end })
    }

    /// Range covering an entire object of `file_size` bytes
    ///
    /// `file_size` must be non-zero; zero-length objects have no valid range.
    pub fn full(file_size: u64) -> Result<Self> {
        if file_size == 0 {
            return Err(RelayError::BadRequest(
                "cannot build a range over an empty object".to_string(),
            ));
        }
        Ok(ByteRange {
            start: 0,
            end: file_size - 1,
        })
    }

    /// Get the size of this byte range in bytes
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Parse a ByteRange from an HTTP Range header value
    ///
    /// Accepts exactly two forms: `bytes=start-end` and the open-ended
    /// `bytes=start-`, where a missing end means "through the last byte".
    /// Suffix ranges (`bytes=-500`) and multi-range headers are rejected.
    /// An end past the object is clamped to the last byte; a start at or
    /// past the object size is an error.
    ///
    /// # Arguments
    /// * `header` - The Range header value (e.g., "bytes=0-1023")
    /// * `file_size` - Total object size, used to resolve and clamp the end
    pub fn from_header(header: &str, file_size: u64) -> Result<Self> {
        let header = header.trim();

        if !header.starts_with("bytes=") {
            return Err(RelayError::BadRequest(format!(
                "Range header must start with 'bytes=', got: {}",
                header
            )));
        }

        let range_part = &header[6..]; // Skip "bytes="
        let parts: Vec<&str> = range_part.split('-').collect();

        if parts.len() != 2 {
            return Err(RelayError::BadRequest(format!(
                "invalid range format, expected 'start-end' or 'start-', got: {}",
                range_part
            )));
        }

        let start = parts[0]
            .trim()
            .parse::<u64>()
            .map_err(|e| RelayError::BadRequest(format!("invalid range start: {}", e)))?;

        let end_part = parts[1].trim();
        let end = if end_part.is_empty() {
            file_size.saturating_sub(1)
        } else {
            end_part
                .parse::<u64>()
                .map_err(|e| RelayError::BadRequest(format!("invalid range end: {}", e)))?
        };
        let end = end.min(file_size.saturating_sub(1));

        if start >= file_size {
            return Err(RelayError::BadRequest(format!(
                "range start {} is beyond the object size {}",
                start, file_size
            )));
        }

        ByteRange::new(start, end)
    }

    /// Render the Content-Range header value for this range
    ///
    /// # Returns
    /// A string in the format "bytes start-end/total"
    pub fn content_range_header(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

/// Opaque reference the backing store needs to address an object's bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLocation {
    /// Store-internal media identifier (distinct from the public object id)
    pub media_id: i64,
    /// Access token that must accompany every chunk fetch
    pub access_token: i64,
    /// Thumbnail-size selector when addressing a reduced rendition
    #[serde(default)]
    pub thumb_size: Option<String>,
}

/// Metadata describing one stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Region that physically holds the object's chunks
    pub region_id: u8,
    /// Location reference to pass to chunk fetches
    pub location: ChunkLocation,
    /// Total object size in bytes
    pub size: u64,
    /// MIME type as recorded by the store, if any
    pub mime_type: Option<String>,
    /// Original file name as recorded by the store, if any
    pub file_name: Option<String>,
}

/// An authenticated session bound to one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Region this session is valid for
    pub region_id: u8,
    /// Opaque authentication key material
    pub auth_key: String,
    /// Whether this session was established via an export/import handshake
    pub imported: bool,
}

/// Fetch plan for streaming one byte range out of a chunked object
///
/// Produced by the chunk planner; consumed by the stream producer. All
/// chunk fetches happen at multiples of `chunk_size` starting from
/// `aligned_offset`, and the first/last chunks are trimmed to the exact
/// requested bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    /// Chunk size in bytes (a power of two)
    pub chunk_size: u64,
    /// First fetch offset, aligned down to a chunk boundary
    pub aligned_offset: u64,
    /// Bytes to drop from the front of the first chunk
    pub first_part_cut: u64,
    /// Bytes to keep from the front of the last chunk
    pub last_part_cut: u64,
    /// Number of chunk fetches the range spans
    pub part_count: u64,
}

impl ChunkPlan {
    /// Trim a fetched chunk down to the requested range
    ///
    /// `part` is 1-based. A single-part plan is trimmed on both sides;
    /// otherwise the first part loses its head, the last part its tail,
    /// and intermediate parts pass through untouched. Cut positions are
    /// clamped to the fetched length so a short read from the store can
    /// never panic, only shorten the output.
    pub fn cut_for_part(&self, part: u64, chunk: &Bytes) -> Bytes {
        let len = chunk.len() as u64;
        if self.part_count == 1 {
            let end = self.last_part_cut.min(len) as usize;
            let start = (self.first_part_cut as usize).min(end);
            chunk.slice(start..end)
        } else if part == 1 {
            let start = self.first_part_cut.min(len) as usize;
            chunk.slice(start..)
        } else if part == self.part_count {
            let end = self.last_part_cut.min(len) as usize;
            chunk.slice(..end)
        } else {
            chunk.clone()
        }
    }
}

/// One client request for object bytes, as seen by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Public identifier of the requested object
    pub object_id: i64,
    /// Resolved byte range to serve
    pub range: ByteRange,
    /// Whether the client actually sent a Range header
    pub ranged: bool,
}

impl StreamRequest {
    /// Create a new StreamRequest
    pub fn new(object_id: i64, range: ByteRange, ranged: bool) -> Self {
        StreamRequest {
            object_id,
            range,
            ranged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_range_new() {
        let range = ByteRange::new(0, 1023).unwrap();
        assert_eq!(range.start, 0);
        assert_eq!(range.end, 1023);
        assert_eq!(range.size(), 1024);
    }

    #[test]
    fn test_byte_range_invalid() {
        let result = ByteRange::new(100, 50);
        assert!(result.is_err());
    }

    #[test]
    fn test_byte_range_full() {
        let range = ByteRange::full(100).unwrap();
        assert_eq!(range.start, 0);
        assert_eq!(range.end, 99);
        assert!(ByteRange::full(0).is_err());
    }

    #[test]
    fn test_from_header_explicit_range() {
        let range = ByteRange::from_header("bytes=0-1023", 10_000).unwrap();
        assert_eq!(range.start, 0);
        assert_eq!(range.end, 1023);
    }

    #[test]
    fn test_from_header_open_ended() {
        let range = ByteRange::from_header("bytes=5-", 100).unwrap();
        assert_eq!(range.start, 5);
        assert_eq!(range.end, 99);
        assert_eq!(range.size(), 95);
    }

    #[test]
    fn test_from_header_clamps_end() {
        let range = ByteRange::from_header("bytes=10-999999", 100).unwrap();
        assert_eq!(range.end, 99);
    }

    #[test]
    fn test_from_header_rejects_suffix_range() {
        // Suffix ranges are not part of the accepted grammar
        assert!(ByteRange::from_header("bytes=-500", 10_000).is_err());
    }

    #[test]
    fn test_from_header_rejects_multi_range() {
        assert!(ByteRange::from_header("bytes=0-10,20-30", 10_000).is_err());
    }

    #[test]
    fn test_from_header_rejects_missing_prefix() {
        assert!(ByteRange::from_header("0-1023", 10_000).is_err());
        assert!(ByteRange::from_header("items=0-1023", 10_000).is_err());
    }

    #[test]
    fn test_from_header_rejects_start_past_eof() {
        assert!(ByteRange::from_header("bytes=100-", 100).is_err());
        assert!(ByteRange::from_header("bytes=500-600", 100).is_err());
    }

    #[test]
    fn test_from_header_rejects_inverted_range() {
        assert!(ByteRange::from_header("bytes=50-10", 100).is_err());
    }

    #[test]
    fn test_content_range_header() {
        let range = ByteRange::new(5, 99).unwrap();
        assert_eq!(range.content_range_header(100), "bytes 5-99/100");
    }

    #[test]
    fn test_cut_single_part() {
        let plan = ChunkPlan {
            chunk_size: 4096,
            aligned_offset: 0,
            first_part_cut: 10,
            last_part_cut: 20,
            part_count: 1,
        };
        let chunk = Bytes::from((0u8..100).collect::<Vec<u8>>());
        let cut = plan.cut_for_part(1, &chunk);
        assert_eq!(cut.len(), 10);
        assert_eq!(cut[0], 10);
        assert_eq!(cut[9], 19);
    }

    #[test]
    fn test_cut_first_and_last_parts() {
        let plan = ChunkPlan {
            chunk_size: 16,
            aligned_offset: 0,
            first_part_cut: 4,
            last_part_cut: 8,
            part_count: 3,
        };
        let chunk = Bytes::from((0u8..16).collect::<Vec<u8>>());

        let first = plan.cut_for_part(1, &chunk);
        assert_eq!(first.len(), 12);
        assert_eq!(first[0], 4);

        let middle = plan.cut_for_part(2, &chunk);
        assert_eq!(middle.len(), 16);

        let last = plan.cut_for_part(3, &chunk);
        assert_eq!(last.len(), 8);
        assert_eq!(last[7], 7);
    }

    #[test]
    fn test_cut_clamps_short_chunk() {
        // Store returned fewer bytes than the plan expected
        let plan = ChunkPlan {
            chunk_size: 4096,
            aligned_offset: 0,
            first_part_cut: 0,
            last_part_cut: 3000,
            part_count: 1,
        };
        let chunk = Bytes::from(vec![7u8; 100]);
        let cut = plan.cut_for_part(1, &chunk);
        assert_eq!(cut.len(), 100);
    }

    #[test]
    fn test_stream_request_new() {
        let range = ByteRange::new(0, 9).unwrap();
        let req = StreamRequest::new(42, range, true);
        assert_eq!(req.object_id, 42);
        assert!(req.ranged);
        assert_eq!(req.range.size(), 10);
    }
}
