//! # TinyIndex Configuration Constants
//!
//! This module centralizes the configuration constants for TinyIndex. Format
//! constants are grouped with the values they constrain, and the relationships
//! between them are enforced through compile-time assertions.
//!
//! ## Dependency Graph
//!
//! ```text
//! METADATA_SIZE (16384 bytes)
//!       │
//!       ├─> METADATA_MAGIC (must fit, with room for the JSON body)
//!       │
//!       └─> legacy page offset = METADATA_SIZE + page_index * page_size
//!
//! DEFAULT_PAGE_SIZE (4096 bytes)
//!       │
//!       └─> MIN_PAGE_SIZE (an empty page must always compress below it)
//!
//! LOG_SEGMENT_HEADER_SIZE (32 bytes)
//!       │
//!       └─> LOG_FRAME_HEADER_SIZE (32 bytes per frame, header + key + value)
//!
//! DEFAULT_COMPACTION_MIN_BYTES (64MB)
//!       │
//!       └─> DEFAULT_COMPACTION_RATIO (log bytes / live bytes before rewrite)
//! ```
//!
//! ## Format Stability
//!
//! `METADATA_MAGIC`, `METADATA_SIZE`, `METADATA_KEY` and `PAGE_KEY_PREFIX` are
//! part of the on-disk format. Changing any of them makes existing indexes
//! unreadable.

// ============================================================================
// INDEX FORMAT CONSTANTS
// Shared by the legacy flat file and the transactional store
// ============================================================================

/// Metadata format version written by this crate.
pub const VERSION: u32 = 1;

/// Prefix identifying an index metadata block.
pub const METADATA_MAGIC: &[u8] = b"mwmbl-tiny-search";

/// Size of the zero-padded metadata region.
pub const METADATA_SIZE: usize = 16384;

/// Default page size in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Smallest page size accepted by `create`.
///
/// A zstd frame holding an empty JSON array is 11 bytes long.
pub const MIN_PAGE_SIZE: usize = 32;

/// zstd compression level for page payloads.
pub const COMPRESSION_LEVEL: i32 = 3;

const _: () = assert!(
    METADATA_MAGIC.len() < METADATA_SIZE,
    "METADATA_MAGIC must leave room for the metadata body"
);

const _: () = assert!(
    MIN_PAGE_SIZE <= DEFAULT_PAGE_SIZE,
    "DEFAULT_PAGE_SIZE must be a valid page size"
);

// ============================================================================
// STORE KEY LAYOUT
// ============================================================================

/// Store key holding the padded metadata block.
pub const METADATA_KEY: &str = "metadata";

/// Prefix of every page key; page `i` lives at `page_<i>`.
pub const PAGE_KEY_PREFIX: &str = "page_";

// ============================================================================
// COMMIT LOG LAYOUT
// ============================================================================

/// Magic bytes at the start of every log segment.
pub const LOG_MAGIC: &[u8; 16] = b"TinyIndex Log\x00\x00\x00";

/// Log segment format version.
pub const LOG_FORMAT_VERSION: u32 = 1;

/// Size of the log segment header.
pub const LOG_SEGMENT_HEADER_SIZE: usize = 32;

/// Size of each log frame header.
pub const LOG_FRAME_HEADER_SIZE: usize = 32;

/// Upper bound for a single key, guards replay against garbage lengths.
pub const MAX_KEY_LEN: usize = 1024;

/// Upper bound for a single value, guards replay against garbage lengths.
pub const MAX_VALUE_LEN: usize = 64 * 1024 * 1024;

/// File holding the generation number of the active segment.
pub const CURRENT_FILE_NAME: &str = "CURRENT";

/// Advisory lock file held by the writer.
pub const LOCK_FILE_NAME: &str = "LOCK";

/// Extension appended to a legacy file path for its migrated store.
pub const MIGRATED_STORE_EXTENSION: &str = "tinykv";

const _: () = assert!(
    LOG_MAGIC.len() < LOG_SEGMENT_HEADER_SIZE,
    "LOG_MAGIC must fit in the segment header"
);

// ============================================================================
// COMPACTION DEFAULTS
// ============================================================================

/// Log size below which automatic compaction never runs.
pub const DEFAULT_COMPACTION_MIN_BYTES: u64 = 64 * 1024 * 1024;

/// Compact once the log is this many times larger than the live data.
pub const DEFAULT_COMPACTION_RATIO: f64 = 4.0;
