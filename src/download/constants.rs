//! Constants for the download module.

/// Connect timeout for archive downloads (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Write buffer size for streaming downloads (1 MiB).
pub const WRITE_BUFFER_BYTES: usize = 1024 * 1024;

/// Default number of simultaneous downloads in a batch.
pub const DEFAULT_WORKERS: usize = 3;

/// Extension appended when the destination is derived from a URL path
/// segment (catalog products are zip archives).
pub const ARCHIVE_EXTENSION: &str = "zip";
