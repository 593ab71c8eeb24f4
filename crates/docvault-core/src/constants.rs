//! Shared constants

/// Leading bytes every accepted upload must carry.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Content type served for every stored blob.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

pub const DEFAULT_SESSION_TTL_HOURS: u64 = 24;
/// Upper bound on `SESSION_TTL_HOURS` (ten years).
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 10;
pub const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_ORPHAN_GRACE_MULTIPLIER: f64 = 2.0;
/// The grace window must cover at least one sweep interval.
pub const MIN_ORPHAN_GRACE_MULTIPLIER: f64 = 1.0;
pub const DEFAULT_RETRIEVAL_BASE_PATH: &str = "/documents";
pub const DEFAULT_LOCAL_STORAGE_PATH: &str = "./uploads";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://docvault.db";
