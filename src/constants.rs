//! Named defaults shared by the storage adapters.
//!
//! These are passed into adapter construction explicitly rather than read
//! from process-wide state.

/// Default permission bits for files written by the filesystem adapter
/// (read/write for the owner only).
pub const DEFAULT_FILE_MODE: u32 = 0o600;

/// Default permission bits for directories created by the filesystem adapter.
pub const DEFAULT_DIR_MODE: u32 = 0o750;

/// File mode used by [`Options::standard`](crate::Options::standard).
pub const STANDARD_FILE_MODE: u32 = 0o644;

/// Directory mode used by [`Options::standard`](crate::Options::standard).
pub const STANDARD_DIR_MODE: u32 = 0o755;

/// Default object-store root. A root of `/` applies no key prefix.
pub const DEFAULT_OBJECT_ROOT: &str = "/";

/// Separator between namespace segments in keys.
pub const KEY_SEPARATOR: char = '/';

/// Idle connections kept by a KV connection pool when none is configured.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Longest TTL a cache entry can hold (30 years). Longer TTLs are clamped
/// to this so expiry instants stay representable.
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 365 * 24 * 60 * 60;
