//! Shared constants and invariants

pub const RETRY_ATTEMPTS_DEFAULT: u32 = 3;
pub const RETRY_BASE_DELAY_MS_DEFAULT: u64 = 1000;
pub const RETRY_MAX_DELAY_MS_DEFAULT: u64 = 30_000;
pub const RETRY_AFTER_MAX_SECONDS_DEFAULT: u64 = 300;

// Metadata cache keys
pub const CACHE_KEY_SCHEMA: &str = "schema";
pub const CACHE_KEY_SERVICE_TYPES: &str = "service-types";
