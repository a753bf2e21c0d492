/// Query parameter carrying a single-use access key on gated URLs
pub const ACCESS_KEY_PARAM: &str = "access-key";

/// Default time-to-live for single-use access tokens (seconds)
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 3600;

/// Default expiry window for pre-signed object-storage URLs (seconds)
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u32 = 60;
