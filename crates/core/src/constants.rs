/// Constants used throughout the shuto codebase
// Public API version prefix
pub const API_VERSION: &str = "v2";

// Signed URL query parameters
pub const SIGNATURE_PARAM: &str = "sig";
pub const KEY_ID_PARAM: &str = "kid";
pub const TIMESTAMP_PARAM: &str = "ts";

/// Parameters stripped before a query string is canonicalized for signing
pub const RESERVED_SIGNING_PARAMS: &[&str] = &[SIGNATURE_PARAM, KEY_ID_PARAM, TIMESTAMP_PARAM];

// Environment variable names
pub const HMAC_SECRET_KEY_VAR: &str = "HMAC_SECRET_KEY";
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

// Defaults
pub const DEFAULT_KEY_ID: &str = "v1";
pub const DEFAULT_DOMAIN: &str = "default";
