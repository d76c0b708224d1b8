//! Error types for URL signing

/// Reasons a signed URL is rejected
///
/// Every variant is a final authorization decision; none of them is worth
/// retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// `sig` or `kid` missing, or `ts` missing/malformed in time-bound mode
    #[error("invalid URL format")]
    InvalidFormat,

    /// `kid` names a key that is not registered
    #[error("signing key not found")]
    KeyNotFound,

    /// The URL is older than the validity window
    #[error("URL has expired")]
    ExpiredUrl,

    /// The signature does not match the request
    #[error("invalid signature")]
    InvalidSignature,
}

/// Errors building a key registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("at least one key is required")]
    EmptyRegistry,

    #[error("default key ID '{key_id}' not found in provided keys")]
    DefaultKeyNotFound { key_id: String },

    #[error("key ID '{key_id}' is registered more than once")]
    DuplicateKeyId { key_id: String },

    #[error("key '{key_id}' cannot be used for signing")]
    InvalidKey { key_id: String },
}
