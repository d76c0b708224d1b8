//! Error types for the metadata cache

/// Result type for cache construction and metadata lookups
pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Invalid cache configuration
    #[error("cache configuration error: {message}")]
    Configuration { message: String },

    /// Fetching or decoding an object's metadata failed
    #[error("failed to load metadata for '{key}': {source}")]
    Load {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl CacheError {
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        CacheError::Configuration {
            message: message.into(),
        }
    }
}
