//! Configuration data model for tenant domains
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Storage remote used to list and fetch a domain's files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcloneConfig {
    /// Remote specification, e.g. `s3:bucket/prefix`
    #[serde(default)]
    pub remote: String,
    /// Extra flags passed to every invocation
    #[serde(default)]
    pub flags: Vec<String>,
}

/// One signing secret as it appears in configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretConfig {
    pub key_id: String,
    pub secret: String,
}

impl fmt::Debug for SecretConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretConfig")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Signed URL settings for a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Signing secrets; the first one is the default unless `default_key_id` is set
    #[serde(default)]
    pub secrets: Vec<SecretConfig>,
    /// Validity window in seconds, 0 for URLs that never expire
    #[serde(default)]
    pub validity_window: u64,
    /// Key used to mint new URLs
    #[serde(default)]
    pub default_key_id: Option<String>,
}

/// Configuration for a single tenant domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    #[serde(default)]
    pub rclone: RcloneConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Top-level document listing every configured domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainsConfig {
    #[serde(default)]
    pub domains: HashMap<String, DomainConfig>,
}
