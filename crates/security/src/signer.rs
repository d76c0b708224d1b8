//! HMAC-SHA256 URL signer
//!
//! The signed message is `path|canonical_query` for timeless URLs and
//! `path|ts|canonical_query` for time-bound ones, where `canonical_query` is
//! the [`QueryParams::encode`] form of the request parameters with `sig`,
//! `kid` and `ts` removed.

use crate::error::{KeyError, SignatureError};
use crate::keys::{KeyRegistry, SecretKey, SigningKey};
use crate::query::QueryParams;
use shuto_config::SecurityConfig;
use shuto_core::{
    system_clock, SharedClock, API_VERSION, KEY_ID_PARAM, RESERVED_SIGNING_PARAMS,
    SIGNATURE_PARAM, TIMESTAMP_PARAM,
};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use tracing::debug;

/// Whether signatures carry a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    /// URLs never expire
    Timeless,
    /// URLs expire `window_secs` after generation
    TimeBound { window_secs: u64 },
}

/// Generates and validates signed URLs for one tenant
#[derive(Clone)]
pub struct UrlSigner {
    registry: KeyRegistry,
    validity_window: u64,
    clock: SharedClock,
}

impl UrlSigner {
    /// Create a signer.
    ///
    /// A `validity_window_secs` of 0 produces timeless URLs. An empty
    /// `default_key_id` selects the first key.
    pub fn new(
        keys: Vec<SecretKey>,
        validity_window_secs: u64,
        default_key_id: &str,
    ) -> Result<Self, KeyError> {
        let registry = KeyRegistry::new(keys, Some(default_key_id))?;
        Ok(Self::from_registry(registry, validity_window_secs))
    }

    pub fn from_registry(registry: KeyRegistry, validity_window_secs: u64) -> Self {
        Self {
            registry,
            validity_window: validity_window_secs,
            clock: system_clock(),
        }
    }

    /// Replace the clock used for timestamps and expiry checks
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn mode(&self) -> SigningMode {
        match self.validity_window {
            0 => SigningMode::Timeless,
            window_secs => SigningMode::TimeBound { window_secs },
        }
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Sign `path` and return `params` augmented with `kid`, `sig` and, in
    /// time-bound mode, `ts`.
    ///
    /// Any reserved parameters already present in `params` are discarded.
    /// Signing always uses the default key.
    pub fn sign(&self, path: &str, params: &QueryParams) -> QueryParams {
        let key = self.registry.default_key();
        let mut signed = params.without(RESERVED_SIGNING_PARAMS);
        let canonical = signed.encode();

        let signature = match self.mode() {
            SigningMode::Timeless => key.sign(&signing_message(path, None, &canonical)),
            SigningMode::TimeBound { .. } => {
                let timestamp = self.clock.unix_timestamp();
                signed.set(TIMESTAMP_PARAM, timestamp.to_string());
                key.sign(&signing_message(path, Some(timestamp), &canonical))
            }
        };

        signed.set(KEY_ID_PARAM, key.id());
        signed.set(SIGNATURE_PARAM, signature);
        signed
    }

    /// Signed `path?query` string for `path` and `params`
    pub fn generate(&self, path: &str, params: &QueryParams) -> String {
        format!("{path}?{}", self.sign(path, params).encode())
    }

    /// Check that `params` carry a valid signature for `path`
    pub fn validate(&self, path: &str, params: &QueryParams) -> Result<(), SignatureError> {
        let signature = non_empty(params.get(SIGNATURE_PARAM));
        let key_id = non_empty(params.get(KEY_ID_PARAM));
        let (Some(signature), Some(key_id)) = (signature, key_id) else {
            debug!(path, "Rejecting signed URL: missing sig or kid");
            return Err(SignatureError::InvalidFormat);
        };

        let Some(key) = self.registry.get(key_id) else {
            debug!(path, key_id, "Rejecting signed URL: unknown key");
            return Err(SignatureError::KeyNotFound);
        };

        let canonical = params.without(RESERVED_SIGNING_PARAMS).encode();

        let message = match self.mode() {
            SigningMode::Timeless => signing_message(path, None, &canonical),
            SigningMode::TimeBound { window_secs } => {
                let timestamp = non_empty(params.get(TIMESTAMP_PARAM))
                    .and_then(|ts| ts.parse::<i64>().ok())
                    .ok_or_else(|| {
                        debug!(path, key_id, "Rejecting signed URL: missing or malformed ts");
                        SignatureError::InvalidFormat
                    })?;

                // Expiry is reported ahead of the signature check.
                let age = self.clock.unix_timestamp().saturating_sub(timestamp);
                if age > i64::try_from(window_secs).unwrap_or(i64::MAX) {
                    debug!(path, key_id, age, window_secs, "Rejecting signed URL: expired");
                    return Err(SignatureError::ExpiredUrl);
                }

                signing_message(path, Some(timestamp), &canonical)
            }
        };

        verify_signature(key, &message, signature).inspect_err(|_| {
            debug!(path, key_id, "Rejecting signed URL: signature mismatch");
        })
    }
}

impl fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlSigner")
            .field("registry", &self.registry)
            .field("mode", &self.mode())
            .finish()
    }
}

impl TryFrom<&SecurityConfig> for UrlSigner {
    type Error = KeyError;

    fn try_from(config: &SecurityConfig) -> Result<Self, Self::Error> {
        let keys = config.secrets.iter().map(SecretKey::from).collect();
        UrlSigner::new(
            keys,
            config.validity_window,
            config.default_key_id.as_deref().unwrap_or_default(),
        )
    }
}

fn signing_message(path: &str, timestamp: Option<i64>, canonical_query: &str) -> String {
    match timestamp {
        Some(ts) => format!("{path}|{ts}|{canonical_query}"),
        None => format!("{path}|{canonical_query}"),
    }
}

fn verify_signature(key: &SigningKey, message: &str, provided: &str) -> Result<(), SignatureError> {
    let expected = key.sign(message);
    if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
        Ok(())
    } else {
        Err(SignatureError::InvalidSignature)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Public endpoints that accept signed URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoint {
    #[default]
    Image,
    Download,
}

/// Endpoint name that is neither `image` nor `download`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("endpoint must be either 'image' or 'download', got '{0}'")]
pub struct UnknownEndpoint(pub String);

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Image => "image",
            Endpoint::Download => "download",
        }
    }

    /// Outward URL for a signed `path?query` string
    pub fn url(&self, signed: &str) -> String {
        format!("/{API_VERSION}/{}/{signed}", self.as_str())
    }

    /// Split an outward URL into endpoint, path and decoded parameters.
    ///
    /// Scheme and host, if present, are ignored.
    pub fn parse_url(url: &str) -> Option<(Endpoint, String, QueryParams)> {
        let (location, query) = url.split_once('?').unwrap_or((url, ""));
        let prefix = format!("/{API_VERSION}/");
        let start = location.find(&prefix)?;
        let rest = &location[start + prefix.len()..];
        let (endpoint, path) = rest.split_once('/')?;
        let endpoint = endpoint.parse().ok()?;
        Some((endpoint, path.to_string(), QueryParams::parse(query)))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = UnknownEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Endpoint::Image),
            "download" => Ok(Endpoint::Download),
            _ => Err(UnknownEndpoint(s.to_string())),
        }
    }
}
