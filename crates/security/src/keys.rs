//! Signing keys and the registry that holds them

use crate::error::KeyError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shuto_config::SecretConfig;
use std::collections::HashMap;
use std::fmt;
use zeroize::Zeroizing;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// A shared secret identified by a short key id
#[derive(Clone)]
pub struct SecretKey {
    id: String,
    secret: Zeroizing<Vec<u8>>,
}

impl SecretKey {
    pub fn new(id: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl From<&SecretConfig> for SecretKey {
    fn from(config: &SecretConfig) -> Self {
        SecretKey::new(config.key_id.clone(), config.secret.as_bytes().to_vec())
    }
}

/// A key with its HMAC state already initialised
#[derive(Clone)]
pub(crate) struct SigningKey {
    id: String,
    mac: HmacSha256,
}

impl SigningKey {
    fn new(key: &SecretKey) -> Result<Self, KeyError> {
        let mac = HmacSha256::new_from_slice(&key.secret).map_err(|_| KeyError::InvalidKey {
            key_id: key.id.clone(),
        })?;
        Ok(Self {
            id: key.id.clone(),
            mac,
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Lowercase hex HMAC-SHA256 of `message`
    pub(crate) fn sign(&self, message: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Immutable set of signing keys with one default used for minting
#[derive(Clone)]
pub struct KeyRegistry {
    keys: HashMap<String, SigningKey>,
    default_key: SigningKey,
}

impl KeyRegistry {
    /// Build a registry from `keys`.
    ///
    /// When `default_key_id` is `None` or empty the first key becomes the
    /// default. Key ids must be non-empty and unique.
    pub fn new(keys: Vec<SecretKey>, default_key_id: Option<&str>) -> Result<Self, KeyError> {
        let first_id = keys.first().ok_or(KeyError::EmptyRegistry)?.id.clone();
        let default_key_id = match default_key_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => first_id,
        };

        let mut map = HashMap::with_capacity(keys.len());
        for key in &keys {
            if key.id.is_empty() {
                return Err(KeyError::InvalidKey {
                    key_id: key.id.clone(),
                });
            }
            if map.contains_key(&key.id) {
                return Err(KeyError::DuplicateKeyId {
                    key_id: key.id.clone(),
                });
            }
            map.insert(key.id.clone(), SigningKey::new(key)?);
        }

        let default_key = map
            .get(&default_key_id)
            .cloned()
            .ok_or(KeyError::DefaultKeyNotFound {
                key_id: default_key_id,
            })?;

        Ok(Self {
            keys: map,
            default_key,
        })
    }

    /// Key used to mint new signatures
    pub fn default_key_id(&self) -> &str {
        self.default_key.id()
    }

    /// Registered key ids in sorted order
    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn get(&self, key_id: &str) -> Option<&SigningKey> {
        self.keys.get(key_id)
    }

    pub(crate) fn default_key(&self) -> &SigningKey {
        &self.default_key
    }
}

impl fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRegistry")
            .field("keys", &self.key_ids())
            .field("default_key_id", &self.default_key_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_keys() -> Vec<SecretKey> {
        vec![
            SecretKey::new("v1", "test-secret-1"),
            SecretKey::new("v2", "test-secret-2"),
        ]
    }

    #[test]
    fn test_explicit_default() {
        let registry = KeyRegistry::new(test_keys(), Some("v2")).unwrap();
        assert_eq!(registry.default_key_id(), "v2");
        assert_eq!(registry.key_ids(), vec!["v1", "v2"]);
    }

    #[test]
    fn test_first_key_is_default_when_unspecified() {
        let registry = KeyRegistry::new(test_keys(), None).unwrap();
        assert_eq!(registry.default_key_id(), "v1");

        let registry = KeyRegistry::new(test_keys(), Some("")).unwrap();
        assert_eq!(registry.default_key_id(), "v1");
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert_eq!(
            KeyRegistry::new(Vec::new(), None).unwrap_err(),
            KeyError::EmptyRegistry
        );
    }

    #[test]
    fn test_unknown_default_rejected() {
        let err = KeyRegistry::new(test_keys(), Some("v3")).unwrap_err();
        assert_eq!(
            err,
            KeyError::DefaultKeyNotFound {
                key_id: "v3".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let keys = vec![SecretKey::new("v1", "a"), SecretKey::new("v1", "b")];
        assert!(matches!(
            KeyRegistry::new(keys, None),
            Err(KeyError::DuplicateKeyId { .. })
        ));
    }

    #[test]
    fn test_empty_id_rejected() {
        let keys = vec![SecretKey::new("", "a")];
        assert!(matches!(
            KeyRegistry::new(keys, None),
            Err(KeyError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_secret_never_printed() {
        let registry = KeyRegistry::new(test_keys(), None).unwrap();
        let rendered = format!("{registry:?} {:?}", test_keys());
        assert!(!rendered.contains("test-secret"));
    }

    #[test]
    fn test_sign_matches_known_vector() {
        // RFC 4231 test case 2
        let registry = KeyRegistry::new(vec![SecretKey::new("k", "Jefe")], None).unwrap();
        assert_eq!(
            registry.default_key().sign("what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
