//! Signed URL authorization for shuto
//!
//! A holder of a signed URL may fetch exactly one path with exactly one set
//! of query parameters, optionally only within a validity window. Signatures
//! are HMAC-SHA256 over a canonical form of the request; several keys may be
//! registered at once so secrets can be rotated without breaking URLs that
//! are already in circulation.

pub mod error;
pub mod keys;
pub mod query;
pub mod signer;

pub use error::{KeyError, SignatureError};
pub use keys::{KeyRegistry, SecretKey};
pub use query::QueryParams;
pub use signer::{Endpoint, SigningMode, UrlSigner};
