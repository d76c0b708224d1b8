//! Cache entries and their freshness lifecycle

use chrono::{DateTime, Utc};
use shuto_core::clock::add_duration;
use std::time::Duration;

/// Where an entry sits in its lifecycle at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Before `stale_at`: serve as is
    Fresh,
    /// Between `stale_at` and `expires_at`: serve and refresh in the background
    Stale,
    /// At or after `expires_at`: reload before serving
    Expired,
}

/// A cached value with its timestamps
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub stale_at: DateTime<Utc>,
    /// Set while a background refresh for this entry is in flight
    pub is_stale: bool,
}

impl<V> CacheEntry<V> {
    /// Create an entry stamped at `now`.
    ///
    /// `stale_at` never lands after `expires_at`; a `stale_after` longer than
    /// `ttl` is clamped to it.
    pub fn new(value: V, now: DateTime<Utc>, ttl: Duration, stale_after: Duration) -> Self {
        let expires_at = add_duration(now, ttl);
        let stale_at = add_duration(now, stale_after).min(expires_at);
        Self {
            value,
            created_at: now,
            expires_at,
            stale_at,
            is_stale: false,
        }
    }

    pub fn freshness(&self, now: DateTime<Utc>) -> Freshness {
        if now >= self.expires_at {
            Freshness::Expired
        } else if now >= self.stale_at {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }
}
