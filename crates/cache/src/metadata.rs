//! Per-file image metadata for directory listings
//!
//! Listings report dimensions and keywords for every image they contain.
//! Computing those means fetching the object and decoding its header, so
//! results are kept in an [`SwrCache`] for a long time and refreshed in the
//! background once they are an hour old.

use crate::errors::{CacheError, Result};
use crate::swr::SwrCache;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Dimensions and keywords of a stored image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

/// Fetches raw object bytes from a tenant's storage backend
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, domain: &str, path: &str) -> anyhow::Result<Vec<u8>>;
}

/// Decodes metadata from raw image bytes
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, data: &[u8]) -> anyhow::Result<ImageMetadata>;
}

/// Freshness policy for metadata entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataPolicy {
    pub ttl: Duration,
    pub stale_after: Duration,
}

impl Default for MetadataPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(180 * 24 * 60 * 60),
            stale_after: Duration::from_secs(60 * 60),
        }
    }
}

/// Cached metadata lookups backed by storage
#[derive(Clone)]
pub struct MetadataIndex {
    cache: SwrCache<ImageMetadata>,
    fetcher: Arc<dyn ObjectFetcher>,
    extractor: Arc<dyn MetadataExtractor>,
    policy: MetadataPolicy,
}

impl MetadataIndex {
    pub fn new(
        cache: SwrCache<ImageMetadata>,
        fetcher: Arc<dyn ObjectFetcher>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            extractor,
            policy: MetadataPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: MetadataPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache(&self) -> &SwrCache<ImageMetadata> {
        &self.cache
    }

    /// Metadata for `path` within `domain`, loading it on a miss
    pub async fn metadata(&self, domain: &str, path: &str) -> Result<ImageMetadata> {
        let key = cache_key(domain, path);
        let fetcher = Arc::clone(&self.fetcher);
        let extractor = Arc::clone(&self.extractor);
        let domain = domain.to_string();
        let path = path.to_string();

        self.cache
            .get_or_load(
                &key,
                self.policy.ttl,
                self.policy.stale_after,
                move || async move {
                    let data = fetcher.fetch(&domain, &path).await?;
                    debug!(
                        domain = %domain,
                        path = %path,
                        bytes = data.len(),
                        "Extracting image metadata"
                    );
                    extractor.extract(&data)
                },
            )
            .await
            .map_err(|source| CacheError::Load { key, source })
    }
}

/// Tenants share one cache, so keys carry the domain
fn cache_key(domain: &str, path: &str) -> String {
    format!("{domain}/{path}")
}

/// Path of a listing entry `file` found under directory `dir`.
///
/// Listing a single file reports that file again, in which case `dir`
/// already ends with it and is returned unchanged.
pub fn listing_path(dir: &str, file: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        return file.to_string();
    }
    if dir == file || dir.ends_with(&format!("/{file}")) {
        return dir.to_string();
    }
    format!("{dir}/{file}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuto_core::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeStorage {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ObjectFetcher for FakeStorage {
        async fn fetch(&self, domain: &str, path: &str) -> anyhow::Result<Vec<u8>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if path.ends_with("missing.jpg") {
                anyhow::bail!("object not found: {domain}/{path}");
            }
            Ok(format!("{domain}|{path}").into_bytes())
        }
    }

    /// Reports the byte length as the width so tests can tell objects apart
    struct LengthExtractor;

    impl MetadataExtractor for LengthExtractor {
        fn extract(&self, data: &[u8]) -> anyhow::Result<ImageMetadata> {
            Ok(ImageMetadata {
                width: data.len() as u32,
                height: 1,
                keywords: vec!["test".to_string()],
            })
        }
    }

    fn index() -> (MetadataIndex, Arc<FakeStorage>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::from_unix(1_700_000_000));
        let cache = SwrCache::with_clock(16, clock.clone()).unwrap();
        let storage = Arc::new(FakeStorage::default());
        let index = MetadataIndex::new(cache, storage.clone(), Arc::new(LengthExtractor));
        (index, storage, clock)
    }

    #[tokio::test]
    async fn test_metadata_is_cached() {
        let (index, storage, clock) = index();

        let first = index.metadata("a.example.com", "photos/cat.jpg").await.unwrap();
        assert_eq!(first.width, "a.example.com|photos/cat.jpg".len() as u32);
        assert_eq!(first.keywords, vec!["test".to_string()]);

        clock.advance(Duration::from_secs(30 * 60));
        let second = index.metadata("a.example.com", "photos/cat.jpg").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(storage.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_domains_do_not_share_entries() {
        let (index, storage, _clock) = index();

        let a = index.metadata("a.example.com", "cat.jpg").await.unwrap();
        let b = index.metadata("bb.example.com", "cat.jpg").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(storage.fetches.load(Ordering::SeqCst), 2);
        assert!(index.cache().contains("a.example.com/cat.jpg"));
    }

    #[tokio::test]
    async fn test_fetch_failure_reports_key() {
        let (index, _storage, _clock) = index();

        let err = index
            .metadata("a.example.com", "missing.jpg")
            .await
            .unwrap_err();
        match err {
            CacheError::Load { key, source } => {
                assert_eq!(key, "a.example.com/missing.jpg");
                assert!(source.to_string().contains("object not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(index.cache().is_empty());
    }

    #[test]
    fn test_default_policy() {
        let policy = MetadataPolicy::default();
        assert_eq!(policy.ttl, Duration::from_secs(15_552_000));
        assert_eq!(policy.stale_after, Duration::from_secs(3_600));
    }

    #[test]
    fn test_listing_path() {
        assert_eq!(listing_path("photos", "cat.jpg"), "photos/cat.jpg");
        assert_eq!(listing_path("photos/", "cat.jpg"), "photos/cat.jpg");
        assert_eq!(listing_path("photos/cat.jpg", "cat.jpg"), "photos/cat.jpg");
        assert_eq!(listing_path("", "cat.jpg"), "cat.jpg");
        assert_eq!(listing_path("cat.jpg", "cat.jpg"), "cat.jpg");
        assert_eq!(listing_path("bobcat.jpg", "cat.jpg"), "bobcat.jpg/cat.jpg");
    }

    #[test]
    fn test_metadata_serializes_without_empty_keywords() {
        let metadata = ImageMetadata {
            width: 640,
            height: 480,
            keywords: Vec::new(),
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"width":640,"height":480}"#);
    }
}
