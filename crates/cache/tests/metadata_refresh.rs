//! Listing metadata through the public cache API

use async_trait::async_trait;
use shuto_cache::{
    listing_path, ImageMetadata, MetadataExtractor, MetadataIndex, MetadataPolicy, ObjectFetcher,
    SwrCache,
};
use shuto_core::ManualClock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Storage whose objects grow by one byte every time they are fetched
#[derive(Default)]
struct GrowingStorage {
    fetches: AtomicU32,
}

#[async_trait]
impl ObjectFetcher for GrowingStorage {
    async fn fetch(&self, _domain: &str, _path: &str) -> anyhow::Result<Vec<u8>> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(vec![0; n as usize])
    }
}

struct WidthFromLength;

impl MetadataExtractor for WidthFromLength {
    fn extract(&self, data: &[u8]) -> anyhow::Result<ImageMetadata> {
        Ok(ImageMetadata {
            width: data.len() as u32,
            height: 100,
            keywords: Vec::new(),
        })
    }
}

const MINUTE: Duration = Duration::from_secs(60);

fn setup() -> (MetadataIndex, Arc<GrowingStorage>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::from_unix(1_700_000_000));
    let cache = SwrCache::with_clock(100, clock.clone()).unwrap();
    let storage = Arc::new(GrowingStorage::default());
    let index = MetadataIndex::new(cache, storage.clone(), Arc::new(WidthFromLength)).with_policy(
        MetadataPolicy {
            ttl: MINUTE * 60,
            stale_after: MINUTE * 10,
        },
    );
    (index, storage, clock)
}

async fn wait_for_width(index: &MetadataIndex, key: &str, width: u32) {
    for _ in 0..1_000 {
        if index.cache().peek(key).map(|m| m.width) == Some(width) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("{key} never reached width {width}");
}

#[tokio::test]
async fn test_listing_serves_stale_metadata_then_refreshed_metadata() {
    let (index, storage, clock) = setup();
    let path = listing_path("albums/2024", "beach.jpg");
    assert_eq!(path, "albums/2024/beach.jpg");

    let first = index.metadata("photos.example.com", &path).await.unwrap();
    assert_eq!(first.width, 1);

    clock.advance(MINUTE * 5);
    assert_eq!(index.metadata("photos.example.com", &path).await.unwrap().width, 1);
    assert_eq!(storage.fetches.load(Ordering::SeqCst), 1);

    clock.advance(MINUTE * 10);
    assert_eq!(index.metadata("photos.example.com", &path).await.unwrap().width, 1);

    let key = format!("photos.example.com/{path}");
    wait_for_width(&index, &key, 2).await;
    assert_eq!(storage.fetches.load(Ordering::SeqCst), 2);
    assert_eq!(index.metadata("photos.example.com", &path).await.unwrap().width, 2);
}

#[tokio::test]
async fn test_expired_metadata_is_reloaded_before_returning() {
    let (index, storage, clock) = setup();

    index.metadata("photos.example.com", "a.png").await.unwrap();
    clock.advance(MINUTE * 60);

    let reloaded = index.metadata("photos.example.com", "a.png").await.unwrap();
    assert_eq!(reloaded.width, 2);
    assert_eq!(storage.fetches.load(Ordering::SeqCst), 2);
}
