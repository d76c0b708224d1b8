//! Cache system for shuto
//!
//! This crate provides:
//! - A bounded stale-while-revalidate cache with background refresh
//! - Image metadata lookups for directory listings built on top of it

pub mod entry;
pub mod errors;
pub mod metadata;
pub mod swr;

pub use entry::{CacheEntry, Freshness};
pub use errors::{CacheError, Result};
pub use metadata::{
    listing_path, ImageMetadata, MetadataExtractor, MetadataIndex, MetadataPolicy, ObjectFetcher,
};
pub use swr::SwrCache;
