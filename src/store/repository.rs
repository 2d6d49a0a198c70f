use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;

use crate::error::StoreError;

use super::model::Feed;
use super::seed::SeedFile;

/// Read access to stored feeds
#[async_trait]
pub trait FeedRepository: Send + Sync {
    /// Look up a feed (with its episodes) by its public slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Arc<Feed>>, StoreError>;
}

/// Feed repository held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    feeds: HashMap<String, Arc<Feed>>,
}

impl MemoryRepository {
    /// Index feeds by slug, rejecting duplicate slugs
    pub fn new(feeds: Vec<Feed>) -> Result<Self, StoreError> {
        let mut by_slug = HashMap::with_capacity(feeds.len());
        for feed in feeds {
            if by_slug.contains_key(&feed.url_slug) {
                return Err(StoreError::DuplicateSlug(feed.url_slug));
            }
            by_slug.insert(feed.url_slug.clone(), Arc::new(feed));
        }
        Ok(Self { feeds: by_slug })
    }

    /// Load feeds from a JSON data file, localizing naive dates in `tz`
    pub fn from_json_file(path: &Path, tz: Tz) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path).map_err(|e| StoreError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let seed: SeedFile = serde_json::from_slice(&bytes).map_err(|e| StoreError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::new(seed.into_feeds(tz, Utc::now())?)
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

#[async_trait]
impl FeedRepository for MemoryRepository {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Arc<Feed>>, StoreError> {
        Ok(self.feeds.get(slug).map(Arc::clone))
    }
}
