// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::cache::{CacheEntry, FeedCache, RefreshSchedule};
use crate::error::BuildError;
use crate::feed::{build_feed, feed_owner, feed_self_url, resolve_many_with_timeout, select_visible};
use crate::http::{DEFAULT_TIMEOUT, HttpClient};
use crate::store::{Clock, Feed, FeedId};

/// Stand-in base URL for cached documents, swapped for the request's on the way out
const DOCUMENT_BASE_URL: &str = "http://podcastpal.invalid";

/// Options for feed generation
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Zone used for naive dates, recurrence and the refresh schedule
    pub time_zone: Tz,
    /// Daily wall-clock times at which cached documents go stale
    pub refresh_at: Vec<NaiveTime>,
    /// Per-request timeout for enclosure size probes
    pub size_timeout: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            time_zone: chrono_tz::America::Los_Angeles,
            refresh_at: vec![NaiveTime::from_hms_opt(3, 0, 0).unwrap_or_default()],
            size_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Produces RSS documents for stored feeds, serving them from cache while fresh
pub struct FeedService {
    client: Arc<dyn HttpClient>,
    cache: Arc<dyn FeedCache>,
    clock: Arc<dyn Clock>,
    schedule: RefreshSchedule,
    time_zone: Tz,
    size_timeout: Duration,
}

impl FeedService {
    pub fn new(
        client: Arc<dyn HttpClient>,
        cache: Arc<dyn FeedCache>,
        clock: Arc<dyn Clock>,
        options: FeedOptions,
    ) -> Self {
        Self {
            client,
            cache,
            clock,
            schedule: RefreshSchedule::daily(options.time_zone, options.refresh_at),
            time_zone: options.time_zone,
            size_timeout: options.size_timeout,
        }
    }

    /// Document for `feed` as served under `base_url`, from cache while fresh
    pub async fn generate_feed(&self, feed: &Feed, base_url: &str) -> Result<String, BuildError> {
        let now = self.clock.now_in(self.time_zone);
        self.get_or_build(feed, now, base_url).await
    }

    /// Build a fresh document without reading or writing the cache.
    ///
    /// The next cached read still goes by the last cached build.
    pub async fn force_regenerate(
        &self,
        feed: &Feed,
        base_url: &str,
    ) -> Result<String, BuildError> {
        tracing::info!(feed_id = feed.id, slug = %feed.url_slug, "Forced feed rebuild");
        let document = self.render(feed, self.clock.now_in(self.time_zone)).await?;
        Ok(with_base_url(&document, base_url))
    }

    /// Drop the cached document after the feed or its episodes change
    pub fn invalidate(&self, feed_id: FeedId) {
        self.cache.invalidate(feed_id);
    }

    /// Serve from cache unless stale at `now`; otherwise build and store.
    ///
    /// The cached document does not depend on the request, so one entry
    /// serves every host. A failed build leaves the cache untouched.
    pub async fn get_or_build(
        &self,
        feed: &Feed,
        now: DateTime<Tz>,
        base_url: &str,
    ) -> Result<String, BuildError> {
        let now_utc = now.with_timezone(&Utc);

        if let Some(entry) = self.cache.get(feed.id) {
            if !self.schedule.is_stale(entry.generated_at, now_utc) {
                tracing::debug!(
                    feed_id = feed.id,
                    generated_at = %entry.generated_at,
                    "Feed cache hit"
                );
                return Ok(with_base_url(&entry.content, base_url));
            }
            tracing::debug!(
                feed_id = feed.id,
                generated_at = %entry.generated_at,
                "Cached feed is stale"
            );
        }

        let content: Arc<str> = Arc::from(self.render(feed, now).await?);
        self.cache.put(
            feed.id,
            CacheEntry {
                generated_at: now_utc,
                content: content.clone(),
            },
        );
        tracing::info!(feed_id = feed.id, slug = %feed.url_slug, "Feed rebuilt and cached");

        Ok(with_base_url(&content, base_url))
    }

    async fn render(&self, feed: &Feed, now: DateTime<Tz>) -> Result<String, BuildError> {
        // Fail before any network work when the document cannot be produced.
        feed_owner(feed)?;

        let visible = select_visible(&feed.episodes, now);
        tracing::debug!(
            feed_id = feed.id,
            stored = feed.episodes.len(),
            visible = visible.len(),
            "Selected visible episodes"
        );

        let sizes = resolve_many_with_timeout(
            self.client.as_ref(),
            visible.iter().map(|v| v.episode),
            self.size_timeout,
        )
        .await;

        build_feed(
            feed,
            &visible,
            &sizes,
            &feed_self_url(DOCUMENT_BASE_URL, &feed.url_slug),
            now,
        )
    }
}

/// Point a rendered document's self links at `base_url`
fn with_base_url(document: &str, base_url: &str) -> String {
    let base_url = html_escape::encode_quoted_attribute(base_url.trim_end_matches('/'));
    document.replace(DOCUMENT_BASE_URL, &base_url)
}
