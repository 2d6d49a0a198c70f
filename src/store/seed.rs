// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::StoreError;

use super::clock::localize;
use super::model::{Episode, Feed, Owner, slugify};

/// Naive formats accepted for release dates, tried in order
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Serialized form of the feed data file
#[derive(Debug, Deserialize)]
pub(super) struct SeedFile {
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SeedUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub feeds: Vec<SeedFeed>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SeedFeed {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub url_slug: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub episodes: Vec<SeedEpisode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SeedEpisode {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub audio_url: String,
    pub release_date: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl SeedFile {
    /// Convert the file into stored feeds, localizing naive dates in `tz`
    pub fn into_feeds(self, tz: Tz, loaded_at: DateTime<Utc>) -> Result<Vec<Feed>, StoreError> {
        let mut feeds = Vec::new();

        for user in self.users {
            let owner = Owner {
                name: user.name,
                email: user.email,
            };

            for feed in user.feeds {
                let episodes = feed
                    .episodes
                    .into_iter()
                    .map(|episode| episode.into_episode(tz, loaded_at))
                    .collect::<Result<Vec<_>, _>>()?;

                let url_slug = feed
                    .url_slug
                    .filter(|slug| !slug.trim().is_empty())
                    .unwrap_or_else(|| slugify(&feed.name));

                feeds.push(Feed {
                    id: feed.id,
                    name: feed.name,
                    description: feed.description,
                    image_url: feed.image_url,
                    website_url: feed.website_url,
                    url_slug,
                    owner: Some(owner.clone()),
                    created_at: feed.created_at.unwrap_or(loaded_at),
                    episodes,
                });
            }
        }

        Ok(feeds)
    }
}

impl SeedEpisode {
    fn into_episode(self, tz: Tz, loaded_at: DateTime<Utc>) -> Result<Episode, StoreError> {
        let release_date = parse_release_date(&self.release_date, tz).ok_or_else(|| {
            StoreError::InvalidReleaseDate {
                episode_id: self.id,
                value: self.release_date.clone(),
            }
        })?;

        Ok(Episode {
            id: self.id,
            title: self.title,
            description: self.description,
            audio_url: self.audio_url,
            release_date,
            is_recurring: self.is_recurring,
            created_at: self.created_at.unwrap_or(loaded_at),
        })
    }
}

/// Parse a stored release date into an absolute instant
///
/// Values with an explicit offset (RFC 3339) are taken as-is. Naive values,
/// including bare dates, are wall-clock times in `tz`.
pub fn parse_release_date(value: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    Some(localize(tz, naive).with_timezone(&Utc))
}
