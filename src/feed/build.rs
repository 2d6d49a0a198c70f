// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use rss::extension::atom::{AtomExtension, Link};
use rss::extension::itunes::{
    ITunesCategory, ITunesChannelExtension, ITunesItemExtension, ITunesOwner,
};
use rss::{Channel, Enclosure, Guid, Image, Item};
use url::Url;

use crate::error::BuildError;
use crate::store::{Feed, Owner};

use super::normalize::normalize;
use super::size::{EnclosureSizes, UNKNOWN_SIZE};
use super::visibility::VisibleEpisode;

const ITUNES_NAMESPACE: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";
const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

const LANGUAGE: &str = "en-us";
const CATEGORY: &str = "Arts";
const AUDIO_MIME_TYPE: &str = "audio/mpeg";
const RSS_MIME_TYPE: &str = "application/rss+xml";
const EMPTY_CHANNEL_LINK: &str = "<link></link>";

/// Canonical public URL of a feed's RSS document
pub fn feed_self_url(base_url: &str, slug: &str) -> String {
    format!("{}/feed/{}/rss", base_url.trim_end_matches('/'), slug)
}

/// Render a feed and its visible episodes as an RSS 2.0 podcast document.
///
/// `episodes` must already be filtered and ordered; they are emitted as
/// given. Enclosure lengths come from `sizes`, defaulting to `"0"`.
/// Episodes without a title or audio URL are skipped. A feed without a
/// complete owner cannot be rendered at all.
pub fn build_feed(
    feed: &Feed,
    episodes: &[VisibleEpisode<'_>],
    sizes: &EnclosureSizes,
    self_url: &str,
    now: DateTime<Tz>,
) -> Result<String, BuildError> {
    let owner = feed_owner(feed)?;

    let mut channel = Channel::default();
    channel.set_namespaces(namespaces());
    channel.set_title(feed.name.clone());
    channel.set_description(feed.description.clone().unwrap_or_default());
    channel.set_language(LANGUAGE.to_string());
    channel.set_copyright(format!("© {} {}", now.year(), feed.name));
    channel.set_last_build_date(now.to_rfc2822());

    let website = feed
        .website_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty());
    if let Some(website) = website {
        channel.set_link(website.to_string());
    }

    let image_url = feed
        .image_url
        .as_deref()
        .and_then(|url| podcast_image(feed, url));
    if let Some(ref image_url) = image_url {
        let mut image = Image::default();
        image.set_url(image_url.clone());
        image.set_title(feed.name.clone());
        image.set_link(website.unwrap_or(self_url).to_string());
        channel.set_image(image);
    }

    channel.set_itunes_ext(channel_itunes(owner, image_url));
    channel.set_atom_ext(self_link(self_url));

    let items: Vec<Item> = episodes
        .iter()
        .filter_map(|visible| episode_item(visible, sizes))
        .collect();
    channel.set_items(items);

    let bytes = channel.write_to(Vec::new())?;
    let xml = String::from_utf8(bytes)?;

    // The writer always emits the required channel <link>, even when empty.
    Ok(match website {
        Some(_) => xml,
        None => xml.replacen(EMPTY_CHANNEL_LINK, "", 1),
    })
}

/// The feed's owner, required for the author tags
pub fn feed_owner(feed: &Feed) -> Result<&Owner, BuildError> {
    feed.owner
        .as_ref()
        .filter(|owner| owner.is_complete())
        .ok_or_else(|| BuildError::MissingOwner {
            feed: feed.url_slug.clone(),
        })
}

fn namespaces() -> BTreeMap<String, String> {
    [
        ("itunes", ITUNES_NAMESPACE),
        ("content", CONTENT_NAMESPACE),
        ("atom", ATOM_NAMESPACE),
    ]
    .into_iter()
    .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
    .collect()
}

fn channel_itunes(owner: &Owner, image_url: Option<String>) -> ITunesChannelExtension {
    let mut category = ITunesCategory::default();
    category.set_text(CATEGORY);

    let mut itunes_owner = ITunesOwner::default();
    itunes_owner.set_name(owner.name.clone());
    itunes_owner.set_email(owner.email.clone());

    let mut itunes = ITunesChannelExtension::default();
    itunes.set_author(owner.name.clone());
    itunes.set_owner(itunes_owner);
    itunes.set_categories(vec![category]);
    itunes.set_image(image_url);
    itunes
}

fn self_link(self_url: &str) -> AtomExtension {
    let mut link = Link::default();
    link.set_href(self_url);
    link.set_rel("self");
    link.set_mime_type(RSS_MIME_TYPE.to_string());

    let mut atom = AtomExtension::default();
    atom.set_links(vec![link]);
    atom
}

/// Normalized image URL, or `None` (logged) when it cannot be used
fn podcast_image(feed: &Feed, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let normalized = normalize(raw);
    match Url::parse(&normalized) {
        Ok(_) => Some(normalized),
        Err(e) => {
            tracing::warn!(
                feed = %feed.url_slug,
                url = raw,
                error = %e,
                "Skipping unusable podcast image"
            );
            None
        }
    }
}

fn episode_item(visible: &VisibleEpisode<'_>, sizes: &EnclosureSizes) -> Option<Item> {
    let episode = visible.episode;
    let title = episode.title.trim();
    let audio_url = episode.audio_url.trim();

    if title.is_empty() || audio_url.is_empty() {
        tracing::warn!(
            episode_id = episode.id,
            title = %episode.title,
            "Skipping episode without a title or audio URL"
        );
        return None;
    }

    let description = episode.description.clone().unwrap_or_default();

    let mut itunes = ITunesItemExtension::default();
    itunes.set_summary(description.clone());

    // The year suffix gives each yearly occurrence of a recurring episode its own guid.
    let mut guid = Guid::default();
    guid.set_value(format!("episode_{}_{}", episode.id, visible.effective_date.year()));
    guid.set_permalink(false);

    let mut item = Item::default();
    item.set_title(title.to_string());
    item.set_description(description);
    item.set_itunes_ext(itunes);
    item.set_pub_date(visible.effective_date.to_rfc2822());
    item.set_guid(guid);

    let enclosure_url = normalize(audio_url);
    match Url::parse(&enclosure_url) {
        Ok(_) => {
            let length = sizes
                .get(&episode.id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_SIZE.to_string());

            let mut enclosure = Enclosure::default();
            enclosure.set_url(enclosure_url);
            enclosure.set_mime_type(AUDIO_MIME_TYPE);
            enclosure.set_length(length);
            item.set_enclosure(enclosure);
        }
        Err(e) => {
            tracing::warn!(
                episode_id = episode.id,
                title = %episode.title,
                url = audio_url,
                error = %e,
                "Audio URL is not a valid URL; omitting enclosure"
            );
        }
    }

    Some(item)
}
