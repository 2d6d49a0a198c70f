use chrono::{DateTime, Utc};

pub type FeedId = i64;
pub type EpisodeId = i64;

/// The user a feed belongs to, as shown in author tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    pub email: String,
}

impl Owner {
    /// Both name and email are present
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// A stored podcast feed with its episodes
#[derive(Debug, Clone)]
pub struct Feed {
    pub id: FeedId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub website_url: Option<String>,
    /// Globally unique, the only public identifier of the feed
    pub url_slug: String,
    pub owner: Option<Owner>,
    pub created_at: DateTime<Utc>,
    pub episodes: Vec<Episode>,
}

/// A stored episode
#[derive(Debug, Clone)]
pub struct Episode {
    pub id: EpisodeId,
    pub title: String,
    pub description: Option<String>,
    /// Share link as entered by the user (Dropbox, Google Drive, or direct)
    pub audio_url: String,
    /// Always an absolute instant; naive input is localized when stored
    pub release_date: DateTime<Utc>,
    pub is_recurring: bool,
    pub created_at: DateTime<Utc>,
}

/// Derive a URL slug from a feed name
///
/// Lower-cases ASCII letters and digits and collapses every other run of
/// characters into a single dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
