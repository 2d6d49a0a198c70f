use std::path::PathBuf;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Errors that abort the construction of a whole feed document
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Feed '{feed}' has no owner name or email; an author is required")]
    MissingOwner { feed: String },

    #[error("Failed to serialize RSS document: {0}")]
    Serialize(#[from] rss::Error),

    #[error("Serialized RSS document is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),
}

/// Errors raised while loading or querying stored feeds
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read feed data {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse feed data JSON in {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Episode {episode_id} has an unreadable release date '{value}'")]
    InvalidReleaseDate { episode_id: i64, value: String },

    #[error("Feed slug '{0}' is used more than once")]
    DuplicateSlug(String),
}

/// Errors surfaced at the HTTP boundary
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("No feed with slug '{0}'")]
    FeedNotFound(String),

    #[error("Feed build failed: {0}")]
    Build(#[from] BuildError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server terminated: {0}")]
    Serve(#[source] std::io::Error),
}
