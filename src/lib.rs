pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod http;
pub mod server;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use cache::{CacheEntry, FeedCache, MemoryCache, RefreshSchedule};
pub use config::{Args, Config};
pub use error::{BuildError, ServerError, StoreError};
pub use feed::{VisibleEpisode, build_feed, normalize, resolve_many, resolve_size, select_visible};
pub use http::{HeadResponse, HttpClient, ReqwestClient};
pub use server::{AppState, create_router, serve};
pub use service::{FeedOptions, FeedService};
pub use store::{Clock, Episode, Feed, FeedRepository, MemoryRepository, Owner, SystemClock};
