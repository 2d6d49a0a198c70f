mod build;
mod normalize;
mod size;
mod visibility;

pub use build::{build_feed, feed_owner, feed_self_url};
pub use normalize::normalize;
pub use size::{
    EnclosureSizes, SIZE_RESOLVER_CONCURRENCY, UNKNOWN_SIZE, resolve_many,
    resolve_many_with_timeout, resolve_size,
};
pub use visibility::{
    DISPLAY_WINDOW_DAYS, MAX_FEED_ITEMS, RECURRENCE_HORIZON_DAYS, VisibleEpisode,
    effective_release, roll_recurring, select_visible,
};
