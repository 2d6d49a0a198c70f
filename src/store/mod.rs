mod clock;
mod model;
mod repository;
mod seed;

pub use clock::{Clock, FixedClock, SystemClock, localize};
pub use model::{Episode, EpisodeId, Feed, FeedId, Owner, slugify};
pub use repository::{FeedRepository, MemoryRepository};
pub use seed::parse_release_date;
