use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use clap::Parser;
use url::Url;

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::service::FeedOptions;

/// Serve podcast RSS feeds for externally hosted audio
#[derive(Parser, Debug)]
#[command(name = "podcastpal")]
#[command(about = "Serve podcast RSS feeds for externally hosted audio")]
#[command(version)]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "PODCASTPAL_LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// JSON file with users, feeds and episodes
    #[arg(long, env = "PODCASTPAL_DATA")]
    pub data: PathBuf,

    /// IANA time zone for release dates and refresh times
    #[arg(
        long,
        env = "PODCASTPAL_TIME_ZONE",
        default_value = "America/Los_Angeles",
        value_parser = parse_time_zone
    )]
    pub time_zone: Tz,

    /// Daily HH:MM times at which cached feeds are rebuilt
    #[arg(
        long,
        env = "PODCASTPAL_REFRESH_AT",
        default_value = "03:00",
        value_delimiter = ',',
        value_parser = parse_refresh_time
    )]
    pub refresh_at: Vec<NaiveTime>,

    /// Seconds to wait for each enclosure size probe
    #[arg(long, env = "PODCASTPAL_SIZE_TIMEOUT_SECS", default_value = "10")]
    pub size_timeout_secs: u64,

    /// Canonical public base URL (default: taken from the request Host header)
    #[arg(long, env = "PODCASTPAL_PUBLIC_URL", value_parser = parse_public_url)]
    pub public_url: Option<String>,

    /// Maximum number of feed documents kept in memory
    #[arg(long, env = "PODCASTPAL_CACHE_CAPACITY", default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: usize,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub data: PathBuf,
    pub public_url: Option<String>,
    pub cache_capacity: usize,
    pub feed: FeedOptions,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            listen: args.listen,
            data: args.data,
            public_url: args.public_url,
            cache_capacity: args.cache_capacity,
            feed: FeedOptions {
                time_zone: args.time_zone,
                refresh_at: args.refresh_at,
                size_timeout: Duration::from_secs(args.size_timeout_secs),
            },
        }
    }
}

fn parse_time_zone(value: &str) -> Result<Tz, String> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|e| format!("unknown time zone '{value}': {e}"))
}

fn parse_refresh_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| format!("expected HH:MM, got '{value}': {e}"))
}

fn parse_public_url(value: &str) -> Result<String, String> {
    let url = Url::parse(value).map_err(|e| format!("invalid URL '{value}': {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("public URL must be http or https, got '{value}'"));
    }
    Ok(value.trim_end_matches('/').to_string())
}
