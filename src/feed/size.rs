use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;

use crate::http::{DEFAULT_TIMEOUT, HttpClient};
use crate::store::{Episode, EpisodeId};

use super::normalize::normalize;

/// Number of size probes in flight at once
pub const SIZE_RESOLVER_CONCURRENCY: usize = 5;

/// Sentinel length used when a size cannot be determined
pub const UNKNOWN_SIZE: &str = "0";

/// Enclosure lengths keyed by episode, joined back by identity rather than position
pub type EnclosureSizes = HashMap<EpisodeId, String>;

/// Fetch the byte length of a remote file as a decimal string.
///
/// Every failure (timeout, transport error, non-2xx status, missing or
/// unparsable Content-Length) yields `"0"`.
pub async fn resolve_size<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    timeout: Duration,
) -> String {
    match tokio::time::timeout(timeout, client.head(url)).await {
        Ok(Ok(response)) if response.is_success() => match response.content_length {
            Some(length) => length.to_string(),
            None => {
                tracing::debug!(url, "No Content-Length in response");
                UNKNOWN_SIZE.to_string()
            }
        },
        Ok(Ok(response)) => {
            tracing::warn!(url, status = response.status, "Size probe returned an error status");
            UNKNOWN_SIZE.to_string()
        }
        Ok(Err(e)) => {
            tracing::warn!(url, error = %e, "Size probe failed");
            UNKNOWN_SIZE.to_string()
        }
        Err(_) => {
            tracing::warn!(url, timeout_ms = timeout.as_millis() as u64, "Size probe timed out");
            UNKNOWN_SIZE.to_string()
        }
    }
}

/// Resolve enclosure sizes for many episodes with bounded concurrency.
///
/// The returned map covers every input episode; probes are made against the
/// normalized audio URL. Completion order does not matter.
pub async fn resolve_many<'a, C, I>(client: &C, episodes: I) -> EnclosureSizes
where
    C: HttpClient + ?Sized,
    I: IntoIterator<Item = &'a Episode>,
{
    resolve_many_with_timeout(client, episodes, DEFAULT_TIMEOUT).await
}

/// Same as [`resolve_many`] with an explicit per-request timeout
pub async fn resolve_many_with_timeout<'a, C, I>(
    client: &C,
    episodes: I,
    timeout: Duration,
) -> EnclosureSizes
where
    C: HttpClient + ?Sized,
    I: IntoIterator<Item = &'a Episode>,
{
    let targets: Vec<(EpisodeId, String)> = episodes
        .into_iter()
        .map(|episode| (episode.id, normalize(&episode.audio_url)))
        .collect();

    let mut sizes: EnclosureSizes = targets
        .iter()
        .map(|(id, _)| (*id, UNKNOWN_SIZE.to_string()))
        .collect();

    let resolved: Vec<(EpisodeId, String)> = futures::stream::iter(targets)
        .map(|(id, url)| async move {
            if url.is_empty() {
                return (id, UNKNOWN_SIZE.to_string());
            }
            (id, resolve_size(client, &url, timeout).await)
        })
        .buffer_unordered(SIZE_RESOLVER_CONCURRENCY)
        .collect()
        .await;

    sizes.extend(resolved);
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HeadResponse, ReqwestClient};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a fixed table; unknown URLs hang until the timeout.
    struct MockHttpClient {
        responses: HashMap<String, HeadResponse>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockHttpClient {
        fn new(responses: &[(&str, u16, Option<u64>)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(url, status, content_length)| {
                        (
                            url.to_string(),
                            HeadResponse {
                                status: *status,
                                content_length: *content_length,
                            },
                        )
                    })
                    .collect(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn head(&self, url: &str) -> Result<HeadResponse, reqwest::Error> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;

            let response = match self.responses.get(url) {
                Some(response) => *response,
                None => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    HeadResponse {
                        status: 200,
                        content_length: Some(1),
                    }
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(response)
        }
    }

    fn episode(id: i64, audio_url: &str) -> Episode {
        Episode {
            id,
            title: format!("Episode {id}"),
            description: None,
            audio_url: audio_url.to_string(),
            release_date: Utc::now(),
            is_recurring: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn resolve_size_reads_content_length() {
        let client = MockHttpClient::new(&[("https://a.example/ep.mp3", 200, Some(1234567))]);
        let size = resolve_size(&client, "https://a.example/ep.mp3", DEFAULT_TIMEOUT).await;
        assert_eq!(size, "1234567");
    }

    #[tokio::test]
    async fn resolve_size_maps_failures_to_zero() {
        let client = MockHttpClient::new(&[
            ("https://a.example/missing.mp3", 404, Some(10)),
            ("https://a.example/nolength.mp3", 200, None),
        ]);
        assert_eq!(
            resolve_size(&client, "https://a.example/missing.mp3", DEFAULT_TIMEOUT).await,
            "0"
        );
        assert_eq!(
            resolve_size(&client, "https://a.example/nolength.mp3", DEFAULT_TIMEOUT).await,
            "0"
        );
    }

    #[tokio::test]
    async fn resolve_size_times_out_to_zero() {
        let client = MockHttpClient::new(&[]);
        let size = resolve_size(
            &client,
            "https://slow.example/ep.mp3",
            Duration::from_millis(50),
        )
        .await;
        assert_eq!(size, "0");
    }

    #[tokio::test]
    async fn resolve_size_maps_connection_errors_to_zero() {
        // Nothing listens on port 1, so the connection is refused.
        let timeout = Duration::from_secs(2);
        let client = ReqwestClient::with_timeout(timeout).unwrap();

        let size = resolve_size(&client, "http://127.0.0.1:1/ep.mp3", timeout).await;

        assert_eq!(size, "0");
    }

    #[tokio::test]
    async fn resolve_many_covers_every_episode() {
        let client = MockHttpClient::new(&[
            ("https://dl.dropboxusercontent.com/s/abc/one.mp3", 200, Some(100)),
            ("https://a.example/two.mp3", 200, Some(200)),
        ]);
        let episodes = vec![
            episode(1, "https://www.dropbox.com/s/abc/one.mp3?dl=0"),
            episode(2, "https://a.example/two.mp3"),
            episode(3, "https://slow.example/three.mp3"),
            episode(4, ""),
        ];

        let sizes = resolve_many_with_timeout(&client, &episodes, Duration::from_millis(100)).await;

        assert_eq!(sizes.len(), 4);
        assert_eq!(sizes[&1], "100");
        assert_eq!(sizes[&2], "200");
        assert_eq!(sizes[&3], "0");
        assert_eq!(sizes[&4], "0");
    }

    #[tokio::test]
    async fn resolve_many_bounds_concurrency() {
        let urls: Vec<String> = (0..20).map(|i| format!("https://a.example/{i}.mp3")).collect();
        let table: Vec<(&str, u16, Option<u64>)> = urls
            .iter()
            .map(|url| (url.as_str(), 200, Some(1)))
            .collect();
        let client = MockHttpClient::new(&table);
        let episodes: Vec<Episode> = urls
            .iter()
            .enumerate()
            .map(|(i, url)| episode(i as i64, url))
            .collect();

        let sizes = resolve_many(&client, &episodes).await;

        assert_eq!(sizes.len(), 20);
        assert!(client.max_in_flight.load(Ordering::SeqCst) <= SIZE_RESOLVER_CONCURRENCY);
    }
}
