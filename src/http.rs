// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;

/// Default per-request timeout for probing remote audio files
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status and Content-Length of a probed remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Length header value, if present and numeric
    pub content_length: Option<u64>,
}

impl HeadResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Probe a URL without downloading its body
    async fn head(&self, url: &str) -> Result<HeadResponse, reqwest::Error>;
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with the default timeout
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a new ReqwestClient whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("podcastpal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Create a new ReqwestClient with a custom reqwest::Client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn head(&self, url: &str) -> Result<HeadResponse, reqwest::Error> {
        let response = self.client.head(url).send().await?;

        // `Response::content_length` reports the (empty) body size for HEAD,
        // so read the header itself.
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok());

        Ok(HeadResponse {
            status: response.status().as_u16(),
            content_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reqwest_client_can_be_created() {
        let _client = ReqwestClient::new().unwrap();
        let _client_short = ReqwestClient::with_timeout(Duration::from_millis(500)).unwrap();
    }

    #[test]
    fn reqwest_client_can_be_cloned() {
        let client = ReqwestClient::with_client(reqwest::Client::new());
        let _cloned = client.clone();
    }

    #[test]
    fn head_response_success_range() {
        let ok = HeadResponse {
            status: 206,
            content_length: Some(10),
        };
        let redirect = HeadResponse {
            status: 302,
            content_length: None,
        };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }
}
