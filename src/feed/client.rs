use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use super::wire::{FeedsResponse, RemoteSource, ValidateEnvelope, ValidateRequest, ValidateResponse};
use crate::config::Config;

/// Errors from talking to the feed-aggregation API.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Body was not the JSON shape the API documents
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Response body exceeded `max_response_bytes`
    #[error("Response too large")]
    ResponseTooLarge,
    /// Received fewer bytes than Content-Length announced
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// HTTP client for the remote feed source.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct FeedApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_response_bytes: usize,
}

impl FeedApi {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .user_agent(concat!("framefeed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
            max_response_bytes: config.max_response_bytes,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /feeds`: every subscribed source with its parsed feed contents.
    pub async fn fetch_sources(&self) -> Result<Vec<RemoteSource>, FetchError> {
        let url = format!("{}/feeds", self.base_url);
        let response: FeedsResponse = self.send_json(self.client.get(&url)).await?;
        tracing::debug!(sources = response.data.len(), "Fetched source list");
        Ok(response.data)
    }

    /// `POST /feeds/validate`: ask the remote side whether `feed_url` is a
    /// usable RSS/Atom feed.
    pub async fn validate_feed(&self, feed_url: &str) -> Result<ValidateResponse, FetchError> {
        let url = format!("{}/feeds/validate", self.base_url);
        let body = serde_json::to_vec(&ValidateRequest { feed_url })?;
        let request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        let envelope: ValidateEnvelope = self.send_json(request).await?;
        Ok(envelope.data)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = tokio::time::timeout(
            self.timeout,
            read_limited_bytes(response, self.max_response_bytes),
        )
        .await
        .map_err(|_| FetchError::Timeout)??;

        Ok(serde_json::from_slice(&bytes)?)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: refuse before reading when the header already says too much
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
