use crate::error::SocketError;
use bytes::Bytes;
use reqwest::StatusCode;
use std::time::Duration;

/// Minimal REST client for public price endpoints.
///
/// Executes timeout-bounded HTTP GETs and hands the caller the status code plus the full
/// response payload, so the response body is consumed exactly once and parsing stays with
/// the venue data handler.
#[derive(Debug, Clone)]
pub struct RestClient {
    http_client: reqwest::Client,
}

impl RestClient {
    /// Construct a new [`Self`] with the provided per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, SocketError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SocketError::Http)?;

        Ok(Self { http_client })
    }

    /// Execute an HTTP GET against the provided url.
    ///
    /// Transport failures surface as [`SocketError::Http`] / [`SocketError::HttpTimeout`];
    /// non-success statuses are returned to the caller rather than treated as errors, as
    /// some venues encode meaningful failure payloads in them.
    pub async fn get(&self, url: &str) -> Result<(StatusCode, Bytes), SocketError> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        let payload = response.bytes().await?;

        Ok((status, payload))
    }
}
