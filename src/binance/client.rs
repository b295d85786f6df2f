//! Binance HTTP Client
//!
//! HTTP client wrapper for making requests to the Binance REST API.
//! Provides timeout configuration, user-agent headers, and rate-limit
//! backoff for the server-time probe.

use crate::binance::types::{DepthResponse, ServerTimeResponse};
use crate::binance::DepthSource;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Binance REST API HTTP client
///
/// Wraps reqwest::Client with Binance-specific configuration including
/// timeouts, base URL, and user-agent headers. Public endpoints only;
/// the pipeline never writes to the exchange.
#[derive(Clone, Debug)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

impl BinanceClient {
    /// Creates a new Binance client with default settings
    ///
    /// Default configuration:
    /// - Base URL: https://api.binance.com
    /// - Timeout: 10 seconds
    pub fn new() -> Result<Self, ApiError> {
        Self::with_timeout(Duration::from_secs(10))
    }

    /// Creates a new Binance client with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("microlab/0.1.0")
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: "https://api.binance.com".to_string(),
        })
    }

    /// Overrides the base URL (testnets, mirrors)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches current Binance server time
    ///
    /// Calls GET /api/v3/time and returns the server timestamp in
    /// milliseconds. Implements exponential backoff for rate limit (429)
    /// responses with up to 3 retries; used at startup to verify the
    /// exchange is reachable before any collection begins.
    pub async fn get_server_time(&self) -> Result<i64, ApiError> {
        let url = format!("{}/api/v3/time", self.base_url);
        let max_retries = 3;
        let mut retry_count = 0;

        loop {
            let resp = self.client.get(&url).send().await?;
            let status = resp.status();

            // Handle 429 rate limit with exponential backoff
            if status.as_u16() == 429 {
                if retry_count >= max_retries {
                    return Err(ApiError::RateLimited(format!(
                        "Rate limit exceeded after {} retries. Wait 60 seconds before retrying.",
                        max_retries
                    )));
                }

                // Parse Retry-After header if present, otherwise backoff 1s, 2s, 4s
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or_else(|| 2_u64.pow(retry_count));

                tracing::warn!(
                    "Rate limit hit (429). Retry {} of {}. Waiting {}s before retry.",
                    retry_count + 1,
                    max_retries,
                    retry_after
                );

                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                return Err(ApiError::from(resp.error_for_status().unwrap_err()));
            }

            let server_time: ServerTimeResponse = resp.json().await?;

            if !server_time.is_valid() {
                return Err(ApiError::Parse(format!(
                    "Invalid server time received: {}",
                    server_time.server_time
                )));
            }

            return Ok(server_time.time_ms());
        }
    }

    /// Get order book depth
    ///
    /// Calls GET /api/v3/depth
    ///
    /// # Arguments
    /// * `symbol` - Trading pair symbol (e.g., "BTCUSDT")
    /// * `limit` - Levels per side (valid: 5, 10, 20, 50, 100, 500, 1000, 5000)
    pub async fn get_depth(&self, symbol: &str, limit: u32) -> Result<DepthResponse, ApiError> {
        let url = format!(
            "{}/api/v3/depth?symbol={}&limit={}",
            self.base_url, symbol, limit
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::from(response.error_for_status().unwrap_err()));
        }

        let depth: DepthResponse = response.json().await?;
        Ok(depth)
    }
}

#[async_trait]
impl DepthSource for BinanceClient {
    async fn fetch_depth(&self, symbol: &str, depth: u32) -> Result<DepthResponse, ApiError> {
        // Binance only accepts fixed limit values; round the requested
        // depth up to the next valid bucket.
        let limit = [5u32, 10, 20, 50, 100, 500, 1000, 5000]
            .into_iter()
            .find(|&l| l >= depth)
            .unwrap_or(5000);

        self.get_depth(symbol, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let client = BinanceClient::new().unwrap();
        assert_eq!(client.base_url(), "https://api.binance.com");
    }

    #[test]
    fn test_base_url_override() {
        let client = BinanceClient::new()
            .unwrap()
            .with_base_url("https://testnet.binance.vision");
        assert_eq!(client.base_url(), "https://testnet.binance.vision");
    }
}
