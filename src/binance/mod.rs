//! Binance API integration
//!
//! REST client and response types for the public market-data endpoints.
//! The collector depends only on the [`DepthSource`] capability, not on
//! the concrete client, so any exchange (or a scripted fixture in tests)
//! can feed the pipeline.

pub mod client;
pub mod types;

pub use client::BinanceClient;
pub use types::{DepthResponse, ServerTimeResponse};

use crate::error::ApiError;
use async_trait::async_trait;

/// Read-only capability: fetch the current order book for a trading pair.
///
/// Levels come back as (price, quantity) string pairs sorted best-to-worst
/// on each side.
#[async_trait]
pub trait DepthSource: Send + Sync {
    async fn fetch_depth(&self, symbol: &str, depth: u32) -> Result<DepthResponse, ApiError>;
}
