//! Binance API Type Definitions
//!
//! Type definitions for the REST endpoints the pipeline touches.
//! Prices and quantities arrive as strings and stay strings here;
//! numeric conversion happens when a snapshot is derived.

use serde::{Deserialize, Serialize};

/// Response from Binance /api/v3/time endpoint
///
/// Returns the current server time in milliseconds since Unix epoch.
/// Used as the startup reachability probe before collection begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTimeResponse {
    /// Server time in milliseconds since Unix epoch
    pub server_time: i64,
}

impl ServerTimeResponse {
    /// Validates the server time is within reasonable bounds
    ///
    /// Returns true if server_time is positive (after Unix epoch).
    pub fn is_valid(&self) -> bool {
        self.server_time > 0
    }

    /// Returns the server time as milliseconds since Unix epoch
    pub fn time_ms(&self) -> i64 {
        self.server_time
    }
}

/// Response from Binance /api/v3/depth endpoint
///
/// Bid levels are sorted best (highest) first, ask levels best (lowest)
/// first, exactly as Binance returns them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthResponse {
    /// Binance update ID for this snapshot
    pub last_update_id: i64,

    /// Bid levels as (price, quantity) string pairs, best first
    pub bids: Vec<(String, String)>,

    /// Ask levels as (price, quantity) string pairs, best first
    pub asks: Vec<(String, String)>,
}

impl DepthResponse {
    /// Best bid price, parsed. None if the bid side is empty or unparsable.
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().and_then(|(p, _)| p.parse().ok())
    }

    /// Best ask price, parsed. None if the ask side is empty or unparsable.
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().and_then(|(p, _)| p.parse().ok())
    }
}
