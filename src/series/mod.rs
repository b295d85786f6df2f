//! Snapshot series data model
//!
//! A [`Snapshot`] is one derived orderbook observation; a [`Series`] is an
//! ordered run of snapshots for a single symbol, sampled at an approximately
//! fixed interval (gaps from failed polls are permitted).

pub mod storage;

use crate::binance::DepthResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One orderbook observation with derived microstructure metrics.
///
/// Immutable once recorded. `imbalance` is only defined when the book had
/// volume on at least one side; a both-sides-empty aggregate leaves it None
/// rather than forcing a zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Observation time (UTC)
    pub timestamp: DateTime<Utc>,

    /// Midpoint of best bid/ask
    pub mid_price: f64,

    /// Best ask minus best bid
    pub spread: f64,

    /// Spread in basis points: (spread / best_bid) * 10000
    pub spread_bps: f64,

    /// Sum of bid quantities over the top N levels
    pub bid_volume: f64,

    /// Sum of ask quantities over the top N levels
    pub ask_volume: f64,

    /// (bid_volume - ask_volume) / (bid_volume + ask_volume), in [-1, 1].
    /// None when total volume is zero.
    pub imbalance: Option<f64>,
}

impl Snapshot {
    /// Derive a snapshot from a raw depth response, aggregating the top
    /// `depth` levels per side.
    ///
    /// Returns None for a degenerate book (either side empty, unparsable or
    /// non-positive best prices); the caller treats that poll as failed.
    pub fn from_depth(timestamp: DateTime<Utc>, depth_resp: &DepthResponse, depth: usize) -> Option<Self> {
        let best_bid = depth_resp.best_bid()?;
        let best_ask = depth_resp.best_ask()?;

        if best_bid <= 0.0 || best_ask <= 0.0 {
            return None;
        }

        let bid_volume = sum_quantities(&depth_resp.bids, depth);
        let ask_volume = sum_quantities(&depth_resp.asks, depth);

        let spread = best_ask - best_bid;
        let mid_price = (best_bid + best_ask) / 2.0;
        let spread_bps = (spread / best_bid) * 10_000.0;

        let total_volume = bid_volume + ask_volume;
        let imbalance = if total_volume > 0.0 {
            Some((bid_volume - ask_volume) / total_volume)
        } else {
            None
        };

        Some(Self {
            timestamp,
            mid_price,
            spread,
            spread_bps,
            bid_volume,
            ask_volume,
            imbalance,
        })
    }
}

/// Sum parsed quantities over the top `depth` levels of one side.
/// Unparsable or negative quantities are skipped.
fn sum_quantities(levels: &[(String, String)], depth: usize) -> f64 {
    levels
        .iter()
        .take(depth)
        .filter_map(|(_, qty)| qty.parse::<f64>().ok())
        .filter(|q| *q >= 0.0)
        .sum()
}

/// Ordered sequence of snapshots for one symbol, strictly increasing by
/// timestamp. Owned by the pipeline run that produced it.
#[derive(Debug, Clone, Default)]
pub struct Series {
    pub symbol: String,
    pub snapshots: Vec<Snapshot>,
}

impl Series {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            snapshots: Vec::new(),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        debug_assert!(
            self.snapshots
                .last()
                .map_or(true, |prev| prev.timestamp < snapshot.timestamp),
            "snapshots must be strictly increasing by timestamp"
        );
        self.snapshots.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Mid-prices in observation order
    pub fn mid_prices(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.mid_price).collect()
    }

    /// Imbalances in observation order (None where undefined)
    pub fn imbalances(&self) -> Vec<Option<f64>> {
        self.snapshots.iter().map(|s| s.imbalance).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth_fixture() -> DepthResponse {
        DepthResponse {
            last_update_id: 1,
            bids: vec![
                ("100.0".to_string(), "2.0".to_string()),
                ("99.0".to_string(), "3.0".to_string()),
            ],
            asks: vec![
                ("101.0".to_string(), "1.0".to_string()),
                ("102.0".to_string(), "4.0".to_string()),
            ],
        }
    }

    #[test]
    fn test_snapshot_from_depth() {
        let snap = Snapshot::from_depth(Utc::now(), &depth_fixture(), 2).unwrap();
        assert_eq!(snap.mid_price, 100.5);
        assert_eq!(snap.spread, 1.0);
        assert_eq!(snap.bid_volume, 5.0);
        assert_eq!(snap.ask_volume, 5.0);
        assert_eq!(snap.imbalance, Some(0.0));
        assert!((snap.spread_bps - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_respects_depth_limit() {
        let snap = Snapshot::from_depth(Utc::now(), &depth_fixture(), 1).unwrap();
        assert_eq!(snap.bid_volume, 2.0);
        assert_eq!(snap.ask_volume, 1.0);
        let imb = snap.imbalance.unwrap();
        assert!((imb - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_volume_book_has_undefined_imbalance() {
        let depth = DepthResponse {
            last_update_id: 1,
            bids: vec![("100.0".to_string(), "0.0".to_string())],
            asks: vec![("101.0".to_string(), "0.0".to_string())],
        };
        let snap = Snapshot::from_depth(Utc::now(), &depth, 5).unwrap();
        assert_eq!(snap.imbalance, None);
    }

    #[test]
    fn test_one_sided_book_is_rejected() {
        let depth = DepthResponse {
            last_update_id: 1,
            bids: vec![],
            asks: vec![("101.0".to_string(), "1.0".to_string())],
        };
        assert!(Snapshot::from_depth(Utc::now(), &depth, 5).is_none());
    }

    #[test]
    #[should_panic(expected = "strictly increasing")]
    fn test_push_rejects_stale_timestamp() {
        use chrono::TimeZone;
        let later = Utc.timestamp_opt(1_700_000_020, 0).unwrap();
        let earlier = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let mut series = Series::new("BTCUSDT");
        series.push(Snapshot::from_depth(later, &depth_fixture(), 2).unwrap());
        series.push(Snapshot::from_depth(earlier, &depth_fixture(), 2).unwrap());
    }

    #[test]
    fn test_imbalance_bounds() {
        let depth = DepthResponse {
            last_update_id: 1,
            bids: vec![("100.0".to_string(), "7.5".to_string())],
            asks: vec![("101.0".to_string(), "0.0".to_string())],
        };
        let snap = Snapshot::from_depth(Utc::now(), &depth, 5).unwrap();
        assert_eq!(snap.imbalance, Some(1.0));
    }
}
