//! Snapshot collection loop
//!
//! Polls the depth source at fixed interval boundaries, derives a snapshot
//! per poll, and appends each row to the CSV writer as it arrives. A failed
//! poll leaves a gap in the series; a failed write aborts the run.

use crate::binance::DepthSource;
use crate::series::storage::SeriesWriter;
use crate::series::{Series, Snapshot};
use anyhow::{ensure, Result};
use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Parameters for one collection run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Trading pair symbol (e.g., "BTCUSDT")
    pub symbol: String,
    /// Total collection duration
    pub duration: Duration,
    /// Time between snapshots
    pub interval: Duration,
    /// Orderbook levels to aggregate per side
    pub depth: u32,
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.symbol.is_empty(), "symbol must not be empty");
        ensure!(self.depth >= 1, "depth must be at least 1 level per side");
        ensure!(
            self.interval > Duration::ZERO,
            "interval must be positive"
        );
        ensure!(
            self.duration.is_zero() || self.interval <= self.duration,
            "interval must not exceed duration"
        );
        Ok(())
    }

    /// Nominal snapshot count for a full run
    pub fn expected_snapshots(&self) -> u64 {
        if self.interval.is_zero() {
            return 0;
        }
        self.duration.as_secs() / self.interval.as_secs().max(1)
    }
}

/// Collect orderbook snapshots over the configured duration.
///
/// Runs a sleep-until-deadline loop: each iteration waits for the next
/// interval boundary (boundaries advance by a fixed step, so one slow fetch
/// does not shift the schedule), fetches the book, and records the snapshot
/// both in memory and through the writer.
///
/// Returns whatever was gathered when the duration elapses or the token is
/// cancelled; both are normal termination. duration = 0 yields an empty
/// series without touching the source.
pub async fn collect(
    source: &dyn DepthSource,
    writer: &mut SeriesWriter,
    config: &CollectorConfig,
    cancel: &CancellationToken,
) -> Result<Series> {
    config.validate()?;

    tracing::info!(
        symbol = %config.symbol,
        duration_secs = config.duration.as_secs(),
        interval_secs = config.interval.as_secs(),
        depth = config.depth,
        expected = config.expected_snapshots(),
        "Starting data collection"
    );

    let mut series = Series::new(config.symbol.clone());
    let start = Instant::now();
    let deadline = start + config.duration;
    let mut next_target = start;
    let mut errors = 0u64;

    while Instant::now() < deadline {
        // Wait for the next boundary, bailing out early on cancellation.
        tokio::select! {
            _ = tokio::time::sleep_until(next_target) => {}
            _ = cancel.cancelled() => {
                tracing::info!(collected = series.len(), "Collection cancelled, returning partial series");
                return Ok(series);
            }
        }

        let behind = Instant::now().saturating_duration_since(next_target);
        if behind > config.interval {
            tracing::warn!(behind_secs = behind.as_secs_f64(), "Running behind schedule");
        }

        match source.fetch_depth(&config.symbol, config.depth).await {
            Ok(depth_resp) => {
                let now = Utc::now();
                match Snapshot::from_depth(now, &depth_resp, config.depth as usize) {
                    Some(snapshot) => {
                        // Persistence failure is fatal: silently losing rows
                        // defeats the point of the run.
                        writer.append(&snapshot)?;

                        tracing::info!(
                            n = series.len() + 1,
                            mid = snapshot.mid_price,
                            spread_bps = format!("{:.4}", snapshot.spread_bps),
                            imbalance = ?snapshot.imbalance.map(|i| format!("{:+.3}", i)),
                            "Snapshot recorded"
                        );

                        series.push(snapshot);
                    }
                    None => {
                        errors += 1;
                        tracing::warn!(errors, "Degenerate orderbook, skipping interval");
                    }
                }
            }
            Err(err) => {
                errors += 1;
                if err.is_retryable() {
                    tracing::warn!(errors, error = %err, "Transient fetch failure, skipping interval");
                } else {
                    tracing::error!(errors, error = %err, "Fetch failed, skipping interval");
                }
            }
        }

        next_target += config.interval;
    }

    let attempts = series.len() as u64 + errors;
    let success_rate = if attempts > 0 {
        series.len() as f64 / attempts as f64 * 100.0
    } else {
        0.0
    };
    tracing::info!(
        collected = series.len(),
        errors,
        success_rate = format!("{:.1}%", success_rate),
        file = %writer.path().display(),
        "Collection complete"
    );

    Ok(series)
}
