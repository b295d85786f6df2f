//! Runtime settings
//!
//! Pipeline defaults with environment overrides. Constructed once at
//! startup and passed down explicitly; nothing here is global state.

use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by the collect and analyse modes.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Trading pair symbol (Binance spot format, e.g. "BTCUSDT")
    pub symbol: String,
    /// Seconds between snapshots
    pub interval_secs: u64,
    /// Orderbook levels aggregated per side
    pub depth: u32,
    /// Directory for collected CSV series
    pub data_dir: PathBuf,
    /// Directory for figures and metrics
    pub results_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval_secs: 20,
            depth: 20,
            data_dir: PathBuf::from("data"),
            results_dir: PathBuf::from("results"),
        }
    }
}

impl Settings {
    /// Defaults overridden by MICRO_* environment variables.
    ///
    /// Unparsable numeric values fall back to the default rather than
    /// aborting startup.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(symbol) = std::env::var("MICRO_SYMBOL") {
            if !symbol.is_empty() {
                settings.symbol = symbol.to_uppercase();
            }
        }
        if let Ok(value) = std::env::var("MICRO_INTERVAL_SECS") {
            match value.parse::<u64>() {
                Ok(secs) if secs > 0 => settings.interval_secs = secs,
                _ => tracing::warn!(value = %value, "Ignoring invalid MICRO_INTERVAL_SECS"),
            }
        }
        if let Ok(value) = std::env::var("MICRO_DEPTH") {
            match value.parse::<u32>() {
                Ok(depth) if depth > 0 => settings.depth = depth,
                _ => tracing::warn!(value = %value, "Ignoring invalid MICRO_DEPTH"),
            }
        }
        if let Ok(dir) = std::env::var("MICRO_DATA_DIR") {
            if !dir.is_empty() {
                settings.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var("MICRO_RESULTS_DIR") {
            if !dir.is_empty() {
                settings.results_dir = PathBuf::from(dir);
            }
        }

        settings
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
