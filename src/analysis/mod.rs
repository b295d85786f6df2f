//! Hypothesis tests over a collected snapshot series
//!
//! Two tests, both tolerant of gaps and degenerate inputs: the order flow
//! imbalance test ([`imbalance`]) and the variance ratio market efficiency
//! test ([`efficiency`]). Undefined horizons/lags come back as None so
//! partial results survive.

pub mod efficiency;
pub mod imbalance;
pub mod stats;

pub use efficiency::{variance_ratio, EfficiencyReport, LagStats, MarketCharacter};
pub use imbalance::{test_imbalance, HorizonStats, ImbalanceReport};

/// Default forward-return horizons: 1..=30 snapshot steps
/// (20s to 10min at the nominal 20s sampling interval).
pub fn default_horizons() -> Vec<usize> {
    (1..=30).collect()
}

/// Default variance ratio lags, in snapshot steps.
pub fn default_lags() -> Vec<usize> {
    vec![2, 5, 7, 10, 15, 20, 25, 30]
}
