//! Market efficiency (variance ratio) test
//!
//! Lo-MacKinlay variance ratios over overlapping k-period log returns.
//! Under a random walk, variance scales linearly with the horizon, so
//! VR(k) = Var(k-period) / (k * Var(1-period)) should sit near 1.

use crate::analysis::stats;
use crate::series::Series;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;

/// Informational verdict derived from the average variance ratio.
/// Reporting data only; nothing in the analyzer branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCharacter {
    /// Average VR > 1.1
    Trending,
    /// Average VR < 0.9
    MeanReverting,
    /// Average VR within [0.9, 1.1]
    Efficient,
}

impl MarketCharacter {
    fn from_average_vr(avg: f64) -> Self {
        if avg > 1.1 {
            MarketCharacter::Trending
        } else if avg < 0.9 {
            MarketCharacter::MeanReverting
        } else {
            MarketCharacter::Efficient
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            MarketCharacter::Trending => "Trending/Momentum",
            MarketCharacter::MeanReverting => "Mean-reverting",
            MarketCharacter::Efficient => "Approximately efficient (random walk)",
        }
    }
}

/// Per-lag outcome. Undefined (None) when the 1-period return variance is
/// zero or the lag leaves too few windows; no NaN or infinity ever leaks
/// into the output.
#[derive(Debug, Clone, Serialize)]
pub struct LagStats {
    /// Variance ratio VR(k)
    pub vr: Option<f64>,

    /// Homoskedastic Lo-MacKinlay z-statistic (undefined at k = 1)
    pub z_stat: Option<f64>,

    /// Two-sided p-value for the z-statistic
    pub p_value: Option<f64>,

    /// Number of overlapping k-period windows
    pub samples: usize,
}

/// Results across all requested lags.
#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyReport {
    /// Per-lag statistics, keyed by lag in snapshot steps
    pub lags: BTreeMap<usize, LagStats>,

    /// Mean of the defined variance ratios
    pub average_vr: Option<f64>,

    /// Verdict mapped from the average VR
    pub character: Option<MarketCharacter>,
}

/// Run the variance ratio test at each requested lag.
///
/// One-period log returns d_t = ln(mid[t]) - ln(mid[t-1]) are computed over
/// the full series; k-period returns are overlapping sums of k consecutive
/// one-period returns (equivalently ln(mid[t]) - ln(mid[t-k])).
pub fn variance_ratio(series: &Series, lags: &[usize]) -> EfficiencyReport {
    let returns = log_returns(&series.mid_prices());
    let var_1 = stats::sample_variance(&returns).filter(|v| *v > 0.0);

    let mut results = BTreeMap::new();
    for &k in lags {
        results.insert(k, lag_stats(&returns, var_1, k));
    }

    let defined: Vec<f64> = results.values().filter_map(|s| s.vr).collect();
    let average_vr = stats::mean(&defined);
    let character = average_vr.map(MarketCharacter::from_average_vr);

    EfficiencyReport {
        lags: results,
        average_vr,
        character,
    }
}

fn lag_stats(returns: &[f64], var_1: Option<f64>, k: usize) -> LagStats {
    let samples = if k >= 1 && returns.len() >= k {
        returns.len() - k + 1
    } else {
        0
    };

    let undefined = LagStats {
        vr: None,
        z_stat: None,
        p_value: None,
        samples,
    };

    // Zero-variance guard: a constant price series makes every VR undefined.
    let Some(var_1) = var_1 else {
        return undefined;
    };
    if k == 0 || samples < 2 {
        return undefined;
    }

    let k_returns: Vec<f64> = returns.windows(k).map(|w| w.iter().sum()).collect();
    let Some(var_k) = stats::sample_variance(&k_returns) else {
        return undefined;
    };

    let vr = var_k / (k as f64 * var_1);

    // Homoskedastic Lo-MacKinlay asymptotic: under the random walk null,
    // sqrt(n) * (VR(k) - 1) ~ N(0, 2(2k-1)(k-1) / 3k).
    let (z_stat, p_value) = if k > 1 {
        let n = returns.len() as f64;
        let phi = 2.0 * (2.0 * k as f64 - 1.0) * (k as f64 - 1.0) / (3.0 * k as f64 * n);
        let z = (vr - 1.0) / phi.sqrt();
        let normal = Normal::new(0.0, 1.0).unwrap();
        let p = 2.0 * (1.0 - normal.cdf(z.abs()));
        (Some(z), Some(p))
    } else {
        (None, None)
    };

    LagStats {
        vr: Some(vr),
        z_stat,
        p_value,
        samples,
    }
}

/// One-period log returns over consecutive positive mid-prices.
fn log_returns(mids: &[f64]) -> Vec<f64> {
    mids.windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0)
        .map(|w| w[1].ln() - w[0].ln())
        .collect()
}
