//! Order flow imbalance hypothesis test
//!
//! Tests whether orderbook imbalance predicts future price direction: per
//! horizon, the Pearson correlation between imbalance and forward returns,
//! and the directional accuracy of sign(imbalance) as a predictor.

use crate::analysis::stats;
use crate::series::Series;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-horizon outcome. A horizon that admits no valid window (h >= series
/// length, or too few defined pairs) reports None rather than failing the
/// whole test.
#[derive(Debug, Clone, Serialize)]
pub struct HorizonStats {
    /// Pearson correlation between imbalance and forward return
    pub correlation: Option<f64>,

    /// Fraction of qualifying observations where sign(imbalance) matched
    /// sign(forward return). Ties (zero return) count as incorrect.
    pub directional_accuracy: Option<f64>,

    /// Valid (imbalance, forward return) pairs at this horizon
    pub samples: usize,
}

/// Results across all requested horizons.
#[derive(Debug, Clone, Serialize)]
pub struct ImbalanceReport {
    /// Per-horizon statistics, keyed by horizon in snapshot steps
    pub horizons: BTreeMap<usize, HorizonStats>,

    /// Horizon with the strongest (largest absolute) correlation; None when
    /// no horizon has a defined correlation
    pub best_horizon: Option<usize>,

    /// Absolute imbalance threshold applied to the accuracy test
    pub threshold: f64,
}

/// Test the imbalance hypothesis at each requested horizon.
///
/// Forward return at horizon h: r_t = (mid[t+h] - mid[t]) / mid[t].
/// Pairs where the imbalance is undefined are excluded. The accuracy test
/// is restricted to pairs with |imbalance| > `threshold` (0.0 means any
/// nonzero imbalance qualifies).
pub fn test_imbalance(series: &Series, horizons: &[usize], threshold: f64) -> ImbalanceReport {
    let mids = series.mid_prices();
    let imbalances = series.imbalances();

    let mut results = BTreeMap::new();

    for &h in horizons {
        results.insert(h, horizon_stats(&mids, &imbalances, h, threshold));
    }

    let best_horizon = results
        .iter()
        .filter_map(|(h, stats)| stats.correlation.map(|c| (*h, c.abs())))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(h, _)| h);

    ImbalanceReport {
        horizons: results,
        best_horizon,
        threshold,
    }
}

fn horizon_stats(mids: &[f64], imbalances: &[Option<f64>], h: usize, threshold: f64) -> HorizonStats {
    if h == 0 || h >= mids.len() {
        return HorizonStats {
            correlation: None,
            directional_accuracy: None,
            samples: 0,
        };
    }

    let mut imb_values = Vec::new();
    let mut returns = Vec::new();

    for t in 0..mids.len() - h {
        let Some(imb) = imbalances[t] else { continue };
        if mids[t] <= 0.0 {
            continue;
        }
        let forward_return = (mids[t + h] - mids[t]) / mids[t];
        imb_values.push(imb);
        returns.push(forward_return);
    }

    let correlation = stats::pearson(&imb_values, &returns);

    let mut qualified = 0usize;
    let mut matched = 0usize;
    for (imb, ret) in imb_values.iter().zip(returns.iter()) {
        if imb.abs() > threshold {
            qualified += 1;
            // A flat forward return is a failed prediction, not a push.
            if *ret != 0.0 && imb.signum() == ret.signum() {
                matched += 1;
            }
        }
    }

    let directional_accuracy = if qualified > 0 {
        Some(matched as f64 / qualified as f64)
    } else {
        None
    };

    HorizonStats {
        correlation,
        directional_accuracy,
        samples: imb_values.len(),
    }
}
