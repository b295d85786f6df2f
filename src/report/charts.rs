//! SVG chart rendering for the analysis reports.
//!
//! Each chart function returns Ok(false) when its inputs are degenerate
//! (nothing to plot) so one empty panel never fails the whole render.

use crate::analysis::{EfficiencyReport, ImbalanceReport};
use crate::series::Series;
use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::Path;

const CHART_SIZE: (u32, u32) = (900, 600);

/// Scatter of imbalance vs forward return (in percent) at the best horizon,
/// with a least-squares fit line.
pub fn imbalance_scatter(series: &Series, report: &ImbalanceReport, path: &Path) -> Result<bool> {
    let Some(best_h) = report.best_horizon else {
        return Ok(false);
    };

    let mids = series.mid_prices();
    let imbalances = series.imbalances();

    let mut points: Vec<(f64, f64)> = Vec::new();
    for t in 0..mids.len().saturating_sub(best_h) {
        let Some(imb) = imbalances[t] else { continue };
        if mids[t] <= 0.0 {
            continue;
        }
        let ret_pct = (mids[t + best_h] - mids[t]) / mids[t] * 100.0;
        points.push((imb, ret_pct));
    }

    if points.len() < 2 {
        return Ok(false);
    }

    let (y_min, y_max) = padded_range(points.iter().map(|(_, y)| *y));

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let caption = format!("Imbalance vs Forward Return (horizon {})", best_h);
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(-1.05..1.05, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Imbalance")
        .y_desc("Forward return (%)")
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|(x, y)| Circle::new((*x, *y), 3, BLUE.mix(0.5).filled())),
    )?;

    if let Some((slope, intercept)) = linear_fit(&points) {
        let corr = report
            .horizons
            .get(&best_h)
            .and_then(|s| s.correlation)
            .unwrap_or(0.0);
        chart
            .draw_series(LineSeries::new(
                [(-1.0, slope * -1.0 + intercept), (1.0, slope + intercept)],
                RED.stroke_width(2),
            ))?
            .label(format!("Correlation: {:.3}", corr))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Correlation by horizon, horizon expressed in minutes.
pub fn correlation_decay(report: &ImbalanceReport, interval_secs: u64, path: &Path) -> Result<bool> {
    let points: Vec<(f64, f64)> = report
        .horizons
        .iter()
        .filter_map(|(h, stats)| {
            stats
                .correlation
                .map(|c| (*h as f64 * interval_secs as f64 / 60.0, c))
        })
        .collect();

    if points.is_empty() {
        return Ok(false);
    }

    let x_max = points.last().map(|(x, _)| *x).unwrap_or(1.0).max(0.1);
    let (y_min, y_max) = padded_range(points.iter().map(|(_, y)| *y).chain([0.0]));

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Imbalance Correlation Decay", ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..x_max * 1.05, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Horizon (minutes)")
        .y_desc("Correlation")
        .draw()?;

    // Zero reference line
    chart.draw_series(LineSeries::new(
        [(0.0, 0.0), (x_max * 1.05, 0.0)],
        BLACK.mix(0.4),
    ))?;

    chart.draw_series(LineSeries::new(points.clone(), BLUE.stroke_width(2)))?;
    chart.draw_series(
        points
            .iter()
            .map(|(x, y)| Circle::new((*x, *y), 3, BLUE.filled())),
    )?;

    root.present()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Variance ratio by lag with the VR = 1 random-walk reference line.
pub fn variance_ratio_chart(report: &EfficiencyReport, path: &Path) -> Result<bool> {
    let points: Vec<(f64, f64)> = report
        .lags
        .iter()
        .filter_map(|(k, stats)| stats.vr.map(|vr| (*k as f64, vr)))
        .collect();

    if points.is_empty() {
        return Ok(false);
    }

    let x_max = points.last().map(|(x, _)| *x).unwrap_or(1.0);
    let (y_min, y_max) = padded_range(points.iter().map(|(_, y)| *y).chain([1.0]));

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Market Efficiency: Variance Ratios", ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..x_max * 1.1, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Lag (snapshot steps)")
        .y_desc("Variance ratio")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            [(0.0, 1.0), (x_max * 1.1, 1.0)],
            BLACK.mix(0.5).stroke_width(2),
        ))?
        .label("Random walk (VR = 1)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.mix(0.5).stroke_width(2)));

    chart.draw_series(LineSeries::new(points.clone(), GREEN.stroke_width(2)))?;
    chart.draw_series(
        points
            .iter()
            .map(|(x, y)| Circle::new((*x, *y), 4, GREEN.filled())),
    )?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Least-squares slope and intercept. None for degenerate x.
fn linear_fit(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (x, y) in points {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x) * (x - mean_x);
    }

    if var_x <= 0.0 {
        return None;
    }
    let slope = cov / var_x;
    Some((slope, mean_y - slope * mean_x))
}

/// Min/max of an iterator with 10% padding, widened when flat so plotters
/// never sees an empty range.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = (max - min).max(1e-6);
    (min - span * 0.1, max + span * 0.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_fit_recovers_line() {
        let points: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        let (slope, intercept) = linear_fit(&points).unwrap();
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((intercept - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_fit_degenerate() {
        assert!(linear_fit(&[(1.0, 2.0)]).is_none());
        assert!(linear_fit(&[(1.0, 2.0), (1.0, 3.0)]).is_none());
    }

    #[test]
    fn test_padded_range_widens_flat_input() {
        let (min, max) = padded_range([1.0, 1.0].into_iter());
        assert!(min < 1.0 && max > 1.0);
    }
}
