//! Report generation
//!
//! Renders the analyzer outputs as SVG figures plus a machine-readable
//! summary record. Pure consumer of the series and the two reports; never
//! feeds anything back into collection or analysis.

pub mod charts;

use crate::analysis::{EfficiencyReport, ImbalanceReport};
use crate::series::Series;
use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Artifacts produced by one render pass.
#[derive(Debug, Default)]
pub struct RenderedArtifacts {
    pub figures: Vec<PathBuf>,
    pub summary: Option<PathBuf>,
}

/// Render all artifacts under `results_dir`.
///
/// Figures land in `<results_dir>/figures/`, the JSON summary in
/// `<results_dir>/metrics/summary.json`. Degenerate inputs skip the
/// affected figure; the summary is always written.
pub fn render(
    series: &Series,
    imbalance: &ImbalanceReport,
    efficiency: &EfficiencyReport,
    results_dir: &Path,
    interval_secs: u64,
) -> Result<RenderedArtifacts> {
    let figures_dir = results_dir.join("figures");
    let metrics_dir = results_dir.join("metrics");
    std::fs::create_dir_all(&figures_dir)
        .with_context(|| format!("Failed to create {}", figures_dir.display()))?;
    std::fs::create_dir_all(&metrics_dir)
        .with_context(|| format!("Failed to create {}", metrics_dir.display()))?;

    let mut artifacts = RenderedArtifacts::default();

    let scatter_path = figures_dir.join("imbalance_scatter.svg");
    if charts::imbalance_scatter(series, imbalance, &scatter_path)? {
        artifacts.figures.push(scatter_path);
    } else {
        tracing::info!("Skipping imbalance scatter: no defined horizon to plot");
    }

    let decay_path = figures_dir.join("correlation_decay.svg");
    if charts::correlation_decay(imbalance, interval_secs, &decay_path)? {
        artifacts.figures.push(decay_path);
    } else {
        tracing::info!("Skipping correlation decay chart: no defined correlations");
    }

    let vr_path = figures_dir.join("variance_ratios.svg");
    if charts::variance_ratio_chart(efficiency, &vr_path)? {
        artifacts.figures.push(vr_path);
    } else {
        tracing::info!("Skipping variance ratio chart: no defined ratios");
    }

    let summary_path = metrics_dir.join("summary.json");
    write_summary(series, imbalance, efficiency, &summary_path)?;
    artifacts.summary = Some(summary_path);

    Ok(artifacts)
}

/// Write the nested test-name -> per-horizon/per-lag summary record.
fn write_summary(
    series: &Series,
    imbalance: &ImbalanceReport,
    efficiency: &EfficiencyReport,
    path: &Path,
) -> Result<()> {
    let summary = json!({
        "symbol": &series.symbol,
        "snapshots": series.len(),
        "imbalance_hypothesis": imbalance,
        "market_efficiency": {
            "lags": &efficiency.lags,
            "average_vr": efficiency.average_vr,
            "market_characterization": efficiency.character.map(|c| c.describe()),
        },
    });

    let body = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;

    tracing::info!(path = %path.display(), "Summary written");
    Ok(())
}
