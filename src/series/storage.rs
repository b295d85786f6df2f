//! CSV persistence for snapshot series
//!
//! One row per snapshot, header first, append-friendly: the writer flushes
//! after every row so a partial collection run survives process termination.

use crate::series::{Series, Snapshot};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use csv::{Reader, Writer};
use std::fs::File;
use std::path::{Path, PathBuf};

const HEADER: [&str; 7] = [
    "timestamp",
    "mid_price",
    "spread",
    "spread_bps",
    "bid_volume",
    "ask_volume",
    "imbalance",
];

/// Incremental CSV writer for a collection run.
///
/// Creates `orderbook_<SYMBOL>_<YYYYmmdd_HHMMSS>.csv` under the data
/// directory and appends one flushed row per snapshot. Any write or flush
/// failure is surfaced to the caller; the collection loop treats it as fatal.
pub struct SeriesWriter {
    writer: Writer<File>,
    path: PathBuf,
}

impl SeriesWriter {
    /// Create the data file for a run starting at `started`.
    pub fn create(data_dir: &Path, symbol: &str, started: DateTime<Utc>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let filename = format!("orderbook_{}_{}.csv", symbol, started.format("%Y%m%d_%H%M%S"));
        let path = data_dir.join(filename);

        let file = File::create(&path)
            .with_context(|| format!("Failed to create data file {}", path.display()))?;
        let mut writer = Writer::from_writer(file);
        writer.write_record(HEADER).context("Failed to write CSV header")?;
        writer.flush().context("Failed to flush CSV header")?;

        Ok(Self { writer, path })
    }

    /// Append one snapshot row and flush it to disk.
    pub fn append(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.writer
            .write_record([
                snapshot.timestamp.to_rfc3339(),
                snapshot.mid_price.to_string(),
                snapshot.spread.to_string(),
                snapshot.spread_bps.to_string(),
                snapshot.bid_volume.to_string(),
                snapshot.ask_volume.to_string(),
                snapshot
                    .imbalance
                    .map(|i| i.to_string())
                    .unwrap_or_default(),
            ])
            .context("Failed to write snapshot row")?;
        self.writer.flush().context("Failed to flush snapshot row")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Load a persisted series back from disk.
///
/// The symbol is recovered from the file name; an empty imbalance field
/// round-trips to None.
pub fn load_series(path: &Path) -> Result<Series> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open data file {}", path.display()))?;
    let mut reader = Reader::from_reader(file);

    let mut series = Series::new(symbol_from_filename(path).unwrap_or_else(|| "UNKNOWN".to_string()));

    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        if record.len() < 7 {
            bail!("Malformed row in {}: expected 7 fields, got {}", path.display(), record.len());
        }

        let timestamp: DateTime<Utc> = record[0]
            .parse()
            .with_context(|| format!("Failed to parse timestamp {:?}", &record[0]))?;
        let mid_price: f64 = record[1].parse().context("Failed to parse mid_price")?;
        let spread: f64 = record[2].parse().context("Failed to parse spread")?;
        let spread_bps: f64 = record[3].parse().context("Failed to parse spread_bps")?;
        let bid_volume: f64 = record[4].parse().context("Failed to parse bid_volume")?;
        let ask_volume: f64 = record[5].parse().context("Failed to parse ask_volume")?;
        let imbalance = if record[6].is_empty() {
            None
        } else {
            Some(record[6].parse::<f64>().context("Failed to parse imbalance")?)
        };

        // Rows must be strictly increasing by timestamp; a stale row (for
        // example from a hand-concatenated file) is dropped, not reordered.
        if let Some(prev) = series.snapshots.last() {
            if timestamp <= prev.timestamp {
                tracing::warn!(
                    timestamp = %timestamp,
                    previous = %prev.timestamp,
                    "Out-of-order row in data file, skipping"
                );
                continue;
            }
        }

        series.push(Snapshot {
            timestamp,
            mid_price,
            spread,
            spread_bps,
            bid_volume,
            ask_volume,
            imbalance,
        });
    }

    Ok(series)
}

/// Most recently written `orderbook_*.csv` under the data directory.
///
/// Ordered by modification time with the file name as tiebreak (the name
/// embeds the run start time, so ties resolve to the later run).
pub fn latest_series_file(data_dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();

    let entries = std::fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read data directory {}", data_dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("orderbook_") && name.ends_with(".csv") {
            let modified = entry.metadata()?.modified()?;
            candidates.push((modified, path));
        }
    }

    candidates.sort();
    candidates
        .pop()
        .map(|(_, path)| path)
        .context("No data files found. Run collection first or specify a data file.")
}

fn symbol_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    // orderbook_<SYMBOL>_<date>_<time>
    let mut parts = stem.splitn(2, '_');
    if parts.next() != Some("orderbook") {
        return None;
    }
    let rest = parts.next()?;
    let symbol = rest.rsplitn(3, '_').nth(2)?;
    Some(symbol.to_string())
}
