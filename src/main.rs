use anyhow::{Context, Result};
use chrono::Utc;
use microlab::analysis;
use microlab::binance::BinanceClient;
use microlab::collector::{self, CollectorConfig};
use microlab::config::Settings;
use microlab::report;
use microlab::series::storage;
use microlab::series::Series;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
enum Mode {
    Collect { minutes: u64 },
    Analyse { file: Option<PathBuf> },
    Menu,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mode = parse_args(&args).unwrap_or_else(|err| {
        eprintln!("{}", err);
        print_usage();
        std::process::exit(1);
    });

    // Initialize tracing/logging to stderr; stdout stays clean for the menu.
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let settings = Settings::from_env();

    match mode {
        Mode::Collect { minutes } => {
            run_collect(&settings, minutes).await?;
        }
        Mode::Analyse { file } => {
            run_analyse(&settings, file)?;
        }
        Mode::Menu => run_menu(&settings).await?,
    }

    Ok(())
}

/// Parse command-line arguments
fn parse_args(args: &[String]) -> Result<Mode, String> {
    let Some(command) = args.get(1) else {
        return Ok(Mode::Menu);
    };

    match command.as_str() {
        "collect" => {
            let mut minutes = 60u64;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--minutes" => {
                        let value = args
                            .get(i + 1)
                            .ok_or_else(|| "--minutes requires a value".to_string())?;
                        minutes = value
                            .parse()
                            .map_err(|_| format!("Invalid value for --minutes: {}", value))?;
                        i += 1;
                    }
                    value => {
                        // Bare number keeps the original `collect 30` shorthand.
                        minutes = value
                            .parse()
                            .map_err(|_| format!("Unknown argument: {}", value))?;
                    }
                }
                i += 1;
            }
            Ok(Mode::Collect { minutes })
        }
        "analyse" => {
            let mut file = None;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--file" => {
                        let value = args
                            .get(i + 1)
                            .ok_or_else(|| "--file requires a value".to_string())?;
                        file = Some(PathBuf::from(value));
                        i += 1;
                    }
                    value => return Err(format!("Unknown argument: {}", value)),
                }
                i += 1;
            }
            Ok(Mode::Analyse { file })
        }
        "--help" | "-h" => {
            print_usage();
            std::process::exit(0);
        }
        other => Err(format!("Invalid mode: {}", other)),
    }
}

/// Print usage information
fn print_usage() {
    println!("microlab - crypto market microstructure analysis pipeline");
    println!();
    println!("USAGE:");
    println!("    microlab [collect [--minutes N] | analyse [--file PATH]]");
    println!();
    println!("MODES:");
    println!("    collect     Collect fresh orderbook snapshots (default 60 minutes)");
    println!("    analyse     Run both hypothesis tests on the most recent data file");
    println!("    (no mode)   Interactive menu");
    println!();
    println!("ENVIRONMENT:");
    println!("    MICRO_SYMBOL, MICRO_INTERVAL_SECS, MICRO_DEPTH,");
    println!("    MICRO_DATA_DIR, MICRO_RESULTS_DIR");
}

/// Collect fresh orderbook data from Binance.
async fn run_collect(settings: &Settings, minutes: u64) -> Result<Series> {
    let client = BinanceClient::new()?;

    // Startup probe: an unreachable exchange is fatal before collection begins.
    let server_time = client
        .get_server_time()
        .await
        .context("Exchange unreachable at startup")?;
    tracing::info!(server_time, "Connected to Binance");

    let started = Utc::now();
    let mut writer = storage::SeriesWriter::create(&settings.data_dir, &settings.symbol, started)?;

    let config = CollectorConfig {
        symbol: settings.symbol.clone(),
        duration: Duration::from_secs(minutes * 60),
        interval: settings.interval(),
        depth: settings.depth,
    };

    // Ctrl-C requests a graceful stop; the partial series is kept.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stop requested, finishing up");
            signal_cancel.cancel();
        }
    });

    let series = collector::collect(&client, &mut writer, &config, &cancel).await?;
    Ok(series)
}

/// Run both hypothesis tests and render the report artifacts.
fn run_analyse(settings: &Settings, file: Option<PathBuf>) -> Result<()> {
    let path = match file {
        Some(path) => path,
        None => storage::latest_series_file(&settings.data_dir)?,
    };
    tracing::info!(file = %path.display(), "Using data file");

    let series = storage::load_series(&path)?;
    tracing::info!(snapshots = series.len(), symbol = %series.symbol, "Series loaded");

    let imbalance = analysis::test_imbalance(&series, &analysis::default_horizons(), 0.0);
    let efficiency = analysis::variance_ratio(&series, &analysis::default_lags());

    let artifacts = report::render(
        &series,
        &imbalance,
        &efficiency,
        &settings.results_dir,
        settings.interval_secs,
    )?;

    print_findings(&imbalance, &efficiency, settings);
    tracing::info!(
        figures = artifacts.figures.len(),
        "Analysis complete"
    );

    Ok(())
}

/// Key findings, printed to stdout for the operator.
fn print_findings(
    imbalance: &analysis::ImbalanceReport,
    efficiency: &analysis::EfficiencyReport,
    settings: &Settings,
) {
    println!();
    println!("ANALYSIS COMPLETE - KEY FINDINGS");
    println!("--------------------------------");

    match imbalance.best_horizon {
        Some(h) => {
            let corr = imbalance.horizons[&h].correlation.unwrap_or(0.0);
            println!(
                "Order book imbalance: peak correlation {:.3} at {}s",
                corr,
                h as u64 * settings.interval_secs
            );
        }
        None => println!("Order book imbalance: no horizon with a defined correlation"),
    }

    match (efficiency.average_vr, efficiency.character) {
        (Some(avg), Some(character)) => {
            println!(
                "Market efficiency: average VR {:.3} ({})",
                avg,
                character.describe()
            );
        }
        _ => println!("Market efficiency: variance ratios undefined for this series"),
    }

    println!(
        "Figures in {}/figures, metrics in {}/metrics",
        settings.results_dir.display(),
        settings.results_dir.display()
    );
}

/// Interactive menu offering the same operations as the CLI modes.
async fn run_menu(settings: &Settings) -> Result<()> {
    println!();
    println!("Options:");
    println!("1. Run analysis on existing data");
    println!("2. Collect new data");
    println!("3. Collect data then analyse");
    print!("\nSelect option (1-3): ");
    std::io::stdout().flush().ok();

    let choice = read_line()?;
    match choice.trim() {
        "1" => run_analyse(settings, None)?,
        "2" => {
            let minutes = prompt_minutes()?;
            run_collect(settings, minutes).await?;
        }
        "3" => {
            let minutes = prompt_minutes()?;
            let series = run_collect(settings, minutes).await?;
            if series.is_empty() {
                tracing::warn!("No snapshots collected, skipping analysis");
            } else {
                run_analyse(settings, None)?;
            }
        }
        other => {
            eprintln!("Invalid choice: {}", other);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn prompt_minutes() -> Result<u64> {
    print!("Duration in minutes (default 60): ");
    std::io::stdout().flush().ok();
    let line = read_line()?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(60);
    }
    trimmed
        .parse()
        .with_context(|| format!("Invalid duration: {}", trimmed))
}

fn read_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line)
}
