//! Canopy CLI - NDVI feature preprocessing for satellite observations

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use canopy_algorithms::features::{
    parse_grid, parse_observation, BandSource, FeatureExtractor, PreprocessorConfig,
    SatelliteObservation,
};
use canopy_algorithms::imagery::normalize;
use canopy_core::Raster;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "canopy")]
#[command(author, version, about = "NDVI feature preprocessing for satellite observations", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the preprocessing pipeline on an observation payload
    Preprocess {
        /// Input observation (JSON)
        input: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Target image rows
        #[arg(long, requires = "cols", conflicts_with = "region_km")]
        rows: Option<usize>,
        /// Target image columns
        #[arg(long, requires = "rows", conflicts_with = "region_km")]
        cols: Option<usize>,
        /// Size the target image for a region of this many kilometres
        #[arg(long)]
        region_km: Option<f64>,
        /// Seed for synthetic placeholder bands
        #[arg(long)]
        seed: Option<u64>,
        /// Write the full report (statistics and band provenance)
        #[arg(long)]
        report: bool,
    },
    /// Min-max normalize a 2-D grid to [0, 1]
    Normalize {
        /// Input grid (JSON array of rows)
        input: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show information about an observation payload
    Info {
        /// Input observation (JSON)
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_input(path: &Path) -> Result<String> {
    let pb = spinner("Reading payload...");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    Ok(text)
}

fn read_observation(path: &Path, config: &PreprocessorConfig) -> Result<SatelliteObservation> {
    let text = read_input(path)?;
    let observation = parse_observation(&text, config).context("Failed to parse observation")?;
    info!("Input: {} observation", observation.kind());
    Ok(observation)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let pb = spinner("Writing output...");
            let json = serde_json::to_vec(value).context("Failed to serialize output")?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            pb.finish_and_clear();
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer(&mut lock, value).context("Failed to write output")?;
            writeln!(lock).context("Failed to write output")?;
        }
    }
    Ok(())
}

fn done(name: &str, output: Option<&Path>, elapsed: std::time::Duration) {
    if let Some(path) = output {
        info!("{} saved to: {}", name, path.display());
    }
    info!("Processing time: {:.2?}", elapsed);
}

fn build_config(
    rows: Option<usize>,
    cols: Option<usize>,
    region_km: Option<f64>,
    seed: Option<u64>,
) -> Result<PreprocessorConfig> {
    let config = match (rows, cols, region_km) {
        (Some(rows), Some(cols), _) => PreprocessorConfig::new(rows, cols)?,
        (_, _, Some(km)) => PreprocessorConfig::for_region_km(km)?,
        _ => PreprocessorConfig::default(),
    };
    Ok(match seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    })
}

fn read_grid(path: &Path) -> Result<Raster<f64>> {
    let text = read_input(path)?;
    let grid = parse_grid(&text).context("Expected a JSON array of equal-length rows")?;
    info!("Input: {} x {}", grid.cols(), grid.rows());
    Ok(grid)
}

fn source_label(source: BandSource) -> &'static str {
    match source {
        BandSource::Observed => "observed",
        BandSource::Synthetic => "synthetic",
        BandSource::Empty => "empty",
    }
}

fn describe(observation: &SatelliteObservation) {
    println!("Kind: {}", observation.kind());
    match observation {
        SatelliteObservation::NoData => println!("No imagery"),
        SatelliteObservation::Structured(bands) => {
            let mut names: Vec<&String> = bands.keys().collect();
            names.sort();
            for name in names {
                let band = &bands[name];
                let stats = band.statistics();
                println!(
                    "  {}: {} x {}  valid={} min={:?} max={:?}",
                    name,
                    band.rows(),
                    band.cols(),
                    stats.valid_count,
                    stats.min,
                    stats.max
                );
            }
        }
        SatelliteObservation::Stacked(stack) => {
            let (rows, cols, depth) = stack.dim();
            println!("  {} x {} pixels, {} bands", rows, cols, depth);
        }
        SatelliteObservation::Unbanded(array) => {
            println!("  Shape: {:?} (no band axis)", array.shape());
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Preprocess {
            input,
            output,
            rows,
            cols,
            region_km,
            seed,
            report,
        } => {
            let config = build_config(rows, cols, region_km, seed)?;
            let (rows, cols) = config.image_size();
            let observation = read_observation(&input, &config)?;
            let extractor = FeatureExtractor::new(config);

            let pb = spinner("Extracting features...");
            let start = Instant::now();
            let result = extractor
                .extract_report(&observation)
                .context("Feature extraction failed")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            info!("Output: {} x {}", cols, rows);
            info!(
                "NDVI mean: {:.4} ({} of {} pixels valid)",
                result.ndvi_stats.mean, result.ndvi_stats.valid_pixels, result.ndvi_stats.total_pixels
            );
            info!(
                "Bands: nir={} red={}",
                source_label(result.nir_source),
                source_label(result.red_source)
            );
            if result.is_partial() {
                warn!("Some bands were not observed; features are partly synthetic");
            }

            if report {
                write_json(&result, output.as_deref())?;
            } else {
                write_json(&result.bundle, output.as_deref())?;
            }
            done("Features", output.as_deref(), elapsed);
        }

        Commands::Normalize { input, output } => {
            let grid = read_grid(&input)?;
            let start = Instant::now();
            let result = normalize(&grid);
            let elapsed = start.elapsed();
            write_json(&result, output.as_deref())?;
            done("Normalized grid", output.as_deref(), elapsed);
        }

        Commands::Info { input } => {
            let observation = read_observation(&input, &PreprocessorConfig::default())?;
            describe(&observation);
        }
    }

    Ok(())
}
