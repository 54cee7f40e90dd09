//! Emberwatch CLI - wildfire-risk classification for IoT sensor spreadsheets

#![deny(warnings)]

// Global invariants enforced:
// - Reports go to stdout, logs and warnings go to stderr
// - CLI flags override config file values

use anyhow::Context;
use clap::{Parser, Subcommand};
use emberwatch_core::config::{self, ResolvedConfig};
use emberwatch_core::features::parse_decimal;
use emberwatch_core::locale::Locale;
use emberwatch_core::report::{self, render_prediction_json, render_prediction_text};
use emberwatch_core::{
    classify_source, load_pipeline, render_json, render_text, DataSource, Monitor, RefreshOutcome,
    SensorReading, Snapshot,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "emberwatch")]
#[command(about = "Wildfire-risk classification of IoT sensor readings")]
#[command(version = env!("EMBERWATCH_VERSION"))]
struct Cli {
    /// Path to config file (default: auto-discover)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Classifier artifact (overrides config file)
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Scaler artifact (overrides config file)
    #[arg(long, global = true)]
    scaler: Option<PathBuf>,

    /// Banner language: id or en (overrides config file)
    #[arg(long, global = true)]
    locale: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one manually entered reading
    Predict {
        /// Average temperature (°C)
        #[arg(long, value_parser = parse_value, allow_hyphen_values = true)]
        temperature: f64,

        /// Average relative humidity (%)
        #[arg(long, value_parser = parse_value, allow_hyphen_values = true)]
        humidity: f64,

        /// Rainfall (mm)
        #[arg(long, value_parser = parse_value, allow_hyphen_values = true)]
        rainfall: f64,

        /// Average wind speed (m/s)
        #[arg(long, value_parser = parse_value, allow_hyphen_values = true)]
        wind_speed: f64,

        /// Surface soil moisture
        #[arg(long, value_parser = parse_value, allow_hyphen_values = true)]
        soil_moisture: f64,

        /// Output format
        #[arg(long, default_value = "text")]
        format: TextOrJson,
    },
    /// Classify every row of a CSV file or URL
    Classify {
        /// CSV path or http(s) URL (default: source from config file)
        source: Option<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Write output to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Re-classify a source on a fixed interval
    Watch {
        /// CSV path or http(s) URL (default: source from config file)
        source: Option<String>,

        /// Seconds between refreshes (overrides config file)
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many refreshes (default: run until interrupted)
        #[arg(long)]
        cycles: Option<u64>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: TextOrJson,
    },
    /// Print the risk categories with their colors and meaning
    Legend,
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without loading artifacts
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum TextOrJson {
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Numeric flag values accept a comma as the decimal separator
fn parse_value(raw: &str) -> Result<f64, String> {
    parse_decimal(raw).ok_or_else(|| format!("not a number: {:?}", raw))
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("EMBERWATCH_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| "emberwatch=info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Commands::Predict {
            temperature,
            humidity,
            rainfall,
            wind_speed,
            soil_moisture,
            format,
        } => {
            let resolved = resolve_config(&cli.config, &cli.model, &cli.scaler, &cli.locale)?;
            let pipeline = load_pipeline(&resolved)?;
            let reading = SensorReading {
                temperature,
                humidity,
                rainfall,
                wind_speed,
                soil_moisture,
            };
            let prediction = pipeline
                .predict_reading(&reading)
                .context("failed to classify reading")?;

            match format {
                TextOrJson::Text => print!("{}", render_prediction_text(&prediction)),
                TextOrJson::Json => println!("{}", render_prediction_json(&prediction)),
            }
        }
        Commands::Classify {
            source,
            format,
            output,
        } => {
            let resolved = resolve_config(&cli.config, &cli.model, &cli.scaler, &cli.locale)?;
            let source = select_source(source, &resolved)?;
            let pipeline = load_pipeline(&resolved)?;
            let snapshot = classify_source(&pipeline, &source, &resolved)
                .with_context(|| format!("failed to classify {}", source))?;

            let rendered = match format {
                OutputFormat::Text => render_text(&snapshot),
                OutputFormat::Json => render_json(&snapshot),
                OutputFormat::Csv => report::render_csv(&snapshot, &resolved.label_column)?,
            };

            match output {
                Some(path) => {
                    write_output(&path, &rendered)?;
                    eprintln!("{} rows written to: {}", snapshot.rows.len(), path.display());
                }
                None => print!("{}", ensure_newline(rendered)),
            }
        }
        Commands::Watch {
            source,
            interval,
            cycles,
            format,
        } => {
            let resolved = resolve_config(&cli.config, &cli.model, &cli.scaler, &cli.locale)?;
            let source = select_source(source, &resolved)?;
            let interval = match interval {
                Some(0) => anyhow::bail!("--interval must be positive"),
                Some(secs) => Duration::from_secs(secs),
                None => resolved.refresh_interval,
            };
            if cycles == Some(0) {
                anyhow::bail!("--cycles must be positive");
            }

            let pipeline = load_pipeline(&resolved)?;
            let mut monitor = Monitor::new(pipeline, source.clone(), resolved.snapshot_settings())
                .with_fetch_timeout(resolved.fetch_timeout);
            tracing::info!(source = %source, interval_secs = interval.as_secs(), "watching");

            let mut cycle = 0u64;
            loop {
                cycle += 1;
                match monitor.refresh()? {
                    RefreshOutcome::Fresh(snapshot) => print_snapshot(snapshot, format),
                    RefreshOutcome::Stale { error, last } => {
                        eprintln!("Warning: refresh failed: {}", error);
                        match last {
                            Some(snapshot) => eprintln!(
                                "Keeping data fetched at {}",
                                snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
                            ),
                            None => eprintln!("No data fetched yet"),
                        }
                    }
                }

                if cycles.is_some_and(|n| cycle >= n) {
                    break;
                }
                std::thread::sleep(interval);
            }
        }
        Commands::Legend => print!("{}", report::risk_table()),
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

/// Load the config file, then apply global flag overrides
fn resolve_config(
    config_path: &Option<PathBuf>,
    model: &Option<PathBuf>,
    scaler: &Option<PathBuf>,
    locale: &Option<String>,
) -> anyhow::Result<ResolvedConfig> {
    let project_root = std::env::current_dir()?;
    let mut resolved = config::load_and_resolve(&project_root, config_path.as_deref())
        .context("failed to load configuration")?;

    if let Some(ref p) = resolved.config_path {
        tracing::info!(path = %p.display(), "using config");
    }
    if let Some(model) = model {
        resolved.model_path = model.clone();
    }
    if let Some(scaler) = scaler {
        resolved.scaler_path = scaler.clone();
    }
    if let Some(locale) = locale {
        resolved.locale = locale.parse::<Locale>().map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(resolved)
}

fn select_source(arg: Option<String>, resolved: &ResolvedConfig) -> anyhow::Result<DataSource> {
    match arg {
        Some(location) => Ok(DataSource::parse(&location)),
        None => resolved
            .source
            .clone()
            .context("no data source given and none set in the config file"),
    }
}

fn print_snapshot(snapshot: &Snapshot, format: TextOrJson) {
    match format {
        TextOrJson::Text => {
            println!(
                "== {} ({}) ==",
                snapshot.source,
                snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            print!("{}", render_text(snapshot));
        }
        TextOrJson::Json => println!("{}", render_json(snapshot)),
    }
}

fn write_output(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write output: {}", path.display()))
}

fn ensure_newline(mut s: String) -> String {
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Artifacts:");
    println!("  model: {}", resolved.model_path.display());
    println!("  scaler: {}", resolved.scaler_path.display());
    println!();
    println!("Data:");
    match &resolved.source {
        Some(source) => println!("  source: {}", source),
        None => println!("  source: none"),
    }
    println!("  refresh: {}s", resolved.refresh_interval.as_secs());
    println!("  fetch timeout: {}s", resolved.fetch_timeout.as_secs());
    println!("  timestamp column: {}", resolved.timestamp_column);
    println!("  label column: {}", resolved.label_column);
    println!("  locale: {}", resolved.locale.as_str());
    println!();
    println!("Columns:");
    for feature in emberwatch_core::Feature::ALL {
        println!(
            "  {}: {}",
            feature.key(),
            resolved.columns.aliases(feature).join(", ")
        );
    }
}
