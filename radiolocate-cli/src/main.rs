//! Radiolocate CLI - demo host for the location engine.
//!
//! Plays the role of the host process the engine is embedded in:
//! loads configuration, initialises logging, constructs the engine from
//! table-backed signal sources and answers the boundary queries on
//! stdout. `demo` runs a built-in scripted scenario; `replay` feeds
//! observations from a JSON file against user-supplied lookup tables.

mod config;
mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use radiolocate::{
    logging::init_logging, Bssid, ConnectivitySnapshot, LocationEngine, LocationEstimate,
    Observation, SignalIdentifier, SignalKind, TableSource,
};

use crate::config::ConfigFile;
use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "radiolocate", about = "Network-signal location provider demo host")]
struct Cli {
    /// Path to an INI configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the built-in scripted scenario.
    Demo,

    /// Replay observations from a JSON file.
    Replay {
        /// JSON file with an array of observations.
        observations: PathBuf,

        /// JSON lookup table for Wi-Fi identifiers.
        #[arg(long)]
        wifi_table: Option<PathBuf>,

        /// JSON lookup table for cell identifiers.
        #[arg(long)]
        cell_table: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match ConfigFile::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(1);
            }
        },
        None => ConfigFile::default(),
    };

    let _guard = match init_logging(&config.log_dir, &config.log_file) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialise logging: {err}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Demo => run_demo(&config).await,
        Command::Replay {
            observations,
            wifi_table,
            cell_table,
        } => {
            run_replay(
                &config,
                &observations,
                wifi_table.as_deref(),
                cell_table.as_deref(),
            )
            .await
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

/// Print the full boundary protocol state.
fn report(engine: &LocationEngine, label: &str) {
    println!("--- {label}");
    println!("active:  {}", engine.is_active());
    match engine.current_location() {
        Some(fix) => println!(
            "current: {:.5}, {:.5} (±{:.0}m)",
            fix.latitude, fix.longitude, fix.accuracy_m
        ),
        None => println!("current: unknown"),
    }
    match engine.real_location() {
        Some(fix) => println!(
            "real:    {:.5}, {:.5} (±{:.0}m)",
            fix.latitude, fix.longitude, fix.accuracy_m
        ),
        None => println!("real:    unknown"),
    }
}

/// Scripted walk past three Berlin access points and one cell, with an
/// airplane-mode interruption in the middle.
async fn run_demo(config: &ConfigFile) -> Result<(), CliError> {
    let ap1 = SignalIdentifier::Wifi(Bssid([0x02, 0x1a, 0x2b, 0, 0, 1]));
    let ap2 = SignalIdentifier::Wifi(Bssid([0x02, 0x1a, 0x2b, 0, 0, 2]));
    let cell = SignalIdentifier::Cell {
        mcc: 262,
        mnc: 2,
        lac: 434,
        cid: 7_465_392,
    };

    let wifi_table = TableSource::new()
        .with_entry(ap1, LocationEstimate::now(52.5215, 13.4120, 80.0))
        .with_entry(ap2, LocationEstimate::now(52.5222, 13.4138, 60.0));
    let cell_table =
        TableSource::new().with_entry(cell, LocationEstimate::now(52.5230, 13.4100, 1_500.0));

    let engine = LocationEngine::new(config.engine, Arc::new(cell_table), Arc::new(wifi_table));
    report(&engine, "engine constructed (disabled)");

    engine.on_connectivity_changed(ConnectivitySnapshot {
        airplane_mode_on: false,
        wifi_enabled: true,
    });

    engine
        .on_observations(
            SignalKind::Wifi,
            &[
                Observation::new(ap1, -55, Utc::now()),
                Observation::new(ap2, -48, Utc::now()),
            ],
        )
        .await;
    engine
        .on_observations(SignalKind::Cell, &[Observation::new(cell, -85, Utc::now())])
        .await;
    report(&engine, "after one wifi batch and one cell reading");

    engine.on_connectivity_changed(ConnectivitySnapshot {
        airplane_mode_on: true,
        wifi_enabled: false,
    });
    engine
        .on_observations(SignalKind::Wifi, &[Observation::new(ap1, -52, Utc::now())])
        .await;
    report(&engine, "airplane mode on (observations dropped)");

    engine.on_connectivity_changed(ConnectivitySnapshot {
        airplane_mode_on: false,
        wifi_enabled: true,
    });
    engine
        .on_observations(SignalKind::Wifi, &[Observation::new(ap2, -50, Utc::now())])
        .await;
    report(&engine, "back online");

    Ok(())
}

/// Replay observations from a JSON file against the given tables.
async fn run_replay(
    config: &ConfigFile,
    observations_path: &Path,
    wifi_table: Option<&Path>,
    cell_table: Option<&Path>,
) -> Result<(), CliError> {
    let observations: Vec<Observation> = read_json(observations_path)?;
    let wifi = load_table(wifi_table)?;
    let cell = load_table(cell_table)?;

    let engine = LocationEngine::new(config.engine, Arc::new(cell), Arc::new(wifi));
    engine.enable();

    info!(count = observations.len(), "replaying observations");
    let (cells, wifis): (Vec<_>, Vec<_>) = observations
        .into_iter()
        .partition(|o| o.identifier.kind() == SignalKind::Cell);

    engine.on_observations(SignalKind::Cell, &cells).await;
    engine.on_observations(SignalKind::Wifi, &wifis).await;

    report(&engine, "after replay");
    Ok(())
}

/// Load a `(identifier, estimate)` table, empty when no path is given.
fn load_table(path: Option<&Path>) -> Result<TableSource, CliError> {
    match path {
        Some(path) => {
            let entries: Vec<(SignalIdentifier, LocationEstimate)> = read_json(path)?;
            Ok(TableSource::from_entries(entries))
        }
        None => Ok(TableSource::new()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })
}
