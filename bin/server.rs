// Bangladesh Police Crime Dashboard - Web Server

use anyhow::{Context, Result};
use clap::Parser;
use crime_dashboard::logging::{init_logging, Verbosity};
use crime_dashboard::{load_csv, server, Config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crime-server", version, about = "Serve the crime statistics dashboard")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the dataset path from the config
    #[arg(short, long, value_name = "CSV")]
    data: Option<PathBuf>,

    /// More log output (-v debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(Verbosity::from_flags(args.verbose, false));

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(data) = args.data {
        config.data.csv_path = data;
    }

    let dataset = load_csv(&config.data.csv_path)
        .with_context(|| format!("Failed to load dataset {:?}", config.data.csv_path))?;

    server::serve(config, dataset)
        .await
        .context("Server exited with an error")?;

    Ok(())
}
