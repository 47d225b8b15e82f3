// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crime_dashboard::aggregate;
use crime_dashboard::logging::{init_logging, Verbosity};
use crime_dashboard::{load_csv, summary_cards, Config, Dataset, Filter, FilterRequest};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crime-dashboard", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override the dataset path from the config
    #[arg(short, long, value_name = "CSV", global = true)]
    data: Option<PathBuf>,

    /// More log output (-v debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the summary cards and top units for a selection
    Summary {
        #[command(flatten)]
        filter: FilterArgs,

        /// How many units to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Browse the dashboard in the terminal (default)
    Tui,
}

#[derive(Args)]
struct FilterArgs {
    /// Comma-separated police units, or "all"
    #[arg(short, long)]
    units: Option<String>,

    /// First year of the range
    #[arg(long)]
    from: Option<i32>,

    /// Last year of the range
    #[arg(long)]
    to: Option<i32>,

    /// Comma-separated crime types, or "all"
    #[arg(long)]
    crimes: Option<String>,
}

impl From<FilterArgs> for FilterRequest {
    fn from(args: FilterArgs) -> Self {
        FilterRequest {
            units: args.units,
            year_from: args.from.map(|y| y.to_string()),
            year_to: args.to.map(|y| y.to_string()),
            crimes: args.crimes,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Tui);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(data) = cli.data {
        config.data.csv_path = data;
    }

    match command {
        Commands::Summary { filter, top } => {
            init_logging(Verbosity::from_flags(cli.verbose, false));
            let dataset = load_dataset(&config)?;
            run_summary(&dataset, &config, filter.into(), top)
        }
        Commands::Tui => {
            // stay quiet on the alternate screen unless asked
            crime_dashboard::logging::init_stderr_logging(Verbosity::from_flags(
                cli.verbose,
                cli.verbose == 0,
            ));
            let dataset = load_dataset(&config)?;
            run_ui_mode(dataset, &config)
        }
    }
}

fn load_dataset(config: &Config) -> Result<Dataset> {
    load_csv(&config.data.csv_path)
        .with_context(|| format!("Failed to load dataset {:?}", config.data.csv_path))
}

fn run_summary(dataset: &Dataset, config: &Config, request: FilterRequest, top: usize) -> Result<()> {
    let base = Filter::from_defaults(dataset, &config.defaults);
    let filter = request
        .resolve(dataset, &base)
        .context("Invalid filter")?;
    let cards = summary_cards(dataset, &filter);

    let units: Vec<&str> = filter.units.iter().map(String::as_str).collect();
    println!("Bangladesh Crime Data ({}-{})", filter.years.start, filter.years.end);
    println!("Units: {}", if units.is_empty() { "-".to_string() } else { units.join(", ") });
    println!();
    println!("  Total Cases   {:>12}", cards.total_cases);
    println!("  Avg Monthly   {:>12}", cards.avg_monthly);
    println!("  Peak Crime    {:>12}", cards.peak_crime);
    println!("  Units         {:>12}", cards.units);

    let rows = filter.apply(dataset);
    let ranked = aggregate::top_units(&rows, top);
    if !ranked.is_empty() {
        println!();
        println!("Top {} units:", ranked.len());
        for (i, (unit, total)) in ranked.iter().enumerate() {
            println!(
                "  {:>2}. {:<24} {:>12}",
                i + 1,
                unit,
                crime_dashboard::format_thousands(*total as f64)
            );
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(dataset: Dataset, config: &Config) -> Result<()> {
    tracing::info!(records = dataset.len(), "starting terminal dashboard");
    let mut app = ui::App::new(dataset, config);
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_dataset: Dataset, _config: &Config) -> Result<()> {
    anyhow::bail!(
        "TUI mode not available; rebuild with `--features tui` or run `crime-dashboard summary`"
    )
}
