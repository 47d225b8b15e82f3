// Bangladesh Police Crime Dashboard - Core Library
// Shared by the CLI, the terminal UI, the web server and tests

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod logging;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use aggregate::{CrimeTrends, Summary};
pub use chart::{ChartKind, Figure};
pub use config::Config;
pub use dashboard::{
    format_thousands, options, render_chart, render_tab, summary_cards, unit_profile,
    DashboardOptions, DataTable, SummaryCards, Tab, TabContent, UnitProfile,
};
pub use dataset::{load_csv, CrimeCounts, CrimeRecord, CrimeType, Dataset};
pub use error::{Error, Result};
pub use filter::{Filter, FilterRequest, YearRange};
pub use logging::{init_logging, Verbosity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
