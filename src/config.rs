// Configuration - layered with figment, later layers win
//
// 1. Built-in defaults
// 2. TOML config file (`config.toml` unless overridden)
// 3. `CRIME_DASHBOARD_*` env vars, `__` separating sections
//    (e.g. `CRIME_DASHBOARD_SERVER__HOST=127.0.0.1`)
// 4. `PORT`, as set by hosting platforms

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default dataset file name.
const DATASET_FILE_NAME: &str = "bangladesh_police_crime_data_2021_2025.csv";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dataset location.
    pub data: DataConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Initial filter selection for the dashboard controls.
    pub defaults: DefaultSelection,
    /// Raw data table limits.
    pub table: TableConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub csv_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
}

/// Filter values used when a request leaves a control unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSelection {
    pub units: Vec<String>,
    pub year_from: i32,
    pub year_to: i32,
    pub crimes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Rows shown on the raw data tab.
    pub max_rows: usize,
    /// Upper bound for an explicit `limit` on the records endpoint.
    pub row_limit_cap: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DATASET_FILE_NAME),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8050,
            static_dir: PathBuf::from("web"),
        }
    }
}

impl Default for DefaultSelection {
    fn default() -> Self {
        Self {
            units: vec!["DMP".to_string(), "CMP".to_string()],
            year_from: 2021,
            year_to: 2024,
            crimes: ["Murder", "Robbery", "Narcotics", "Theft", "Woman_Child_Repression"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_rows: 50,
            row_limit_cap: 1_000,
        }
    }
}

/// Only the port, read from the bare `PORT` variable.
#[derive(Debug, Deserialize)]
struct PortOverride {
    port: Option<u16>,
}

impl Config {
    /// Load configuration from the given file (optional) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(CONFIG_FILE_NAME));
        Self::figment(path).extract::<Self>()?.with_port_env()?.validated()
    }

    /// Load from a file and defaults only, ignoring the environment.
    pub fn load_file(path: &Path) -> Result<Self> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract::<Self>()?
            .validated()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CRIME_DASHBOARD_").split("__"))
    }

    fn with_port_env(mut self) -> Result<Self> {
        let over: PortOverride = Figment::new()
            .merge(Env::raw().only(&["PORT"]))
            .extract()?;
        if let Some(port) = over.port {
            self.server.port = port;
        }
        Ok(self)
    }

    /// Check invariants that serde cannot express.
    pub fn validated(self) -> Result<Self> {
        if self.server.port == 0 {
            return Err(Error::config("server.port must be non-zero"));
        }
        if self.table.max_rows == 0 {
            return Err(Error::config("table.max_rows must be at least 1"));
        }
        if self.table.row_limit_cap < self.table.max_rows {
            return Err(Error::config("table.row_limit_cap must be >= table.max_rows"));
        }
        if self.defaults.year_from > self.defaults.year_to {
            return Err(Error::config(format!(
                "defaults.year_from ({}) is after defaults.year_to ({})",
                self.defaults.year_from, self.defaults.year_to
            )));
        }
        Ok(self)
    }

    /// `host:port` for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8050);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.defaults.units, vec!["DMP", "CMP"]);
        assert_eq!((config.defaults.year_from, config.defaults.year_to), (2021, 2024));
        assert_eq!(config.defaults.crimes.len(), 5);
        assert_eq!(config.table.max_rows, 50);
        assert_eq!(
            config.data.csv_path,
            PathBuf::from("bangladesh_police_crime_data_2021_2025.csv")
        );
        assert!(config.validated().is_ok());
    }

    #[test]
    fn test_bind_address() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8050");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load_file(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "dashboard.toml",
                r#"
                [data]
                csv_path = "data/crime.csv"

                [server]
                port = 9000

                [defaults]
                units = ["RMP"]
                year_from = 2022
                year_to = 2023
                "#,
            )?;

            let config = Config::load(Some(Path::new("dashboard.toml"))).unwrap();
            assert_eq!(config.data.csv_path, PathBuf::from("data/crime.csv"));
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.defaults.units, vec!["RMP"]);
            assert_eq!(config.defaults.year_from, 2022);
            // untouched sections keep their defaults
            assert_eq!(config.table.max_rows, 50);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[server]\nport = 9000\nhost = \"127.0.0.1\"")?;
            jail.set_env("CRIME_DASHBOARD_SERVER__HOST", "10.0.0.1");
            jail.set_env("CRIME_DASHBOARD_TABLE__MAX_ROWS", "20");

            let config = Config::load(None).unwrap();
            assert_eq!(config.server.host, "10.0.0.1");
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.table.max_rows, 20);
            Ok(())
        });
    }

    #[test]
    fn test_port_env_wins() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[server]\nport = 9000")?;
            jail.set_env("PORT", "10000");

            let config = Config::load(None).unwrap();
            assert_eq!(config.server.port, 10000);
            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(matches!(
            config.validated(),
            Err(Error::ConfigValidation { .. })
        ));

        let mut config = Config::default();
        config.table.max_rows = 0;
        assert!(config.validated().is_err());

        let mut config = Config::default();
        config.defaults.year_from = 2025;
        config.defaults.year_to = 2021;
        let err = config.validated().unwrap_err();
        assert!(err.to_string().contains("2025"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[server]\nport = \"not a number\"")?;
            let err = Config::load(None).unwrap_err();
            assert!(matches!(err, Error::ConfigLoad(_)));
            Ok(())
        });
    }
}
