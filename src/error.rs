// Error types - one enum for loading, filtering and config failures
//
// The web layer maps each variant to an HTTP status via `Error::status_code`.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for dashboard operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Dataset Errors ===
    /// Failed to open the CSV dataset.
    #[error("failed to open dataset at {path}: {source}")]
    DatasetOpen {
        /// Path to the CSV file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    /// The CSV reader rejected the file (bad header, ragged row, bad UTF-8).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A cell held a value that cannot be used.
    #[error("invalid value '{value}' in column '{column}' on line {line}")]
    InvalidValue {
        /// 1-based CSV line number.
        line: u64,
        /// Column header.
        column: String,
        /// Raw cell contents.
        value: String,
    },

    /// The dataset contains no rows.
    #[error("dataset is empty")]
    EmptyDataset,

    // === Filter Errors ===
    /// A requested unit does not exist in the dataset.
    #[error("unknown police unit: {0}")]
    UnknownUnit(String),

    /// A requested crime type is not one of the known columns.
    #[error("unknown crime type: {0}")]
    UnknownCrimeType(String),

    /// A requested year range is reversed or outside the dataset.
    #[error("invalid year range {from}-{to} (dataset covers {min}-{max})")]
    InvalidYearRange {
        /// Requested start year.
        from: i32,
        /// Requested end year.
        to: i32,
        /// First year in the dataset.
        min: i32,
        /// Last year in the dataset.
        max: i32,
    },

    /// A numeric query parameter could not be parsed.
    #[error("invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    // === Dashboard Errors ===
    /// No tab with this name.
    #[error("unknown tab: {0}")]
    UnknownTab(String),

    /// No chart with this name.
    #[error("unknown chart: {0}")]
    UnknownChart(String),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for dashboard operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a config validation error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// True when the error was caused by user input rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownUnit(_)
                | Self::UnknownCrimeType(_)
                | Self::InvalidYearRange { .. }
                | Self::InvalidParameter { .. }
                | Self::UnknownTab(_)
                | Self::UnknownChart(_)
        )
    }

    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownTab(_) | Self::UnknownChart(_) => 404,
            _ if self.is_client_error() => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownUnit("XYZ".to_string());
        assert_eq!(err.to_string(), "unknown police unit: XYZ");

        let err = Error::EmptyDataset;
        assert_eq!(err.to_string(), "dataset is empty");
    }

    #[test]
    fn test_invalid_value_display() {
        let err = Error::InvalidValue {
            line: 7,
            column: "Murder".to_string(),
            value: "-3".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Murder"));
        assert!(msg.contains("line 7"));
        assert!(msg.contains("-3"));
    }

    #[test]
    fn test_year_range_display() {
        let err = Error::InvalidYearRange {
            from: 2030,
            to: 2031,
            min: 2021,
            max: 2025,
        };
        assert_eq!(
            err.to_string(),
            "invalid year range 2030-2031 (dataset covers 2021-2025)"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::UnknownUnit("x".into()).status_code(), 400);
        assert_eq!(Error::UnknownCrimeType("x".into()).status_code(), 400);
        assert_eq!(Error::UnknownTab("x".into()).status_code(), 404);
        assert_eq!(Error::UnknownChart("x".into()).status_code(), 404);
        assert_eq!(Error::EmptyDataset.status_code(), 500);
        assert_eq!(Error::config("bad").status_code(), 500);
    }

    #[test]
    fn test_is_client_error() {
        assert!(Error::InvalidParameter {
            name: "limit",
            value: "abc".into()
        }
        .is_client_error());
        assert!(!Error::EmptyDataset.is_client_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_config_validation_display() {
        let err = Error::config("port must be non-zero");
        assert!(err.to_string().contains("port must be non-zero"));
    }
}
