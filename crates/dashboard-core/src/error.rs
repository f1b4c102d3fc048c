use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the site dashboard.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// The source file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader or writer rejected the input.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// One or more required columns are absent from the header row.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The source has a header but no usable rows.
    #[error("No data rows found in {0}")]
    EmptyFile(PathBuf),

    /// No data file was configured and none could be discovered.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// The active filters selected zero rows.
    #[error("No data available for the selected filters")]
    EmptySelection,

    /// An hour range outside `0..=23` or with `lo > hi`.
    #[error("Invalid hour range: {lo}-{hi}")]
    InvalidHourRange { lo: u8, hi: u8 },

    /// A column name that the table does not carry.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DashboardError {
    /// `true` for errors raised while loading the source table.
    ///
    /// These abort the session; everything else is recovered per view.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            DashboardError::FileRead { .. }
                | DashboardError::Csv(_)
                | DashboardError::MissingColumns(_)
                | DashboardError::EmptyFile(_)
                | DashboardError::DataPathNotFound(_)
        )
    }
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = DashboardError::FileRead {
            path: PathBuf::from("/data/site_metrics.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/site_metrics.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_missing_columns() {
        let err = DashboardError::MissingColumns(vec!["hour".to_string(), "ct_sum".to_string()]);
        assert_eq!(err.to_string(), "Missing required columns: hour, ct_sum");
    }

    #[test]
    fn test_error_display_empty_file() {
        let err = DashboardError::EmptyFile(PathBuf::from("/empty.csv"));
        assert_eq!(err.to_string(), "No data rows found in /empty.csv");
    }

    #[test]
    fn test_error_display_invalid_hour_range() {
        let err = DashboardError::InvalidHourRange { lo: 20, hi: 3 };
        assert_eq!(err.to_string(), "Invalid hour range: 20-3");
    }

    #[test]
    fn test_error_display_empty_selection() {
        let err = DashboardError::EmptySelection;
        assert_eq!(
            err.to_string(),
            "No data available for the selected filters"
        );
    }

    #[test]
    fn test_is_load_error_classification() {
        assert!(DashboardError::EmptyFile(PathBuf::from("x.csv")).is_load_error());
        assert!(DashboardError::MissingColumns(vec![]).is_load_error());
        assert!(DashboardError::DataPathNotFound(PathBuf::from("data")).is_load_error());
        assert!(!DashboardError::EmptySelection.is_load_error());
        assert!(!DashboardError::InvalidHourRange { lo: 5, hi: 2 }.is_load_error());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DashboardError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }
}
