/// Error types for GapDash
use thiserror::Error;

/// Failure to load the dashboard's dataset. Always fatal at startup.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The dataset file could not be read
    #[error("Failed to read dataset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV input
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed JSON input
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The source has a header but no rows, or nothing at all
    #[error("Dataset '{0}' is empty")]
    Empty(String),

    /// A data row has a different number of fields than the header
    #[error("Row {row} has {found} fields, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Input is structurally valid but not a table
    #[error("Invalid dataset format: {0}")]
    InvalidFormat(String),

    /// The file extension does not name a supported format
    #[error("Unsupported dataset format '{0}' (expected .csv or .json)")]
    UnsupportedFormat(String),
}

/// Data-shape problems found while grouping a row set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    /// A row in the set carries no value at all for the grouping column
    #[error("Row {row} has no '{column}' column")]
    MissingColumn { column: String, row: usize },
}

/// Failure while drawing the bar chart.
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Chart rendering failed: {0}")]
    Render(String),
}

/// Invalid startup configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a number, got '{value}'")]
    NotANumber { name: &'static str, value: String },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("{name} must not be empty")]
    Blank { name: &'static str },
}
