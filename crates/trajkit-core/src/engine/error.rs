use super::config::ConfigError;
use super::format::FormatError;
use super::host::HostError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Selection '{expression}' matched no atoms")]
    EmptySelection { expression: String },

    #[error("The column '{name}' already exists")]
    NameConflict { name: String },

    #[error("Cannot add column '{name}': the data set already holds {rows} row(s)")]
    ColumnsFrozen { name: String, rows: usize },

    #[error("Row has {found} value(s) but the data set has {expected} column(s)")]
    RowWidth { expected: usize, found: usize },

    #[error(
        "Selection '{expression}' matched {selected} atom(s) but the reference has {reference}"
    )]
    ReferenceMismatch {
        expression: String,
        selected: usize,
        reference: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid column format: {0}")]
    Format(#[from] FormatError),

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Custom(String),
}
