// Error taxonomy for the dashboard library
// Binaries wrap these in anyhow at the outer edge

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// An aggregation that has no value over zero records (mean rating).
    /// The controller recovers this into a placeholder view.
    #[error("no data: {aggregation} is undefined over an empty selection")]
    NoData { aggregation: &'static str },

    /// Source row rejected by the loader. The core never sees these.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
