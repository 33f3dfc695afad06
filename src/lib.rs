// Supermarket Dashboard - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod aggregation;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod errors;
pub mod filter;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;

#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use aggregation::{
    CategoryShares, CityGenderCount, GroupedCounts, ProductLineCount, ScalarIndicator,
    TimeSeries, TrendPoint, TrendSettings,
};
pub use config::{load_config, Config};
pub use dashboard::{Dashboard, DashboardViews, FacetOptions, ViewModel};
pub use dataset::{load_csv, load_csv_from_reader, DatasetStore, ProductLine, TransactionRecord};
pub use errors::DashboardError;
pub use filter::FilterSelection;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
