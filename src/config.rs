use crate::aggregation::TrendSettings;
use crate::errors::{DashboardError, Result};
use chrono::Weekday;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub trend: TrendConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

fn default_addr() -> String {
    "0.0.0.0:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrendConfig {
    /// Weekday name, e.g. "monday" or "sun"
    #[serde(default = "default_week_start")]
    pub week_start: String,

    #[serde(default = "default_true")]
    pub drop_final_point: bool,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            week_start: default_week_start(),
            drop_final_point: true,
        }
    }
}

fn default_week_start() -> String {
    "monday".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log file used by the terminal dashboard
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

fn default_log_file() -> String {
    "logs/dashboard.log".to_string()
}

impl TrendConfig {
    pub fn settings(&self) -> Result<TrendSettings> {
        let week_start: Weekday = self.week_start.trim().parse().map_err(|_| {
            DashboardError::Config(format!(
                "trend.week_start: '{}' is not a weekday",
                self.week_start
            ))
        })?;

        Ok(TrendSettings {
            week_start,
            drop_final_point: self.drop_final_point,
        })
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[dataset]
path = "data/supermarket_sales.csv"

[server]
addr = "0.0.0.0:3000"

[trend]
week_start = "monday"
drop_final_point = true

[logging]
file = "logs/dashboard.log"
"#;

pub const CONFIG_ENV_VAR: &str = "DASHBOARD_CONFIG";

pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(contents).map_err(|e| DashboardError::Config(e.to_string()))?;
    // Reject a bad weekday up front instead of on first use
    config.trend.settings()?;
    Ok(config)
}

/// Load configuration and log where it came from.
///
/// Search order:
/// 1. $DASHBOARD_CONFIG
/// 2. config.toml next to the executable
/// 3. config.toml in the working directory
/// 4. Embedded default config
pub fn load_config() -> Result<Config> {
    let (config, source) = locate_config()?;
    log_config_source(source.as_deref());
    Ok(config)
}

/// Same search as `load_config`, without logging. Returns the file that was
/// read, or `None` for the embedded default. Use this when the subscriber
/// depends on the config itself.
pub fn locate_config() -> Result<(Config, Option<PathBuf>)> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        let config = read_config(&path)?;
        return Ok((config, Some(path)));
    }

    for candidate in candidate_paths() {
        if candidate.exists() {
            let config = read_config(&candidate)?;
            return Ok((config, Some(candidate)));
        }
    }

    Ok((parse_config(DEFAULT_CONFIG)?, None))
}

pub fn log_config_source(source: Option<&Path>) {
    match source {
        Some(path) => tracing::info!("Loading config from: {}", path.display()),
        None => tracing::warn!("config.toml not found, using default embedded configuration"),
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("config.toml"));
        }
    }
    paths.push(PathBuf::from("config.toml"));
    paths
}

/// Resolve the dataset path. Relative paths are taken from the working
/// directory.
pub fn get_dataset_path(config: &Config) -> PathBuf {
    PathBuf::from(&config.dataset.path)
}
