use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;

use supermarket_dashboard::config::{get_dataset_path, load_config, Config};
use supermarket_dashboard::logging::{self, LogTarget};
use supermarket_dashboard::{Dashboard, DatasetStore, FilterSelection};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("summary") => {
            logging::initialize(LogTarget::Stderr)?;
            let selection = parse_selection_args(&args[2..])?;
            run_summary(&selection)?;
        }
        Some("facets") => {
            logging::initialize(LogTarget::Stderr)?;
            run_facets()?;
        }
        Some("help") | Some("--help") | Some("-h") => print_usage(),
        Some(other) => {
            eprintln!("❌ Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
        None => run_ui_mode()?,
    }

    Ok(())
}

fn print_usage() {
    println!("Supermarket Dashboard v{}", supermarket_dashboard::VERSION);
    println!();
    println!("Usage:");
    println!("  supermarket-dashboard                          Interactive terminal dashboard");
    println!("  supermarket-dashboard summary [--gender G]... [--city C]...");
    println!("                                                 Print the five views as JSON");
    println!("  supermarket-dashboard facets                   List selectable genders and cities");
    println!();
    println!("Configuration: $DASHBOARD_CONFIG or config.toml");
}

/// `--gender X` / `--city Y`, each repeatable.
fn parse_selection_args(args: &[String]) -> Result<FilterSelection> {
    let mut selection = FilterSelection::all();
    let mut iter = args.iter();

    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .with_context(|| format!("{} needs a value", flag))?;

        match flag.as_str() {
            "--gender" | "-g" => {
                selection.genders.insert(value.clone());
            }
            "--city" | "-c" => {
                selection.cities.insert(value.clone());
            }
            other => anyhow::bail!("Unknown option: {}", other),
        }
    }

    Ok(selection)
}

fn build_dashboard(config: &Config) -> Result<Dashboard> {
    let csv_path = get_dataset_path(config);
    let store = DatasetStore::from_csv(&csv_path)
        .with_context(|| format!("Failed to load dataset from {}", csv_path.display()))?;
    let trend = config.trend.settings()?;

    Ok(Dashboard::with_trend_settings(Arc::new(store), trend))
}

fn run_summary(selection: &FilterSelection) -> Result<()> {
    let config = load_config()?;
    let dashboard = build_dashboard(&config)?;

    let views = dashboard.update(selection);
    let payload = serde_json::json!({
        "selection": selection,
        "views": views.into_array(),
    });

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_facets() -> Result<()> {
    let config = load_config()?;
    let dashboard = build_dashboard(&config)?;
    let options = dashboard.facet_options();

    println!("Genders: {}", options.genders.join(", "));
    println!("Cities:  {}", options.cities.join(", "));
    if let (Some(first), Some(last)) = (options.first_date, options.last_date) {
        println!("Dates:   {} to {}", first, last);
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    use supermarket_dashboard::config::{locate_config, log_config_source};
    use supermarket_dashboard::ui;

    // The log file path comes from the config, so report its source afterwards
    let (config, source) = locate_config()?;
    logging::initialize(LogTarget::File(config.logging.file.clone().into()))?;
    log_config_source(source.as_deref());

    println!("🖥️  Loading Supermarket Dashboard...\n");
    let dashboard = Arc::new(build_dashboard(&config)?);
    println!("✓ Loaded {} sales\n", dashboard.store().len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(dashboard);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the JSON API: cargo run --bin supermarket-server --features server");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_selection_args() {
        let selection = parse_selection_args(&args(&[
            "--gender", "Male", "--city", "Yangon", "-c", "Mandalay",
        ]))
        .unwrap();

        assert_eq!(selection, FilterSelection::new(["Male"], ["Yangon", "Mandalay"]));
    }

    #[test]
    fn test_parse_selection_args_errors() {
        assert!(parse_selection_args(&args(&["--gender"])).is_err());
        assert!(parse_selection_args(&args(&["--payment", "Cash"])).is_err());
        assert!(parse_selection_args(&[]).unwrap().is_unfiltered());
    }
}
