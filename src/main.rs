//! roi-dashboard: interactive report for per-region statistics
//!
//! Loads the combined results table, serves it as a sortable, filterable table and
//! draws a bar chart of whichever rows are selected.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

mod chart;
mod config;
mod controller;
mod dataset;
mod error;
mod filter;
mod loader;
mod selection;
#[cfg(feature = "serve")]
mod serve;
mod statistic;
mod table;

use crate::config::Config;
use crate::selection::SelectionState;
use crate::statistic::Statistic;

/// Interactive dashboard for per-region statistics
#[derive(Parser, Debug)]
#[command(name = "roi-dashboard")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(about = "Explore per-region statistics in a selectable table with a linked bar chart")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    args: ServeArgs,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Derive the bar chart for given rows and print it as Plotly JSON
    PrintChart(PrintChartArgs),
}

/// Arguments for serving the dashboard (default command)
#[derive(Parser, Debug)]
struct ServeArgs {
    /// Results directory (containing Summarised_results/) or combined_results.json
    results: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port for web server (overrides config, default: 8050)
    #[arg(long)]
    port: Option<u16>,

    /// Do not open a browser window
    #[arg(long)]
    no_browser: bool,

    /// Statistic shown on load: Mean, Std_dev, Min, Max, Voxels, Excluded_Voxels
    #[arg(long)]
    statistic: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Arguments for the print-chart subcommand
#[derive(Parser, Debug)]
struct PrintChartArgs {
    /// Results directory or combined_results.json
    results: PathBuf,

    /// Row ids to plot (comma-separated)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    ids: Vec<usize>,

    /// Statistic to plot
    #[arg(long, default_value = "Mean")]
    statistic: String,

    /// YAML configuration file (for chart colours and height)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the chart specification instead of the Plotly figure
    #[arg(long)]
    spec: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::PrintChart(args)) => run_print_chart(args),
        None => run_serve(cli.args),
    }
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            info!("Loading configuration: {}", path.display());
            Config::from_yaml(path)
        }
        None => Ok(Config::default()),
    }
}

/// Serve the dashboard until interrupted
fn run_serve(args: ServeArgs) -> Result<()> {
    init_logging(args.verbose);
    info!("roi-dashboard v{}", env!("CARGO_PKG_VERSION"));

    let results = args
        .results
        .as_ref()
        .context("A results directory or JSON file is required")?;

    let mut config = load_config(args.config.as_ref())?;
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_browser {
        config.server.open_browser = false;
    }
    if let Some(statistic) = &args.statistic {
        config.display.default_statistic = statistic.clone();
    }
    config.validate()?;

    let dataset = loader::load_dataset(results)?;
    let statistic = config.default_statistic()?;
    let dashboard = controller::Dashboard::new(dataset, statistic, config.palette());

    serve_dashboard(dashboard, &config)
}

#[cfg(feature = "serve")]
fn serve_dashboard(dashboard: controller::Dashboard, config: &Config) -> Result<()> {
    let options = serve::ServeOptions {
        address: config.address(),
        open_browser: config.server.open_browser,
        background: config.display.background.clone(),
        text: config.display.text.clone(),
        chart_height: config.display.chart_height,
    };
    serve::start_server(dashboard, &options)
}

#[cfg(not(feature = "serve"))]
fn serve_dashboard(_dashboard: controller::Dashboard, _config: &Config) -> Result<()> {
    anyhow::bail!("This build does not include the web server; rebuild with --features serve")
}

/// Print the chart for the given rows without starting a server
fn run_print_chart(args: PrintChartArgs) -> Result<()> {
    init_logging(args.verbose);

    let config = load_config(args.config.as_ref())?;
    let statistic: Statistic = args.statistic.parse()?;
    let dataset = loader::load_dataset(&args.results)?;

    let selection: SelectionState = args.ids.iter().copied().collect();
    let derivation = chart::derive_chart(&dataset, &selection, statistic);
    for notice in &derivation.notices {
        log::warn!("{}", notice);
    }

    let chart = derivation
        .chart
        .context("No rows selected; pass at least one existing row id with --ids")?;

    let output = if args.spec {
        serde_json::to_string_pretty(&chart)?
    } else {
        let figure = chart.to_figure(&config.display.background, config.display.chart_height);
        serde_json::to_string_pretty(&figure)?
    };
    println!("{}", output);

    Ok(())
}
