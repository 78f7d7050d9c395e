//! Thematic evolution CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (analyze, forecast, config)

pub mod cli;
pub mod commands;

pub use cli::{AnalyzeArgs, Cli, Commands, ForecastArgs, InputArgs, OutputFormat};
pub use commands::{
    init_logging, load_settings, parse_records, read_records, render_forecasts, render_report,
    run_analyze, run_forecast, show_config,
};
