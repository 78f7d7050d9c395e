//! Thematic evolution analysis CLI
//!
//! # Usage
//!
//! ```bash
//! theme-evolution analyze records.jsonl [--language cn] [--window 5] [--step 3] [-f json]
//! theme-evolution forecast records.json [-k keyword ...] [--horizon 5]
//! theme-evolution config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/theme-evolution/config.toml)
//! 3. Environment variables (EVOLUTION_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use evolution_cli::{run_analyze, run_forecast, show_config, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let log_level = cli.log_level.as_deref();

    match &cli.command {
        Commands::Analyze(args) => run_analyze(config, log_level, args)?,
        Commands::Forecast(args) => run_forecast(config, log_level, args)?,
        Commands::Config => show_config(config, log_level)?,
    }

    Ok(())
}
