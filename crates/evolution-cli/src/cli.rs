//! CLI argument parsing for `theme-evolution`.
//!
//! CLI flags override every other configuration source.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Thematic evolution analysis of dated keyword records
///
/// Builds per-window keyword co-occurrence graphs, classifies topic
/// communities and forecasts keyword trends.
#[derive(Parser, Debug)]
#[command(name = "theme-evolution")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/theme-evolution/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run windowed co-occurrence analysis and evolution tracking
    Analyze(AnalyzeArgs),

    /// Forecast keyword trends
    Forecast(ForecastArgs),

    /// Print the effective configuration as TOML
    Config,
}

/// Output rendering
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// Full JSON report
    Json,
}

/// Input and output options shared by the analysis commands
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Records as a JSON array or JSON Lines (`{"year": ..., "keywords": "..."}`)
    pub input: PathBuf,

    /// Keyword script: latin (en) or ideographic (cn, zh)
    #[arg(long, default_value = "latin")]
    pub language: String,

    /// Override the language's minimum keyword frequency
    #[arg(long)]
    pub min_freq: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `analyze`
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Window length in years
    #[arg(long)]
    pub window: Option<u32>,

    /// Window step in years
    #[arg(long)]
    pub step: Option<u32>,

    /// Ignore records after this year
    #[arg(long)]
    pub max_year: Option<i32>,

    /// Process windows in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Keywords to forecast alongside the analysis (default: most frequent)
    #[arg(short = 'k', long = "keyword")]
    pub keywords: Vec<String>,
}

/// Arguments for `forecast`
#[derive(Args, Debug, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Keywords to forecast (default: most frequent)
    #[arg(short = 'k', long = "keyword")]
    pub keywords: Vec<String>,

    /// Years to extrapolate
    #[arg(long)]
    pub horizon: Option<u32>,

    /// Fit with equal weights for every year
    #[arg(long)]
    pub unweighted: bool,

    /// Exclude observations after this year (e.g. an incomplete current year)
    #[arg(long)]
    pub max_year: Option<i32>,
}
