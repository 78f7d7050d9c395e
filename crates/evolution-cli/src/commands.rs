//! Command implementations.
//!
//! Configuration is resolved as defaults -> config file -> env -> CLI flags;
//! all analysis lives in `evolution-engine`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use evolution_engine::{EngineReport, EvolutionEngine, ForecastReport, Quadrant, WindowOutcome};
use evolution_types::{coerce_records, Language, RawRecord, Settings};

use crate::cli::{AnalyzeArgs, ForecastArgs, InputArgs, OutputFormat};

/// Number of new/lost keywords shown per evolution row.
const PREVIEW: usize = 10;

/// Load settings and apply the global CLI overrides.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over settings.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Parse a language code.
pub fn parse_language(code: &str) -> Result<Language> {
    Language::from_code(code).ok_or_else(|| {
        anyhow!(
            "Unknown language '{}' (expected latin, en, ideographic, cn or zh)",
            code
        )
    })
}

/// Read records from a JSON array or JSON Lines file.
pub fn read_records(path: &Path) -> Result<Vec<RawRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input {}", path.display()))?;
    parse_records(&content).with_context(|| format!("Failed to parse input {}", path.display()))
}

/// Parse records; a leading `[` selects JSON array, otherwise JSON Lines.
pub fn parse_records(content: &str) -> Result<Vec<RawRecord>> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content).context("Invalid JSON array");
    }
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid record on line {}", n + 1))
        })
        .collect()
}

fn apply_input_overrides(settings: &mut Settings, language: Language, input: &InputArgs) {
    if let Some(min_freq) = input.min_freq {
        settings.language_mut(language).min_freq = min_freq;
    }
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("Failed to write output {}", path.display())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// `analyze`: windows, thematic maps, evolution and forecasts.
pub fn run_analyze(
    config_path: Option<&str>,
    log_level: Option<&str>,
    args: &AnalyzeArgs,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level)?;
    init_logging(&settings)?;

    let language = parse_language(&args.input.language)?;
    apply_input_overrides(&mut settings, language, &args.input);
    if let Some(length) = args.window {
        settings.windows.length = length;
    }
    if let Some(step) = args.step {
        settings.windows.step = step;
    }
    if args.max_year.is_some() {
        settings.windows.max_year = args.max_year;
    }
    if args.parallel {
        settings.windows.parallel = true;
    }

    let records = read_records(&args.input.input)?;
    info!(records = records.len(), input = %args.input.input.display(), "Loaded records");

    let engine = EvolutionEngine::new(settings, language).context("Invalid configuration")?;
    let targets = (!args.keywords.is_empty()).then_some(args.keywords.as_slice());
    let report = engine.run_records(records, targets);

    let rendered = match args.input.format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        }
        OutputFormat::Text => render_report(&report),
    };
    write_output(args.input.output.as_deref(), &rendered)
}

/// `forecast`: keyword trend forecasts only.
pub fn run_forecast(
    config_path: Option<&str>,
    log_level: Option<&str>,
    args: &ForecastArgs,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level)?;
    init_logging(&settings)?;

    let language = parse_language(&args.input.language)?;
    apply_input_overrides(&mut settings, language, &args.input);
    if let Some(horizon) = args.horizon {
        settings.forecast.horizon = horizon;
    }
    if args.unweighted {
        settings.forecast.weighted = false;
    }
    if args.max_year.is_some() {
        settings.forecast.max_year = args.max_year;
    }

    let records = read_records(&args.input.input)?;
    let coerced = coerce_records(records);
    info!(
        documents = coerced.documents.len(),
        dropped = coerced.dropped,
        "Loaded records"
    );

    let engine = EvolutionEngine::new(settings, language).context("Invalid configuration")?;
    let documents = engine.normalize(&coerced.documents);
    let targets = (!args.keywords.is_empty()).then_some(args.keywords.as_slice());
    let report = engine.forecast(&documents, targets);

    let rendered = match args.input.format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&report).context("Failed to serialize forecasts")?
        }
        OutputFormat::Text => render_forecasts(&report),
    };
    write_output(args.input.output.as_deref(), &rendered)
}

/// `config`: print the effective settings.
pub fn show_config(config_path: Option<&str>, log_level: Option<&str>) -> Result<()> {
    let settings = load_settings(config_path, log_level)?;
    let rendered = toml::to_string_pretty(&settings).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}

/// Human-readable summary of a full report.
pub fn render_report(report: &EngineReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Thematic evolution ({}, {} documents, {} dropped)",
        report.language, report.document_count, report.dropped_records
    );

    let _ = writeln!(out, "\nWindows:");
    for outcome in &report.windows {
        match outcome {
            WindowOutcome::Empty {
                window,
                document_count,
                reason,
            } => {
                let _ = writeln!(
                    out,
                    "  {}  {} documents  insufficient data ({:?})",
                    window, document_count, reason
                );
            }
            WindowOutcome::Snapshot(s) => {
                let _ = writeln!(
                    out,
                    "  {}  {} documents  {} nodes  {} edges  {} clusters  Q={:.3}",
                    s.period, s.document_count, s.node_count, s.edge_count, s.n_clusters, s.modularity
                );
                for quadrant in [
                    Quadrant::Motor,
                    Quadrant::Basic,
                    Quadrant::Niche,
                    Quadrant::EmergingDeclining,
                ] {
                    let labels: Vec<&str> = s
                        .thematic_map
                        .in_quadrant(quadrant)
                        .map(|p| p.label.as_str())
                        .collect();
                    if !labels.is_empty() {
                        let _ = writeln!(out, "    {}: {}", quadrant, labels.join(", "));
                    }
                }
            }
        }
    }

    let _ = writeln!(out, "\nEvolution:");
    for record in &report.evolution {
        let delta = record
            .modularity_delta
            .map(|d| format!("{:+.3}", d))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {}  nodes={} edges={} clusters={} Q={:.3} dQ={}  +{} -{}",
            record.period,
            record.n_nodes,
            record.n_edges,
            record.n_clusters,
            record.modularity,
            delta,
            record.n_new,
            record.n_lost
        );
        let (new, lost) = record.preview(PREVIEW);
        if !new.is_empty() {
            let _ = writeln!(out, "    new: {}", new.join(", "));
        }
        if !lost.is_empty() {
            let _ = writeln!(out, "    lost: {}", lost.join(", "));
        }
    }

    if !report.emerging.is_empty() {
        let _ = writeln!(out, "\nEmerging keywords:");
        for kw in report.emerging.iter().take(PREVIEW) {
            let growth = match kw.growth {
                Some(g) => format!("{:.2}x", g),
                None => "new".to_string(),
            };
            let _ = writeln!(
                out,
                "  {}  recent={} prior={} {}",
                kw.keyword, kw.recent_count, kw.prior_count, growth
            );
        }
    }

    out.push('\n');
    out.push_str(&render_forecasts(&ForecastReport {
        series: report.forecasts.clone(),
        skipped: report.skipped_forecasts.clone(),
    }));
    out
}

/// Human-readable forecast table.
pub fn render_forecasts(report: &ForecastReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Forecasts ({} keywords, {} skipped):",
        report.series.len(),
        report.skipped.len()
    );
    for (keyword, series) in &report.series {
        let _ = writeln!(
            out,
            "  {}  slope={:+.3}/yr  se={:.3}",
            keyword, series.slope, series.residual_se
        );
        for row in series.forecast_rows() {
            let _ = writeln!(
                out,
                "    {}  {:.1}  [{:.1}, {:.1}]",
                row.year, row.predicted, row.ci_lower, row.ci_upper
            );
        }
    }
    out
}
