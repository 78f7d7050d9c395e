//! Configuration loading for the thematic evolution engine.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/theme-evolution/config.toml`
//! (platform equivalent via `directories`).

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::document::Language;
use crate::error::EvolutionError;

/// Per-language normalization and graph settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageSettings {
    /// Minimum document frequency for a keyword to become a graph node
    pub min_freq: u32,

    /// Include the built-in stop-term list for this language
    #[serde(default = "default_true")]
    pub use_default_stopwords: bool,

    /// Additional stop terms (matched case-insensitively)
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
}

impl LanguageSettings {
    /// Defaults for Latin-script term fields (large grant databases).
    pub fn latin() -> Self {
        Self {
            min_freq: default_latin_min_freq(),
            use_default_stopwords: true,
            extra_stopwords: Vec::new(),
        }
    }

    /// Defaults for ideographic keyword fields (small curated lists).
    pub fn ideographic() -> Self {
        Self {
            min_freq: default_ideographic_min_freq(),
            use_default_stopwords: true,
            extra_stopwords: Vec::new(),
        }
    }
}

fn default_latin_min_freq() -> u32 {
    50
}

fn default_ideographic_min_freq() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

/// Co-occurrence graph construction settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CooccurrenceSettings {
    /// Per-document fan-out cap; bounds pair expansion to O(K^2)
    #[serde(default = "default_max_keywords_per_doc")]
    pub max_keywords_per_doc: usize,
}

fn default_max_keywords_per_doc() -> usize {
    20
}

impl Default for CooccurrenceSettings {
    fn default() -> Self {
        Self {
            max_keywords_per_doc: default_max_keywords_per_doc(),
        }
    }
}

/// Temporal windowing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowSettings {
    /// Window length in years
    #[serde(default = "default_window_length")]
    pub length: u32,

    /// Years between consecutive window starts (< length = overlapping)
    #[serde(default = "default_window_step")]
    pub step: u32,

    /// Windows with fewer documents are skipped
    #[serde(default = "default_min_documents")]
    pub min_documents: usize,

    /// Windows with fewer documents use a relaxed min_freq
    #[serde(default = "default_small_window_documents")]
    pub small_window_documents: usize,

    /// Records after this year are ignored (incomplete trailing years)
    #[serde(default)]
    pub max_year: Option<i32>,

    /// Process windows on the rayon pool; output order is unchanged
    #[serde(default)]
    pub parallel: bool,
}

fn default_window_length() -> u32 {
    5
}

fn default_window_step() -> u32 {
    3
}

fn default_min_documents() -> usize {
    5
}

fn default_small_window_documents() -> usize {
    50
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            length: default_window_length(),
            step: default_window_step(),
            min_documents: default_min_documents(),
            small_window_documents: default_small_window_documents(),
            max_year: None,
            parallel: false,
        }
    }
}

/// Community detection algorithm selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommunityAlgorithm {
    /// Seeded Louvain modularity optimization (default)
    #[default]
    Louvain,
    /// Connected components; degenerate, lower-quality partition
    ConnectedComponents,
}

/// Community detection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunitySettings {
    #[serde(default)]
    pub algorithm: CommunityAlgorithm,

    /// Seed for node visiting order; fixed for reproducible partitions
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Modularity resolution used while optimizing
    #[serde(default = "default_resolution")]
    pub resolution: f64,
}

fn default_seed() -> u64 {
    42
}

fn default_resolution() -> f64 {
    1.0
}

impl Default for CommunitySettings {
    fn default() -> Self {
        Self {
            algorithm: CommunityAlgorithm::default(),
            seed: default_seed(),
            resolution: default_resolution(),
        }
    }
}

/// Keyword trend forecasting settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastSettings {
    /// Years to extrapolate beyond the last observed year
    #[serde(default = "default_horizon")]
    pub horizon: u32,

    /// Keywords averaging fewer occurrences per observed year are skipped
    #[serde(default = "default_min_yearly_avg")]
    pub min_yearly_avg: f64,

    /// Minimum distinct observed years for a fit
    #[serde(default = "default_min_years")]
    pub min_years: usize,

    /// Weight recent years up to 3x the earliest
    #[serde(default = "default_true")]
    pub weighted: bool,

    /// Number of most frequent keywords forecast when no targets are given
    #[serde(default = "default_forecast_top_n")]
    pub top_n: usize,

    /// Observations after this year are excluded from fitting
    #[serde(default)]
    pub max_year: Option<i32>,
}

fn default_horizon() -> u32 {
    5
}

fn default_min_yearly_avg() -> f64 {
    2.0
}

fn default_min_years() -> usize {
    3
}

fn default_forecast_top_n() -> usize {
    30
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            min_yearly_avg: default_min_yearly_avg(),
            min_years: default_min_years(),
            weighted: true,
            top_n: default_forecast_top_n(),
            max_year: None,
        }
    }
}

/// Keyword statistics settings (trend topics, emerging keywords).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendSettings {
    /// Keywords reported per period
    #[serde(default = "default_trend_top_n")]
    pub top_n: usize,

    /// Size of the trailing "recent" span for emerging keyword detection
    #[serde(default = "default_emerging_recent_years")]
    pub emerging_recent_years: u32,

    /// Minimum recent count for an emerging keyword
    #[serde(default = "default_emerging_min_count")]
    pub emerging_min_count: u64,
}

fn default_trend_top_n() -> usize {
    5
}

fn default_emerging_recent_years() -> u32 {
    3
}

fn default_emerging_min_count() -> u64 {
    3
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            top_n: default_trend_top_n(),
            emerging_recent_years: default_emerging_recent_years(),
            emerging_min_count: default_emerging_min_count(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "LanguageSettings::latin")]
    pub latin: LanguageSettings,

    #[serde(default = "LanguageSettings::ideographic")]
    pub ideographic: LanguageSettings,

    #[serde(default)]
    pub cooccurrence: CooccurrenceSettings,

    #[serde(default)]
    pub windows: WindowSettings,

    #[serde(default)]
    pub community: CommunitySettings,

    #[serde(default)]
    pub forecast: ForecastSettings,

    #[serde(default)]
    pub trends: TrendSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            latin: LanguageSettings::latin(),
            ideographic: LanguageSettings::ideographic(),
            cooccurrence: CooccurrenceSettings::default(),
            windows: WindowSettings::default(),
            community: CommunitySettings::default(),
            forecast: ForecastSettings::default(),
            trends: TrendSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/theme-evolution/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (EVOLUTION_*, `__` between section and field)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, EvolutionError> {
        let config_dir = ProjectDirs::from("", "", "theme-evolution")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| EvolutionError::Config(e.to_string()))?
            .set_default("latin.min_freq", i64::from(default_latin_min_freq()))
            .map_err(|e| EvolutionError::Config(e.to_string()))?
            .set_default(
                "ideographic.min_freq",
                i64::from(default_ideographic_min_freq()),
            )
            .map_err(|e| EvolutionError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: EVOLUTION_LOG_LEVEL, EVOLUTION_WINDOWS__STEP, EVOLUTION_LATIN__MIN_FREQ
        builder = builder.add_source(
            Environment::with_prefix("EVOLUTION")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| EvolutionError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| EvolutionError::Config(e.to_string()))?;
        settings.validate().map_err(EvolutionError::Config)?;
        Ok(settings)
    }

    /// Settings for one language.
    pub fn language(&self, language: Language) -> &LanguageSettings {
        match language {
            Language::Latin => &self.latin,
            Language::Ideographic => &self.ideographic,
        }
    }

    /// Mutable settings for one language (for CLI overrides).
    pub fn language_mut(&mut self, language: Language) -> &mut LanguageSettings {
        match language {
            Language::Latin => &mut self.latin,
            Language::Ideographic => &mut self.ideographic,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.windows.length == 0 {
            return Err("windows.length must be > 0".to_string());
        }
        if self.windows.step == 0 {
            return Err("windows.step must be > 0".to_string());
        }
        if self.cooccurrence.max_keywords_per_doc < 2 {
            return Err(format!(
                "cooccurrence.max_keywords_per_doc must be >= 2, got {}",
                self.cooccurrence.max_keywords_per_doc
            ));
        }
        if self.community.resolution.is_nan() || self.community.resolution <= 0.0 {
            return Err(format!(
                "community.resolution must be > 0, got {}",
                self.community.resolution
            ));
        }
        if self.forecast.horizon == 0 {
            return Err("forecast.horizon must be > 0".to_string());
        }
        if self.forecast.min_years < 2 {
            return Err(format!(
                "forecast.min_years must be >= 2, got {}",
                self.forecast.min_years
            ));
        }
        for (name, lang) in [("latin", &self.latin), ("ideographic", &self.ideographic)] {
            if lang.min_freq == 0 {
                return Err(format!("{}.min_freq must be > 0", name));
            }
        }
        Ok(())
    }
}
