//! End-to-end pipeline facade.
//!
//! [`EvolutionEngine`] wires normalization, windowed analysis, evolution
//! tracking, keyword statistics and forecasting for one language, and
//! returns a plain serializable [`EngineReport`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use evolution_types::{coerce_records, Language, RawRecord, Settings, TaggedDocument};

use crate::error::EngineError;
use crate::evolution::{EvolutionRecord, EvolutionTracker};
use crate::forecast::{ForecastReport, ForecastSeries, SkippedKeyword, TrendForecaster};
use crate::normalizer::{KeywordNormalizer, NormalizedDocument};
use crate::stopwords::StopTerms;
use crate::trends::{self, EmergingKeyword, PeriodTopics};
use crate::windows::{snapshots, TemporalWindowManager, WindowOutcome};

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineReport {
    pub language: Language,
    pub generated_at: DateTime<Utc>,
    pub document_count: usize,
    /// Records dropped for a missing or malformed year
    pub dropped_records: usize,
    pub windows: Vec<WindowOutcome>,
    pub evolution: Vec<EvolutionRecord>,
    pub trend_topics: Vec<PeriodTopics>,
    pub emerging: Vec<EmergingKeyword>,
    pub forecasts: BTreeMap<String, ForecastSeries>,
    pub skipped_forecasts: Vec<SkippedKeyword>,
}

impl EngineReport {
    /// Number of windows that produced a snapshot.
    pub fn snapshot_count(&self) -> usize {
        self.windows.iter().filter(|w| !w.is_empty()).count()
    }
}

/// Configured pipeline for one language.
#[derive(Debug)]
pub struct EvolutionEngine {
    settings: Settings,
    language: Language,
    normalizer: KeywordNormalizer,
    windows: TemporalWindowManager,
    tracker: EvolutionTracker,
    forecaster: TrendForecaster,
}

impl EvolutionEngine {
    pub fn new(settings: Settings, language: Language) -> Result<Self, EngineError> {
        settings.validate().map_err(EngineError::InvalidConfig)?;

        let normalizer =
            KeywordNormalizer::new(language, StopTerms::for_language(language, &settings));
        let windows = TemporalWindowManager::from_settings(&settings, language)?;
        let forecaster = TrendForecaster::new(settings.forecast.clone())?;

        info!(
            language = %language,
            min_freq = settings.language(language).min_freq,
            stop_terms = normalizer.stop_terms().len(),
            detector = %windows.detector().method(),
            "Evolution engine ready"
        );

        Ok(Self {
            settings,
            language,
            normalizer,
            windows,
            tracker: EvolutionTracker::new(),
            forecaster,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn normalizer(&self) -> &KeywordNormalizer {
        &self.normalizer
    }

    pub fn window_manager(&self) -> &TemporalWindowManager {
        &self.windows
    }

    pub fn normalize(&self, documents: &[TaggedDocument]) -> Vec<NormalizedDocument> {
        self.normalizer.normalize_documents(documents)
    }

    /// Windowed analysis followed by evolution tracking over the snapshots.
    pub fn analyze(
        &self,
        documents: &[NormalizedDocument],
    ) -> (Vec<WindowOutcome>, Vec<EvolutionRecord>) {
        let outcomes = self.windows.run(documents);
        let evolution = self.tracker.track(&snapshots(&outcomes));
        (outcomes, evolution)
    }

    /// Forecast `targets`, or the most frequent keywords when none are given.
    pub fn forecast(
        &self,
        documents: &[NormalizedDocument],
        targets: Option<&[String]>,
    ) -> ForecastReport {
        let observations = trends::explode_documents(documents);
        let targets: Vec<String> = match targets {
            Some(list) => list.to_vec(),
            None => trends::top_keywords(documents, self.settings.forecast.top_n)
                .into_iter()
                .map(|k| k.keyword)
                .collect(),
        };
        self.forecaster.forecast(&observations, &targets)
    }

    /// Run the full pipeline on already-dated documents.
    #[instrument(skip(self, documents, targets), fields(documents = documents.len()))]
    pub fn run(&self, documents: &[TaggedDocument], targets: Option<&[String]>) -> EngineReport {
        self.run_inner(documents, 0, targets)
    }

    /// Coerce raw records, then run the full pipeline.
    pub fn run_records(
        &self,
        records: impl IntoIterator<Item = RawRecord>,
        targets: Option<&[String]>,
    ) -> EngineReport {
        let coerced = coerce_records(records);
        self.run_inner(&coerced.documents, coerced.dropped, targets)
    }

    fn run_inner(
        &self,
        documents: &[TaggedDocument],
        dropped_records: usize,
        targets: Option<&[String]>,
    ) -> EngineReport {
        let normalized = self.normalize(documents);
        let (windows, evolution) = self.analyze(&normalized);

        let periods: Vec<_> = windows.iter().map(WindowOutcome::window).collect();
        let trend_topics = trends::trend_topics(&normalized, &periods, self.settings.trends.top_n);
        let emerging = trends::emerging_keywords(
            &normalized,
            self.settings.trends.emerging_recent_years,
            self.settings.trends.emerging_min_count,
        );
        let forecast = self.forecast(&normalized, targets);

        let report = EngineReport {
            language: self.language,
            generated_at: Utc::now(),
            document_count: documents.len(),
            dropped_records,
            windows,
            evolution,
            trend_topics,
            emerging,
            forecasts: forecast.series,
            skipped_forecasts: forecast.skipped,
        };
        info!(
            documents = report.document_count,
            windows = report.windows.len(),
            snapshots = report.snapshot_count(),
            forecasts = report.forecasts.len(),
            "Pipeline complete"
        );
        report
    }
}
