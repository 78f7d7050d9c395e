//! # evolution-engine
//!
//! Temporal co-occurrence and thematic evolution analysis for dated,
//! keyword-tagged documents.
//!
//! Keyword fields are normalized per document, grouped into sliding year
//! windows, and turned into weighted co-occurrence graphs. Each graph is
//! partitioned into communities which are placed on a four-quadrant
//! strategic diagram. Consecutive windows are compared for keyword churn and
//! modularity drift; per-keyword yearly counts are extrapolated with a
//! weighted linear trend.
//!
//! ## Features
//! - Seeded Louvain community detection (`louvain` feature, default on)
//! - Connected-components fallback, tagged as degenerate
//! - Optional parallel window processing (rayon), order preserved
//! - Serializable snapshots, evolution records and forecasts

pub mod community;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod forecast;
pub mod graph;
#[cfg(feature = "louvain")]
pub mod louvain;
pub mod normalizer;
pub mod stopwords;
pub mod thematic;
pub mod trends;
pub mod windows;

pub use community::{
    detector_from_settings, modularity, CommunityDetector, ConnectedComponentsFallback,
    DetectionMethod, Partition,
};
pub use engine::{EngineReport, EvolutionEngine};
pub use error::EngineError;
pub use evolution::{EvolutionRecord, EvolutionTracker};
pub use forecast::{
    aggregate_observations, ForecastOutcome, ForecastReport, ForecastRow, ForecastSeries,
    ForecastSkip, SkippedKeyword, TrendForecaster,
};
pub use graph::{CooccurrenceEdge, CooccurrenceGraph, CooccurrenceGraphBuilder, KeywordNode};
#[cfg(feature = "louvain")]
pub use louvain::ModularityOptimizer;
pub use normalizer::{KeywordNormalizer, NormalizedDocument};
pub use stopwords::StopTerms;
pub use thematic::{
    labeled_clusters, LabeledCluster, Quadrant, ThematicMap, ThematicMapClassifier, ThematicPoint,
};
pub use trends::{EmergingKeyword, KeywordCount, KeywordTrajectories, PeriodTopics};
pub use windows::{EmptyReason, TemporalWindowManager, TimeWindow, WindowOutcome, WindowSnapshot};
