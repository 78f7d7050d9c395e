//! Sliding temporal windows.
//!
//! Windows are `[start, start + length - 1]`, starting at the earliest year
//! present and advancing by `step` until `start` passes the latest year.
//! Every window either yields a [`WindowSnapshot`] or an explicit
//! [`WindowOutcome::Empty`]; sparse data is never an error.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use evolution_types::{CooccurrenceSettings, Language, Settings, WindowSettings};

use crate::community::{detector_from_settings, CommunityDetector, Partition};
use crate::error::EngineError;
use crate::graph::{CooccurrenceGraph, CooccurrenceGraphBuilder};
use crate::normalizer::NormalizedDocument;
use crate::thematic::{ThematicMap, ThematicMapClassifier};

/// Number of highest-degree keywords recorded per snapshot.
pub const TOP_NODES: usize = 10;

/// An inclusive span of years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i32,
    pub end: i32,
}

impl TimeWindow {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }

    /// Label in `start-end` form.
    pub fn period(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Why a window produced no snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// Fewer documents than `min_documents`
    TooFewDocuments,
    /// No keyword reached the effective minimum frequency
    EmptyVocabulary,
}

/// Complete analysis of one window. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub period: String,
    pub window: TimeWindow,
    pub document_count: usize,
    pub effective_min_freq: u32,
    pub node_count: usize,
    pub edge_count: usize,
    pub n_clusters: usize,
    pub modularity: f64,
    pub top_nodes: Vec<String>,
    pub graph: CooccurrenceGraph,
    pub partition: Partition,
    pub thematic_map: ThematicMap,
}

/// Result for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WindowOutcome {
    Empty {
        window: TimeWindow,
        document_count: usize,
        reason: EmptyReason,
    },
    Snapshot(Box<WindowSnapshot>),
}

impl WindowOutcome {
    pub fn window(&self) -> TimeWindow {
        match self {
            WindowOutcome::Empty { window, .. } => *window,
            WindowOutcome::Snapshot(s) => s.window,
        }
    }

    pub fn snapshot(&self) -> Option<&WindowSnapshot> {
        match self {
            WindowOutcome::Snapshot(s) => Some(s),
            WindowOutcome::Empty { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, WindowOutcome::Empty { .. })
    }
}

/// Snapshots of a run, in window order, skipping empty outcomes.
pub fn snapshots(outcomes: &[WindowOutcome]) -> Vec<&WindowSnapshot> {
    outcomes.iter().filter_map(WindowOutcome::snapshot).collect()
}

/// Slices documents into windows and runs graph, community and thematic
/// analysis once per window.
pub struct TemporalWindowManager {
    settings: WindowSettings,
    min_freq: u32,
    max_keywords_per_doc: usize,
    detector: Box<dyn CommunityDetector>,
    classifier: ThematicMapClassifier,
}

impl std::fmt::Debug for TemporalWindowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporalWindowManager")
            .field("settings", &self.settings)
            .field("min_freq", &self.min_freq)
            .field("max_keywords_per_doc", &self.max_keywords_per_doc)
            .field("detector", &self.detector.method())
            .finish()
    }
}

impl TemporalWindowManager {
    pub fn new(
        settings: WindowSettings,
        min_freq: u32,
        cooccurrence: &CooccurrenceSettings,
        detector: Box<dyn CommunityDetector>,
    ) -> Result<Self, EngineError> {
        if settings.length == 0 {
            return Err(EngineError::InvalidConfig(
                "window length must be at least 1 year".to_string(),
            ));
        }
        if settings.step == 0 {
            return Err(EngineError::InvalidConfig(
                "window step must be at least 1 year".to_string(),
            ));
        }
        if min_freq == 0 {
            return Err(EngineError::InvalidConfig(
                "min_freq must be at least 1".to_string(),
            ));
        }
        if cooccurrence.max_keywords_per_doc < 2 {
            return Err(EngineError::InvalidConfig(
                "max_keywords_per_doc must be at least 2".to_string(),
            ));
        }
        Ok(Self {
            settings,
            min_freq,
            max_keywords_per_doc: cooccurrence.max_keywords_per_doc,
            detector,
            classifier: ThematicMapClassifier::new(),
        })
    }

    /// Build from full settings, picking the language's `min_freq` and the
    /// configured detector.
    pub fn from_settings(settings: &Settings, language: Language) -> Result<Self, EngineError> {
        Self::new(
            settings.windows.clone(),
            settings.language(language).min_freq,
            &settings.cooccurrence,
            detector_from_settings(&settings.community),
        )
    }

    pub fn settings(&self) -> &WindowSettings {
        &self.settings
    }

    pub fn detector(&self) -> &dyn CommunityDetector {
        self.detector.as_ref()
    }

    /// Minimum frequency for a window with `document_count` documents.
    ///
    /// Windows below `small_window_documents` use `max(2, min_freq - 1)`.
    pub fn effective_min_freq(&self, document_count: usize) -> u32 {
        if document_count < self.settings.small_window_documents {
            self.min_freq.saturating_sub(1).max(2)
        } else {
            self.min_freq
        }
    }

    /// Window bounds covering the documents' year range.
    pub fn windows(&self, documents: &[NormalizedDocument]) -> Vec<TimeWindow> {
        let years = documents
            .iter()
            .map(|d| d.year)
            .filter(|y| self.settings.max_year.map_or(true, |max| *y <= max));
        let (Some(min), Some(max)) = (years.clone().min(), years.max()) else {
            return Vec::new();
        };

        let span = i32::try_from(self.settings.length - 1).unwrap_or(i32::MAX);
        let step = i32::try_from(self.settings.step).unwrap_or(i32::MAX);
        let mut windows = Vec::new();
        let mut start = min;
        while start <= max {
            windows.push(TimeWindow::new(start, start.saturating_add(span)));
            match start.checked_add(step) {
                Some(next) => start = next,
                None => break,
            }
        }
        windows
    }

    /// Run every window. Output follows window order even when parallel.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub fn run(&self, documents: &[NormalizedDocument]) -> Vec<WindowOutcome> {
        let windows = self.windows(documents);
        info!(
            windows = windows.len(),
            length = self.settings.length,
            step = self.settings.step,
            detector = %self.detector.method(),
            "Processing temporal windows"
        );
        if self.settings.parallel {
            windows
                .par_iter()
                .map(|w| self.process_window(*w, documents))
                .collect()
        } else {
            windows
                .iter()
                .map(|w| self.process_window(*w, documents))
                .collect()
        }
    }

    /// Analyze the documents falling into one window.
    pub fn process_window(
        &self,
        window: TimeWindow,
        documents: &[NormalizedDocument],
    ) -> WindowOutcome {
        let in_window: Vec<&[String]> = documents
            .iter()
            .filter(|d| window.contains(d.year))
            .filter(|d| self.settings.max_year.map_or(true, |max| d.year <= max))
            .map(|d| d.keywords.as_slice())
            .collect();
        let document_count = in_window.len();

        if document_count < self.settings.min_documents {
            debug!(
                period = %window,
                documents = document_count,
                min_documents = self.settings.min_documents,
                "Skipping sparse window"
            );
            return WindowOutcome::Empty {
                window,
                document_count,
                reason: EmptyReason::TooFewDocuments,
            };
        }

        let effective_min_freq = self.effective_min_freq(document_count);
        let graph = CooccurrenceGraphBuilder::new(effective_min_freq)
            .with_max_keywords_per_doc(self.max_keywords_per_doc)
            .build(&in_window);

        if graph.is_empty() {
            debug!(
                period = %window,
                documents = document_count,
                min_freq = effective_min_freq,
                "Window has no keywords above the frequency threshold"
            );
            return WindowOutcome::Empty {
                window,
                document_count,
                reason: EmptyReason::EmptyVocabulary,
            };
        }

        let partition = self.detector.detect(&graph);
        let thematic_map = self.classifier.classify(&graph, &partition);
        let snapshot = WindowSnapshot {
            period: window.period(),
            window,
            document_count,
            effective_min_freq,
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            n_clusters: partition.community_count(),
            modularity: partition.modularity,
            top_nodes: graph.top_nodes(TOP_NODES),
            graph,
            partition,
            thematic_map,
        };

        info!(
            period = %snapshot.period,
            documents = document_count,
            nodes = snapshot.node_count,
            edges = snapshot.edge_count,
            clusters = snapshot.n_clusters,
            modularity = snapshot.modularity,
            "Window analyzed"
        );
        WindowOutcome::Snapshot(Box::new(snapshot))
    }
}
