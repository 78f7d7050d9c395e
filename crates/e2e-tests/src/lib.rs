//! End-to-end test infrastructure for the thematic evolution engine.
//!
//! Provides corpus builders and settings helpers shared by the scenario
//! tests under `tests/`.

use std::collections::{BTreeSet, HashMap, HashSet};

use evolution_engine::{NormalizedDocument, TimeWindow};
use evolution_types::{Settings, TaggedDocument};

/// Builds tagged document collections year by year.
#[derive(Debug, Default, Clone)]
pub struct CorpusBuilder {
    documents: Vec<TaggedDocument>,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` documents in `year` with the same raw keyword field.
    pub fn year(mut self, year: i32, count: usize, field: &str) -> Self {
        for _ in 0..count {
            self.documents.push(TaggedDocument::new(year, field));
        }
        self
    }

    /// Add `count` documents per year over an inclusive range.
    pub fn years(mut self, first: i32, last: i32, count: usize, field: &str) -> Self {
        for year in first..=last {
            self = self.year(year, count, field);
        }
        self
    }

    pub fn build(self) -> Vec<TaggedDocument> {
        self.documents
    }
}

/// Normalized documents directly from token lists (bypasses the normalizer).
pub fn normalized(year: i32, count: usize, keywords: &[&str]) -> Vec<NormalizedDocument> {
    (0..count)
        .map(|_| NormalizedDocument {
            year,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}

/// Default settings with the given window geometry and Latin `min_freq`.
pub fn settings(length: u32, step: u32, min_freq: u32) -> Settings {
    let mut settings = Settings::default();
    settings.windows.length = length;
    settings.windows.step = step;
    settings.latin.min_freq = min_freq;
    settings.ideographic.min_freq = min_freq;
    settings
}

/// Two dense topics (neuroimaging, sleep) joined by a weak bridge, 2000-2011,
/// plus a third topic (genetics) that appears from 2006 on.
pub fn two_topic_corpus() -> Vec<TaggedDocument> {
    CorpusBuilder::new()
        .years(2000, 2011, 4, "fMRI; EEG; Connectivity; Cortex")
        .years(2000, 2011, 4, "Sleep; Circadian Rhythm; Melatonin; Insomnia")
        .years(2000, 2011, 1, "Cortex; Sleep")
        .years(2006, 2011, 4, "GWAS; Heritability; Polygenic Score")
        .build()
}

/// Document frequency of every token in the documents falling in `window`.
pub fn window_frequencies(
    documents: &[NormalizedDocument],
    window: TimeWindow,
) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for doc in documents.iter().filter(|d| window.contains(d.year)) {
        let unique: HashSet<&String> = doc.keywords.iter().collect();
        for keyword in unique {
            *counts.entry(keyword.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Tokens reaching `min_freq` in `window`, sorted.
pub fn expected_nodes(
    documents: &[NormalizedDocument],
    window: TimeWindow,
    min_freq: u32,
) -> BTreeSet<String> {
    window_frequencies(documents, window)
        .into_iter()
        .filter(|(_, f)| *f >= min_freq)
        .map(|(k, _)| k)
        .collect()
}

