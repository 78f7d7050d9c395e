//! Graceful degradation tests.
//!
//! The pipeline must never fail on thin or malformed data: sparse windows,
//! empty vocabularies, bad years and the connected-components fallback all
//! produce explicit, inspectable results.

use pretty_assertions::assert_eq;

use e2e_tests::{normalized, settings, two_topic_corpus, CorpusBuilder};
use evolution_engine::{DetectionMethod, EmptyReason, EvolutionEngine, WindowOutcome};
use evolution_types::{CommunityAlgorithm, Language, RawRecord, RawYear};

#[test]
fn test_connected_components_fallback_completes() {
    let mut s = settings(4, 4, 3);
    s.community.algorithm = CommunityAlgorithm::ConnectedComponents;
    let engine = EvolutionEngine::new(s, Language::Latin).unwrap();
    let report = engine.run(&two_topic_corpus(), None);

    assert_eq!(report.snapshot_count(), 3);
    for outcome in &report.windows {
        let snapshot = outcome.snapshot().unwrap();
        assert_eq!(snapshot.partition.method, DetectionMethod::ConnectedComponents);
        assert!(snapshot.partition.method.is_degenerate());
        assert!(snapshot.partition.covers(&snapshot.graph));
    }
    // the bridge merges both topics into one component
    let first = report.windows[0].snapshot().unwrap();
    assert_eq!(first.n_clusters, 1);
    assert_eq!(first.thematic_map.len(), 1);
}

#[cfg(feature = "louvain")]
#[test]
fn test_fallback_modularity_not_better_than_louvain() {
    let louvain = EvolutionEngine::new(settings(4, 4, 3), Language::Latin).unwrap();
    let mut s = settings(4, 4, 3);
    s.community.algorithm = CommunityAlgorithm::ConnectedComponents;
    let fallback = EvolutionEngine::new(s, Language::Latin).unwrap();

    let corpus = two_topic_corpus();
    let a = louvain.run(&corpus, None);
    let b = fallback.run(&corpus, None);
    for (x, y) in a.windows.iter().zip(&b.windows) {
        let (x, y) = (x.snapshot().unwrap(), y.snapshot().unwrap());
        assert!(x.modularity >= y.modularity);
        assert_eq!(x.partition.method, DetectionMethod::Louvain);
    }
}

#[test]
fn test_empty_input() {
    let engine = EvolutionEngine::new(settings(5, 3, 2), Language::Latin).unwrap();
    let report = engine.run(&[], None);

    assert!(report.windows.is_empty());
    assert!(report.evolution.is_empty());
    assert!(report.forecasts.is_empty());
    assert!(report.emerging.is_empty());
    assert_eq!(report.document_count, 0);
}

#[test]
fn test_sparse_windows_are_reported_not_dropped() {
    let corpus = CorpusBuilder::new()
        .year(2000, 2, "Alpha; Beta")
        .years(2005, 2006, 5, "Alpha; Beta")
        .build();
    let engine = EvolutionEngine::new(settings(3, 3, 2), Language::Latin).unwrap();
    let report = engine.run(&corpus, None);

    // 2000-2002, 2003-2005, 2006-2008
    assert_eq!(report.windows.len(), 3);
    assert_eq!(
        report.windows[0],
        WindowOutcome::Empty {
            window: evolution_engine::TimeWindow::new(2000, 2002),
            document_count: 2,
            reason: EmptyReason::TooFewDocuments,
        }
    );
    assert_eq!(report.snapshot_count(), 2);
    // evolution runs over snapshots only; the first has no predecessor
    assert_eq!(report.evolution.len(), 2);
    assert_eq!(report.evolution[0].period, "2003-2005");
    assert!(report.evolution[0].new_keywords.is_empty());
}

#[test]
fn test_empty_vocabulary_window() {
    let corpus = CorpusBuilder::new()
        .year(2001, 1, "Aa1")
        .year(2001, 1, "Bb2")
        .year(2001, 1, "Cc3")
        .year(2001, 1, "Dd4")
        .year(2001, 1, "")
        .build();
    let engine = EvolutionEngine::new(settings(5, 5, 2), Language::Latin).unwrap();
    let report = engine.run(&corpus, None);

    assert_eq!(report.windows.len(), 1);
    assert!(matches!(
        report.windows[0],
        WindowOutcome::Empty {
            reason: EmptyReason::EmptyVocabulary,
            document_count: 5,
            ..
        }
    ));
    assert!(report.evolution.is_empty());
}

#[test]
fn test_malformed_years_are_dropped() {
    let mut records: Vec<RawRecord> = (0..6)
        .map(|_| RawRecord::new(Some(RawYear::Integer(2010)), Some("Alpha; Beta")))
        .collect();
    records.push(RawRecord::new(None, Some("Alpha")));
    records.push(RawRecord::new(Some(RawYear::Float(f64::NAN)), Some("Alpha")));
    records.push(RawRecord::new(Some(RawYear::Text("unknown".into())), Some("Alpha")));
    records.push(RawRecord::new(Some(RawYear::Text("2011".into())), None));

    let engine = EvolutionEngine::new(settings(5, 5, 2), Language::Latin).unwrap();
    let report = engine.run_records(records, None);

    assert_eq!(report.dropped_records, 3);
    assert_eq!(report.document_count, 7);
    let snapshot = report.windows[0].snapshot().unwrap();
    assert_eq!(snapshot.document_count, 7);
    assert_eq!(snapshot.graph.weight("alpha", "beta"), Some(6));
}

#[test]
fn test_isolated_keywords_never_produce_nan() {
    let mut docs = normalized(2000, 5, &["solo"]);
    docs.extend(normalized(2000, 5, &["pair", "mate"]));
    let engine = EvolutionEngine::new(settings(1, 1, 2), Language::Latin).unwrap();
    let (outcomes, _) = engine.analyze(&docs);

    let snapshot = outcomes[0].snapshot().unwrap();
    assert!(snapshot.modularity.is_finite());
    for point in &snapshot.thematic_map.points {
        assert!(point.centrality.is_finite());
        assert!(point.density.is_finite());
        assert!(point.size >= 2);
    }
    assert_eq!(snapshot.thematic_map.len(), 1);
}
