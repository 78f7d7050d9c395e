//! End-to-end pipeline tests: raw records through windows, thematic maps
//! and evolution records.

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;

use e2e_tests::{expected_nodes, normalized, settings, two_topic_corpus, CorpusBuilder};
use evolution_engine::{
    CommunityDetector, ConnectedComponentsFallback, EvolutionEngine, EvolutionTracker,
    NormalizedDocument, Quadrant, TemporalWindowManager, TimeWindow, WindowOutcome,
};
use evolution_types::{CooccurrenceSettings, Language, WindowSettings};

fn manager(length: u32, step: u32, min_freq: u32) -> TemporalWindowManager {
    TemporalWindowManager::new(
        WindowSettings {
            length,
            step,
            ..WindowSettings::default()
        },
        min_freq,
        &CooccurrenceSettings::default(),
        evolution_engine::detector_from_settings(&Default::default()),
    )
    .unwrap()
}

/// Window 5, step 5, years 2000-2009: "x" in 3 documents per year, "y" once.
#[test]
fn test_singleton_keyword_scenario() {
    let mut docs: Vec<NormalizedDocument> = Vec::new();
    for year in 2000..=2009 {
        docs.extend(normalized(year, 3, &["x"]));
    }
    docs.extend(normalized(2003, 1, &["y"]));

    let outcomes = manager(5, 5, 2).run(&docs);

    let windows: Vec<TimeWindow> = outcomes.iter().map(WindowOutcome::window).collect();
    assert_eq!(
        windows,
        vec![TimeWindow::new(2000, 2004), TimeWindow::new(2005, 2009)]
    );
    for outcome in &outcomes {
        let snapshot = outcome.snapshot().expect("window should produce a snapshot");
        assert!(!snapshot.graph.contains("y"));
        assert!(snapshot.graph.contains("x"));
        assert_eq!(snapshot.node_count, 1);
        assert_eq!(snapshot.edge_count, 0);
        assert_eq!(snapshot.n_clusters, 1);
        assert!(snapshot.thematic_map.is_empty());
    }
}

#[test]
fn test_full_pipeline_two_topics() {
    let engine = EvolutionEngine::new(settings(4, 4, 3), Language::Latin).unwrap();
    let report = engine.run(&two_topic_corpus(), None);

    assert_eq!(report.windows.len(), 3);
    assert_eq!(report.snapshot_count(), 3);

    let first = report.windows[0].snapshot().unwrap();
    assert_eq!(first.period, "2000-2003");
    assert_eq!(first.node_count, 8);
    assert_eq!(first.graph.weight("cortex", "sleep"), Some(4));

    let second = report.windows[1].snapshot().unwrap();
    let genetics = second
        .thematic_map
        .points
        .iter()
        .find(|p| p.label == "gwas")
        .expect("genetics theme should be mapped");
    assert_eq!(genetics.size, 3);
    assert_eq!(genetics.centrality, 0.0);
    assert_eq!(genetics.top_words, vec!["gwas", "heritability", "polygenic score"]);
}

#[cfg(feature = "louvain")]
#[test]
fn test_louvain_separates_bridged_topics() {
    let engine = EvolutionEngine::new(settings(4, 4, 3), Language::Latin).unwrap();
    let report = engine.run(&two_topic_corpus(), None);
    let first = report.windows[0].snapshot().unwrap();

    assert_eq!(first.n_clusters, 2);
    assert_ne!(
        first.partition.community_of("cortex"),
        first.partition.community_of("sleep")
    );
    assert_eq!(
        first.partition.community_of("fmri"),
        first.partition.community_of("eeg")
    );
    assert!(first.modularity > 0.0);

    let labels: BTreeSet<&str> = first
        .thematic_map
        .points
        .iter()
        .map(|p| p.label.as_str())
        .collect();
    assert_eq!(labels, BTreeSet::from(["cortex", "sleep"]));

    // Isolated and sparser than the two established themes
    let second = report.windows[1].snapshot().unwrap();
    assert_eq!(second.n_clusters, 3);
    let genetics = second
        .thematic_map
        .points
        .iter()
        .find(|p| p.label == "gwas")
        .unwrap();
    assert_eq!(genetics.quadrant, Quadrant::EmergingDeclining);
    assert!(second
        .thematic_map
        .in_quadrant(Quadrant::Motor)
        .any(|p| p.label == "cortex"));
}

#[test]
fn test_evolution_tracks_new_theme() {
    let engine = EvolutionEngine::new(settings(4, 4, 3), Language::Latin).unwrap();
    let report = engine.run(&two_topic_corpus(), None);

    assert_eq!(report.evolution.len(), 3);
    assert!(report.evolution[0].new_keywords.is_empty());
    assert!(report.evolution[0].lost_keywords.is_empty());
    assert_eq!(report.evolution[0].modularity_delta, None);

    assert_eq!(
        report.evolution[1].new_keywords,
        vec!["gwas", "heritability", "polygenic score"]
    );
    assert!(report.evolution[1].lost_keywords.is_empty());
    assert!(report.evolution[2].new_keywords.is_empty());
}

#[test]
fn test_evolution_sets_are_node_differences() {
    let engine = EvolutionEngine::new(settings(3, 2, 3), Language::Latin).unwrap();
    let docs = engine.normalize(&two_topic_corpus());
    let (outcomes, evolution) = engine.analyze(&docs);

    let snapshots: Vec<_> = outcomes.iter().filter_map(WindowOutcome::snapshot).collect();
    assert_eq!(evolution.len(), snapshots.len());
    for i in 1..snapshots.len() {
        let before = snapshots[i - 1].graph.keyword_set();
        let after = snapshots[i].graph.keyword_set();
        let mut new: Vec<String> = after.difference(&before).cloned().collect();
        let mut lost: Vec<String> = before.difference(&after).cloned().collect();
        new.sort();
        lost.sort();
        assert_eq!(evolution[i].new_keywords, new);
        assert_eq!(evolution[i].lost_keywords, lost);
    }
}

#[test]
fn test_graph_invariants_every_window() {
    let engine = EvolutionEngine::new(settings(3, 1, 3), Language::Latin).unwrap();
    let docs = engine.normalize(&two_topic_corpus());
    let outcomes = engine.window_manager().run(&docs);

    for snapshot in outcomes.iter().filter_map(WindowOutcome::snapshot) {
        assert_eq!(
            snapshot.graph.keywords().map(String::from).collect::<BTreeSet<_>>(),
            expected_nodes(&docs, snapshot.window, snapshot.effective_min_freq)
        );
        for edge in snapshot.graph.edges() {
            assert!(edge.weight >= 1);
            assert_ne!(edge.source, edge.target);
            assert_eq!(
                snapshot.graph.weight(&edge.source, &edge.target),
                snapshot.graph.weight(&edge.target, &edge.source)
            );
        }
        assert!(snapshot.partition.covers(&snapshot.graph));
    }
}

#[test]
fn test_small_window_relaxes_min_freq() {
    // 2000-2001 holds 40 documents (relaxed to 4); 2002-2003 holds 60 (kept at 5).
    let mut docs = Vec::new();
    docs.extend(normalized(2000, 36, &["aa", "bb"]));
    docs.extend(normalized(2001, 4, &["cc", "dd"]));
    docs.extend(normalized(2002, 56, &["aa", "bb"]));
    docs.extend(normalized(2003, 4, &["cc", "dd"]));

    let outcomes = manager(2, 2, 5).run(&docs);
    let small = outcomes[0].snapshot().unwrap();
    let large = outcomes[1].snapshot().unwrap();

    assert_eq!(small.document_count, 40);
    assert_eq!(small.effective_min_freq, 4);
    assert!(small.graph.contains("cc"));
    assert_eq!(large.document_count, 60);
    assert_eq!(large.effective_min_freq, 5);
    assert!(!large.graph.contains("cc"));
}

#[test]
fn test_repeated_runs_are_identical() {
    let engine = EvolutionEngine::new(settings(4, 2, 3), Language::Latin).unwrap();
    let first = engine.run(&two_topic_corpus(), None);
    let second = engine.run(&two_topic_corpus(), None);

    assert_eq!(first.windows, second.windows);
    assert_eq!(first.evolution, second.evolution);
    assert_eq!(first.forecasts, second.forecasts);
}

#[test]
fn test_parallel_windows_match_sequential() {
    let sequential = EvolutionEngine::new(settings(3, 1, 3), Language::Latin).unwrap();
    let mut parallel_settings = settings(3, 1, 3);
    parallel_settings.windows.parallel = true;
    let parallel = EvolutionEngine::new(parallel_settings, Language::Latin).unwrap();

    let corpus = two_topic_corpus();
    assert_eq!(
        sequential.run(&corpus, None).windows,
        parallel.run(&corpus, None).windows
    );
}

#[test]
fn test_ideographic_pipeline() {
    let corpus = CorpusBuilder::new()
        .years(2015, 2019, 3, "脑电；睡眠、注意力")
        .years(2015, 2019, 2, "睡眠; 记忆; 研究")
        .build();
    let engine = EvolutionEngine::new(settings(5, 5, 2), Language::Ideographic).unwrap();
    let report = engine.run(&corpus, None);

    let snapshot = report.windows[0].snapshot().unwrap();
    assert_eq!(snapshot.document_count, 25);
    assert!(snapshot.graph.contains("脑电"));
    assert!(snapshot.graph.contains("记忆"));
    assert!(!snapshot.graph.contains("研究"));
    assert_eq!(snapshot.graph.weight("睡眠", "脑电"), Some(15));
    assert_eq!(snapshot.top_nodes[0], "睡眠");
}

#[test]
fn test_evolution_tracker_over_components_partitions() {
    let docs = e2e_tests::normalized(2000, 6, &["aa", "bb"])
        .into_iter()
        .chain(normalized(2003, 6, &["bb", "cc"]))
        .collect::<Vec<_>>();
    let manager = TemporalWindowManager::new(
        WindowSettings {
            length: 3,
            step: 3,
            ..WindowSettings::default()
        },
        2,
        &CooccurrenceSettings::default(),
        Box::new(ConnectedComponentsFallback),
    )
    .unwrap();
    assert!(manager.detector().method().is_degenerate());

    let outcomes = manager.run(&docs);
    let snapshots: Vec<_> = outcomes.iter().filter_map(WindowOutcome::snapshot).collect();
    let records = EvolutionTracker::new().track(&snapshots);
    assert_eq!(records[1].new_keywords, vec!["cc"]);
    assert_eq!(records[1].lost_keywords, vec!["aa"]);
}
