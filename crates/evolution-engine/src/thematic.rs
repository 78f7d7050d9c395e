//! Strategic-diagram classification of communities.
//!
//! Each community with at least two members gets a centrality (external
//! weight per member) and a density (internal weight per possible pair).
//! Quadrants are assigned against the medians of the same window.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::community::Partition;
use crate::graph::CooccurrenceGraph;

/// Default number of top words listed per theme.
pub const DEFAULT_TOP_WORDS: usize = 5;

/// Quadrant of the strategic diagram.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// Central and dense
    Motor,
    /// Central but loosely knit
    Basic,
    /// Dense but peripheral
    Niche,
    /// Peripheral and loosely knit
    EmergingDeclining,
}

impl Quadrant {
    /// Classify against window medians. Ties go to the upper half.
    pub fn classify(
        centrality: f64,
        density: f64,
        median_centrality: f64,
        median_density: f64,
    ) -> Self {
        match (centrality >= median_centrality, density >= median_density) {
            (true, true) => Quadrant::Motor,
            (true, false) => Quadrant::Basic,
            (false, true) => Quadrant::Niche,
            (false, false) => Quadrant::EmergingDeclining,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quadrant::Motor => "Motor Themes",
            Quadrant::Basic => "Basic Themes",
            Quadrant::Niche => "Niche Themes",
            Quadrant::EmergingDeclining => "Emerging/Declining Themes",
        }
    }
}

impl std::fmt::Display for Quadrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThematicPoint {
    pub cluster_id: usize,
    /// Highest-frequency member
    pub label: String,
    pub top_words: Vec<String>,
    pub size: usize,
    pub centrality: f64,
    pub density: f64,
    pub quadrant: Quadrant,
}

/// All classified communities of one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ThematicMap {
    pub points: Vec<ThematicPoint>,
    pub median_centrality: f64,
    pub median_density: f64,
}

impl ThematicMap {
    /// Recompute medians and quadrants from the points' own centrality and
    /// density. Classification depends on nothing else.
    pub fn from_points(mut points: Vec<ThematicPoint>) -> Self {
        let median_centrality = median(points.iter().map(|p| p.centrality).collect());
        let median_density = median(points.iter().map(|p| p.density).collect());
        for point in &mut points {
            point.quadrant = Quadrant::classify(
                point.centrality,
                point.density,
                median_centrality,
                median_density,
            );
        }
        Self {
            points,
            median_centrality,
            median_density,
        }
    }

    /// Rerun classification on this map's rows.
    pub fn reclassify(&self) -> Self {
        Self::from_points(self.points.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Points in the given quadrant.
    pub fn in_quadrant(&self, quadrant: Quadrant) -> impl Iterator<Item = &ThematicPoint> {
        self.points.iter().filter(move |p| p.quadrant == quadrant)
    }
}

/// Median of a sample; 0 for an empty sample.
pub fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Computes thematic maps from a graph and its partition.
#[derive(Debug, Clone)]
pub struct ThematicMapClassifier {
    top_words: usize,
}

impl Default for ThematicMapClassifier {
    fn default() -> Self {
        Self {
            top_words: DEFAULT_TOP_WORDS,
        }
    }
}

impl ThematicMapClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_words(mut self, n: usize) -> Self {
        self.top_words = n;
        self
    }

    /// Classify every community of size two or more.
    pub fn classify(&self, graph: &CooccurrenceGraph, partition: &Partition) -> ThematicMap {
        let members = members_by_frequency(graph, partition);

        let mut internal: BTreeMap<usize, f64> = BTreeMap::new();
        let mut external: BTreeMap<usize, f64> = BTreeMap::new();
        for edge in graph.edges() {
            let w = f64::from(edge.weight);
            let (Some(a), Some(b)) = (
                partition.community_of(&edge.source),
                partition.community_of(&edge.target),
            ) else {
                continue;
            };
            if a == b {
                *internal.entry(a).or_insert(0.0) += w;
            } else {
                *external.entry(a).or_insert(0.0) += w;
                *external.entry(b).or_insert(0.0) += w;
            }
        }

        let points = members
            .into_iter()
            .filter(|(_, m)| m.len() >= 2)
            .map(|(cluster_id, m)| {
                let size = m.len();
                let pairs = (size * (size - 1) / 2) as f64;
                let inside = internal.get(&cluster_id).copied().unwrap_or(0.0);
                let outside = external.get(&cluster_id).copied().unwrap_or(0.0);
                ThematicPoint {
                    cluster_id,
                    label: m[0].clone(),
                    top_words: m.iter().take(self.top_words).cloned().collect(),
                    size,
                    centrality: outside / size as f64,
                    density: if pairs > 0.0 { inside / pairs } else { 0.0 },
                    quadrant: Quadrant::EmergingDeclining,
                }
            })
            .collect();

        ThematicMap::from_points(points)
    }
}

/// A community labeled by its most frequent member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledCluster {
    pub cluster_id: usize,
    pub label: String,
    /// Members by frequency, descending
    pub members: Vec<String>,
}

impl LabeledCluster {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// The `n` largest communities (ties by id), each labeled by its most
/// frequent member.
pub fn labeled_clusters(
    graph: &CooccurrenceGraph,
    partition: &Partition,
    n: usize,
) -> Vec<LabeledCluster> {
    let mut clusters: Vec<LabeledCluster> = members_by_frequency(graph, partition)
        .into_iter()
        .filter_map(|(cluster_id, members)| {
            let label = members.first()?.clone();
            Some(LabeledCluster {
                cluster_id,
                label,
                members,
            })
        })
        .collect();
    clusters.sort_by(|a, b| {
        b.size()
            .cmp(&a.size())
            .then(a.cluster_id.cmp(&b.cluster_id))
    });
    clusters.truncate(n);
    clusters
}

/// Community members sorted by frequency descending, then name.
fn members_by_frequency(
    graph: &CooccurrenceGraph,
    partition: &Partition,
) -> BTreeMap<usize, Vec<String>> {
    let mut groups: BTreeMap<usize, Vec<(u32, String)>> = BTreeMap::new();
    for node in graph.nodes() {
        if let Some(id) = partition.community_of(&node.keyword) {
            groups
                .entry(id)
                .or_default()
                .push((node.frequency, node.keyword.clone()));
        }
    }
    groups
        .into_iter()
        .map(|(id, mut members)| {
            members.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
            (id, members.into_iter().map(|(_, k)| k).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::{CommunityDetector, ConnectedComponentsFallback, DetectionMethod};
    use crate::graph::{CooccurrenceEdge, KeywordNode};

    const EPS: f64 = 1e-9;

    fn node(k: &str, f: u32) -> KeywordNode {
        KeywordNode {
            keyword: k.to_string(),
            frequency: f,
        }
    }

    fn partition_of(groups: &[&[&str]], graph: &CooccurrenceGraph) -> Partition {
        Partition::from_groups(
            groups
                .iter()
                .map(|g| g.iter().map(|s| s.to_string()).collect())
                .collect(),
            graph,
            DetectionMethod::Louvain,
        )
    }

    /// Triangle {aa,bb,cc} (weights 2), pair {dd,ee} (weight 1), bridge cc-dd
    /// (weight 1), isolated ff.
    fn sample() -> CooccurrenceGraph {
        CooccurrenceGraph::from_parts(
            vec![
                node("aa", 5),
                node("bb", 3),
                node("cc", 4),
                node("dd", 2),
                node("ee", 2),
                node("ff", 1),
            ],
            vec![
                CooccurrenceEdge::new("aa", "bb", 2),
                CooccurrenceEdge::new("aa", "cc", 2),
                CooccurrenceEdge::new("bb", "cc", 2),
                CooccurrenceEdge::new("dd", "ee", 1),
                CooccurrenceEdge::new("cc", "dd", 1),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_quadrant_rules() {
        assert_eq!(Quadrant::classify(1.0, 1.0, 1.0, 1.0), Quadrant::Motor);
        assert_eq!(Quadrant::classify(2.0, 0.5, 1.0, 1.0), Quadrant::Basic);
        assert_eq!(Quadrant::classify(0.5, 2.0, 1.0, 1.0), Quadrant::Niche);
        assert_eq!(
            Quadrant::classify(0.5, 0.5, 1.0, 1.0),
            Quadrant::EmergingDeclining
        );
    }

    #[test]
    fn test_metrics() {
        let graph = sample();
        let partition = partition_of(&[&["aa", "bb", "cc"], &["dd", "ee"], &["ff"]], &graph);
        let map = ThematicMapClassifier::new().classify(&graph, &partition);

        assert_eq!(map.len(), 2);
        let triangle = &map.points[0];
        assert_eq!(triangle.label, "aa");
        assert_eq!(triangle.top_words, vec!["aa", "cc", "bb"]);
        assert_eq!(triangle.size, 3);
        assert!((triangle.density - 2.0).abs() < EPS);
        assert!((triangle.centrality - 1.0 / 3.0).abs() < EPS);

        let pair = &map.points[1];
        assert_eq!(pair.label, "dd");
        assert!((pair.density - 1.0).abs() < EPS);
        assert!((pair.centrality - 0.5).abs() < EPS);
    }

    #[test]
    fn test_singletons_excluded() {
        let graph = sample();
        let partition = partition_of(&[&["aa", "bb", "cc"], &["dd", "ee"], &["ff"]], &graph);
        let map = ThematicMapClassifier::new().classify(&graph, &partition);
        assert!(map.points.iter().all(|p| p.size >= 2));
        assert!(map.points.iter().all(|p| p.cluster_id != 2));
    }

    #[test]
    fn test_medians_and_quadrants() {
        let graph = sample();
        let partition = partition_of(&[&["aa", "bb", "cc"], &["dd", "ee"], &["ff"]], &graph);
        let map = ThematicMapClassifier::new().classify(&graph, &partition);

        // centralities {1/3, 1/2}, densities {2, 1}
        assert!((map.median_centrality - (1.0 / 3.0 + 0.5) / 2.0).abs() < EPS);
        assert!((map.median_density - 1.5).abs() < EPS);
        assert_eq!(map.points[0].quadrant, Quadrant::Niche);
        assert_eq!(map.points[1].quadrant, Quadrant::Basic);
    }

    #[test]
    fn test_reclassify_is_stable() {
        let graph = sample();
        let partition = ConnectedComponentsFallback.detect(&graph);
        let map = ThematicMapClassifier::new().classify(&graph, &partition);
        assert_eq!(map.reclassify(), map);
    }

    #[test]
    fn test_reclassify_ignores_stored_quadrant() {
        let graph = sample();
        let partition = partition_of(&[&["aa", "bb", "cc"], &["dd", "ee"], &["ff"]], &graph);
        let map = ThematicMapClassifier::new().classify(&graph, &partition);

        let mut tampered = map.clone();
        for p in &mut tampered.points {
            p.quadrant = Quadrant::Motor;
        }
        assert_eq!(tampered.reclassify(), map);
    }

    #[test]
    fn test_empty_graph_map() {
        let graph = CooccurrenceGraph::new();
        let partition = Partition::empty(DetectionMethod::Louvain);
        let map = ThematicMapClassifier::new().classify(&graph, &partition);
        assert!(map.is_empty());
        assert_eq!(map.median_centrality, 0.0);
        assert_eq!(map.median_density, 0.0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(vec![]), 0.0);
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn test_labeled_clusters() {
        let graph = sample();
        let partition = partition_of(&[&["aa", "bb", "cc"], &["dd", "ee"], &["ff"]], &graph);
        let clusters = labeled_clusters(&graph, &partition, 2);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].label, "aa");
        assert_eq!(clusters[0].members, vec!["aa", "cc", "bb"]);
        assert_eq!(clusters[1].label, "dd");
        assert_eq!(clusters[1].members, vec!["dd", "ee"]);
    }
}
