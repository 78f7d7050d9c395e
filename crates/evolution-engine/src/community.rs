//! Community detection over co-occurrence graphs.
//!
//! Two implementations sit behind [`CommunityDetector`]:
//! - [`ModularityOptimizer`](crate::louvain::ModularityOptimizer): seeded
//!   Louvain optimization (requires the `louvain` feature, on by default).
//! - [`ConnectedComponentsFallback`]: one community per connected component.
//!   This is a degenerate partition of noticeably lower quality; it never
//!   splits a connected topic cluster, so dense fields collapse into one
//!   giant community. Partitions it produces are tagged
//!   [`DetectionMethod::ConnectedComponents`] so consumers can tell.

use std::collections::BTreeMap;

use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::warn;

use evolution_types::{CommunityAlgorithm, CommunitySettings};

use crate::graph::CooccurrenceGraph;

/// Which algorithm produced a partition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Louvain modularity optimization
    Louvain,
    /// Connected components (degenerate fallback)
    ConnectedComponents,
}

impl DetectionMethod {
    /// Whether the partition is a lower-quality stand-in for true detection.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, DetectionMethod::ConnectedComponents)
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionMethod::Louvain => write!(f, "louvain"),
            DetectionMethod::ConnectedComponents => write!(f, "connected-components"),
        }
    }
}

/// A node -> community assignment covering every node exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Keyword -> community id (ids are dense, starting at 0)
    pub assignments: BTreeMap<String, usize>,
    /// Standard modularity (resolution 1) of this partition
    pub modularity: f64,
    /// Algorithm that produced the partition
    pub method: DetectionMethod,
}

impl Partition {
    /// The partition of an empty graph.
    pub fn empty(method: DetectionMethod) -> Self {
        Self {
            assignments: BTreeMap::new(),
            modularity: 0.0,
            method,
        }
    }

    /// Build from disjoint keyword groups; group `i` becomes community `i`.
    pub fn from_groups(
        groups: Vec<Vec<String>>,
        graph: &CooccurrenceGraph,
        method: DetectionMethod,
    ) -> Self {
        let mut assignments = BTreeMap::new();
        for (id, members) in groups.into_iter().enumerate() {
            for keyword in members {
                assignments.insert(keyword, id);
            }
        }
        let modularity = modularity(graph, &assignments);
        Self {
            assignments,
            modularity,
            method,
        }
    }

    /// Number of distinct communities.
    pub fn community_count(&self) -> usize {
        let mut ids: Vec<usize> = self.assignments.values().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Community of a keyword.
    pub fn community_of(&self, keyword: &str) -> Option<usize> {
        self.assignments.get(keyword).copied()
    }

    /// Members grouped by community id, ascending; members sorted by name.
    pub fn communities(&self) -> BTreeMap<usize, Vec<String>> {
        let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (keyword, id) in &self.assignments {
            groups.entry(*id).or_default().push(keyword.clone());
        }
        groups
    }

    /// Whether every graph node is assigned and nothing else is.
    pub fn covers(&self, graph: &CooccurrenceGraph) -> bool {
        self.assignments.len() == graph.node_count()
            && graph.keywords().all(|k| self.assignments.contains_key(k))
    }
}

/// Standard modularity of an assignment.
///
/// `Q = sum_c [ L_c / m - (d_c / 2m)^2 ]` where `m` is the total edge weight,
/// `L_c` the weight inside community `c` and `d_c` the summed weighted degree
/// of its members. A graph without edges has modularity 0.
pub fn modularity(graph: &CooccurrenceGraph, assignments: &BTreeMap<String, usize>) -> f64 {
    modularity_with_resolution(graph, assignments, 1.0)
}

/// Modularity with a resolution factor on the null-model term.
pub fn modularity_with_resolution(
    graph: &CooccurrenceGraph,
    assignments: &BTreeMap<String, usize>,
    resolution: f64,
) -> f64 {
    let inner = graph.inner();
    let m = graph.total_weight() as f64;
    if m == 0.0 {
        return 0.0;
    }

    // Ordered by community id so the float sum is reproducible.
    let mut internal: BTreeMap<usize, f64> = BTreeMap::new();
    let mut degree: BTreeMap<usize, f64> = BTreeMap::new();
    for e in inner.edge_references() {
        let w = f64::from(*e.weight());
        let ca = assignments.get(&inner[e.source()].keyword);
        let cb = assignments.get(&inner[e.target()].keyword);
        if let Some(&ca) = ca {
            *degree.entry(ca).or_insert(0.0) += w;
        }
        if let Some(&cb) = cb {
            *degree.entry(cb).or_insert(0.0) += w;
        }
        if let (Some(ca), Some(cb)) = (ca, cb) {
            if ca == cb {
                *internal.entry(*ca).or_insert(0.0) += w;
            }
        }
    }

    degree
        .iter()
        .map(|(c, d)| {
            let l = internal.get(c).copied().unwrap_or(0.0);
            l / m - resolution * (d / (2.0 * m)).powi(2)
        })
        .sum()
}

/// Partitions a graph into communities.
pub trait CommunityDetector: Send + Sync {
    /// The algorithm this detector runs.
    fn method(&self) -> DetectionMethod;

    /// Partition the graph. Empty graphs yield an empty partition.
    fn detect(&self, graph: &CooccurrenceGraph) -> Partition;
}

/// One community per connected component.
///
/// Lower fidelity than modularity optimization: it cannot separate topics
/// that share even a single bridging keyword. Use only when Louvain is
/// unavailable or explicitly configured off.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectedComponentsFallback;

impl CommunityDetector for ConnectedComponentsFallback {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::ConnectedComponents
    }

    fn detect(&self, graph: &CooccurrenceGraph) -> Partition {
        if graph.is_empty() {
            return Partition::empty(self.method());
        }
        Partition::from_groups(graph.connected_components(), graph, self.method())
    }
}

/// Select a detector from settings.
///
/// Falling back to connected components is logged at `warn`.
pub fn detector_from_settings(settings: &CommunitySettings) -> Box<dyn CommunityDetector> {
    match settings.algorithm {
        CommunityAlgorithm::Louvain => louvain_or_fallback(settings),
        CommunityAlgorithm::ConnectedComponents => {
            warn!("Connected-components partitioning configured; thematic maps will be degenerate");
            Box::new(ConnectedComponentsFallback)
        }
    }
}

#[cfg(feature = "louvain")]
fn louvain_or_fallback(settings: &CommunitySettings) -> Box<dyn CommunityDetector> {
    Box::new(
        crate::louvain::ModularityOptimizer::new(settings.seed)
            .with_resolution(settings.resolution),
    )
}

#[cfg(not(feature = "louvain"))]
fn louvain_or_fallback(_settings: &CommunitySettings) -> Box<dyn CommunityDetector> {
    warn!(
        "Louvain support not compiled in; falling back to connected components (lower-quality partition)"
    );
    Box::new(ConnectedComponentsFallback)
}
