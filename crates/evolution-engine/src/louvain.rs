//! Seeded Louvain modularity optimization.
//!
//! Classic two-phase scheme: local node moves until no move strictly
//! improves modularity, then aggregation of communities into super-nodes,
//! repeated until a level produces no move. Node visiting order is shuffled
//! with a seeded RNG, so a fixed seed gives identical partitions across runs.

use std::collections::BTreeMap;

use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, instrument};

use crate::community::{CommunityDetector, DetectionMethod, Partition};
use crate::graph::CooccurrenceGraph;

/// Gains at or below this are treated as no improvement.
const MIN_GAIN: f64 = 1e-12;

/// Upper bound on local-move sweeps per level.
const MAX_SWEEPS: usize = 1_000;

/// Louvain community detector.
#[derive(Debug, Clone)]
pub struct ModularityOptimizer {
    seed: u64,
    resolution: f64,
}

impl ModularityOptimizer {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            resolution: 1.0,
        }
    }

    /// Set the resolution (values above 1 favor smaller communities).
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }
}

impl CommunityDetector for ModularityOptimizer {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Louvain
    }

    #[instrument(skip(self, graph), fields(nodes = graph.node_count(), seed = self.seed))]
    fn detect(&self, graph: &CooccurrenceGraph) -> Partition {
        if graph.is_empty() {
            return Partition::empty(self.method());
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut level = LevelGraph::from_graph(graph);
        // original node index -> node index in the current level
        let mut membership: Vec<usize> = (0..graph.node_count()).collect();
        let mut levels = 0usize;

        loop {
            let Some(labels) = level.move_nodes(&mut rng, self.resolution) else {
                break;
            };
            let (assign, count) = relabel(&labels);
            for m in membership.iter_mut() {
                *m = assign[*m];
            }
            levels += 1;
            if count == level.len() {
                break;
            }
            level = level.aggregate(&assign, count);
        }

        let keywords: Vec<String> = graph.keywords().map(str::to_string).collect();
        let mut groups: Vec<Vec<String>> = Vec::new();
        let mut group_of: BTreeMap<usize, usize> = BTreeMap::new();
        for (node, community) in membership.iter().enumerate() {
            let next = groups.len();
            let slot = *group_of.entry(*community).or_insert(next);
            if slot == next {
                groups.push(Vec::new());
            }
            groups[slot].push(keywords[node].clone());
        }

        let partition = Partition::from_groups(groups, graph, self.method());
        debug!(
            levels,
            communities = partition.community_count(),
            modularity = partition.modularity,
            "Louvain converged"
        );
        partition
    }
}

/// Weighted graph for one Louvain level. Self-loops hold the internal weight
/// of aggregated communities.
#[derive(Debug)]
struct LevelGraph {
    adjacency: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    degrees: Vec<f64>,
    /// Sum of all degrees (2m)
    total: f64,
}

impl LevelGraph {
    fn from_graph(graph: &CooccurrenceGraph) -> Self {
        let inner = graph.inner();
        let n = inner.node_count();
        let mut adjacency = vec![Vec::new(); n];
        let mut degrees = vec![0.0; n];
        for e in inner.edge_references() {
            let (a, b) = (e.source().index(), e.target().index());
            let w = f64::from(*e.weight());
            adjacency[a].push((b, w));
            adjacency[b].push((a, w));
            degrees[a] += w;
            degrees[b] += w;
        }
        let total = degrees.iter().sum();
        Self {
            adjacency,
            self_loops: vec![0.0; n],
            degrees,
            total,
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Local-move phase. Returns community labels when at least one node
    /// moved, `None` otherwise.
    fn move_nodes(&self, rng: &mut StdRng, resolution: f64) -> Option<Vec<usize>> {
        let n = self.len();
        if self.total == 0.0 {
            return None;
        }

        let mut community: Vec<usize> = (0..n).collect();
        let mut tot = self.degrees.clone();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let mut weight_to = vec![0.0; n];
        let mut touched: Vec<usize> = Vec::new();
        let mut moved_any = false;

        for _ in 0..MAX_SWEEPS {
            let mut moved = false;
            for &node in &order {
                let current = community[node];
                let k = self.degrees[node];

                for &(neighbor, w) in &self.adjacency[node] {
                    let c = community[neighbor];
                    if weight_to[c] == 0.0 {
                        touched.push(c);
                    }
                    weight_to[c] += w;
                }

                tot[current] -= k;
                let gain = |c: usize, tot: &[f64], w: f64| w - resolution * tot[c] * k / self.total;
                let mut best = current;
                let mut best_gain = gain(current, &tot, weight_to[current]);
                for &c in &touched {
                    let g = gain(c, &tot, weight_to[c]);
                    if g > best_gain + MIN_GAIN {
                        best = c;
                        best_gain = g;
                    }
                }
                tot[best] += k;
                community[node] = best;

                for &c in &touched {
                    weight_to[c] = 0.0;
                }
                touched.clear();

                if best != current {
                    moved = true;
                    moved_any = true;
                }
            }
            if !moved {
                break;
            }
        }

        moved_any.then_some(community)
    }

    /// Collapse communities into super-nodes.
    fn aggregate(&self, assign: &[usize], count: usize) -> Self {
        let mut self_loops = vec![0.0; count];
        let mut degrees = vec![0.0; count];
        let mut between: BTreeMap<(usize, usize), f64> = BTreeMap::new();

        for node in 0..self.len() {
            let c = assign[node];
            self_loops[c] += self.self_loops[node];
            degrees[c] += self.degrees[node];
            for &(neighbor, w) in &self.adjacency[node] {
                if neighbor < node {
                    continue;
                }
                let d = assign[neighbor];
                if c == d {
                    self_loops[c] += w;
                } else {
                    *between.entry((c.min(d), c.max(d))).or_insert(0.0) += w;
                }
            }
        }

        let mut adjacency = vec![Vec::new(); count];
        for ((a, b), w) in between {
            adjacency[a].push((b, w));
            adjacency[b].push((a, w));
        }

        Self {
            adjacency,
            self_loops,
            degrees,
            total: self.total,
        }
    }
}

/// Map arbitrary labels to dense ids in order of first appearance.
fn relabel(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut ids: BTreeMap<usize, usize> = BTreeMap::new();
    let assign = labels
        .iter()
        .map(|label| {
            let next = ids.len();
            *ids.entry(*label).or_insert(next)
        })
        .collect();
    (assign, ids.len())
}
