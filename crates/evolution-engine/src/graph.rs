//! Keyword co-occurrence graphs.
//!
//! A [`CooccurrenceGraph`] holds one node per surviving keyword (carrying its
//! document frequency) and one undirected edge per keyword pair that shares
//! at least one document. Graphs are built once per window by
//! [`CooccurrenceGraphBuilder`] and are read-only afterwards.
//!
//! Invariants: no self-loops, at most one edge per unordered pair, every edge
//! weight is at least 1.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;

/// Default per-document fan-out cap.
pub const DEFAULT_MAX_KEYWORDS_PER_DOC: usize = 20;

/// A keyword node and its document frequency within the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordNode {
    pub keyword: String,
    pub frequency: u32,
}

/// An undirected co-occurrence edge; `source < target` lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooccurrenceEdge {
    pub source: String,
    pub target: String,
    pub weight: u32,
}

impl CooccurrenceEdge {
    /// Create an edge with canonical endpoint order.
    pub fn new(a: impl Into<String>, b: impl Into<String>, weight: u32) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self {
                source: a,
                target: b,
                weight,
            }
        } else {
            Self {
                source: b,
                target: a,
                weight,
            }
        }
    }

    /// Check if this edge joins the given keywords (in either order).
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

/// Serialized form of a graph: node list plus edge list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub nodes: Vec<KeywordNode>,
    pub edges: Vec<CooccurrenceEdge>,
}

/// Weighted undirected keyword graph for one window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "GraphRecord", try_from = "GraphRecord")]
pub struct CooccurrenceGraph {
    graph: UnGraph<KeywordNode, u32>,
    index: HashMap<String, NodeIndex>,
}

impl CooccurrenceGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a graph from explicit nodes and edges, enforcing the graph
    /// invariants.
    pub fn from_parts(
        nodes: Vec<KeywordNode>,
        edges: Vec<CooccurrenceEdge>,
    ) -> Result<Self, EngineError> {
        let mut graph = Self::new();
        for node in nodes {
            if graph.index.contains_key(&node.keyword) {
                return Err(EngineError::InvalidInput(format!(
                    "Duplicate node: {}",
                    node.keyword
                )));
            }
            graph.push_node(node.keyword, node.frequency);
        }
        for edge in edges {
            graph.push_edge(&edge.source, &edge.target, edge.weight)?;
        }
        Ok(graph)
    }

    fn push_node(&mut self, keyword: String, frequency: u32) -> NodeIndex {
        let idx = self.graph.add_node(KeywordNode {
            keyword: keyword.clone(),
            frequency,
        });
        self.index.insert(keyword, idx);
        idx
    }

    fn push_edge(&mut self, a: &str, b: &str, weight: u32) -> Result<(), EngineError> {
        if a == b {
            return Err(EngineError::InvalidInput(format!("Self-loop on {}", a)));
        }
        if weight == 0 {
            return Err(EngineError::InvalidInput(format!(
                "Zero-weight edge {} - {}",
                a, b
            )));
        }
        let (ia, ib) = match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => (ia, ib),
            _ => {
                return Err(EngineError::InvalidInput(format!(
                    "Edge {} - {} references an unknown node",
                    a, b
                )))
            }
        };
        if self.graph.find_edge(ia, ib).is_some() {
            return Err(EngineError::InvalidInput(format!(
                "Duplicate edge {} - {}",
                a, b
            )));
        }
        self.graph.add_edge(ia, ib, weight);
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.index.contains_key(keyword)
    }

    /// Document frequency of a keyword node.
    pub fn frequency(&self, keyword: &str) -> Option<u32> {
        self.index
            .get(keyword)
            .map(|&idx| self.graph[idx].frequency)
    }

    /// Co-occurrence weight between two keywords, symmetric in its arguments.
    pub fn weight(&self, a: &str, b: &str) -> Option<u32> {
        let (&ia, &ib) = (self.index.get(a)?, self.index.get(b)?);
        self.graph.find_edge(ia, ib).map(|e| self.graph[e])
    }

    /// Number of distinct neighbors.
    pub fn degree(&self, keyword: &str) -> usize {
        self.index
            .get(keyword)
            .map(|&idx| self.graph.neighbors(idx).count())
            .unwrap_or(0)
    }

    /// Neighbors of a keyword with edge weights, sorted by keyword.
    pub fn neighbors(&self, keyword: &str) -> Vec<(&str, u32)> {
        let Some(&idx) = self.index.get(keyword) else {
            return Vec::new();
        };
        let mut out: Vec<(&str, u32)> = self
            .graph
            .edges(idx)
            .map(|e| {
                let other = if e.source() == idx { e.target() } else { e.source() };
                (self.graph[other].keyword.as_str(), *e.weight())
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// Nodes in insertion (alphabetical for built graphs) order.
    pub fn nodes(&self) -> impl Iterator<Item = &KeywordNode> {
        self.graph.node_weights()
    }

    /// All keywords in node order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|n| n.keyword.as_str())
    }

    /// All keywords as a set.
    pub fn keyword_set(&self) -> HashSet<String> {
        self.keywords().map(String::from).collect()
    }

    /// Edges in canonical form, sorted by (source, target).
    pub fn edges(&self) -> Vec<CooccurrenceEdge> {
        let mut edges: Vec<CooccurrenceEdge> = self
            .graph
            .edge_references()
            .map(|e| {
                CooccurrenceEdge::new(
                    self.graph[e.source()].keyword.clone(),
                    self.graph[e.target()].keyword.clone(),
                    *e.weight(),
                )
            })
            .collect();
        edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        edges
    }

    /// Sum of all edge weights.
    pub fn total_weight(&self) -> u64 {
        self.graph.edge_weights().map(|&w| u64::from(w)).sum()
    }

    /// The `n` highest-degree keywords (ties: frequency, then name).
    pub fn top_nodes(&self, n: usize) -> Vec<String> {
        let mut ranked: Vec<(usize, u32, &str)> = self
            .graph
            .node_indices()
            .map(|idx| {
                let node = &self.graph[idx];
                (
                    self.graph.neighbors(idx).count(),
                    node.frequency,
                    node.keyword.as_str(),
                )
            })
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(a.2.cmp(b.2)));
        ranked
            .into_iter()
            .take(n)
            .map(|(_, _, k)| k.to_string())
            .collect()
    }

    /// Connected components as keyword lists.
    ///
    /// Components are ordered by their first node; members keep node order.
    pub fn connected_components(&self) -> Vec<Vec<String>> {
        let n = self.graph.node_count();
        let mut uf: UnionFind<usize> = UnionFind::new(n);
        for e in self.graph.edge_references() {
            uf.union(e.source().index(), e.target().index());
        }

        let mut order: Vec<usize> = Vec::new();
        let mut groups: HashMap<usize, Vec<String>> = HashMap::new();
        for idx in self.graph.node_indices() {
            let root = uf.find(idx.index());
            let group = groups.entry(root).or_insert_with(|| {
                order.push(root);
                Vec::new()
            });
            group.push(self.graph[idx].keyword.clone());
        }

        order
            .into_iter()
            .filter_map(|root| groups.remove(&root))
            .collect()
    }

    /// The subgraph induced by the largest connected component.
    pub fn largest_component(&self) -> CooccurrenceGraph {
        let mut best: Option<Vec<String>> = None;
        for component in self.connected_components() {
            if best.as_ref().map_or(true, |b| component.len() > b.len()) {
                best = Some(component);
            }
        }
        match best {
            Some(members) => self.subgraph(&members),
            None => CooccurrenceGraph::new(),
        }
    }

    /// Induced subgraph on the given keywords (unknown keywords are ignored).
    pub fn subgraph(&self, keywords: &[String]) -> CooccurrenceGraph {
        let keep: HashSet<&str> = keywords.iter().map(String::as_str).collect();
        let mut sub = CooccurrenceGraph::new();
        for node in self.graph.node_weights() {
            if keep.contains(node.keyword.as_str()) {
                sub.push_node(node.keyword.clone(), node.frequency);
            }
        }
        for e in self.graph.edge_references() {
            let (a, b) = (
                &self.graph[e.source()].keyword,
                &self.graph[e.target()].keyword,
            );
            if keep.contains(a.as_str()) && keep.contains(b.as_str()) {
                if let (Some(&ia), Some(&ib)) = (sub.index.get(a), sub.index.get(b)) {
                    sub.graph.add_edge(ia, ib, *e.weight());
                }
            }
        }
        sub
    }

    /// Borrow the underlying petgraph structure.
    pub(crate) fn inner(&self) -> &UnGraph<KeywordNode, u32> {
        &self.graph
    }
}

impl PartialEq for CooccurrenceGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes().eq(other.nodes()) && self.edges() == other.edges()
    }
}

impl From<CooccurrenceGraph> for GraphRecord {
    fn from(graph: CooccurrenceGraph) -> Self {
        GraphRecord {
            nodes: graph.nodes().cloned().collect(),
            edges: graph.edges(),
        }
    }
}

impl TryFrom<GraphRecord> for CooccurrenceGraph {
    type Error = EngineError;

    fn try_from(record: GraphRecord) -> Result<Self, Self::Error> {
        CooccurrenceGraph::from_parts(record.nodes, record.edges)
    }
}

/// Builds a co-occurrence graph from per-document token sequences.
#[derive(Debug, Clone)]
pub struct CooccurrenceGraphBuilder {
    min_freq: u32,
    max_keywords_per_doc: usize,
}

impl CooccurrenceGraphBuilder {
    /// Create a builder with the default fan-out cap.
    pub fn new(min_freq: u32) -> Self {
        Self {
            min_freq,
            max_keywords_per_doc: DEFAULT_MAX_KEYWORDS_PER_DOC,
        }
    }

    /// Set the per-document fan-out cap.
    pub fn with_max_keywords_per_doc(mut self, cap: usize) -> Self {
        self.max_keywords_per_doc = cap;
        self
    }

    pub fn min_freq(&self) -> u32 {
        self.min_freq
    }

    pub fn max_keywords_per_doc(&self) -> usize {
        self.max_keywords_per_doc
    }

    /// Build the graph.
    ///
    /// 1. Count document frequency per token (duplicates within a document
    ///    count once).
    /// 2. Keep tokens with frequency >= `min_freq`.
    /// 3. Restrict each document to kept tokens, then truncate to the first
    ///    `max_keywords_per_doc`.
    /// 4. Count every unordered pair once per document.
    ///
    /// No documents or an empty vocabulary yield an empty graph.
    pub fn build<D: AsRef<[String]>>(&self, documents: &[D]) -> CooccurrenceGraph {
        let mut frequency: HashMap<&str, u32> = HashMap::new();
        let mut deduped: Vec<Vec<&str>> = Vec::with_capacity(documents.len());

        for doc in documents {
            let mut seen: HashSet<&str> = HashSet::new();
            let tokens: Vec<&str> = doc
                .as_ref()
                .iter()
                .map(String::as_str)
                .filter(|t| seen.insert(*t))
                .collect();
            for &token in &tokens {
                *frequency.entry(token).or_insert(0) += 1;
            }
            deduped.push(tokens);
        }

        let valid: BTreeMap<&str, u32> = frequency
            .into_iter()
            .filter(|(_, count)| *count >= self.min_freq)
            .collect();

        if valid.is_empty() {
            debug!(
                documents = documents.len(),
                min_freq = self.min_freq,
                "Empty vocabulary, returning empty graph"
            );
            return CooccurrenceGraph::new();
        }

        let mut pairs: BTreeMap<(&str, &str), u32> = BTreeMap::new();
        for tokens in &deduped {
            let kept: Vec<&str> = tokens
                .iter()
                .copied()
                .filter(|t| valid.contains_key(t))
                .take(self.max_keywords_per_doc)
                .collect();
            for (i, a) in kept.iter().enumerate() {
                for b in &kept[i + 1..] {
                    let key = if a <= b { (*a, *b) } else { (*b, *a) };
                    *pairs.entry(key).or_insert(0) += 1;
                }
            }
        }

        let mut graph = CooccurrenceGraph::new();
        for (keyword, freq) in &valid {
            graph.push_node((*keyword).to_string(), *freq);
        }
        for ((a, b), weight) in pairs {
            if let (Some(&ia), Some(&ib)) = (graph.index.get(a), graph.index.get(b)) {
                graph.graph.add_edge(ia, ib, weight);
            }
        }

        debug!(
            documents = documents.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built co-occurrence graph"
        );
        graph
    }
}
