//! Structural change between consecutive window snapshots.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::windows::WindowSnapshot;

/// Change record for one snapshot relative to its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionRecord {
    pub period: String,
    pub n_nodes: usize,
    pub n_edges: usize,
    pub n_clusters: usize,
    pub modularity: f64,
    /// `None` for the first snapshot
    pub modularity_delta: Option<f64>,
    /// Sorted
    pub new_keywords: Vec<String>,
    /// Sorted
    pub lost_keywords: Vec<String>,
    pub n_new: usize,
    pub n_lost: usize,
}

impl EvolutionRecord {
    /// The first `n` new and lost keywords.
    pub fn preview(&self, n: usize) -> (&[String], &[String]) {
        let new = &self.new_keywords[..n.min(self.new_keywords.len())];
        let lost = &self.lost_keywords[..n.min(self.lost_keywords.len())];
        (new, lost)
    }

    pub fn is_first(&self) -> bool {
        self.modularity_delta.is_none()
    }
}

/// Compares consecutive snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvolutionTracker;

impl EvolutionTracker {
    pub fn new() -> Self {
        Self
    }

    /// One record per snapshot. The first has empty keyword sets.
    #[instrument(skip(self, snapshots), fields(snapshots = snapshots.len()))]
    pub fn track<S: AsRef<WindowSnapshot>>(&self, snapshots: &[S]) -> Vec<EvolutionRecord> {
        let mut records = Vec::with_capacity(snapshots.len());
        let mut previous: Option<&WindowSnapshot> = None;
        for snapshot in snapshots {
            let current = snapshot.as_ref();
            let record = match previous {
                None => Self::first(current),
                Some(prev) => Self::compare(prev, current),
            };
            debug!(
                period = %record.period,
                new = record.n_new,
                lost = record.n_lost,
                "Evolution computed"
            );
            records.push(record);
            previous = Some(current);
        }
        records
    }

    /// Record for a snapshot without predecessor.
    pub fn first(snapshot: &WindowSnapshot) -> EvolutionRecord {
        EvolutionRecord {
            period: snapshot.period.clone(),
            n_nodes: snapshot.node_count,
            n_edges: snapshot.edge_count,
            n_clusters: snapshot.n_clusters,
            modularity: snapshot.modularity,
            modularity_delta: None,
            new_keywords: Vec::new(),
            lost_keywords: Vec::new(),
            n_new: 0,
            n_lost: 0,
        }
    }

    /// Record for `current` relative to `previous`.
    pub fn compare(previous: &WindowSnapshot, current: &WindowSnapshot) -> EvolutionRecord {
        let before: BTreeSet<&str> = previous.graph.keywords().collect();
        let after: BTreeSet<&str> = current.graph.keywords().collect();

        let new_keywords: Vec<String> = after.difference(&before).map(|k| k.to_string()).collect();
        let lost_keywords: Vec<String> =
            before.difference(&after).map(|k| k.to_string()).collect();

        EvolutionRecord {
            period: current.period.clone(),
            n_nodes: current.node_count,
            n_edges: current.edge_count,
            n_clusters: current.n_clusters,
            modularity: current.modularity,
            modularity_delta: Some(current.modularity - previous.modularity),
            n_new: new_keywords.len(),
            n_lost: lost_keywords.len(),
            new_keywords,
            lost_keywords,
        }
    }
}

impl AsRef<WindowSnapshot> for WindowSnapshot {
    fn as_ref(&self) -> &WindowSnapshot {
        self
    }
}
