//! Agglomerative hierarchical clustering of scalar values with Ward linkage.
//!
//! Starting from one cluster per value, the pair of clusters whose merge
//! increases the total within-cluster variance the least is merged until the
//! requested number of clusters remains. For clusters `A` and `B` the increase
//! is
//!
//! ```text
//! Δ(A, B) = n_A n_B / (n_A + n_B) · (μ_A − μ_B)²
//! ```
//!
//! Values are sorted before clustering, so the partition does not depend on the
//! order of the input. Equal values always end up in the same cluster since
//! merging them costs nothing. When two candidate merges cost exactly the same,
//! [`MergeTieBreak`] decides which one is taken.
//!
//! # Example
//!
//! ```
//! use stargrid_stats::clustering::WardClustering;
//!
//! let values = [5.0, -4.0, 0.2, -5.0, 4.8, 0.0];
//! let clustering = WardClustering::new(3).fit(&values).unwrap();
//!
//! assert_eq!(clustering.clusters.len(), 3);
//! assert_eq!(clustering.clusters[0].min, -5.0);
//! assert_eq!(clustering.clusters[2].max, 5.0);
//! assert_eq!(clustering.labels[1], clustering.labels[3]);
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ClusteringError {
    #[display("number of clusters must be at least 1")]
    NoClusters,
    #[display("cannot form {requested} clusters from {distinct} distinct values")]
    NotEnoughValues { requested: usize, distinct: usize },
    #[display("values must be finite")]
    NonFinite,
}

/// Which merge to take when several candidate merges have the same cost.
///
/// Candidates are ordered by the position of their clusters along the sorted
/// value axis.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeTieBreak {
    /// Merge the pair closest to the low end of the axis.
    #[default]
    PreferLower,
    /// Merge the pair closest to the high end of the axis.
    PreferUpper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WardClustering {
    pub n_clusters: usize,
    pub tie_break: MergeTieBreak,
}

/// One resulting cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Indices into the input slice, ascending by value.
    pub members: Vec<usize>,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Result of a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Clusters ordered by ascending minimum.
    pub clusters: Vec<Cluster>,
    /// For each input value, the index of its cluster in [`Self::clusters`].
    pub labels: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Node {
    members: Vec<usize>,
    sum: f64,
}

impl Node {
    #[expect(clippy::cast_precision_loss)]
    fn count(&self) -> f64 {
        self.members.len() as f64
    }

    fn mean(&self) -> f64 {
        self.sum / self.count()
    }

    fn merge_cost(&self, other: &Self) -> f64 {
        let (na, nb) = (self.count(), other.count());
        na * nb / (na + nb) * (self.mean() - other.mean()).powi(2)
    }
}

impl WardClustering {
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            tie_break: MergeTieBreak::default(),
        }
    }

    #[must_use]
    pub fn with_tie_break(mut self, tie_break: MergeTieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Clusters `values` into `n_clusters` groups.
    pub fn fit(&self, values: &[f64]) -> Result<Clustering, ClusteringError> {
        if self.n_clusters == 0 {
            return Err(ClusteringError::NoClusters);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ClusteringError::NonFinite);
        }

        let mut order = (0..values.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));
        let distinct = 1 + order
            .windows(2)
            .filter(|w| values[w[0]] < values[w[1]])
            .count();
        if values.is_empty() || distinct < self.n_clusters {
            return Err(ClusteringError::NotEnoughValues {
                requested: self.n_clusters,
                distinct: if values.is_empty() { 0 } else { distinct },
            });
        }

        let mut nodes = order
            .iter()
            .map(|&i| Node {
                members: vec![i],
                sum: values[i],
            })
            .collect::<Vec<_>>();

        while nodes.len() > self.n_clusters {
            let (a, b) = self.cheapest_merge(&nodes);
            let absorbed = nodes.remove(b);
            let target = &mut nodes[a];
            target.sum += absorbed.sum;
            target.members.extend(absorbed.members);
        }
        log::debug!(
            "clustered {} values ({distinct} distinct) into {} clusters",
            values.len(),
            nodes.len()
        );

        let mut clusters = nodes
            .into_iter()
            .map(|node| {
                let mean = node.mean();
                let mut members = node.members;
                members.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));
                let min = values[members[0]];
                let max = values[members[members.len() - 1]];
                Cluster {
                    members,
                    min,
                    max,
                    mean,
                }
            })
            .collect::<Vec<_>>();
        clusters.sort_by(|a, b| a.min.total_cmp(&b.min));

        let mut labels = vec![0; values.len()];
        for (label, cluster) in clusters.iter().enumerate() {
            for &member in &cluster.members {
                labels[member] = label;
            }
        }
        Ok(Clustering { clusters, labels })
    }

    /// Returns indices `(a, b)` with `a < b` of the pair to merge next.
    fn cheapest_merge(&self, nodes: &[Node]) -> (usize, usize) {
        let mut best = (0, 1);
        let mut best_cost = f64::INFINITY;
        for a in 0..nodes.len() {
            for b in (a + 1)..nodes.len() {
                let cost = nodes[a].merge_cost(&nodes[b]);
                let better = match self.tie_break {
                    MergeTieBreak::PreferLower => cost < best_cost,
                    MergeTieBreak::PreferUpper => cost <= best_cost,
                };
                if better {
                    best = (a, b);
                    best_cost = cost;
                }
            }
        }
        best
    }
}
