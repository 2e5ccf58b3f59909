use std::collections::BTreeSet;

use crate::cluster::Cluster;
use crate::geo::{LatLng, LookupKey, Point};

/// Cluster indices the user has opened. Positional, so an index may point at a
/// different group after the next re-cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpandedSet {
    indices: BTreeSet<usize>,
}

impl ExpandedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Insert if absent, remove if present. Returns true when now expanded.
    pub fn toggle(&mut self, index: usize) -> bool {
        if self.indices.remove(&index) {
            false
        } else {
            self.indices.insert(index);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// What tapping a marker does
#[derive(Clone, Debug, PartialEq)]
pub enum TapAction {
    /// Look up the profile stored at these coordinates
    FetchProfile(LookupKey),
    /// Flip the cluster between aggregated and expanded
    ToggleCluster(usize),
}

/// One marker to draw
#[derive(Clone, Debug, PartialEq)]
pub enum MarkerPlan {
    Individual {
        cluster: usize,
        member: usize,
        point: Point,
    },
    Aggregate {
        cluster: usize,
        centroid: LatLng,
        count: usize,
    },
}

impl MarkerPlan {
    pub fn position(&self) -> LatLng {
        match self {
            MarkerPlan::Individual { point, .. } => point.position(),
            MarkerPlan::Aggregate { centroid, .. } => *centroid,
        }
    }

    pub fn cluster(&self) -> usize {
        match self {
            MarkerPlan::Individual { cluster, .. } | MarkerPlan::Aggregate { cluster, .. } => {
                *cluster
            }
        }
    }

    pub fn tap_action(&self) -> TapAction {
        match self {
            MarkerPlan::Individual { point, .. } => TapAction::FetchProfile(point.key.clone()),
            MarkerPlan::Aggregate { cluster, .. } => TapAction::ToggleCluster(*cluster),
        }
    }

    /// Callout title for individual markers, count badge for aggregates
    pub fn label(&self) -> String {
        match self {
            MarkerPlan::Individual { cluster, .. } => format!("Marker {}", cluster + 1),
            MarkerPlan::Aggregate { count, .. } => count.to_string(),
        }
    }
}

/// Decide per cluster whether to draw its members or a single centroid marker.
pub fn plan_markers(clusters: &[Cluster], expanded: &ExpandedSet) -> Vec<MarkerPlan> {
    let mut plan = Vec::with_capacity(clusters.len());

    for (index, cluster) in clusters.iter().enumerate() {
        if cluster.is_single() || expanded.contains(index) {
            plan.extend(
                cluster
                    .points
                    .iter()
                    .enumerate()
                    .map(|(member, point)| MarkerPlan::Individual {
                        cluster: index,
                        member,
                        point: point.clone(),
                    }),
            );
        } else if let Some(centroid) = cluster.centroid() {
            plan.push(MarkerPlan::Aggregate {
                cluster: index,
                centroid,
                count: cluster.len(),
            });
        }
    }

    plan
}
