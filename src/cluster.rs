//! Zoom-tiered proximity clustering.
//!
//! A single greedy pass in input order: each unprocessed point seeds a cluster
//! and absorbs every later unprocessed point closer to the seed than the radius.
//! Grouping depends on input order; reordering the input can change the result.
//! Cost is O(n²) per recompute, which is fine for the tens to low hundreds of
//! markers the backend serves.

use crate::geo::{centroid, distance, LatLng, Point};

/// Radius used below `FINE_ZOOM`
pub const COARSE_RADIUS: f64 = 0.02;
/// Radius used at or above `FINE_ZOOM`
pub const FINE_RADIUS: f64 = 0.005;
/// First zoom level that switches to the fine radius
pub const FINE_ZOOM: i32 = 12;

/// Grouping radius in degrees for a zoom level (two tiers)
#[inline(always)]
pub fn radius_for_zoom(zoom: i32) -> f64 {
    if zoom < FINE_ZOOM {
        COARSE_RADIUS
    } else {
        FINE_RADIUS
    }
}

/// Points grouped around a seed. The seed is always the first member.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub points: Vec<Point>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A single-point cluster is drawn as a plain marker
    pub fn is_single(&self) -> bool {
        self.points.len() == 1
    }

    pub fn seed(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn centroid(&self) -> Option<LatLng> {
        centroid(&self.points)
    }

    pub fn ids(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.id).collect()
    }
}

/// Partition `points` into clusters for the given zoom level.
///
/// Clusters come out in the order their seeds appear in the input, and every
/// input point lands in exactly one cluster.
pub fn cluster_points(points: &[Point], zoom: i32) -> Vec<Cluster> {
    let radius = radius_for_zoom(zoom);
    let mut processed = vec![false; points.len()];
    let mut clusters = Vec::new();

    for (i, base) in points.iter().enumerate() {
        if processed[i] {
            continue;
        }
        let mut members = vec![base.clone()];

        for (j, other) in points.iter().enumerate().skip(i + 1) {
            if processed[j] {
                continue;
            }
            if distance(base.position(), other.position()) < radius {
                members.push(other.clone());
                processed[j] = true;
            }
        }

        clusters.push(Cluster { points: members });
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(clusters: &[Cluster]) -> Vec<Vec<i64>> {
        clusters.iter().map(Cluster::ids).collect()
    }

    #[test]
    fn test_radius_tiers() {
        assert_eq!(radius_for_zoom(0), COARSE_RADIUS);
        assert_eq!(radius_for_zoom(11), COARSE_RADIUS);
        assert_eq!(radius_for_zoom(12), FINE_RADIUS);
        assert_eq!(radius_for_zoom(20), FINE_RADIUS);
    }

    #[test]
    fn test_empty_input() {
        assert!(cluster_points(&[], 10).is_empty());
    }

    #[test]
    fn test_coarse_zoom_groups_close_points() {
        let pts = vec![Point::new(1, 10.0, 20.0), Point::new(2, 10.01, 20.0)];
        assert_eq!(ids(&cluster_points(&pts, 10)), vec![vec![1, 2]]);
    }

    #[test]
    fn test_coarse_zoom_splits_far_points() {
        let pts = vec![Point::new(1, 10.0, 20.0), Point::new(2, 10.03, 20.0)];
        assert_eq!(ids(&cluster_points(&pts, 10)), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_fine_zoom_splits_points() {
        let pts = vec![Point::new(1, 10.0, 20.0), Point::new(2, 10.01, 20.0)];
        assert_eq!(ids(&cluster_points(&pts, 12)), vec![vec![1], vec![2]]);
        assert_eq!(ids(&cluster_points(&pts, 15)), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_threshold_is_strict() {
        // Exactly one radius apart stays separate
        let pts = vec![Point::new(1, 0.0, 0.0), Point::new(2, 0.0, COARSE_RADIUS)];
        assert_eq!(cluster_points(&pts, 5).len(), 2);
    }

    #[test]
    fn test_scenario_end_to_end_grouping() {
        let pts = vec![
            Point::new(1, 10.0, 20.0),
            Point::new(2, 10.001, 20.001),
            Point::new(3, 11.0, 21.0),
        ];
        let clusters = cluster_points(&pts, 10);
        assert_eq!(ids(&clusters), vec![vec![1, 2], vec![3]]);

        let c = clusters[0].centroid().unwrap();
        assert!((c.latitude - 10.0005).abs() < 1e-9);
        assert!((c.longitude - 20.0005).abs() < 1e-9);
    }

    #[test]
    fn test_seed_only_linkage_is_order_dependent() {
        // b is within radius of both a and c, but a and c are not within radius of each other
        let a = Point::new(1, 0.0, 0.0);
        let b = Point::new(2, 0.0, 0.015);
        let c = Point::new(3, 0.0, 0.03);

        let forward = cluster_points(&[a.clone(), b.clone(), c.clone()], 10);
        assert_eq!(ids(&forward), vec![vec![1, 2], vec![3]]);

        let middle_first = cluster_points(&[b, a, c], 10);
        assert_eq!(ids(&middle_first), vec![vec![2, 1, 3]]);
    }

    #[test]
    fn test_partition_property() {
        let mut pts = Vec::new();
        for i in 0..60 {
            let f = i as f64;
            pts.push(Point::new(i, 12.9 + (f * 0.0037) % 0.05, 77.5 + (f * 0.0071) % 0.05));
        }
        for zoom in [5, 11, 12, 16] {
            let clusters = cluster_points(&pts, zoom);
            let total: usize = clusters.iter().map(Cluster::len).sum();
            assert_eq!(total, pts.len());

            let mut seen: Vec<i64> = clusters.iter().flat_map(Cluster::ids).collect();
            seen.sort_unstable();
            let expected: Vec<i64> = (0..60).collect();
            assert_eq!(seen, expected);
            assert!(clusters.iter().all(|c| !c.is_empty()));
        }
    }

    #[test]
    fn test_clusters_follow_seed_order() {
        let pts = vec![
            Point::new(7, 50.0, 50.0),
            Point::new(3, 10.0, 10.0),
            Point::new(9, 50.001, 50.0),
            Point::new(1, 30.0, 30.0),
        ];
        let seeds: Vec<i64> = cluster_points(&pts, 10)
            .iter()
            .filter_map(|c| c.seed().map(|p| p.id))
            .collect();
        assert_eq!(seeds, vec![7, 3, 1]);
    }
}
