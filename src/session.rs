//! State owned by the map screen for as long as it is open.
//!
//! Every transition is a plain method call made from the UI thread: viewport
//! changes, fetch completions, location deliveries and taps. Clustering is
//! recomputed eagerly whenever the point set or the zoom level changes.

use tracing::{debug, info, warn};

use crate::api::Profile;
use crate::cluster::{cluster_points, radius_for_zoom, Cluster};
use crate::error::ApiError;
use crate::geo::{LatLng, LookupKey, Point};
use crate::render_policy::{plan_markers, ExpandedSet, MarkerPlan, TapAction};
use crate::zoom::ZoomTracker;

/// A message shown over the map
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
    /// Blocking alerts stay up until the condition clears
    pub blocking: bool,
}

impl Alert {
    fn dismissable(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            blocking: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationState {
    /// Waiting for the first fix
    Pending,
    Denied,
    Active,
}

/// A profile lookup the front end should run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileRequest {
    pub seq: u64,
    pub key: LookupKey,
}

pub struct MapSession {
    points: Vec<Point>,
    zoom: ZoomTracker,
    clusters: Vec<Cluster>,
    expanded: ExpandedSet,
    selected: Option<Profile>,
    /// Sequence number of the newest profile request issued
    latest_request: u64,
    current_location: Option<LatLng>,
    location: LocationState,
    alert: Option<Alert>,
}

impl MapSession {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            zoom: ZoomTracker::new(),
            clusters: Vec::new(),
            expanded: ExpandedSet::new(),
            selected: None,
            latest_request: 0,
            current_location: None,
            location: LocationState::Pending,
            alert: None,
        }
    }

    fn recluster(&mut self) {
        self.clusters = cluster_points(&self.points, self.zoom.current());
        debug!(
            points = self.points.len(),
            clusters = self.clusters.len(),
            zoom = self.zoom.current(),
            "reclustered"
        );
    }

    /// Viewport settled on a new span. Returns true if the zoom level changed.
    pub fn on_region_change(&mut self, longitude_delta: f64) -> bool {
        let changed = self.zoom.on_region_change(longitude_delta);
        if changed {
            self.recluster();
        }
        changed
    }

    /// Marker fetch finished. Success replaces the whole set; failure keeps it.
    pub fn on_markers_loaded(&mut self, result: Result<Vec<Point>, ApiError>) {
        match result {
            Ok(points) => {
                info!(count = points.len(), "marker set replaced");
                self.points = points;
                self.recluster();
            }
            Err(err) => {
                warn!(error = %err, "marker fetch failed");
                self.raise(Alert::dismissable("Error", "Failed to load marker data"));
            }
        }
    }

    /// Apply a tap on a planned marker. Returns a profile request for point markers.
    pub fn tap(&mut self, marker: &MarkerPlan) -> Option<ProfileRequest> {
        match marker.tap_action() {
            TapAction::ToggleCluster(index) => {
                let open = self.expanded.toggle(index);
                debug!(cluster = index, expanded = open, "cluster toggled");
                None
            }
            TapAction::FetchProfile(key) => {
                self.latest_request += 1;
                Some(ProfileRequest {
                    seq: self.latest_request,
                    key,
                })
            }
        }
    }

    /// Profile fetch finished. Completions older than the newest request are
    /// discarded so a slow earlier lookup cannot overwrite a later one.
    /// Returns true if the completion was applied.
    pub fn on_profile_loaded(&mut self, seq: u64, result: Result<Profile, ApiError>) -> bool {
        if seq < self.latest_request {
            debug!(seq, latest = self.latest_request, "discarding stale profile response");
            return false;
        }
        match result {
            Ok(profile) => self.selected = Some(profile),
            Err(err) => {
                warn!(error = %err, "profile fetch failed");
                self.raise(Alert::dismissable(
                    "Error",
                    "Failed to fetch profile details",
                ));
            }
        }
        true
    }

    pub fn close_profile(&mut self) {
        self.selected = None;
    }

    pub fn on_location(&mut self, fix: LatLng) {
        self.current_location = Some(fix);
        self.location = LocationState::Active;
    }

    pub fn on_permission_denied(&mut self) {
        self.location = LocationState::Denied;
        self.alert = Some(Alert {
            title: "Permission denied".to_string(),
            message: "Allow location permissions to use this feature.".to_string(),
            blocking: true,
        });
    }

    /// Show an alert unless a blocking one is already up
    fn raise(&mut self, alert: Alert) {
        if self.alert.as_ref().is_some_and(|a| a.blocking) {
            debug!(title = %alert.title, "alert suppressed behind blocking alert");
            return;
        }
        self.alert = Some(alert);
    }

    /// Dismiss the current alert. Blocking alerts stay.
    pub fn dismiss_alert(&mut self) -> bool {
        match &self.alert {
            Some(alert) if !alert.blocking => {
                self.alert = None;
                true
            }
            _ => false,
        }
    }

    /// Markers to draw for the current clusters and expansion state
    pub fn plan(&self) -> Vec<MarkerPlan> {
        plan_markers(&self.clusters, &self.expanded)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn expanded(&self) -> &ExpandedSet {
        &self.expanded
    }

    pub fn zoom(&self) -> i32 {
        self.zoom.current()
    }

    pub fn radius(&self) -> f64 {
        radius_for_zoom(self.zoom.current())
    }

    pub fn selected_profile(&self) -> Option<&Profile> {
        self.selected.as_ref()
    }

    pub fn current_location(&self) -> Option<LatLng> {
        self.current_location
    }

    pub fn location_state(&self) -> LocationState {
        self.location
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }
}

impl Default for MapSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_points() -> Vec<Point> {
        vec![
            Point::new(1, 10.0, 20.0),
            Point::new(2, 10.001, 20.001),
            Point::new(3, 11.0, 21.0),
        ]
    }

    fn failed() -> ApiError {
        ApiError::Status {
            status: 500,
            message: "boom".to_string(),
        }
    }

    fn named(name: &str) -> Profile {
        Profile {
            name: Some(name.to_string()),
            ..Profile::default()
        }
    }

    #[test]
    fn test_scenario_end_to_end() {
        let mut session = MapSession::new();
        // 360 / 0.3515625 = 1024 -> zoom 10
        assert!(session.on_region_change(0.3515625));
        assert_eq!(session.zoom(), 10);
        assert_eq!(session.radius(), 0.02);

        session.on_markers_loaded(Ok(scenario_points()));
        let ids: Vec<Vec<i64>> = session.clusters().iter().map(Cluster::ids).collect();
        assert_eq!(ids, vec![vec![1, 2], vec![3]]);

        let plan = session.plan();
        assert_eq!(plan.len(), 2);
        assert!(matches!(plan[0], MarkerPlan::Aggregate { count: 2, .. }));
        assert!(matches!(&plan[1], MarkerPlan::Individual { point, .. } if point.id == 3));
    }

    #[test]
    fn test_zoom_change_reclusters() {
        let mut session = MapSession::new();
        session.on_region_change(0.3515625);
        session.on_markers_loaded(Ok(vec![
            Point::new(1, 10.0, 20.0),
            Point::new(2, 10.01, 20.0),
        ]));
        assert_eq!(session.clusters().len(), 1);

        // Zoom 13: fine radius splits them
        session.on_region_change(0.0421);
        assert_eq!(session.zoom(), 13);
        assert_eq!(session.clusters().len(), 2);
    }

    #[test]
    fn test_tap_aggregate_toggles_without_request() {
        let mut session = MapSession::new();
        session.on_region_change(0.3515625);
        session.on_markers_loaded(Ok(scenario_points()));

        let plan = session.plan();
        assert!(session.tap(&plan[0]).is_none());
        assert!(session.expanded().contains(0));
        assert_eq!(session.plan().len(), 3);
        // Clusters untouched by the toggle
        assert_eq!(session.clusters().len(), 2);

        let expanded_plan = session.plan();
        let member = expanded_plan
            .iter()
            .find(|m| matches!(m, MarkerPlan::Individual { cluster: 0, .. }))
            .unwrap();
        assert!(session.tap(member).is_some());
    }

    #[test]
    fn test_tap_point_issues_sequenced_requests() {
        let mut session = MapSession::new();
        session.on_markers_loaded(Ok(vec![Point::new(9, 1.0, 2.0)]));
        let plan = session.plan();

        let first = session.tap(&plan[0]).unwrap();
        let second = session.tap(&plan[0]).unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(first.key.latitude, "1");
    }

    #[test]
    fn test_stale_profile_discarded() {
        let mut session = MapSession::new();
        session.on_markers_loaded(Ok(vec![Point::new(1, 1.0, 2.0), Point::new(2, 5.0, 6.0)]));
        let plan = session.plan();
        let older = session.tap(&plan[0]).unwrap();
        let newer = session.tap(&plan[1]).unwrap();

        assert!(session.on_profile_loaded(newer.seq, Ok(named("newer"))));
        assert!(!session.on_profile_loaded(older.seq, Ok(named("older"))));
        assert_eq!(
            session.selected_profile().and_then(|p| p.name.as_deref()),
            Some("newer")
        );

        // Stale failures do not raise alerts either
        assert!(!session.on_profile_loaded(older.seq, Err(failed())));
        assert!(session.alert().is_none());
    }

    #[test]
    fn test_close_profile() {
        let mut session = MapSession::new();
        session.on_markers_loaded(Ok(vec![Point::new(1, 1.0, 2.0)]));
        let req = session.tap(&session.plan()[0]).unwrap();
        session.on_profile_loaded(req.seq, Ok(named("x")));
        assert!(session.selected_profile().is_some());
        session.close_profile();
        assert!(session.selected_profile().is_none());
    }

    #[test]
    fn test_marker_failure_keeps_previous_set() {
        let mut session = MapSession::new();
        session.on_markers_loaded(Ok(scenario_points()));
        session.on_markers_loaded(Err(failed()));
        assert_eq!(session.points().len(), 3);

        let alert = session.alert().unwrap();
        assert_eq!(alert.message, "Failed to load marker data");
        assert!(!alert.blocking);
        assert!(session.dismiss_alert());
        assert!(session.alert().is_none());
    }

    #[test]
    fn test_profile_failure_alerts_and_keeps_selection() {
        let mut session = MapSession::new();
        session.on_markers_loaded(Ok(vec![Point::new(1, 1.0, 2.0)]));
        let first = session.tap(&session.plan()[0]).unwrap();
        session.on_profile_loaded(first.seq, Ok(named("kept")));

        let second = session.tap(&session.plan()[0]).unwrap();
        assert!(session.on_profile_loaded(second.seq, Err(failed())));
        assert_eq!(
            session.alert().map(|a| a.message.as_str()),
            Some("Failed to fetch profile details")
        );
        assert!(session.selected_profile().is_some());
    }

    #[test]
    fn test_permission_denied_is_blocking() {
        let mut session = MapSession::new();
        session.on_permission_denied();
        assert_eq!(session.location_state(), LocationState::Denied);
        assert!(session.alert().unwrap().blocking);
        assert!(!session.dismiss_alert());
        assert!(session.alert().is_some());
    }

    #[test]
    fn test_fetch_failures_keep_blocking_alert() {
        let mut session = MapSession::new();
        session.on_permission_denied();

        session.on_markers_loaded(Err(failed()));
        let alert = session.alert().unwrap();
        assert_eq!(alert.title, "Permission denied");
        assert!(alert.blocking);

        let marker = MarkerPlan::Individual {
            cluster: 0,
            member: 0,
            point: Point::new(1, 12.9, 77.5),
        };
        let request = session.tap(&marker).unwrap();
        assert!(session.on_profile_loaded(request.seq, Err(failed())));
        assert_eq!(session.alert().unwrap().title, "Permission denied");

        assert!(!session.dismiss_alert());
        assert_eq!(session.location_state(), LocationState::Denied);
    }

    #[test]
    fn test_location_updates_do_not_recluster() {
        let mut session = MapSession::new();
        session.on_markers_loaded(Ok(scenario_points()));
        let before = session.clusters().to_vec();

        assert_eq!(session.location_state(), LocationState::Pending);
        session.on_location(LatLng::new(10.0, 20.0));
        assert_eq!(session.location_state(), LocationState::Active);
        assert_eq!(session.current_location(), Some(LatLng::new(10.0, 20.0)));
        assert_eq!(session.clusters(), before.as_slice());
    }

    #[test]
    fn test_expansion_indices_are_positional() {
        let mut session = MapSession::new();
        session.on_region_change(0.3515625);
        session.on_markers_loaded(Ok(scenario_points()));
        session.tap(&session.plan()[0]);
        assert!(session.expanded().contains(0));

        // A new set keeps the stale index; cluster 0 is now a different group
        session.on_markers_loaded(Ok(vec![
            Point::new(7, 40.0, 40.0),
            Point::new(8, 40.001, 40.0),
        ]));
        assert!(session.expanded().contains(0));
        assert_eq!(session.plan().len(), 2);
    }
}
