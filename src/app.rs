use crossbeam_channel::Sender;
use tracing::{debug, info};

use crate::api::BackendClient;
use crate::geo::LatLng;
use crate::map::{marker_at, MapRenderer, Viewport};
use crate::session::MapSession;
use crate::worker::{self, Completion};

/// Rows of the map area covered by the profile panel (bottom 30%)
pub fn panel_height(inner_height: u16) -> u16 {
    (inner_height as u32 * 3 / 10).max(3) as u16
}

/// Application state
pub struct App {
    pub session: MapSession,
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Keyboard focus, an index into the current marker plan
    pub selected: Option<usize>,
    /// Set once the first location fix has centred the map
    centered: bool,
    initial_delta: f64,
    client: BackendClient,
    tx: Sender<Completion>,
}

impl App {
    pub fn new(
        width: usize,
        height: usize,
        initial_delta: f64,
        client: BackendClient,
        tx: Sender<Completion>,
    ) -> Self {
        let (pixel_width, pixel_height) = pixel_size(width, height);
        Self {
            session: MapSession::new(),
            viewport: Viewport::new(LatLng::new(0.0, 0.0), initial_delta, pixel_width, pixel_height),
            map_renderer: MapRenderer::new(),
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            selected: None,
            centered: false,
            initial_delta,
            client,
            tx,
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// The map stays on the loading screen until the first fix arrives
    pub fn is_ready(&self) -> bool {
        self.centered
    }

    /// Kick off the one-shot marker fetch
    pub fn load_markers(&self) {
        worker::spawn_marker_fetch(self.client.clone(), self.tx.clone());
    }

    /// Apply a background completion on the UI thread
    pub fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Markers(result) => {
                self.session.on_markers_loaded(result);
                self.clamp_selection();
            }
            Completion::Profile { seq, result } => {
                self.session.on_profile_loaded(seq, result);
            }
            Completion::Location(fix) => {
                self.session.on_location(fix);
                if !self.centered {
                    self.centered = true;
                    self.viewport.center = fix;
                    info!(lat = fix.latitude, lon = fix.longitude, "map centred on first fix");
                    self.region_changed();
                }
            }
        }
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pixel_width, pixel_height) = pixel_size(width, height);
        self.viewport.resize(pixel_width, pixel_height);
    }

    /// Every viewport change settles immediately in a terminal
    fn region_changed(&mut self) {
        if self.session.on_region_change(self.viewport.longitude_delta()) {
            debug!(zoom = self.session.zoom(), radius = self.session.radius(), "zoom level changed");
            self.clamp_selection();
        }
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
        self.region_changed();
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
        self.region_changed();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
        self.region_changed();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
        self.region_changed();
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
        self.region_changed();
    }

    /// Back to the initial span around the current location
    pub fn reset_view(&mut self) {
        self.viewport = Viewport::new(
            self.session.current_location().unwrap_or(self.viewport.center),
            self.initial_delta,
            self.viewport.width,
            self.viewport.height,
        );
        self.region_changed();
    }

    pub fn recenter(&mut self) {
        if let Some(here) = self.session.current_location() {
            self.viewport.center = here;
            self.region_changed();
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Esc: dismiss an alert first, then close the profile panel
    pub fn escape(&mut self) {
        if !self.session.dismiss_alert() {
            self.session.close_profile();
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.session.plan().len();
        self.selected = match self.selected {
            Some(i) if len == 0 => {
                debug!(stale = i, "selection cleared");
                None
            }
            Some(i) => Some(i.min(len - 1)),
            None => None,
        };
    }

    /// Move keyboard focus through the markers in plan order
    pub fn select_next(&mut self) {
        let len = self.session.plan().len();
        if !self.centered || len == 0 {
            self.selected = None;
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) => (i + 1) % len,
            None => 0,
        });
    }

    pub fn select_prev(&mut self) {
        let len = self.session.plan().len();
        if !self.centered || len == 0 {
            self.selected = None;
            return;
        }
        self.selected = Some(match self.selected {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        });
    }

    /// Tap the focused marker. Markers are hidden until the first fix.
    pub fn activate_selected(&mut self) {
        if !self.centered {
            return;
        }
        if let Some(idx) = self.selected {
            self.activate(idx);
        }
    }

    /// Tap whatever marker is under a screen position. Returns true if one was hit.
    pub fn tap_at(&mut self, col: u16, row: u16) -> bool {
        if !self.centered || self.in_profile_panel(row) {
            return false;
        }
        let (px, py) = cell_to_pixel(col, row);
        let plan = self.session.plan();
        match marker_at(&self.viewport, &plan, px, py) {
            Some(idx) => {
                self.selected = Some(idx);
                self.activate(idx);
                true
            }
            None => false,
        }
    }

    fn activate(&mut self, idx: usize) {
        let plan = self.session.plan();
        let Some(marker) = plan.get(idx) else {
            return;
        };
        if let Some(request) = self.session.tap(marker) {
            debug!(seq = request.seq, "profile requested");
            worker::spawn_profile_fetch(self.client.clone(), request, self.tx.clone());
        }
        self.clamp_selection();
    }

    fn in_profile_panel(&self, row: u16) -> bool {
        if self.session.selected_profile().is_none() {
            return false;
        }
        // Inner map rows start at 1 (border); viewport height is in braille pixels
        let inner_height = (self.viewport.height / 4) as u16;
        let panel_top = 1 + inner_height.saturating_sub(panel_height(inner_height));
        row >= panel_top
    }

    /// Handle mouse drag
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            // One cell is 2 braille pixels wide and 4 tall
            self.pan(dx * 2, dy * 4);
        }
        self.last_mouse = Some((x, y));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Mouse position in braille pixel coordinates (for the cursor marker)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| cell_to_pixel(col, row))
    }

    pub fn zoom_level(&self) -> String {
        format!("z{}", self.session.zoom())
    }

    pub fn radius_label(&self) -> String {
        format!("r={}°", self.session.radius())
    }

    pub fn center_coords(&self) -> String {
        let c = self.viewport.center;
        format!(
            "{:.4}°{}, {:.4}°{}",
            c.latitude.abs(),
            if c.latitude >= 0.0 { "N" } else { "S" },
            c.longitude.abs(),
            if c.longitude >= 0.0 { "E" } else { "W" }
        )
    }
}

/// Braille gives 2x4 resolution per character. Border takes 2 columns, and
/// 2 rows plus 1 for the status bar.
fn pixel_size(width: usize, height: usize) -> (usize, usize) {
    (width.saturating_sub(2) * 2, height.saturating_sub(3) * 4)
}

/// Terminal cell to braille pixel, accounting for the 1-cell border
fn cell_to_pixel(col: u16, row: u16) -> (i32, i32) {
    let px = (col.saturating_sub(1) as i32) * 2;
    let py = (row.saturating_sub(1) as i32) * 4;
    (px, py)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Profile;
    use crate::geo::Point;
    use crossbeam_channel::{unbounded, Receiver};
    use std::time::Duration;

    fn app() -> (App, Receiver<Completion>) {
        let (tx, rx) = unbounded();
        let client = BackendClient::new("http://127.0.0.1:9", None).unwrap();
        (App::new(102, 53, 0.0421, client, tx), rx)
    }

    fn scenario() -> Vec<Point> {
        vec![
            Point::new(1, 10.0, 20.0),
            Point::new(2, 10.001, 20.001),
            Point::new(3, 11.0, 21.0),
        ]
    }

    /// Centre on (10, 20) with a span that gives zoom 10
    fn ready_app() -> (App, Receiver<Completion>) {
        let (mut app, rx) = app();
        app.handle_completion(Completion::Markers(Ok(scenario())));
        app.handle_completion(Completion::Location(LatLng::new(10.0, 20.0)));
        for _ in 0..3 {
            app.zoom_out();
        }
        (app, rx)
    }

    #[test]
    fn test_waits_for_first_fix() {
        let (mut app, _rx) = app();
        assert!(!app.is_ready());
        assert_eq!(app.viewport.width, 200);
        assert_eq!(app.viewport.height, 200);

        app.handle_completion(Completion::Location(LatLng::new(12.97, 77.59)));
        assert!(app.is_ready());
        assert_eq!(app.viewport.center, LatLng::new(12.97, 77.59));
        assert_eq!(app.session.zoom(), 13);

        // Later fixes move the marker but not the map
        app.handle_completion(Completion::Location(LatLng::new(13.0, 77.6)));
        assert_eq!(app.viewport.center, LatLng::new(12.97, 77.59));
        assert_eq!(app.session.current_location(), Some(LatLng::new(13.0, 77.6)));
    }

    #[test]
    fn test_zooming_changes_tier() {
        let (app, _rx) = ready_app();
        // 0.0421 * 8 = 0.3368 -> round(log2(1068.9)) = 10
        assert_eq!(app.session.zoom(), 10);
        assert_eq!(app.session.clusters().len(), 2);
        assert_eq!(app.zoom_level(), "z10");
    }

    #[test]
    fn test_keyboard_tap_expands_cluster() {
        let (mut app, _rx) = ready_app();
        app.select_next();
        assert_eq!(app.selected, Some(0));
        app.activate_selected();
        assert!(app.session.expanded().contains(0));
        assert_eq!(app.session.plan().len(), 3);

        // Focus now sits on the first member; tapping it looks up a profile
        // and leaves the cluster open
        app.activate_selected();
        assert!(app.session.expanded().contains(0));
        assert_eq!(app.session.plan().len(), 3);
    }

    #[test]
    fn test_keyboard_ignored_before_first_fix() {
        let (mut app, rx) = app();
        app.session.on_permission_denied();
        app.handle_completion(Completion::Markers(Ok(vec![Point::new(1, 10.0, 20.0)])));
        assert!(!app.is_ready());

        app.select_next();
        assert_eq!(app.selected, None);
        app.select_prev();
        assert_eq!(app.selected, None);

        app.selected = Some(0);
        app.activate_selected();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert!(app.session.expanded().is_empty());
    }

    #[test]
    fn test_selection_wraps() {
        let (mut app, _rx) = ready_app();
        app.select_prev();
        assert_eq!(app.selected, Some(1));
        app.select_next();
        assert_eq!(app.selected, Some(0));
    }

    #[test]
    fn test_mouse_tap_on_cluster() {
        let (mut app, _rx) = ready_app();
        let plan = app.session.plan();
        let (px, py) = app.viewport.project(plan[0].position());
        let col = (px / 2) as u16 + 1;
        let row = (py / 4) as u16 + 1;
        assert!(app.tap_at(col, row));
        assert!(app.session.expanded().contains(0));
    }

    #[test]
    fn test_tap_on_point_requests_profile() {
        let (mut app, rx) = ready_app();
        app.selected = Some(1);
        app.activate_selected();
        match rx.recv_timeout(Duration::from_secs(30)).unwrap() {
            Completion::Profile { seq, result } => {
                assert_eq!(seq, 1);
                assert!(result.is_err());
                app.handle_completion(Completion::Profile { seq, result });
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(app.session.alert().is_some());
        app.escape();
        assert!(app.session.alert().is_none());
    }

    #[test]
    fn test_escape_closes_profile() {
        let (mut app, _rx) = ready_app();
        app.selected = Some(1);
        app.activate_selected();
        app.handle_completion(Completion::Profile {
            seq: 1,
            result: Ok(Profile::default()),
        });
        assert!(app.session.selected_profile().is_some());
        app.escape();
        assert!(app.session.selected_profile().is_none());
    }

    #[test]
    fn test_taps_in_profile_panel_ignored() {
        let (mut app, _rx) = ready_app();
        app.selected = Some(1);
        app.activate_selected();
        app.handle_completion(Completion::Profile {
            seq: 1,
            result: Ok(Profile::default()),
        });
        // Bottom row of the map area is under the panel
        assert!(!app.tap_at(10, 50));
    }

    #[test]
    fn test_reset_view() {
        let (mut app, _rx) = ready_app();
        app.pan(40, 0);
        app.reset_view();
        assert_eq!(app.viewport.center, LatLng::new(10.0, 20.0));
        assert_eq!(app.session.zoom(), 13);
    }

    #[test]
    fn test_panel_height() {
        assert_eq!(panel_height(50), 15);
        assert_eq!(panel_height(4), 3);
    }
}
