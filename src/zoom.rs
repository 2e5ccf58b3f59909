/// Zoom level assumed before the first viewport report
pub const INITIAL_ZOOM: i32 = 14;

/// Discrete zoom level from the degrees of longitude spanned by the viewport.
///
/// `round(log2(360 / longitude_delta))`. Callers must pass a positive delta;
/// zero or negative spans yield a meaningless level.
#[inline(always)]
pub fn zoom_from_longitude_delta(longitude_delta: f64) -> i32 {
    (360.0 / longitude_delta).log2().round() as i32
}

/// Tracks the zoom level the clustering radius is derived from
#[derive(Clone, Debug)]
pub struct ZoomTracker {
    current: i32,
}

impl ZoomTracker {
    pub fn new() -> Self {
        Self {
            current: INITIAL_ZOOM,
        }
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    /// Recompute from a completed viewport change. Returns true if the level moved.
    pub fn on_region_change(&mut self, longitude_delta: f64) -> bool {
        let next = zoom_from_longitude_delta(longitude_delta);
        let changed = next != self.current;
        self.current = next;
        changed
    }
}

impl Default for ZoomTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_delta() {
        assert_eq!(zoom_from_longitude_delta(0.0421), 13);
    }

    #[test]
    fn test_whole_world() {
        assert_eq!(zoom_from_longitude_delta(360.0), 0);
        assert_eq!(zoom_from_longitude_delta(180.0), 1);
    }

    #[test]
    fn test_tracker_reports_changes() {
        let mut tracker = ZoomTracker::new();
        assert_eq!(tracker.current(), INITIAL_ZOOM);

        assert!(tracker.on_region_change(0.0421));
        assert_eq!(tracker.current(), 13);

        // Same level again
        assert!(!tracker.on_region_change(0.04));
        assert_eq!(tracker.current(), 13);

        assert!(tracker.on_region_change(1.0));
        assert_eq!(tracker.current(), 8);
    }
}
