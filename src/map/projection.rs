use crate::geo::LatLng;

/// Narrowest span the viewport zooms to (roughly a metre)
pub const MIN_LONGITUDE_DELTA: f64 = 1e-5;
/// Whole world
pub const MAX_LONGITUDE_DELTA: f64 = 360.0;

/// Visible map region projected onto a braille pixel grid.
///
/// Plate carrée within the region: braille pixels are treated as square, so the
/// latitude span follows from the longitude span and the canvas aspect.
#[derive(Clone, Debug)]
pub struct Viewport {
    pub center: LatLng,
    /// Degrees of longitude across the canvas width. Always positive.
    longitude_delta: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center: LatLng, longitude_delta: f64, width: usize, height: usize) -> Self {
        Self {
            center,
            longitude_delta: clamp_delta(longitude_delta),
            width,
            height,
        }
    }

    pub fn longitude_delta(&self) -> f64 {
        self.longitude_delta
    }

    pub fn latitude_delta(&self) -> f64 {
        if self.width == 0 {
            return self.longitude_delta;
        }
        self.longitude_delta * self.height as f64 / self.width as f64
    }

    /// Degrees per pixel along either axis
    #[inline(always)]
    fn scale(&self) -> f64 {
        self.longitude_delta / self.width.max(1) as f64
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Move the center so the map shifts by a pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = self.scale();
        self.center.longitude += dx as f64 * scale;
        self.center.latitude -= dy as f64 * scale;

        if self.center.longitude > 180.0 {
            self.center.longitude -= 360.0;
        } else if self.center.longitude < -180.0 {
            self.center.longitude += 360.0;
        }
        self.center.latitude = self.center.latitude.clamp(-85.0, 85.0);
    }

    pub fn zoom_in(&mut self) {
        self.longitude_delta = clamp_delta(self.longitude_delta / 2.0);
    }

    pub fn zoom_out(&mut self) {
        self.longitude_delta = clamp_delta(self.longitude_delta * 2.0);
    }

    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 0.5);
    }

    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 2.0);
    }

    /// Scale the span while keeping the coordinate under (px, py) in place
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let anchor = self.unproject(px, py);
        self.longitude_delta = clamp_delta(self.longitude_delta * factor);
        let (new_px, new_py) = self.project(anchor);
        self.pan(new_px - px, new_py - py);
    }

    /// Project a coordinate to pixel coordinates
    pub fn project(&self, p: LatLng) -> (i32, i32) {
        let scale = self.scale();
        let x = (p.longitude - self.center.longitude) / scale + self.width as f64 / 2.0;
        let y = (self.center.latitude - p.latitude) / scale + self.height as f64 / 2.0;
        (x.round() as i32, y.round() as i32)
    }

    /// Pixel coordinates back to a coordinate
    pub fn unproject(&self, px: i32, py: i32) -> LatLng {
        let scale = self.scale();
        let longitude = self.center.longitude + (px as f64 - self.width as f64 / 2.0) * scale;
        let latitude = self.center.latitude - (py as f64 - self.height as f64 / 2.0) * scale;
        LatLng::new(latitude, longitude)
    }

    /// Check if a projected point is on the canvas, with a small margin
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

#[inline(always)]
fn clamp_delta(delta: f64) -> f64 {
    if delta.is_nan() {
        return MAX_LONGITUDE_DELTA;
    }
    delta.clamp(MIN_LONGITUDE_DELTA, MAX_LONGITUDE_DELTA)
}
