/// A latitude/longitude pair in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Coordinate text exactly as the backend sent it.
/// Profile lookups match on the stored strings, so they must be echoed verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LookupKey {
    pub latitude: String,
    pub longitude: String,
}

/// A flagged location
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub key: LookupKey,
}

impl Point {
    /// Build a point whose lookup key is the default float formatting
    pub fn new(id: i64, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            latitude,
            longitude,
            key: LookupKey {
                latitude: latitude.to_string(),
                longitude: longitude.to_string(),
            },
        }
    }

    #[inline(always)]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// Planar distance in degrees, treating lat/lon as plane coordinates.
/// Only meaningful for city-scale spans. NaN inputs propagate.
#[inline(always)]
pub fn distance(a: LatLng, b: LatLng) -> f64 {
    let lat_diff = a.latitude - b.latitude;
    let lon_diff = a.longitude - b.longitude;
    (lat_diff * lat_diff + lon_diff * lon_diff).sqrt()
}

/// Arithmetic mean of each axis independently. `None` for an empty slice.
pub fn centroid(points: &[Point]) -> Option<LatLng> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lat_sum, lon_sum) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));
    Some(LatLng::new(lat_sum / n, lon_sum / n))
}

/// Equirectangular distance in metres, scaled by the cosine of the mean latitude.
/// Good for the short hops between consecutive location fixes.
#[inline(always)]
pub fn distance_m(a: LatLng, b: LatLng) -> f64 {
    const R: f64 = 6_371_000.0;

    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let lat_avg = ((a.latitude + b.latitude) * 0.5).to_radians();

    let dx = dlon * lat_avg.cos();
    let dy = dlat;

    R * (dx * dx + dy * dy).sqrt()
}
