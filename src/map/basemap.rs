//! Optional outline layer drawn under the markers (campus boundaries, roads, ...)

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, Value};
use tracing::{info, warn};

use crate::geo::LatLng;

/// A polyline of coordinates
pub type LineString = Vec<LatLng>;

/// Load every `.geojson` / `.json` file in `dir`. Unreadable files are skipped
/// with a warning so one bad file does not hide the rest.
pub fn load_dir(dir: &Path) -> Result<Vec<LineString>> {
    let mut lines = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("reading basemap dir {}", dir.display()))?;

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("geojson") | Some("json")
            )
        })
        .collect();
    paths.sort();

    for path in paths {
        match load_file(&path) {
            Ok(mut found) => {
                info!(file = %path.display(), lines = found.len(), "basemap layer loaded");
                lines.append(&mut found);
            }
            Err(e) => warn!(file = %path.display(), error = %e, "skipping basemap file"),
        }
    }
    Ok(lines)
}

pub fn load_file(path: &Path) -> Result<Vec<LineString>> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;
    let mut lines = Vec::new();
    collect_lines(&geojson, &mut |line| lines.push(line));
    Ok(lines)
}

/// Walk a GeoJSON document and hand every line or ring to `add_line`
pub fn collect_lines<F>(geojson: &GeoJson, add_line: &mut F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    geometry_lines(geometry, add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                geometry_lines(geometry, add_line);
            }
        }
        GeoJson::Geometry(geometry) => geometry_lines(geometry, add_line),
    }
}

fn to_line(coords: &[Vec<f64>]) -> LineString {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| LatLng::new(c[1], c[0]))
        .collect()
}

fn geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(LineString),
{
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(to_line(coords));
            }
        }
        // Every ring, so courtyards and holes show up too
        Value::Polygon(rings) => {
            for ring in rings {
                add_line(to_line(ring));
            }
        }
        Value::MultiPolygon(polygons) => {
            for ring in polygons.iter().flatten() {
                add_line(to_line(ring));
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                geometry_lines(g, add_line);
            }
        }
        // Points carry no outline
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMPUS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[77.0, 12.0], [77.1, 12.0], [77.1, 12.1], [77.0, 12.0]]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "LineString", "coordinates": [[77.0, 12.05], [77.1, 12.05]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Point", "coordinates": [77.05, 12.05]}}
        ]
    }"#;

    #[test]
    fn test_collect_lines_swaps_axes() {
        let geojson: GeoJson = CAMPUS.parse().unwrap();
        let mut lines = Vec::new();
        collect_lines(&geojson, &mut |l| lines.push(l));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][0], LatLng::new(12.0, 77.0));
        assert_eq!(lines[1].len(), 2);
    }

    #[test]
    fn test_load_dir_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("campus.geojson"), CAMPUS).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let lines = load_dir(dir.path()).unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_missing_dir_is_error() {
        assert!(load_dir(Path::new("/definitely/not/here")).is_err());
    }
}
