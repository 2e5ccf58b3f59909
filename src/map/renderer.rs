use crate::braille::BrailleCanvas;
use crate::geo::LatLng;
use crate::map::basemap::LineString;
use crate::map::geometry::{draw_circle, draw_line, draw_ring};
use crate::map::projection::Viewport;
use crate::render_policy::MarkerPlan;

/// Taps farther than this many pixels from every marker hit nothing
pub const HIT_RADIUS_PX: i32 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelKind {
    Point,
    Cluster,
    Location,
}

/// Text placed over the braille layers, in character cells
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub x: u16,
    pub y: u16,
    pub text: String,
    pub kind: LabelKind,
}

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_basemap: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_basemap: true,
            show_labels: true,
        }
    }
}

/// Rendered map layers, drawn back to front
pub struct MapLayers {
    pub basemap: BrailleCanvas,
    pub points: BrailleCanvas,
    pub clusters: BrailleCanvas,
    pub location: BrailleCanvas,
    pub labels: Vec<Label>,
}

pub struct MapRenderer {
    pub basemap: Vec<LineString>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            basemap: Vec::new(),
            settings: DisplaySettings::default(),
        }
    }

    pub fn set_basemap(&mut self, lines: Vec<LineString>) {
        self.basemap = lines;
    }

    pub fn has_basemap(&self) -> bool {
        !self.basemap.is_empty()
    }

    pub fn toggle_basemap(&mut self) {
        self.settings.show_basemap = !self.settings.show_basemap;
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    /// Render the basemap, the planned markers and the current location.
    /// `width`/`height` are in character cells.
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        plan: &[MarkerPlan],
        location: Option<LatLng>,
    ) -> MapLayers {
        let mut layers = MapLayers {
            basemap: BrailleCanvas::new(width, height),
            points: BrailleCanvas::new(width, height),
            clusters: BrailleCanvas::new(width, height),
            location: BrailleCanvas::new(width, height),
            labels: Vec::new(),
        };

        if self.settings.show_basemap {
            for line in &self.basemap {
                draw_linestring(&mut layers.basemap, line, viewport);
            }
        }

        for marker in plan {
            let (px, py) = viewport.project(marker.position());
            if !viewport.is_visible(px, py) {
                continue;
            }
            match marker {
                MarkerPlan::Individual { .. } => {
                    draw_circle(&mut layers.points, px, py, 1);
                    if self.settings.show_labels {
                        push_label(&mut layers.labels, px, py, 2, marker.label(), LabelKind::Point);
                    }
                }
                MarkerPlan::Aggregate { .. } => {
                    draw_ring(&mut layers.clusters, px, py, 4);
                    // Count badge always shows, it is the marker's content
                    push_label(&mut layers.labels, px, py, 0, marker.label(), LabelKind::Cluster);
                }
            }
        }

        if let Some(here) = location {
            let (px, py) = viewport.project(here);
            if viewport.is_visible(px, py) {
                draw_ring(&mut layers.location, px, py, 3);
                draw_circle(&mut layers.location, px, py, 0);
                if self.settings.show_labels {
                    push_label(
                        &mut layers.labels,
                        px,
                        py,
                        3,
                        "Your Location".to_string(),
                        LabelKind::Location,
                    );
                }
            }
        }

        layers
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert braille pixel coords to a character cell, offset by `dx` cells
fn push_label(labels: &mut Vec<Label>, px: i32, py: i32, dx: u16, text: String, kind: LabelKind) {
    if px < 0 || py < 0 {
        return;
    }
    let char_x = (px / 2) as u16;
    let char_y = (py / 4) as u16;
    if let Some(x) = char_x.checked_add(dx) {
        labels.push(Label {
            x,
            y: char_y,
            text,
            kind,
        });
    }
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;
    for &p in line {
        let (px, py) = viewport.project(p);
        if let Some((prev_x, prev_y)) = prev {
            // Skip segments that wrap around the antimeridian
            let dist = (i64::from(px) - i64::from(prev_x)).abs() + (i64::from(py) - i64::from(prev_y)).abs();
            if dist < viewport.width.max(1) as i64 * 4
                && viewport.line_might_be_visible((prev_x, prev_y), (px, py))
            {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }
        prev = Some((px, py));
    }
}

/// Index of the planned marker nearest to pixel (px, py), within `HIT_RADIUS_PX`
pub fn marker_at(viewport: &Viewport, plan: &[MarkerPlan], px: i32, py: i32) -> Option<usize> {
    plan.iter()
        .enumerate()
        .map(|(idx, m)| {
            let (mx, my) = viewport.project(m.position());
            let dx = i64::from(mx) - i64::from(px);
            let dy = i64::from(my) - i64::from(py);
            (idx, dx * dx + dy * dy)
        })
        .filter(|&(_, d2)| d2 <= i64::from(HIT_RADIUS_PX * HIT_RADIUS_PX))
        .min_by_key(|&(_, d2)| d2)
        .map(|(idx, _)| idx)
}
