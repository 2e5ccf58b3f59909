pub mod basemap;
mod geometry;
mod projection;
mod renderer;

pub use projection::Viewport;
pub use renderer::{marker_at, Label, LabelKind, MapLayers, MapRenderer};
