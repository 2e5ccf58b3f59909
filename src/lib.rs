//! Terminal map of flagged campus locations.
//!
//! Points fetched from the backend are grouped with a zoom-tiered greedy
//! proximity pass and drawn on a braille canvas; aggregated clusters expand on
//! tap and point markers open the profile stored at their coordinates.

pub mod api;
pub mod app;
pub mod braille;
pub mod cluster;
pub mod config;
pub mod error;
pub mod geo;
pub mod location;
pub mod logging;
pub mod map;
pub mod render_policy;
pub mod session;
pub mod ui;
pub mod worker;
pub mod zoom;
