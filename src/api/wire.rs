//! Backend payload shapes and decoding

use serde::Deserialize;
use tracing::warn;

use crate::error::ApiError;
use crate::geo::{LookupKey, Point};

/// The backend stores coordinates as text, so either form can arrive
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
enum Coord {
    Number(f64),
    Text(String),
}

impl Coord {
    /// Parsed value plus the text to echo back in lookups
    fn resolve(self) -> Option<(f64, String)> {
        match self {
            Coord::Number(v) if v.is_finite() => Some((v, v.to_string())),
            Coord::Number(_) => None,
            Coord::Text(s) => {
                let v: f64 = s.trim().parse().ok()?;
                v.is_finite().then_some((v, s))
            }
        }
    }
}

#[derive(Deserialize, Debug)]
struct MarkerRecord {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    latitude: Option<Coord>,
    #[serde(default)]
    longitude: Option<Coord>,
}

/// Decode the `/latlongs/` array into points.
///
/// Records without usable coordinates are dropped. A missing id becomes the
/// record's 1-based position in the array.
pub fn decode_markers(body: &mut [u8]) -> Result<Vec<Point>, ApiError> {
    let records: Vec<MarkerRecord> = simd_json::serde::from_slice(body)?;
    let total = records.len();

    let points: Vec<Point> = records
        .into_iter()
        .enumerate()
        .filter_map(|(pos, rec)| {
            let id = rec.id.unwrap_or(pos as i64 + 1);
            let lat = rec.latitude.and_then(Coord::resolve);
            let lon = rec.longitude.and_then(Coord::resolve);
            match (lat, lon) {
                (Some((latitude, lat_text)), Some((longitude, lon_text))) => Some(Point {
                    id,
                    latitude,
                    longitude,
                    key: LookupKey {
                        latitude: lat_text,
                        longitude: lon_text,
                    },
                }),
                _ => {
                    warn!(id, "dropping marker without usable coordinates");
                    None
                }
            }
        })
        .collect();

    if points.len() < total {
        warn!(kept = points.len(), total, "some markers were dropped");
    }
    Ok(points)
}

/// Profile record returned by `/profile_by_latlong/`. Every field is optional.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub photo: Option<String>,
    pub aadhar_number: Option<String>,
    pub phone_number: Option<String>,
    pub email_id: Option<String>,
    pub course_name: Option<String>,
    pub course_year: Option<String>,
    pub passingout_year: Option<String>,
    pub college_register_number: Option<String>,
    pub college_name: Option<String>,
    pub parents_address: Option<String>,
    pub parents_phone_number: Option<String>,
    pub present_residential_address: Option<String>,
    pub residency_name: Option<String>,
    pub residency_ownername: Option<String>,
    pub owner_phone_number: Option<String>,
    pub room_number: Option<String>,
    pub previous_cases_count: Option<u32>,
    pub vehicle_number: Option<String>,
    pub flagged_reason: Option<String>,
    pub flag_count: Option<u32>,
}

impl Profile {
    /// Labelled rows for the detail panel, absent fields skipped
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let fields: [(&'static str, Option<String>); 21] = [
            ("Name", self.name.clone()),
            ("Age", self.age.map(|v| v.to_string())),
            ("Aadhar Number", self.aadhar_number.clone()),
            ("Phone", self.phone_number.clone()),
            ("Email", self.email_id.clone()),
            ("Course", self.course_name.clone()),
            ("Year", self.course_year.clone()),
            ("Passing Out", self.passingout_year.clone()),
            ("College Register No", self.college_register_number.clone()),
            ("College", self.college_name.clone()),
            ("Parents Address", self.parents_address.clone()),
            ("Parents Phone", self.parents_phone_number.clone()),
            ("Residential Address", self.present_residential_address.clone()),
            ("Residency Name", self.residency_name.clone()),
            ("Residency Owner", self.residency_ownername.clone()),
            ("Owner Phone", self.owner_phone_number.clone()),
            ("Room Number", self.room_number.clone()),
            ("Previous Cases", self.previous_cases_count.map(|v| v.to_string())),
            ("Vehicle Number", self.vehicle_number.clone()),
            ("Flagged Reason", self.flagged_reason.clone()),
            ("Flag Count", self.flag_count.map(|v| v.to_string())),
        ];
        fields
            .into_iter()
            .filter_map(|(label, value)| value.map(|v| (label, v)))
            .collect()
    }

    /// Absolute photo URL; the backend returns a server-relative path
    pub fn photo_url(&self, base_url: &str) -> Option<String> {
        let photo = self.photo.as_deref()?;
        if photo.starts_with("http://") || photo.starts_with("https://") {
            Some(photo.to_string())
        } else {
            Some(format!("{}{}", base_url.trim_end_matches('/'), photo))
        }
    }
}

pub fn decode_profile(body: &mut [u8]) -> Result<Profile, ApiError> {
    Ok(simd_json::serde::from_slice(body)?)
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pull `{"message": ...}` out of an error response, if present
pub fn error_message(body: &mut [u8]) -> Option<String> {
    simd_json::serde::from_slice::<ErrorBody>(body)
        .ok()
        .map(|b| b.message)
}
