mod wire;

pub use wire::{decode_markers, decode_profile, Profile};

use reqwest::blocking::{Client, RequestBuilder, Response};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::geo::{LookupKey, Point};

/// Blocking client for the two backend endpoints the map screen consumes
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl BackendClient {
    /// Requests wait as long as the backend takes; there is no retry either.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(None).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn latlongs_url(&self) -> String {
        format!("{}/latlongs/", self.base_url)
    }

    pub fn profile_url(&self) -> String {
        format!("{}/profile_by_latlong/", self.base_url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.header("Authorization", format!("Token {token}")),
            None => req,
        }
    }

    /// Fetch every flagged location
    pub fn fetch_markers(&self) -> Result<Vec<Point>, ApiError> {
        let url = self.latlongs_url();
        debug!(%url, "fetching markers");
        let resp = self.authorize(self.client.get(&url)).send()?;
        let mut body = success_body(resp)?;
        let points = decode_markers(&mut body)?;
        info!(count = points.len(), "markers loaded");
        Ok(points)
    }

    /// Fetch the profile stored at exactly these coordinates
    pub fn fetch_profile(&self, key: &LookupKey) -> Result<Profile, ApiError> {
        let url = self.profile_url();
        debug!(%url, latitude = %key.latitude, longitude = %key.longitude, "fetching profile");
        let req = self.client.get(&url).query(&[
            ("latitude", key.latitude.as_str()),
            ("longitude", key.longitude.as_str()),
        ]);
        let resp = self.authorize(req).send()?;
        let mut body = success_body(resp)?;
        decode_profile(&mut body)
    }
}

/// Body bytes of a 2xx response, otherwise a status error carrying the backend message
fn success_body(resp: Response) -> Result<Vec<u8>, ApiError> {
    let status = resp.status();
    let mut body = resp.bytes()?.to_vec();
    if status.is_success() {
        return Ok(body);
    }
    let message = wire::error_message(&mut body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    });
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}
