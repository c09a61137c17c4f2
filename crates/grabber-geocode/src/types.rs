//! Geocoding API response types.
//!
//! Only the fields the client reads are modelled; the full body is kept
//! separately as a `serde_json::Value`.

use serde::Deserialize;

/// Top-level response envelope: `{"status": "OK", "results": [...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<GeocodeCandidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeCandidate {
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geometry {
    pub location: LatLng,
    /// `ROOFTOP`, `RANGE_INTERPOLATED`, `GEOMETRIC_CENTER` or `APPROXIMATE`.
    pub location_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LatLng {
    pub lat: f64,
    pub lng: f64,
}
