/// Coordinates for one address, plus the provider payload they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    /// Provider precision class, e.g. `ROOFTOP` or `APPROXIMATE`.
    pub location_type: String,
    /// Full response body, kept for audit.
    pub raw_response: serde_json::Value,
}

/// Result of a successful geocoding call.
///
/// `NoResult` means the provider answered `OK` but matched nothing. It is not
/// an error; callers skip the row.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    Found(GeocodeResult),
    NoResult,
}
