//! HTTP client for the Google Maps Geocoding API.
//!
//! Every request first waits on the client's [`RateLimiter`]. The JSON
//! envelope's `"status"` field is checked before anything else; only `"OK"`
//! is treated as success.

use std::time::Duration;

use grabber_core::{GeocodeOutcome, GeocodeResult};
use reqwest::{Client, Url};

use crate::error::GeocodeError;
use crate::rate_limit::RateLimiter;
use crate::types::GeocodeResponse;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/";
const GEOCODE_PATH: &str = "maps/api/geocode/json";

/// Rate-limited geocoding client.
///
/// Use [`GeocodingClient::new`] for production or
/// [`GeocodingClient::with_base_url`] to point at a mock server in tests.
pub struct GeocodingClient {
    client: Client,
    api_key: String,
    endpoint: Url,
    limiter: RateLimiter,
}

impl GeocodingClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::MissingApiKey`] if `api_key` is blank, or
    /// [`GeocodeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, timeout_secs: u64, rate_per_sec: u32) -> Result<Self, GeocodeError> {
        Self::with_base_url(api_key, timeout_secs, rate_per_sec, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// As [`GeocodingClient::new`], plus [`GeocodeError::InvalidBaseUrl`]
    /// if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        rate_per_sec: u32,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(GeocodeError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("grabber/0.1 (shop-geocoder)")
            .build()?;

        let invalid = |reason: String| GeocodeError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason,
        };
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join(GEOCODE_PATH))
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint,
            limiter: RateLimiter::new(rate_per_sec),
        })
    }

    /// Geocodes one address.
    ///
    /// When the provider returns several candidates the first is used.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::ProviderStatus`] if `status` is anything but `"OK"`,
    ///   including `"ZERO_RESULTS"` and `"OVER_QUERY_LIMIT"`.
    /// - [`GeocodeError::Http`] on network failure, timeout or non-2xx status.
    /// - [`GeocodeError::Deserialize`] if the body does not have the expected
    ///   shape.
    pub async fn geocode(&self, address: &str) -> Result<GeocodeOutcome, GeocodeError> {
        self.limiter.wait().await;

        let url = self.build_url(address);
        tracing::debug!(address, "requesting geocode");

        let body = self.request_json(&url, address).await?;
        let response: GeocodeResponse =
            serde_json::from_value(body.clone()).map_err(|e| GeocodeError::Deserialize {
                context: format!("geocode(address={address})"),
                source: e,
            })?;

        if response.status != "OK" {
            return Err(GeocodeError::ProviderStatus {
                status: response.status,
                message: response
                    .error_message
                    .unwrap_or_else(|| "no error message".to_owned()),
            });
        }

        let Some(first) = response.results.into_iter().next() else {
            return Ok(GeocodeOutcome::NoResult);
        };

        Ok(GeocodeOutcome::Found(GeocodeResult {
            latitude: first.geometry.location.lat,
            longitude: first.geometry.location.lng,
            location_type: first.geometry.location_type,
            raw_response: body,
        }))
    }

    /// Builds the request URL with `address` and `key` percent-encoded.
    fn build_url(&self, address: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("key", &self.api_key);
        url
    }

    async fn request_json(
        &self,
        url: &Url,
        address: &str,
    ) -> Result<serde_json::Value, GeocodeError> {
        // The URL carries the API key; keep it out of error messages.
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let response = response
            .error_for_status()
            .map_err(reqwest::Error::without_url)?;
        let body = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)?;
        serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
            context: format!("geocode(address={address})"),
            source: e,
        })
    }
}
