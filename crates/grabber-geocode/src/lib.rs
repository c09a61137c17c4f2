//! Rate-limited client for the Google Maps Geocoding API.
//!
//! [`GeocodingClient::geocode`] turns a postal address into a
//! [`GeocodeOutcome`]. Every call is gated by a shared [`RateLimiter`] so a
//! batch never exceeds the configured calls per second.

pub mod client;
pub mod error;
pub mod rate_limit;
pub(crate) mod types;

pub use client::GeocodingClient;
pub use error::GeocodeError;
pub use grabber_core::{GeocodeOutcome, GeocodeResult};
pub use rate_limit::RateLimiter;
