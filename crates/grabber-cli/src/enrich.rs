//! Enrich flow: geocode stored shops that have an address but no
//! coordinates.
//!
//! Rows are processed one at a time; the client's rate limiter spaces the
//! provider calls. Each result is committed in its own transaction, so a
//! failure part-way through never rolls back earlier rows.

use std::fmt;

use grabber_core::{AppConfig, GeocodeOutcome};
use grabber_db::ShopRow;
use grabber_geocode::GeocodingClient;

/// Counters reported at the end of a geocoding run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct GeocodeSummary {
    pub pending: usize,
    pub geocoded: usize,
    pub no_result: usize,
    pub failed: usize,
    /// Rows skipped because they have no address yet.
    pub skipped: usize,
}

impl fmt::Display for GeocodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "geocode: {} pending, {} geocoded, {} no result, {} failed, {} without address",
            self.pending, self.geocoded, self.no_result, self.failed, self.skipped
        )
    }
}

/// Builds the geocoding client from config.
///
/// # Errors
///
/// Returns an error if `GOOGLE_MAPS_GEOCODING_API_KEY` is not set or the
/// client cannot be constructed.
pub(crate) fn build_geocoding_client(config: &AppConfig) -> anyhow::Result<GeocodingClient> {
    let api_key = config.geocoding_api_key.as_deref().ok_or_else(|| {
        anyhow::anyhow!("GOOGLE_MAPS_GEOCODING_API_KEY is not set; cannot run geocode")
    })?;

    GeocodingClient::new(
        api_key,
        config.geocode_timeout_secs,
        config.geocode_rate_per_sec,
    )
    .map_err(|e| anyhow::anyhow!("failed to build geocoding client: {e}"))
}

/// Geocodes up to `limit` pending shops.
///
/// # Errors
///
/// Returns an error only if the pending rows cannot be loaded. Per-row
/// provider and write failures are logged and counted.
pub(crate) async fn run_geocode(
    pool: &sqlx::PgPool,
    client: &GeocodingClient,
    limit: i64,
) -> anyhow::Result<GeocodeSummary> {
    let rows = grabber_db::shops_pending_geocoding(pool, limit).await?;
    let mut summary = GeocodeSummary {
        pending: rows.len(),
        ..GeocodeSummary::default()
    };
    tracing::info!(pending = rows.len(), "starting geocode batch");

    for row in &rows {
        let Some(address) = row.address.as_deref().filter(|a| !a.trim().is_empty()) else {
            tracing::debug!(shop_id = row.id, "skipping shop without address");
            summary.skipped += 1;
            continue;
        };

        geocode_row(pool, client, row, address, &mut summary).await;
    }

    if summary.failed > 0 {
        tracing::warn!(
            failed = summary.failed,
            total = summary.pending,
            "some shops failed to geocode"
        );
    }

    Ok(summary)
}

async fn geocode_row(
    pool: &sqlx::PgPool,
    client: &GeocodingClient,
    row: &ShopRow,
    address: &str,
    summary: &mut GeocodeSummary,
) {
    let result = match client.geocode(address).await {
        Ok(GeocodeOutcome::Found(result)) => result,
        Ok(GeocodeOutcome::NoResult) => {
            tracing::info!(shop_id = row.id, address, "no geocoding result; skipping");
            summary.no_result += 1;
            return;
        }
        Err(e) => {
            tracing::error!(shop_id = row.id, address, error = %e, "geocoding failed");
            summary.failed += 1;
            return;
        }
    };

    match grabber_db::commit_geocode(pool, row.id, &result).await {
        Ok(_) => {
            tracing::debug!(
                shop_id = row.id,
                latitude = result.latitude,
                longitude = result.longitude,
                location_type = %result.location_type,
                "geocoded shop"
            );
            summary.geocoded += 1;
        }
        Err(e) => {
            tracing::error!(shop_id = row.id, error = %e, "failed to commit geocode");
            summary.failed += 1;
        }
    }
}

#[cfg(test)]
#[path = "enrich_test.rs"]
mod tests;
