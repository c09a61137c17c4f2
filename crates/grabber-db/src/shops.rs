//! Database operations for the `shops` table.
//!
//! Rows are keyed by `tabelog_url`. Crawls insert or refresh listing fields,
//! detail crawls fill in the address, and the geocoding pass commits
//! coordinates exactly once per row.

use chrono::{DateTime, Utc};
use grabber_core::{GeocodeResult, Shop};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

/// Upper bound on rows returned by [`shops_pending_geocoding`].
pub const MAX_PENDING_BATCH: i64 = 1000;

const SHOP_COLUMNS: &str = "id, name, address, tabelog_url, price, station, station_distance, \
     prefecture, latitude, longitude, location_type, full_api_response, is_geocoded, \
     created_at, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `shops` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShopRow {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub tabelog_url: String,
    pub price: String,
    pub station: String,
    pub station_distance: String,
    pub prefecture: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_type: Option<String>,
    pub full_api_response: Option<serde_json::Value>,
    pub is_geocoded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-batch counts returned by [`insert_shops`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertSummary {
    pub inserted: u64,
    pub updated: u64,
    pub failed: u64,
    /// `tabelog_url` of every row counted in `failed`, in batch order.
    pub failed_urls: Vec<String>,
}

// ---------------------------------------------------------------------------
// Crawl writes
// ---------------------------------------------------------------------------

/// Inserts crawled shops, refreshing listing fields for URLs already stored.
///
/// Each shop is written by its own statement on a single pooled connection.
/// A failing row is logged and counted in [`InsertSummary::failed`]; the rest
/// of the batch still runs. On conflict the address, geocode columns and
/// geocoded flag of the existing row are left untouched.
///
/// # Errors
///
/// Returns [`DbError::EmptyBatch`] if `shops` is empty, or [`DbError::Sqlx`]
/// if a connection cannot be acquired from the pool.
pub async fn insert_shops(pool: &PgPool, shops: &[Shop]) -> Result<InsertSummary, DbError> {
    if shops.is_empty() {
        return Err(DbError::EmptyBatch);
    }

    let mut conn = pool.acquire().await?;
    let mut summary = InsertSummary::default();

    for shop in shops {
        let result = sqlx::query_scalar::<_, bool>(
            "INSERT INTO shops \
                 (name, address, tabelog_url, prefecture, price, station, station_distance) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (tabelog_url) DO UPDATE SET \
                 name             = EXCLUDED.name, \
                 prefecture       = COALESCE(EXCLUDED.prefecture, shops.prefecture), \
                 price            = EXCLUDED.price, \
                 station          = EXCLUDED.station, \
                 station_distance = EXCLUDED.station_distance, \
                 updated_at       = NOW() \
             RETURNING (xmax = 0) AS is_new",
        )
        .bind(&shop.name)
        .bind(shop.address.as_deref())
        .bind(&shop.tabelog_url)
        .bind(shop.prefecture.as_deref())
        .bind(&shop.price)
        .bind(&shop.station)
        .bind(&shop.station_distance)
        .fetch_one(&mut *conn)
        .await;

        match result {
            Ok(true) => {
                tracing::debug!(url = %shop.tabelog_url, name = %shop.name, "inserted shop");
                summary.inserted += 1;
            }
            Ok(false) => {
                tracing::debug!(url = %shop.tabelog_url, name = %shop.name, "refreshed existing shop");
                summary.updated += 1;
            }
            Err(e) => {
                tracing::error!(
                    url = %shop.tabelog_url,
                    name = %shop.name,
                    error = %e,
                    "failed to insert shop"
                );
                summary.failed += 1;
                summary.failed_urls.push(shop.tabelog_url.clone());
            }
        }
    }

    Ok(summary)
}

/// Updates every mutable listing field of the row whose `tabelog_url`
/// matches `shop.tabelog_url`.
///
/// Returns the number of rows affected. Zero means no stored shop has that
/// URL; this is not an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_shop(pool: &PgPool, shop: &Shop) -> Result<u64, DbError> {
    let rows_affected = sqlx::query(
        "UPDATE shops \
         SET name = $1, address = $2, prefecture = $3, price = $4, station = $5, \
             station_distance = $6, updated_at = NOW() \
         WHERE tabelog_url = $7",
    )
    .bind(&shop.name)
    .bind(shop.address.as_deref())
    .bind(shop.prefecture.as_deref())
    .bind(&shop.price)
    .bind(&shop.station)
    .bind(&shop.station_distance)
    .bind(&shop.tabelog_url)
    .execute(pool)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        tracing::debug!(url = %shop.tabelog_url, "update_shop matched no row");
    }

    Ok(rows_affected)
}

/// Fetches a single shop by its detail-page URL.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_shop_by_url(pool: &PgPool, tabelog_url: &str) -> Result<Option<ShopRow>, DbError> {
    let row = sqlx::query_as::<_, ShopRow>(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops WHERE tabelog_url = $1"
    ))
    .bind(tabelog_url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// Geocoding
// ---------------------------------------------------------------------------

/// Returns up to `limit` shops that have not been geocoded.
///
/// Shops with an address come first, oldest first; shops still waiting for
/// their detail page follow, so they never crowd addressed rows out of a
/// batch. `limit` is clamped to `1..=MAX_PENDING_BATCH`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn shops_pending_geocoding(pool: &PgPool, limit: i64) -> Result<Vec<ShopRow>, DbError> {
    let limit = limit.clamp(1, MAX_PENDING_BATCH);

    let rows = sqlx::query_as::<_, ShopRow>(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops \
         WHERE is_geocoded = FALSE \
         ORDER BY (address IS NULL OR btrim(address) = ''), id \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Writes coordinates, location type and raw payload for `shop_id` and marks
/// it geocoded, on a connection the caller controls.
///
/// Callers are expected to run this inside a transaction; see
/// [`commit_geocode`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn apply_geocode(
    conn: &mut PgConnection,
    shop_id: i64,
    result: &GeocodeResult,
) -> Result<u64, DbError> {
    let rows_affected = sqlx::query(
        "UPDATE shops \
         SET latitude = $1, \
             longitude = $2, \
             location_type = $3, \
             full_api_response = $4, \
             is_geocoded = TRUE, \
             updated_at = NOW() \
         WHERE id = $5",
    )
    .bind(result.latitude)
    .bind(result.longitude)
    .bind(&result.location_type)
    .bind(&result.raw_response)
    .bind(shop_id)
    .execute(conn)
    .await?
    .rows_affected();

    Ok(rows_affected)
}

/// Commits a geocode result for `shop_id` in a single transaction.
///
/// Either every geocode column and the flag change together, or nothing
/// does. Returns the number of rows affected (0 if the id does not exist).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the transaction cannot begin, the update
/// fails, or the commit fails. The transaction is rolled back on drop.
pub async fn commit_geocode(
    pool: &PgPool,
    shop_id: i64,
    result: &GeocodeResult,
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let rows_affected = apply_geocode(&mut *tx, shop_id, result).await?;
    tx.commit().await?;
    Ok(rows_affected)
}
