//! Crawl flow: listing pages to stored shops, then detail pages to addresses.
//!
//! Listing pages are fetched with bounded fan-out and all extracted shops are
//! inserted in one batch. Only after that join does the detail stage start,
//! so every row exists before its address is written. A failed page is
//! logged and counted; the rest of the stage carries on.

use std::fmt;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use grabber_core::Shop;
use grabber_scraper::TabelogClient;

/// Parameters for one crawl run.
pub(crate) struct CrawlOptions<'a> {
    pub location: &'a str,
    /// Listing pages `1..=pages` are fetched.
    pub pages: u32,
    /// Search date sent with every listing request.
    pub date: NaiveDate,
    pub max_concurrent: usize,
}

/// Counters reported at the end of a crawl.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CrawlSummary {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub shops_found: usize,
    pub inserted: u64,
    pub updated: u64,
    pub insert_failed: u64,
    pub addresses_saved: usize,
    pub addresses_missing: usize,
    /// Address found but no stored row matched the shop's URL.
    pub addresses_unmatched: usize,
    pub details_failed: usize,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pages: {} fetched, {} failed; shops: {} found, {} new, {} updated, {} failed; \
             addresses: {} saved, {} missing, {} unmatched, {} failed",
            self.pages_fetched,
            self.pages_failed,
            self.shops_found,
            self.inserted,
            self.updated,
            self.insert_failed,
            self.addresses_saved,
            self.addresses_missing,
            self.addresses_unmatched,
            self.details_failed,
        )
    }
}

/// Shops extracted from the listing stage, in page then document order.
pub(crate) struct ListingHarvest {
    pub shops: Vec<Shop>,
    pub pages_fetched: usize,
    pub pages_failed: usize,
}

#[derive(Debug)]
enum DetailOutcome {
    Saved,
    Missing,
    Unmatched,
    Failed,
}

/// Fetches listing pages `1..=pages` and extracts their shops.
///
/// `buffered` keeps results in page order while up to `max_concurrent`
/// requests are in flight.
pub(crate) async fn collect_listings(
    client: &TabelogClient,
    options: &CrawlOptions<'_>,
) -> ListingHarvest {
    let location = options.location;
    let date = options.date;

    let results: Vec<_> = stream::iter(1..=options.pages)
        .map(|page| async move { (page, client.fetch_listing(location, page, date).await) })
        .buffered(options.max_concurrent.max(1))
        .collect()
        .await;

    let mut harvest = ListingHarvest {
        shops: Vec::new(),
        pages_fetched: 0,
        pages_failed: 0,
    };
    for (page, result) in results {
        match result {
            Ok(shops) => {
                harvest.pages_fetched += 1;
                harvest.shops.extend(shops);
            }
            Err(e) => {
                tracing::error!(location, page, error = %e, "failed to fetch listing page");
                harvest.pages_failed += 1;
            }
        }
    }
    harvest
}

/// Runs the listing stage only and prints what would be stored.
pub(crate) async fn preview_crawl(client: &TabelogClient, options: &CrawlOptions<'_>) {
    let harvest = collect_listings(client, options).await;
    for shop in &harvest.shops {
        println!(
            "{}\t{}\t{} {}\t{}",
            shop.name, shop.price, shop.station, shop.station_distance, shop.tabelog_url
        );
    }
    println!(
        "dry-run: {} shops from {} pages ({} failed) for {}; nothing written",
        harvest.shops.len(),
        harvest.pages_fetched,
        harvest.pages_failed,
        options.location
    );
}

/// Runs the full crawl flow against `pool`.
///
/// # Errors
///
/// Returns an error only if the batch insert cannot start (for example the
/// pool cannot hand out a connection). Page fetch failures and per-row
/// write failures are logged and counted in the summary.
pub(crate) async fn run_crawl(
    pool: &sqlx::PgPool,
    client: &TabelogClient,
    options: &CrawlOptions<'_>,
) -> anyhow::Result<CrawlSummary> {
    let harvest = collect_listings(client, options).await;
    let mut summary = CrawlSummary {
        pages_fetched: harvest.pages_fetched,
        pages_failed: harvest.pages_failed,
        shops_found: harvest.shops.len(),
        ..CrawlSummary::default()
    };

    if harvest.shops.is_empty() {
        tracing::warn!(location = options.location, "no shops found; nothing to store");
        return Ok(summary);
    }

    let inserted = grabber_db::insert_shops(pool, &harvest.shops).await?;
    summary.inserted = inserted.inserted;
    summary.updated = inserted.updated;
    summary.insert_failed = inserted.failed;
    tracing::info!(
        inserted = inserted.inserted,
        updated = inserted.updated,
        failed = inserted.failed,
        "listing stage stored"
    );

    let targets = detail_targets(&harvest.shops, &inserted.failed_urls);
    let outcomes: Vec<DetailOutcome> = stream::iter(targets)
        .map(|shop| enrich_address(pool, client, shop))
        .buffer_unordered(options.max_concurrent.max(1))
        .collect()
        .await;

    for outcome in outcomes {
        match outcome {
            DetailOutcome::Saved => summary.addresses_saved += 1,
            DetailOutcome::Missing => summary.addresses_missing += 1,
            DetailOutcome::Unmatched => summary.addresses_unmatched += 1,
            DetailOutcome::Failed => summary.details_failed += 1,
        }
    }

    if summary.details_failed > 0 {
        tracing::warn!(
            failed = summary.details_failed,
            total = summary.shops_found,
            "some detail pages failed"
        );
    }

    Ok(summary)
}

/// Shops whose listing row was written, so their detail page is worth fetching.
fn detail_targets<'a>(shops: &'a [Shop], failed_urls: &[String]) -> Vec<&'a Shop> {
    shops
        .iter()
        .filter(|shop| !failed_urls.contains(&shop.tabelog_url))
        .collect()
}

/// Fetches one detail page and writes the address back to the shop's row.
///
/// A page without an address leaves the stored row as it is.
async fn enrich_address(pool: &sqlx::PgPool, client: &TabelogClient, shop: &Shop) -> DetailOutcome {
    let address = match client.fetch_address(&shop.tabelog_url).await {
        Ok(Some(address)) => address,
        Ok(None) => {
            tracing::warn!(url = %shop.tabelog_url, "detail page has no address");
            return DetailOutcome::Missing;
        }
        Err(e) => {
            tracing::error!(url = %shop.tabelog_url, error = %e, "failed to fetch detail page");
            return DetailOutcome::Failed;
        }
    };

    let updated = shop.clone().with_address(Some(address));
    match grabber_db::update_shop(pool, &updated).await {
        Ok(0) => {
            tracing::warn!(url = %shop.tabelog_url, "no stored row for shop; address dropped");
            DetailOutcome::Unmatched
        }
        Ok(_) => DetailOutcome::Saved,
        Err(e) => {
            tracing::error!(url = %shop.tabelog_url, error = %e, "failed to save address");
            DetailOutcome::Failed
        }
    }
}

#[cfg(test)]
#[path = "crawl_test.rs"]
mod tests;
