//! Field extraction for Tabelog listing pages.
//!
//! A listing page holds one `div.list-rst__rst-data` block per shop. Each
//! well-formed block becomes a [`Shop`] with no address; blocks that cannot
//! be read are logged and skipped.

use std::sync::LazyLock;

use grabber_core::Shop;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;
use crate::url::resolve_detail_url;

static BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.list-rst__rst-data").expect("valid block selector"));
static NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h3.list-rst__rst-name a.list-rst__rst-name-target")
        .expect("valid name selector")
});
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.list-rst__rst-name-target").expect("valid link selector"));
static PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.c-rating-v3__val").expect("valid price selector"));
static AREA: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".list-rst__area-genre").expect("valid area selector"));

/// Extracts every well-formed shop block from a listing page, in document
/// order.
///
/// Relative detail links are resolved against `page_url`. `prefecture` is
/// copied onto every shop. Malformed blocks are skipped with a warning, so
/// the result may be shorter than the number of blocks on the page; an empty
/// page yields an empty `Vec`.
#[must_use]
pub fn parse_listing_page(html: &str, page_url: &Url, prefecture: Option<&str>) -> Vec<Shop> {
    let document = Html::parse_document(html);

    document
        .select(&BLOCK)
        .enumerate()
        .filter_map(|(index, block)| {
            match parse_listing_block(block, page_url, prefecture) {
                Ok(shop) => Some(shop),
                Err(e) => {
                    tracing::warn!(
                        page = %page_url,
                        block = index,
                        error = %e,
                        "skipping listing block"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Reads one listing block.
///
/// # Errors
///
/// Returns [`ScraperError::MalformedListing`] if the block has no detail
/// link or its station text splits into fewer than two tokens, and
/// [`ScraperError::InvalidUrl`] if the link cannot be resolved.
pub(crate) fn parse_listing_block(
    block: ElementRef<'_>,
    page_url: &Url,
    prefecture: Option<&str>,
) -> Result<Shop, ScraperError> {
    let name = child_text(block, &NAME);

    let href = block
        .select(&LINK)
        .find_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .ok_or_else(|| ScraperError::MalformedListing {
            name: name.clone(),
            reason: "missing detail-page link".to_owned(),
        })?;
    let tabelog_url = resolve_detail_url(page_url, href)?;

    let (station, station_distance) =
        split_station_distance(&child_text(block, &AREA)).map_err(|reason| {
            ScraperError::MalformedListing {
                name: name.clone(),
                reason,
            }
        })?;

    Ok(Shop {
        name,
        tabelog_url,
        price: child_text(block, &PRICE),
        station,
        station_distance,
        prefecture: prefecture.map(str::to_owned),
        address: None,
    })
}

/// Splits combined "station distance" text on whitespace.
///
/// The first token is the station and the second the distance; anything
/// after them (genre, separators) is ignored.
///
/// # Errors
///
/// Returns a description of the problem when fewer than two tokens are
/// present.
pub fn split_station_distance(text: &str) -> Result<(String, String), String> {
    let mut tokens = text.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(station), Some(distance)) => Ok((station.to_owned(), distance.to_owned())),
        _ => Err(format!(
            "station text \"{}\" does not split into station and distance",
            text.trim()
        )),
    }
}

/// Concatenated text of every descendant matching `selector`, trimmed.
fn child_text(element: ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_owned()
}

#[cfg(test)]
#[path = "listing_test.rs"]
mod tests;
