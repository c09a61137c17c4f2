//! HTTP client for Tabelog listing and detail pages.

use std::time::Duration;

use chrono::NaiveDate;
use grabber_core::Shop;
use reqwest::{Client, Url};

use crate::detail::parse_detail_address;
use crate::error::ScraperError;
use crate::listing::parse_listing_page;
use crate::url::listing_url;

const DEFAULT_BASE_URL: &str = "https://tabelog.com/";

/// Fetches and extracts Tabelog pages.
///
/// Each page is requested exactly once; there is no retry. Non-2xx
/// responses come back as typed errors so the caller can log and move on.
/// Use [`TabelogClient::with_base_url`] to point at a mock server in tests.
pub struct TabelogClient {
    client: Client,
    base_url: Url,
}

impl TabelogClient {
    /// Creates a client pointed at the production site.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ScraperError::InvalidUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ScraperError::InvalidUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    /// Builds the listing URL for `location` and `page` on this client's base.
    ///
    /// # Errors
    ///
    /// See [`listing_url`].
    pub fn listing_url(
        &self,
        location: &str,
        page: u32,
        date: NaiveDate,
    ) -> Result<Url, ScraperError> {
        listing_url(&self.base_url, location, page, date)
    }

    /// Fetches one listing page and extracts its shops.
    ///
    /// The crawl location is recorded as each shop's prefecture.
    ///
    /// # Errors
    ///
    /// Propagates URL construction and fetch errors. Malformed blocks are
    /// not errors; they are skipped inside [`parse_listing_page`].
    pub async fn fetch_listing(
        &self,
        location: &str,
        page: u32,
        date: NaiveDate,
    ) -> Result<Vec<Shop>, ScraperError> {
        let url = self.listing_url(location, page, date)?;
        let html = self.fetch_html(url.as_str()).await?;
        let prefecture = location.trim().trim_matches('/');
        let shops = parse_listing_page(&html, &url, Some(prefecture));
        tracing::info!(url = %url, shops = shops.len(), "extracted listing page");
        Ok(shops)
    }

    /// Fetches a shop's detail page and extracts its address.
    ///
    /// # Errors
    ///
    /// Propagates fetch errors. A page without an address is `Ok(None)`.
    pub async fn fetch_address(&self, detail_url: &str) -> Result<Option<String>, ScraperError> {
        let html = self.fetch_html(detail_url).await?;
        Ok(parse_detail_address(&html))
    }

    /// Sends a GET request and returns the body of a 2xx response.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::NotFound`] on HTTP 404.
    /// - [`ScraperError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ScraperError::Http`] on network, TLS or body-read failure.
    pub async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        tracing::info!(url, "visiting");

        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "ja,en-US;q=0.8,en;q=0.6")
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        tracing::debug!(url, bytes = body.len(), "finished scraping");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn default_client_targets_tabelog() {
        let client = TabelogClient::new(5, "grabber-test/0.1").unwrap();
        let url = client.listing_url("tokyo", 1, date()).unwrap();
        assert!(url.as_str().starts_with("https://tabelog.com/tokyo/rstLst/?"));
    }

    #[test]
    fn base_url_without_trailing_slash_is_normalised() {
        let client =
            TabelogClient::with_base_url(5, "grabber-test/0.1", "http://127.0.0.1:9999").unwrap();
        let url = client.listing_url("tokyo", 2, date()).unwrap();
        assert_eq!(url.path(), "/tokyo/rstLst/2/");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = TabelogClient::with_base_url(5, "grabber-test/0.1", "not a url");
        assert!(matches!(result, Err(ScraperError::InvalidUrl { .. })));
    }
}
