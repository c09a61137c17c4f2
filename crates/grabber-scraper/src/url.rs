//! URL construction for Tabelog listing and detail pages.

use chrono::NaiveDate;
use reqwest::Url;

use crate::error::ScraperError;

/// Search keyword applied to every listing crawl.
const SEARCH_KEYWORD: &str = "ramen";

/// Builds the listing URL for `location` and 1-based `page`.
///
/// Page 1 is `{base}{location}/rstLst/`; later pages append `{page}/`.
/// `date` fills the reservation-date filter (`svd`, `YYYYMMDD`).
///
/// # Errors
///
/// Returns [`ScraperError::InvalidLocation`] if `location` is empty or
/// contains anything other than ASCII letters, digits, `-` or `_`, and
/// [`ScraperError::InvalidUrl`] if the joined path does not parse.
pub fn listing_url(
    base_url: &Url,
    location: &str,
    page: u32,
    date: NaiveDate,
) -> Result<Url, ScraperError> {
    let location = location.trim().trim_matches('/');
    let is_valid = !location.is_empty()
        && location
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !is_valid {
        return Err(ScraperError::InvalidLocation {
            location: location.to_owned(),
        });
    }

    let path = if page <= 1 {
        format!("{location}/rstLst/")
    } else {
        format!("{location}/rstLst/{page}/")
    };

    let mut url = base_url.join(&path).map_err(|e| ScraperError::InvalidUrl {
        url: format!("{base_url}{path}"),
        reason: e.to_string(),
    })?;

    url.query_pairs_mut()
        .append_pair("vs", "1")
        .append_pair("sa", "")
        .append_pair("sk", SEARCH_KEYWORD)
        .append_pair("lid", "top_navi1")
        .append_pair("vac_net", "")
        .append_pair("svd", &date.format("%Y%m%d").to_string())
        .append_pair("svt", "2000")
        .append_pair("svps", "2")
        .append_pair("hfc", "1")
        .append_pair("sw", SEARCH_KEYWORD);

    Ok(url)
}

/// Resolves a detail-page `href` found on `page_url`.
///
/// Absolute hrefs are returned unchanged; relative ones are joined onto the
/// listing page URL.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if the href cannot be resolved.
pub fn resolve_detail_url(page_url: &Url, href: &str) -> Result<String, ScraperError> {
    page_url
        .join(href.trim())
        .map(String::from)
        .map_err(|e| ScraperError::InvalidUrl {
            url: href.to_owned(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://tabelog.com/").unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn first_page_has_no_page_segment() {
        let url = listing_url(&base(), "tokyo", 1, date()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://tabelog.com/tokyo/rstLst/?vs=1&sa=&sk=ramen&lid=top_navi1&vac_net=&svd=20250601&svt=2000&svps=2&hfc=1&sw=ramen"
        );
    }

    #[test]
    fn later_pages_append_page_number() {
        let url = listing_url(&base(), "osaka", 3, date()).unwrap();
        assert_eq!(url.path(), "/osaka/rstLst/3/");
    }

    #[test]
    fn surrounding_slashes_are_trimmed() {
        let url = listing_url(&base(), "/tokyo/", 1, date()).unwrap();
        assert_eq!(url.path(), "/tokyo/rstLst/");
    }

    #[test]
    fn empty_location_is_rejected() {
        let err = listing_url(&base(), "  ", 1, date()).unwrap_err();
        assert!(matches!(err, ScraperError::InvalidLocation { .. }));
    }

    #[test]
    fn location_with_path_characters_is_rejected() {
        let err = listing_url(&base(), "tokyo/../admin", 1, date()).unwrap_err();
        assert!(matches!(err, ScraperError::InvalidLocation { .. }));
    }

    #[test]
    fn base_with_path_prefix_is_kept() {
        let base = Url::parse("http://127.0.0.1:8080/mirror/").unwrap();
        let url = listing_url(&base, "tokyo", 1, date()).unwrap();
        assert_eq!(url.path(), "/mirror/tokyo/rstLst/");
    }

    #[test]
    fn absolute_detail_href_is_unchanged() {
        let page = listing_url(&base(), "tokyo", 1, date()).unwrap();
        let resolved =
            resolve_detail_url(&page, "https://tabelog.com/tokyo/A1303/A130301/13000001/").unwrap();
        assert_eq!(resolved, "https://tabelog.com/tokyo/A1303/A130301/13000001/");
    }

    #[test]
    fn relative_detail_href_is_joined() {
        let page = listing_url(&base(), "tokyo", 1, date()).unwrap();
        let resolved = resolve_detail_url(&page, "/tokyo/A1303/A130301/13000001/").unwrap();
        assert_eq!(resolved, "https://tabelog.com/tokyo/A1303/A130301/13000001/");
    }
}
