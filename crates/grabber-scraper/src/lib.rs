pub mod client;
pub mod detail;
pub mod error;
pub mod listing;
pub mod url;

pub use client::TabelogClient;
pub use detail::parse_detail_address;
pub use error::ScraperError;
pub use listing::{parse_listing_page, split_station_distance};
pub use url::{listing_url, resolve_detail_url};
