/// A shop as extracted from the listing site, before it has a database id.
///
/// `tabelog_url` is the shop's identity: the same detail-page URL always
/// refers to the same stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shop {
    pub name: String,
    pub tabelog_url: String,
    pub price: String,
    pub station: String,
    pub station_distance: String,
    pub prefecture: Option<String>,
    /// Unset until the detail page has been crawled.
    pub address: Option<String>,
}

impl Shop {
    /// Returns a copy of this shop with `address` filled in.
    #[must_use]
    pub fn with_address(mut self, address: Option<String>) -> Self {
        self.address = address;
        self
    }
}
