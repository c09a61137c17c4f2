//! Address extraction for Tabelog shop detail pages.

use std::sync::LazyLock;

use scraper::{Html, Selector};

static ADDRESS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("p.rstinfo-table__address").expect("valid address selector")
});

/// Returns the shop address from the detail page's info table.
///
/// The address is split across nested links and spans in the markup; their
/// text is joined and runs of whitespace collapse to one space. `None` when
/// the field is absent or blank.
#[must_use]
pub fn parse_detail_address(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    document.select(&ADDRESS).find_map(|p| {
        let text = p.text().collect::<String>();
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        (!collapsed.is_empty()).then_some(collapsed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_address_from_nested_markup() {
        let html = r#"
            <table class="rstinfo-table__table">
              <tr><th>住所</th><td>
                <p class="rstinfo-table__address"><span><a href="/tokyo/">東京都</a></span><span><a href="/tokyo/C13113/">渋谷区</a><a href="/tokyo/C13113/C36025/">道玄坂</a>2-6-17</span></p>
              </td></tr>
            </table>"#;

        assert_eq!(
            parse_detail_address(html).as_deref(),
            Some("東京都渋谷区道玄坂2-6-17")
        );
    }

    #[test]
    fn collapses_line_breaks_and_indentation() {
        let html = r#"<p class="rstinfo-table__address">
              1-2-3 Jinnan,
              Shibuya-ku
            </p>"#;

        assert_eq!(
            parse_detail_address(html).as_deref(),
            Some("1-2-3 Jinnan, Shibuya-ku")
        );
    }

    #[test]
    fn missing_field_yields_none() {
        let html = "<html><body><h2>Shop</h2></body></html>";
        assert!(parse_detail_address(html).is_none());
    }

    #[test]
    fn blank_field_yields_none() {
        let html = r#"<p class="rstinfo-table__address">   </p>"#;
        assert!(parse_detail_address(html).is_none());
    }

    #[test]
    fn first_non_blank_match_wins() {
        let html = r#"
            <p class="rstinfo-table__address"> </p>
            <p class="rstinfo-table__address">Osaka-fu Osaka-shi</p>
            <p class="rstinfo-table__address">Ignored</p>"#;

        assert_eq!(
            parse_detail_address(html).as_deref(),
            Some("Osaka-fu Osaka-shi")
        );
    }
}
