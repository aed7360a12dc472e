use scraper::{Html, Selector};

use crate::models::PriceObservation;
use crate::utils::error::{Result, VigiaError};

/// Structural markers of a Mercado Livre product page.
const TITLE_SELECTOR: &str = "h1.ui-pdp-title";
const PRICE_FRACTION_SELECTOR: &str = "span.andes-money-amount__fraction";

/// Extracts a price observation from raw page content.
///
/// The first three price fragments are, in page order, the crossed-out old
/// price, the current price, and the installment price. Prices use an
/// integer-only currency representation; the `.` thousands separator is
/// stripped before conversion. Any missing or malformed marker is a `Parse`
/// error.
pub fn parse_product_page(html: &str) -> Result<PriceObservation> {
    let document = Html::parse_document(html);

    let title_selector = selector(TITLE_SELECTOR)?;
    let price_selector = selector(PRICE_FRACTION_SELECTOR)?;

    let title = document.select(&title_selector).next().ok_or_else(|| {
        VigiaError::Parse(format!("missing product title element '{}'", TITLE_SELECTOR))
    })?;
    let product_name = title.text().collect::<Vec<_>>().join(" ").trim().to_string();
    if product_name.is_empty() {
        return Err(VigiaError::Parse("empty product title".to_string()));
    }

    let mut amounts = Vec::with_capacity(3);
    for element in document.select(&price_selector).take(3) {
        let text = element.text().collect::<String>();
        amounts.push(parse_amount(text.trim())?);
    }

    if amounts.len() < 3 {
        return Err(VigiaError::Parse(format!(
            "expected 3 price fragments matching '{}', found {}",
            PRICE_FRACTION_SELECTOR,
            amounts.len()
        )));
    }

    Ok(PriceObservation::new(
        product_name,
        amounts[0],
        amounts[1],
        amounts[2],
    ))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| VigiaError::Parse(format!("invalid selector '{}': {:?}", css, e)))
}

fn parse_amount(text: &str) -> Result<i64> {
    let digits = text.replace('.', "");
    digits
        .parse::<i64>()
        .map_err(|_| VigiaError::Parse(format!("non-numeric price fragment '{}'", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_PAGE: &str = r#"
        <html>
            <body>
                <h1 class="ui-pdp-title">Apple iPhone 16 Pro 1 TB</h1>
                <div class="ui-pdp-price">
                    <span class="andes-money-amount__fraction">11.999</span>
                    <span class="andes-money-amount__fraction">10.499</span>
                    <span class="andes-money-amount__fraction">999</span>
                </div>
            </body>
        </html>
    "#;

    #[test]
    fn test_parse_product_page() {
        let observation = parse_product_page(PRODUCT_PAGE).unwrap();

        assert_eq!(observation.product_name, "Apple iPhone 16 Pro 1 TB");
        assert_eq!(observation.old_price, 11999);
        assert_eq!(observation.new_price, 10499);
        assert_eq!(observation.installment_price, 999);
    }

    #[test]
    fn test_parse_ignores_extra_price_fragments() {
        let html = r#"
            <html><body>
                <h1 class="ui-pdp-title">Widget</h1>
                <span class="andes-money-amount__fraction">300</span>
                <span class="andes-money-amount__fraction">250</span>
                <span class="andes-money-amount__fraction">25</span>
                <span class="andes-money-amount__fraction">199</span>
            </body></html>
        "#;

        let observation = parse_product_page(html).unwrap();
        assert_eq!(observation.old_price, 300);
        assert_eq!(observation.new_price, 250);
        assert_eq!(observation.installment_price, 25);
    }

    #[test]
    fn test_parse_missing_title() {
        let html = r#"
            <html><body>
                <span class="andes-money-amount__fraction">100</span>
                <span class="andes-money-amount__fraction">90</span>
                <span class="andes-money-amount__fraction">9</span>
            </body></html>
        "#;

        let err = parse_product_page(html).unwrap_err();
        assert!(matches!(err, VigiaError::Parse(_)));
        assert!(err.to_string().contains("ui-pdp-title"));
    }

    #[test]
    fn test_parse_missing_price_fragments() {
        let html = r#"
            <html><body>
                <h1 class="ui-pdp-title">Widget</h1>
                <span class="andes-money-amount__fraction">100</span>
            </body></html>
        "#;

        let err = parse_product_page(html).unwrap_err();
        assert!(err.to_string().contains("found 1"));
    }

    #[test]
    fn test_parse_non_numeric_price() {
        let html = r#"
            <html><body>
                <h1 class="ui-pdp-title">Widget</h1>
                <span class="andes-money-amount__fraction">abc</span>
                <span class="andes-money-amount__fraction">90</span>
                <span class="andes-money-amount__fraction">9</span>
            </body></html>
        "#;

        let err = parse_product_page(html).unwrap_err();
        assert!(err.to_string().contains("non-numeric"));
    }

    #[test]
    fn test_parse_amount_strips_thousands_separator() {
        assert_eq!(parse_amount("1.040.287").unwrap(), 1040287);
        assert_eq!(parse_amount("999").unwrap(), 999);
    }
}
