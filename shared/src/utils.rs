// Price formatting shared by marker labels and any front end.
// BTC-quoted pairs trade in satoshi increments, everything else in cents.

pub const DEFAULT_BTC_FORMAT: &str = "0.00000000";
pub const DEFAULT_USDT_FORMAT: &str = "0.00";

pub fn is_btc_pair(base: &str) -> bool {
    base.eq_ignore_ascii_case("BTC")
}

/// Decimal places used when displaying prices quoted in `base`.
pub fn price_precision(base: &str) -> usize {
    if is_btc_pair(base) {
        8
    } else {
        2
    }
}

pub fn format_price(price: f64, base: &str) -> String {
    if !price.is_finite() {
        return if is_btc_pair(base) {
            DEFAULT_BTC_FORMAT.to_string()
        } else {
            DEFAULT_USDT_FORMAT.to_string()
        };
    }
    format!("{:.*}", price_precision(base), price)
}
