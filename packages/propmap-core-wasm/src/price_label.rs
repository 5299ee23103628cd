// Compact price labels shown on single-property markers, e.g. "$1.2M" or "850K CHF".

fn currency_symbol(currency: &str) -> Option<&'static str> {
    match currency.to_ascii_uppercase().as_str() {
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" => Some("¥"),
        _ => None,
    }
}

fn trim_decimal(value: String) -> String {
    value
        .strip_suffix(".0")
        .map(str::to_string)
        .unwrap_or(value)
}

fn compact_amount(price: f64) -> String {
    let price = price.max(0.0);
    // 999_500 and up would print as "1000K"
    if (price / 1_000.0).round() >= 1_000.0 {
        format!("{}M", trim_decimal(format!("{:.1}", price / 1_000_000.0)))
    } else if price >= 10_000.0 {
        format!("{:.0}K", price / 1_000.0)
    } else if price >= 1_000.0 {
        format!("{}K", trim_decimal(format!("{:.1}", price / 1_000.0)))
    } else {
        format!("{:.0}", price)
    }
}

pub fn format_price_label(price: f64, currency: &str) -> String {
    if !price.is_finite() {
        return String::from("-");
    }
    let amount = compact_amount(price);
    match currency_symbol(currency) {
        Some(symbol) => format!("{}{}", symbol, amount),
        None if currency.trim().is_empty() => amount,
        None => format!("{} {}", amount, currency.trim().to_ascii_uppercase()),
    }
}
