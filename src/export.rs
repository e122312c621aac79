use crate::model::Stock;

pub const SCREENER_COLUMNS: [&str; 14] = [
    "symbol",
    "name",
    "sector",
    "price",
    "change",
    "change_pct",
    "volume",
    "market_cap",
    "score",
    "recommendation",
    "rsi",
    "macd",
    "pe_ratio",
    "dividend_yield",
];

pub const WATCHLIST_COLUMNS: [&str; 6] = [
    "symbol",
    "name",
    "price",
    "change_pct",
    "score",
    "recommendation",
];

/// Quote a field when it carries a delimiter, quote, or line break;
/// embedded quotes are doubled.
fn escape_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') || raw.contains('\r') {
        let mut escaped = String::with_capacity(raw.len() + 2);
        escaped.push('"');
        for ch in raw.chars() {
            if ch == '"' {
                escaped.push('"');
            }
            escaped.push(ch);
        }
        escaped.push('"');
        escaped
    } else {
        raw.to_string()
    }
}

fn write_row(out: &mut String, fields: &[String]) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        out.push_str(&escape_field(field));
        first = false;
    }
    out.push('\n');
}

/// Flatten the visible record set into the screener's full column list.
pub fn screener_csv(stocks: &[Stock]) -> String {
    let mut out = String::new();
    write_row(
        &mut out,
        &SCREENER_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
    );
    for stock in stocks {
        write_row(
            &mut out,
            &[
                stock.symbol.clone(),
                stock.name.clone(),
                stock.sector.clone(),
                format!("{:.2}", stock.price),
                format!("{:.2}", stock.change),
                format!("{:.2}", stock.change_pct),
                stock.volume.to_string(),
                format!("{:.0}", stock.market_cap),
                format!("{:.1}", stock.score),
                serde_plain_recommendation(stock),
                format!("{:.1}", stock.rsi),
                format!("{:.2}", stock.macd),
                format!("{:.1}", stock.pe_ratio),
                format!("{:.2}", stock.dividend_yield),
            ],
        );
    }
    out
}

/// Shorter column list for the watchlist view.
pub fn watchlist_csv(stocks: &[Stock]) -> String {
    let mut out = String::new();
    write_row(
        &mut out,
        &WATCHLIST_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
    );
    for stock in stocks {
        write_row(
            &mut out,
            &[
                stock.symbol.clone(),
                stock.name.clone(),
                format!("{:.2}", stock.price),
                format!("{:.2}", stock.change_pct),
                format!("{:.1}", stock.score),
                serde_plain_recommendation(stock),
            ],
        );
    }
    out
}

fn serde_plain_recommendation(stock: &Stock) -> String {
    // Wire form (STRONG_BUY), not the display label.
    serde_json::to_value(stock.recommendation)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| stock.recommendation.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Recommendation;

    fn stock(symbol: &str, name: &str) -> Stock {
        Stock {
            symbol: symbol.to_string(),
            name: name.to_string(),
            sector: "Technology".to_string(),
            price: 195.5,
            change: 4.7,
            change_pct: 2.45,
            volume: 45_000_000,
            market_cap: 3.0e12,
            score: 95.0,
            recommendation: Recommendation::StrongBuy,
            rsi: 65.2,
            macd: 1.23,
            pe_ratio: 28.5,
            dividend_yield: 0.44,
        }
    }

    #[test]
    fn header_row_matches_column_list() {
        let csv = screener_csv(&[]);
        let header = csv.lines().next().expect("header");
        assert_eq!(header, SCREENER_COLUMNS.join(","));
    }

    #[test]
    fn one_row_per_record() {
        let csv = screener_csv(&[stock("AAPL", "Apple Inc."), stock("MSFT", "Microsoft")]);
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn embedded_commas_are_quoted() {
        let csv = screener_csv(&[stock("AAPL", "Apple, Inc.")]);
        let row = csv.lines().nth(1).expect("data row");
        assert!(row.contains("\"Apple, Inc.\""));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let csv = screener_csv(&[stock("AAPL", "The \"Fruit\" Company")]);
        let row = csv.lines().nth(1).expect("data row");
        assert!(row.contains("\"The \"\"Fruit\"\" Company\""));
    }

    #[test]
    fn embedded_newlines_are_quoted() {
        let escaped = escape_field("line one\nline two");
        assert_eq!(escaped, "\"line one\nline two\"");
    }

    #[test]
    fn recommendation_uses_wire_form() {
        let csv = watchlist_csv(&[stock("AAPL", "Apple Inc.")]);
        assert!(csv.contains("STRONG_BUY"));
        assert!(!csv.contains("Strong Buy"));
    }
}
