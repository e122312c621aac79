use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Categorical analyst signal, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[value(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    WeakHold,
    Sell,
}

impl Recommendation {
    pub const ALL: [Recommendation; 5] = [
        Recommendation::StrongBuy,
        Recommendation::Buy,
        Recommendation::Hold,
        Recommendation::WeakHold,
        Recommendation::Sell,
    ];

    /// Numeric strength, `Sell` lowest. Used for ordering and alert
    /// threshold comparisons.
    pub fn rank(self) -> u8 {
        match self {
            Recommendation::StrongBuy => 4,
            Recommendation::Buy => 3,
            Recommendation::Hold => 2,
            Recommendation::WeakHold => 1,
            Recommendation::Sell => 0,
        }
    }

    /// Signal band for a catalyst score in [0, 100].
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            Recommendation::StrongBuy
        } else if score >= 70.0 {
            Recommendation::Buy
        } else if score >= 55.0 {
            Recommendation::Hold
        } else if score >= 40.0 {
            Recommendation::WeakHold
        } else {
            Recommendation::Sell
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Recommendation::StrongBuy => "Strong Buy",
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::WeakHold => "Weak Hold",
            Recommendation::Sell => "Sell",
        };
        f.write_str(label)
    }
}

/// One instrument's flat data tuple. The canonical record shape shared by
/// every view; loading rejects unknown fields instead of propagating them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Stock {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub price: f64,
    pub change: f64,
    pub change_pct: f64,
    pub volume: u64,
    pub market_cap: f64,
    pub score: f64,
    pub recommendation: Recommendation,
    pub rsi: f64,
    pub macd: f64,
    pub pe_ratio: f64,
    pub dividend_yield: f64,
}

/// Per-symbol delta emitted after a simulated refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteUpdate {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_pct: f64,
    pub volume: u64,
}

impl From<&Stock> for QuoteUpdate {
    fn from(stock: &Stock) -> Self {
        Self {
            symbol: stock.symbol.clone(),
            price: stock.price,
            change: stock.change,
            change_pct: stock.change_pct,
            volume: stock.volume,
        }
    }
}

/// Wire payload pushed to websocket subscribers after every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteBatch {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub quotes: Vec<QuoteUpdate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bands_cover_all_signals() {
        assert_eq!(Recommendation::from_score(100.0), Recommendation::StrongBuy);
        assert_eq!(Recommendation::from_score(85.0), Recommendation::StrongBuy);
        assert_eq!(Recommendation::from_score(84.9), Recommendation::Buy);
        assert_eq!(Recommendation::from_score(60.0), Recommendation::Hold);
        assert_eq!(Recommendation::from_score(45.0), Recommendation::WeakHold);
        assert_eq!(Recommendation::from_score(0.0), Recommendation::Sell);
    }

    #[test]
    fn rank_orders_signals_strongest_first() {
        let ranks: Vec<u8> = Recommendation::ALL.iter().map(|r| r.rank()).collect();
        assert_eq!(ranks, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn recommendation_serialises_screaming_snake() {
        let json = serde_json::to_string(&Recommendation::StrongBuy).expect("serialise");
        assert_eq!(json, "\"STRONG_BUY\"");
        let back: Recommendation = serde_json::from_str("\"WEAK_HOLD\"").expect("deserialise");
        assert_eq!(back, Recommendation::WeakHold);
    }

    #[test]
    fn stock_load_rejects_unknown_fields() {
        let payload = r#"{
            "symbol": "TECH000", "name": "x", "sector": "Technology",
            "price": 1.0, "change": 0.0, "change_pct": 0.0, "volume": 1,
            "market_cap": 1.0, "score": 50.0, "recommendation": "HOLD",
            "rsi": 50.0, "macd": 0.0, "pe_ratio": 10.0, "dividend_yield": 0.0,
            "bollinger_position": "Upper"
        }"#;
        assert!(serde_json::from_str::<Stock>(payload).is_err());
    }
}
