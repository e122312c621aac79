use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use crate::constants::DEFAULT_UNIVERSE_SIZE;
use crate::generator;
use crate::model::Recommendation;
use crate::store::StockStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    Bullish,
    Bearish,
    Mixed,
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MarketStatus::Bullish => "Bullish",
            MarketStatus::Bearish => "Bearish",
            MarketStatus::Mixed => "Mixed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketSummary {
    pub total_stocks: usize,
    pub strong_buy: usize,
    pub buy: usize,
    pub hold: usize,
    pub weak_hold: usize,
    pub sell: usize,
    pub avg_score: f64,
    pub market_status: MarketStatus,
    pub generated_at: DateTime<Utc>,
}

/// Count the recommendation buckets and derive the overall market mood from
/// the mean percent change (within ±0.25% the market reads as mixed).
pub fn market_summary(store: &StockStore) -> MarketSummary {
    let mut counts = [0usize; 5];
    let mut score_sum = 0.0;
    let mut change_sum = 0.0;
    let mut total = 0usize;

    for stock in store.stocks() {
        counts[stock.recommendation.rank() as usize] += 1;
        score_sum += stock.score;
        change_sum += stock.change_pct;
        total += 1;
    }

    let avg_change = if total > 0 { change_sum / total as f64 } else { 0.0 };
    let market_status = if avg_change > 0.25 {
        MarketStatus::Bullish
    } else if avg_change < -0.25 {
        MarketStatus::Bearish
    } else {
        MarketStatus::Mixed
    };

    MarketSummary {
        total_stocks: total,
        strong_buy: counts[Recommendation::StrongBuy.rank() as usize],
        buy: counts[Recommendation::Buy.rank() as usize],
        hold: counts[Recommendation::Hold.rank() as usize],
        weak_hold: counts[Recommendation::WeakHold.rank() as usize],
        sell: counts[Recommendation::Sell.rank() as usize],
        avg_score: if total > 0 { score_sum / total as f64 } else { 0.0 },
        market_status,
        generated_at: Utc::now(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MoverEntry {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketMovers {
    pub gainers: Vec<MoverEntry>,
    pub losers: Vec<MoverEntry>,
}

/// Top advancers and decliners by percent change. Flat stocks appear in
/// neither list.
pub fn movers(store: &StockStore, count: usize) -> MarketMovers {
    if count == 0 || store.is_empty() {
        return MarketMovers {
            gainers: Vec::new(),
            losers: Vec::new(),
        };
    }

    let mut by_change: Vec<&crate::model::Stock> = store.stocks().collect();
    by_change.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));

    let entry = |stock: &crate::model::Stock| MoverEntry {
        symbol: stock.symbol.clone(),
        name: stock.name.clone(),
        price: stock.price,
        change_pct: stock.change_pct,
    };

    let gainers = by_change
        .iter()
        .filter(|s| s.change_pct > 0.0)
        .take(count)
        .map(|s| entry(s))
        .collect();

    let losers = by_change
        .iter()
        .rev()
        .filter(|s| s.change_pct < 0.0)
        .take(count)
        .map(|s| entry(s))
        .collect();

    MarketMovers { gainers, losers }
}

#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub symbol: String,
    pub name: String,
    pub score: f64,
    pub recommendation: Recommendation,
    pub change_pct: f64,
}

/// Highest-scoring stocks at or above the cutoff with at least a Buy
/// signal, strongest first.
pub fn top_opportunities(store: &StockStore, limit: usize, min_score: f64) -> Vec<Opportunity> {
    let mut candidates: Vec<&crate::model::Stock> = store
        .stocks()
        .filter(|s| s.score >= min_score && s.recommendation.rank() >= Recommendation::Buy.rank())
        .collect();
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    candidates
        .into_iter()
        .take(limit)
        .map(|s| Opportunity {
            symbol: s.symbol.clone(),
            name: s.name.clone(),
            score: s.score,
            recommendation: s.recommendation,
            change_pct: s.change_pct,
        })
        .collect()
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    /// Universe size to generate
    #[arg(long, default_value_t = DEFAULT_UNIVERSE_SIZE)]
    pub count: usize,

    /// Seed for reproducible output
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

pub fn run(args: SummaryArgs) -> Result<()> {
    let store = StockStore::from_universe(generator::generate_universe(args.seed, args.count))?;
    let summary = market_summary(&store);

    println!("Market summary ({} stocks)", summary.total_stocks);
    println!("{:>12}: {}", "status", summary.market_status);
    println!("{:>12}: {:.1}", "avg score", summary.avg_score);
    println!("{:>12}: {}", "strong buy", summary.strong_buy);
    println!("{:>12}: {}", "buy", summary.buy);
    println!("{:>12}: {}", "hold", summary.hold);
    println!("{:>12}: {}", "weak hold", summary.weak_hold);
    println!("{:>12}: {}", "sell", summary.sell);

    let movers = movers(&store, 5);
    if !movers.gainers.is_empty() {
        println!("\nTop gainers:");
        for entry in &movers.gainers {
            println!("{:>10} {:>10.2} {:>+7.2}%", entry.symbol, entry.price, entry.change_pct);
        }
    }
    if !movers.losers.is_empty() {
        println!("\nTop losers:");
        for entry in &movers.losers {
            println!("{:>10} {:>10.2} {:>+7.2}%", entry.symbol, entry.price, entry.change_pct);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stock;

    fn stock(symbol: &str, score: f64, change_pct: f64) -> Stock {
        Stock {
            symbol: symbol.to_string(),
            name: format!("{symbol} Corp"),
            sector: "Technology".to_string(),
            price: 100.0,
            change: 0.0,
            change_pct,
            volume: 1_000,
            market_cap: 1.0e9,
            score,
            recommendation: Recommendation::from_score(score),
            rsi: 50.0,
            macd: 0.0,
            pe_ratio: 20.0,
            dividend_yield: 0.0,
        }
    }

    fn store(stocks: Vec<Stock>) -> StockStore {
        StockStore::from_universe(stocks).expect("store")
    }

    #[test]
    fn summary_counts_every_bucket() {
        let store = store(vec![
            stock("A", 90.0, 1.0),
            stock("B", 75.0, 1.0),
            stock("C", 60.0, 1.0),
            stock("D", 45.0, 1.0),
            stock("E", 10.0, 1.0),
        ]);
        let summary = market_summary(&store);

        assert_eq!(summary.total_stocks, 5);
        assert_eq!(summary.strong_buy, 1);
        assert_eq!(summary.buy, 1);
        assert_eq!(summary.hold, 1);
        assert_eq!(summary.weak_hold, 1);
        assert_eq!(summary.sell, 1);
        assert!((summary.avg_score - 56.0).abs() < 1e-9);
        assert_eq!(summary.market_status, MarketStatus::Bullish);
    }

    #[test]
    fn summary_of_empty_store_is_mixed() {
        let summary = market_summary(&store(Vec::new()));
        assert_eq!(summary.total_stocks, 0);
        assert_eq!(summary.market_status, MarketStatus::Mixed);
    }

    #[test]
    fn movers_split_gainers_and_losers() {
        let store = store(vec![
            stock("UP1", 50.0, 4.0),
            stock("UP2", 50.0, 1.0),
            stock("FLAT", 50.0, 0.0),
            stock("DOWN", 50.0, -2.5),
        ]);
        let movers = movers(&store, 3);

        let gainers: Vec<_> = movers.gainers.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(gainers, vec!["UP1", "UP2"]);
        let losers: Vec<_> = movers.losers.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(losers, vec!["DOWN"]);
    }

    #[test]
    fn opportunities_require_score_and_signal() {
        let store = store(vec![
            stock("HIGH", 95.0, 1.0),
            stock("MID", 82.0, 1.0),
            stock("LOWSIG", 60.0, 1.0),
            stock("LOWSCORE", 72.0, 1.0),
        ]);
        let opportunities = top_opportunities(&store, 10, 80.0);

        let symbols: Vec<_> = opportunities.iter().map(|o| o.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["HIGH", "MID"]);
    }
}
