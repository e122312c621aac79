use std::collections::HashMap;

use serde::Serialize;

use crate::store::StockStore;

/// Aggregate view of one sector across the universe.
#[derive(Debug, Clone, Serialize)]
pub struct SectorBreakdown {
    pub name: String,
    pub stock_count: usize,
    pub avg_score: f64,
    pub market_cap: f64,
    /// Mean percent change across the sector's members.
    pub performance: f64,
}

/// Group the universe by sector, best performing first.
pub fn breakdown(store: &StockStore) -> Vec<SectorBreakdown> {
    struct Acc {
        count: usize,
        score_sum: f64,
        market_cap: f64,
        change_sum: f64,
    }

    let mut groups: HashMap<&str, Acc> = HashMap::new();
    for stock in store.stocks() {
        let acc = groups.entry(stock.sector.as_str()).or_insert(Acc {
            count: 0,
            score_sum: 0.0,
            market_cap: 0.0,
            change_sum: 0.0,
        });
        acc.count += 1;
        acc.score_sum += stock.score;
        acc.market_cap += stock.market_cap;
        acc.change_sum += stock.change_pct;
    }

    let mut sectors: Vec<SectorBreakdown> = groups
        .into_iter()
        .map(|(name, acc)| SectorBreakdown {
            name: name.to_string(),
            stock_count: acc.count,
            avg_score: acc.score_sum / acc.count as f64,
            market_cap: acc.market_cap,
            performance: acc.change_sum / acc.count as f64,
        })
        .collect();

    sectors.sort_by(|a, b| b.performance.total_cmp(&a.performance));
    sectors
}
