use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::Stock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub shares: f64,
    /// Cost per share at purchase.
    pub cost_basis: f64,
    pub opened_at: DateTime<Utc>,
}

/// Valuation of one position against the live quote.
#[derive(Debug, Clone, Serialize)]
pub struct PositionReport {
    pub symbol: String,
    pub name: String,
    pub shares: f64,
    pub cost_basis: f64,
    pub price: f64,
    pub market_value: f64,
    pub gain_loss: f64,
    pub gain_loss_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioReport {
    pub positions: Vec<PositionReport>,
    pub total_value: f64,
    pub total_cost: f64,
    pub total_gain_loss: f64,
    pub total_gain_loss_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Portfolio {
    positions: IndexMap<String, Position>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adding the same symbol twice merges into one position at the blended
    /// average cost.
    pub fn add(&mut self, symbol: impl Into<String>, shares: f64, cost_basis: f64, now: DateTime<Utc>) {
        let symbol = symbol.into();
        match self.positions.get_mut(&symbol) {
            Some(existing) => {
                let total_shares = existing.shares + shares;
                existing.cost_basis =
                    (existing.shares * existing.cost_basis + shares * cost_basis) / total_shares;
                existing.shares = total_shares;
            }
            None => {
                self.positions.insert(
                    symbol.clone(),
                    Position {
                        symbol,
                        shares,
                        cost_basis,
                        opened_at: now,
                    },
                );
            }
        }
    }

    /// Returns false when no position with that symbol exists.
    pub fn remove(&mut self, symbol: &str) -> bool {
        self.positions.shift_remove(symbol).is_some()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Value every position against current quotes. Positions whose symbol
    /// has left the universe are priced at cost so the report never loses a
    /// holding silently.
    pub fn report(&self, quotes: &IndexMap<String, Stock>) -> PortfolioReport {
        let mut positions = Vec::with_capacity(self.positions.len());
        let mut total_value = 0.0;
        let mut total_cost = 0.0;

        for position in self.positions.values() {
            let (name, price) = match quotes.get(&position.symbol) {
                Some(stock) => (stock.name.clone(), stock.price),
                None => (position.symbol.clone(), position.cost_basis),
            };
            let market_value = position.shares * price;
            let cost = position.shares * position.cost_basis;
            let gain_loss = market_value - cost;
            let gain_loss_pct = if cost > 0.0 { gain_loss / cost * 100.0 } else { 0.0 };

            total_value += market_value;
            total_cost += cost;
            positions.push(PositionReport {
                symbol: position.symbol.clone(),
                name,
                shares: position.shares,
                cost_basis: position.cost_basis,
                price,
                market_value,
                gain_loss,
                gain_loss_pct,
            });
        }

        let total_gain_loss = total_value - total_cost;
        let total_gain_loss_pct = if total_cost > 0.0 {
            total_gain_loss / total_cost * 100.0
        } else {
            0.0
        };

        PortfolioReport {
            positions,
            total_value,
            total_cost,
            total_gain_loss,
            total_gain_loss_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Recommendation;

    fn quote(symbol: &str, price: f64) -> Stock {
        Stock {
            symbol: symbol.to_string(),
            name: format!("{symbol} Corp"),
            sector: "Technology".to_string(),
            price,
            change: 0.0,
            change_pct: 0.0,
            volume: 1_000,
            market_cap: 1.0e9,
            score: 50.0,
            recommendation: Recommendation::Hold,
            rsi: 50.0,
            macd: 0.0,
            pe_ratio: 20.0,
            dividend_yield: 0.0,
        }
    }

    fn quotes(stocks: Vec<Stock>) -> IndexMap<String, Stock> {
        stocks.into_iter().map(|s| (s.symbol.clone(), s)).collect()
    }

    #[test]
    fn report_values_positions_against_quotes() {
        let mut portfolio = Portfolio::new();
        let now = Utc::now();
        portfolio.add("TECH000", 10.0, 100.0, now);
        portfolio.add("FIN000", 5.0, 50.0, now);

        let report = portfolio.report(&quotes(vec![quote("TECH000", 120.0), quote("FIN000", 40.0)]));

        assert_eq!(report.positions.len(), 2);
        let tech = &report.positions[0];
        assert_eq!(tech.symbol, "TECH000");
        assert!((tech.market_value - 1200.0).abs() < 1e-9);
        assert!((tech.gain_loss - 200.0).abs() < 1e-9);
        assert!((tech.gain_loss_pct - 20.0).abs() < 1e-9);

        assert!((report.total_value - 1400.0).abs() < 1e-9);
        assert!((report.total_cost - 1250.0).abs() < 1e-9);
        assert!((report.total_gain_loss - 150.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_add_blends_cost_basis() {
        let mut portfolio = Portfolio::new();
        let now = Utc::now();
        portfolio.add("TECH000", 10.0, 100.0, now);
        portfolio.add("TECH000", 10.0, 200.0, now);

        let position = portfolio.positions().next().expect("position");
        assert!((position.shares - 20.0).abs() < 1e-9);
        assert!((position.cost_basis - 150.0).abs() < 1e-9);
        assert_eq!(portfolio.len(), 1);
    }

    #[test]
    fn missing_quote_falls_back_to_cost() {
        let mut portfolio = Portfolio::new();
        portfolio.add("GONE000", 4.0, 25.0, Utc::now());

        let report = portfolio.report(&quotes(vec![]));
        assert_eq!(report.positions.len(), 1);
        assert!((report.positions[0].market_value - 100.0).abs() < 1e-9);
        assert!((report.total_gain_loss).abs() < 1e-9);
    }

    #[test]
    fn remove_reports_membership() {
        let mut portfolio = Portfolio::new();
        portfolio.add("TECH000", 1.0, 10.0, Utc::now());
        assert!(portfolio.remove("TECH000"));
        assert!(!portfolio.remove("TECH000"));
        assert!(portfolio.is_empty());
    }
}
