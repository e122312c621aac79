use std::collections::HashMap;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rand::rngs::StdRng;

use crate::alerts::{AlertBook, PriorQuote};
use crate::constants::QUOTE_BATCH_VERSION;
use crate::generator;
use crate::model::{QuoteBatch, QuoteUpdate, Stock};
use crate::portfolio::Portfolio;
use crate::watchlist::Watchlist;

/// Outcome of one simulated refresh sweep.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub batch: QuoteBatch,
    pub triggered_alerts: Vec<u64>,
}

/// The single in-memory collection every view projects from, plus the user
/// state (watchlist, alerts, portfolio) that lives alongside it. Accessed
/// from one logical thread of control behind an async RwLock.
#[derive(Debug, Default)]
pub struct StockStore {
    stocks: IndexMap<String, Stock>,
    pub watchlist: Watchlist,
    pub alerts: AlertBook,
    pub portfolio: Portfolio,
    last_refresh: Option<DateTime<Utc>>,
}

impl StockStore {
    /// Build a store from a universe snapshot. Duplicate symbols are a data
    /// defect, not something to repair silently.
    pub fn from_universe(universe: Vec<Stock>) -> Result<Self> {
        let mut stocks = IndexMap::with_capacity(universe.len());
        for stock in universe {
            if stocks.insert(stock.symbol.clone(), stock).is_some() {
                bail!("duplicate symbol in universe snapshot");
            }
        }
        Ok(Self {
            stocks,
            ..Self::default()
        })
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&Stock> {
        self.stocks.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.stocks.contains_key(symbol)
    }

    pub fn stocks(&self) -> impl Iterator<Item = &Stock> {
        self.stocks.values()
    }

    pub fn quotes(&self) -> &IndexMap<String, Stock> {
        &self.stocks
    }

    /// Owned copy of the collection for the pipeline.
    pub fn snapshot(&self) -> Vec<Stock> {
        self.stocks.values().cloned().collect()
    }

    /// Records for the watched symbols, in watchlist order. Symbols that
    /// left the universe are skipped.
    pub fn watched_stocks(&self) -> Vec<Stock> {
        self.watchlist
            .symbols()
            .filter_map(|symbol| self.stocks.get(symbol).cloned())
            .collect()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// Re-randomise every quote in place, sweep alerts against the new
    /// prices, and produce the broadcast batch.
    pub fn refresh(&mut self, rng: &mut StdRng) -> RefreshOutcome {
        let now = Utc::now();

        let prior: HashMap<String, PriorQuote> = self
            .stocks
            .iter()
            .map(|(symbol, stock)| {
                (
                    symbol.clone(),
                    PriorQuote {
                        volume: stock.volume,
                        recommendation: stock.recommendation,
                    },
                )
            })
            .collect();

        for stock in self.stocks.values_mut() {
            generator::refresh_stock(stock, rng);
        }

        let quotes: Vec<QuoteUpdate> = self.stocks.values().map(QuoteUpdate::from).collect();
        let triggered_alerts = self.alerts.evaluate(&prior, &self.stocks, now);
        self.last_refresh = Some(now);

        RefreshOutcome {
            batch: QuoteBatch {
                version: QUOTE_BATCH_VERSION,
                generated_at: now,
                quotes,
            },
            triggered_alerts,
        }
    }
}
