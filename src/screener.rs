use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::constants::{DEFAULT_PAGE_SIZE, DEFAULT_UNIVERSE_SIZE};
use crate::export;
use crate::generator;
use crate::model::Recommendation;
use crate::pipeline::{self, FilterConfig, PageConfig, RangeBound, SortConfig, SortDirection, SortKey};

/// Canned screen configurations mirroring the saved presets of the
/// dashboard UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Preset {
    Growth,
    Value,
    Momentum,
    Dividend,
    SmallCap,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Growth,
        Preset::Value,
        Preset::Momentum,
        Preset::Dividend,
        Preset::SmallCap,
    ];

    pub fn describe(self) -> &'static str {
        match self {
            Preset::Growth => "High-scoring strong-buy names with positive momentum",
            Preset::Value => "Cheap earnings multiples with a dividend cushion",
            Preset::Momentum => "Fast movers on elevated volume",
            Preset::Dividend => "Income names with sustainable payouts",
            Preset::SmallCap => "Smaller companies the screen still rates highly",
        }
    }

    pub fn filters(self) -> FilterConfig {
        match self {
            Preset::Growth => FilterConfig {
                score: RangeBound::min(80.0),
                recommendation: Some(Recommendation::StrongBuy),
                change_pct: RangeBound::min(1.0),
                market_cap: RangeBound::min(1.0e9),
                ..FilterConfig::default()
            },
            Preset::Value => FilterConfig {
                pe_ratio: RangeBound::max(15.0),
                dividend_yield: RangeBound::min(2.0),
                ..FilterConfig::default()
            },
            Preset::Momentum => FilterConfig {
                change_pct: RangeBound::min(2.0),
                volume: RangeBound::min(1.0e6),
                rsi: RangeBound::min(60.0),
                ..FilterConfig::default()
            },
            Preset::Dividend => FilterConfig {
                dividend_yield: RangeBound::min(3.0),
                pe_ratio: RangeBound::max(25.0),
                ..FilterConfig::default()
            },
            Preset::SmallCap => FilterConfig {
                market_cap: RangeBound::max(2.0e9),
                score: RangeBound::min(75.0),
                volume: RangeBound::min(5.0e5),
                ..FilterConfig::default()
            },
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct ScreenArgs {
    /// Start from a canned preset, then apply any explicit flags on top
    #[arg(long)]
    pub preset: Option<Preset>,

    /// Case-insensitive match against symbol or name
    #[arg(short, long)]
    pub query: Option<String>,

    /// Exact sector match
    #[arg(long)]
    pub sector: Option<String>,

    /// Exact recommendation match
    #[arg(long)]
    pub recommendation: Option<Recommendation>,

    #[arg(long)]
    pub min_score: Option<f64>,

    #[arg(long)]
    pub max_score: Option<f64>,

    #[arg(long)]
    pub min_price: Option<f64>,

    #[arg(long)]
    pub max_price: Option<f64>,

    /// Sort column
    #[arg(long, value_enum, default_value_t = SortKey::Score)]
    pub sort: SortKey,

    /// Sort direction
    #[arg(long, value_enum, default_value_t = SortDirection::Desc)]
    pub order: SortDirection,

    /// 1-based page to display
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Write the filtered, sorted set as CSV instead of printing a table
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Universe size to generate
    #[arg(long, default_value_t = DEFAULT_UNIVERSE_SIZE)]
    pub count: usize,

    /// Seed for reproducible output
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl ScreenArgs {
    fn filter_config(&self) -> FilterConfig {
        let mut filters = self.preset.map(Preset::filters).unwrap_or_default();
        if self.query.is_some() {
            filters.query = self.query.clone();
        }
        if self.sector.is_some() {
            filters.sector = self.sector.clone();
        }
        if self.recommendation.is_some() {
            filters.recommendation = self.recommendation;
        }
        if let Some(min) = self.min_score {
            filters.score.min = Some(min);
        }
        if let Some(max) = self.max_score {
            filters.score.max = Some(max);
        }
        if let Some(min) = self.min_price {
            filters.price.min = Some(min);
        }
        if let Some(max) = self.max_price {
            filters.price.max = Some(max);
        }
        filters
    }
}

pub fn run(args: ScreenArgs) -> Result<()> {
    let universe = generator::generate_universe(args.seed, args.count);
    let filters = args.filter_config();
    let sort = SortConfig {
        key: args.sort,
        direction: args.order,
    };

    if let Some(path) = &args.csv {
        // Export covers the whole matching set, not just one page.
        let page = PageConfig {
            size: usize::MAX,
            index: 1,
        };
        let output = pipeline::run(&universe, &filters, &sort, &page)
            .context("screener pipeline failed")?;
        fs::write(path, export::screener_csv(&output.visible))
            .with_context(|| format!("failed to write CSV to {path:?}"))?;
        println!("Wrote {} records to {}", output.total_matching, path.display());
        return Ok(());
    }

    let page = PageConfig {
        size: args.page_size,
        index: args.page,
    };
    let output =
        pipeline::run(&universe, &filters, &sort, &page).context("screener pipeline failed")?;

    println!(
        "{:>8} | {:>28} | {:>10} | {:>8} | {:>6} | {:>11} | {:>22}",
        "symbol", "name", "price", "chg %", "score", "signal", "sector"
    );
    for stock in &output.visible {
        println!(
            "{:>8} | {:>28} | {:>10.2} | {:>+8.2} | {:>6.1} | {:>11} | {:>22}",
            stock.symbol,
            stock.name,
            stock.price,
            stock.change_pct,
            stock.score,
            stock.recommendation.to_string(),
            stock.sector
        );
    }
    println!(
        "page {}/{}: {} matching of {} records",
        args.page.min(output.total_pages.max(1)),
        output.total_pages,
        output.total_matching,
        args.count
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_produces_active_predicates() {
        for preset in Preset::ALL {
            let filters = preset.filters();
            let constrained = filters.query.is_some()
                || filters.recommendation.is_some()
                || filters.sector.is_some()
                || filters.score != RangeBound::default()
                || filters.change_pct != RangeBound::default()
                || filters.market_cap != RangeBound::default()
                || filters.pe_ratio != RangeBound::default()
                || filters.dividend_yield != RangeBound::default()
                || filters.volume != RangeBound::default()
                || filters.rsi != RangeBound::default();
            assert!(constrained, "{preset:?} has no predicates");
        }
    }

    #[test]
    fn explicit_flags_override_preset_bounds() {
        let args = ScreenArgs {
            preset: Some(Preset::Growth),
            query: None,
            sector: None,
            recommendation: None,
            min_score: Some(90.0),
            max_score: None,
            min_price: None,
            max_price: None,
            sort: SortKey::Score,
            order: SortDirection::Desc,
            page: 1,
            page_size: 10,
            csv: None,
            count: 10,
            seed: 42,
        };
        let filters = args.filter_config();
        assert_eq!(filters.score.min, Some(90.0));
        assert_eq!(filters.recommendation, Some(Recommendation::StrongBuy));
    }

    #[test]
    fn growth_preset_only_passes_strong_buys() {
        let universe = generator::generate_universe(42, 300);
        let filters = Preset::Growth.filters();
        let output = pipeline::run(
            &universe,
            &filters,
            &SortConfig::default(),
            &PageConfig { size: 1000, index: 1 },
        )
        .expect("run");
        for stock in &output.visible {
            assert_eq!(stock.recommendation, Recommendation::StrongBuy);
            assert!(stock.score >= 80.0);
        }
    }
}
