use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::{Recommendation, Stock};

/// Inclusive numeric bounds; an absent bound is unconstrained.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RangeBound {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeBound {
    pub fn min(value: f64) -> Self {
        Self {
            min: Some(value),
            max: None,
        }
    }

    pub fn max(value: f64) -> Self {
        Self {
            min: None,
            max: Some(value),
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        if let Some(min) = self.min {
            if value < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return false;
            }
        }
        true
    }
}

/// One screen's worth of predicates. Active predicates combine with AND;
/// every field defaults to unconstrained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Case-insensitive containment against symbol or name.
    pub query: Option<String>,
    pub recommendation: Option<Recommendation>,
    pub sector: Option<String>,
    pub price: RangeBound,
    pub score: RangeBound,
    pub change_pct: RangeBound,
    pub volume: RangeBound,
    pub market_cap: RangeBound,
    pub rsi: RangeBound,
    pub pe_ratio: RangeBound,
    pub dividend_yield: RangeBound,
}

impl FilterConfig {
    pub fn matches(&self, stock: &Stock) -> bool {
        if let Some(query) = &self.query {
            let query = query.trim().to_lowercase();
            if !query.is_empty()
                && !stock.symbol.to_lowercase().contains(&query)
                && !stock.name.to_lowercase().contains(&query)
            {
                return false;
            }
        }
        if let Some(recommendation) = self.recommendation {
            if stock.recommendation != recommendation {
                return false;
            }
        }
        if let Some(sector) = &self.sector {
            if !sector.is_empty() && stock.sector != *sector {
                return false;
            }
        }
        self.price.contains(stock.price)
            && self.score.contains(stock.score)
            && self.change_pct.contains(stock.change_pct)
            && self.volume.contains(stock.volume as f64)
            && self.market_cap.contains(stock.market_cap)
            && self.rsi.contains(stock.rsi)
            && self.pe_ratio.contains(stock.pe_ratio)
            && self.dividend_yield.contains(stock.dividend_yield)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SortKey {
    Symbol,
    Name,
    Sector,
    Price,
    Change,
    ChangePct,
    Volume,
    MarketCap,
    Score,
    Recommendation,
    Rsi,
    PeRatio,
    DividendYield,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SortKey::Symbol => "symbol",
            SortKey::Name => "name",
            SortKey::Sector => "sector",
            SortKey::Price => "price",
            SortKey::Change => "change",
            SortKey::ChangePct => "change_pct",
            SortKey::Volume => "volume",
            SortKey::MarketCap => "market_cap",
            SortKey::Score => "score",
            SortKey::Recommendation => "recommendation",
            SortKey::Rsi => "rsi",
            SortKey::PeRatio => "pe_ratio",
            SortKey::DividendYield => "dividend_yield",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            key: SortKey::Score,
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageConfig {
    /// Records per page, must be at least 1.
    pub size: usize,
    /// 1-based page index. An index past the last page yields an empty
    /// `visible` rather than an error.
    pub index: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: crate::constants::DEFAULT_PAGE_SIZE,
            index: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub visible: Vec<Stock>,
    pub total_matching: usize,
    pub total_pages: usize,
}

/// Filter, sort, and paginate an in-memory collection. Pure function of its
/// inputs: the caller decides when to re-invoke it.
///
/// The sort is stable with symbol as the secondary key, so equal primary keys
/// always come back in the same order. An empty collection yields
/// `total_pages = 0`.
pub fn run(
    collection: &[Stock],
    filters: &FilterConfig,
    sort: &SortConfig,
    page: &PageConfig,
) -> Result<PipelineOutput, PipelineError> {
    if page.size == 0 {
        return Err(PipelineError::InvalidConfiguration(
            "page size must be at least 1".to_string(),
        ));
    }
    if page.index == 0 {
        return Err(PipelineError::InvalidConfiguration(
            "page index is 1-based".to_string(),
        ));
    }

    let mut matching: Vec<Stock> = collection
        .iter()
        .filter(|stock| filters.matches(stock))
        .cloned()
        .collect();

    matching.sort_by(|a, b| compare(a, b, sort));

    let total_matching = matching.len();
    let total_pages = if total_matching == 0 {
        0
    } else {
        1 + (total_matching - 1) / page.size
    };

    let start = (page.index - 1).saturating_mul(page.size);
    let visible = if start >= total_matching {
        Vec::new()
    } else {
        let end = (start + page.size).min(total_matching);
        matching[start..end].to_vec()
    };

    Ok(PipelineOutput {
        visible,
        total_matching,
        total_pages,
    })
}

fn compare(a: &Stock, b: &Stock, sort: &SortConfig) -> Ordering {
    let primary = compare_key(a, b, sort.key);
    let directed = match sort.direction {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };
    directed.then_with(|| a.symbol.cmp(&b.symbol))
}

fn compare_key(a: &Stock, b: &Stock, key: SortKey) -> Ordering {
    match key {
        SortKey::Symbol => cmp_str(&a.symbol, &b.symbol),
        SortKey::Name => cmp_str(&a.name, &b.name),
        SortKey::Sector => cmp_str(&a.sector, &b.sector),
        SortKey::Price => a.price.total_cmp(&b.price),
        SortKey::Change => a.change.total_cmp(&b.change),
        SortKey::ChangePct => a.change_pct.total_cmp(&b.change_pct),
        SortKey::Volume => a.volume.cmp(&b.volume),
        SortKey::MarketCap => a.market_cap.total_cmp(&b.market_cap),
        SortKey::Score => a.score.total_cmp(&b.score),
        SortKey::Recommendation => a.recommendation.rank().cmp(&b.recommendation.rank()),
        SortKey::Rsi => a.rsi.total_cmp(&b.rsi),
        SortKey::PeRatio => a.pe_ratio.total_cmp(&b.pe_ratio),
        SortKey::DividendYield => a.dividend_yield.total_cmp(&b.dividend_yield),
    }
}

fn cmp_str(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
