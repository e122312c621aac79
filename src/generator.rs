use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal, Normal};
use rayon::prelude::*;

use crate::model::{Recommendation, Stock};

/// Sector table with the symbol prefix used when synthesising tickers.
pub const SECTORS: [(&str, &str); 10] = [
    ("Technology", "TECH"),
    ("Financials", "FIN"),
    ("Industrials", "IND"),
    ("Healthcare", "HLT"),
    ("Consumer Discretionary", "CND"),
    ("Consumer Staples", "CNS"),
    ("Energy", "ENG"),
    ("Utilities", "UTL"),
    ("Materials", "MAT"),
    ("Real Estate", "REA"),
];

/// Synthesise a universe of `count` stocks with unique symbols. The same
/// seed always produces the same universe; records are generated in parallel
/// with a per-record rng derived from the seed so ordering stays stable.
pub fn generate_universe(seed: u64, count: usize) -> Vec<Stock> {
    (0..count)
        .into_par_iter()
        .map(|index| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            synthesise_stock(index, &mut rng)
        })
        .collect()
}

fn synthesise_stock(index: usize, rng: &mut StdRng) -> Stock {
    let (sector, prefix) = SECTORS[index % SECTORS.len()];
    let serial = index / SECTORS.len();
    let symbol = format!("{prefix}{serial:03}");
    let name = format!("{sector} Corp {serial:03}");

    let price_dist = LogNormal::new(4.2, 0.55).expect("valid log-normal parameters");
    let change_dist = Normal::new(0.0, 2.2).expect("valid normal parameters");

    let price: f64 = price_dist.sample(rng);
    let price = price.max(0.01);
    let change_pct: f64 = change_dist.sample(rng);
    let change = price * change_pct / 100.0;

    let score = rng.gen_range(0.0..=100.0);
    let shares_outstanding = rng.gen_range(5.0e6..2.0e9);
    let dividend_yield = if rng.gen_bool(0.4) {
        0.0
    } else {
        rng.gen_range(0.1..6.0)
    };

    Stock {
        symbol,
        name,
        sector: sector.to_string(),
        price,
        change,
        change_pct,
        volume: rng.gen_range(100_000..80_000_000),
        market_cap: price * shares_outstanding,
        score,
        recommendation: Recommendation::from_score(score),
        rsi: rng.gen_range(15.0..85.0),
        macd: Normal::new(0.0, 1.5).expect("valid normal parameters").sample(rng),
        pe_ratio: rng.gen_range(4.0..70.0),
        dividend_yield,
    }
}

/// Simulated refresh: re-randomise the price-derived fields of one record in
/// place, keeping every invariant (positive price, score in [0, 100],
/// recommendation derived from score).
pub fn refresh_stock(stock: &mut Stock, rng: &mut StdRng) {
    let move_dist = Normal::new(0.0, 1.2).expect("valid normal parameters");
    let pct: f64 = move_dist.sample(rng);

    let previous_price = stock.price;
    stock.price = (stock.price * (1.0 + pct / 100.0)).max(0.01);
    stock.change = stock.price - previous_price;
    stock.change_pct = if previous_price > 0.0 {
        (stock.change / previous_price) * 100.0
    } else {
        0.0
    };

    let volume_jitter = rng.gen_range(0.7..1.4);
    stock.volume = ((stock.volume as f64) * volume_jitter).round().max(1.0) as u64;

    stock.market_cap = (stock.market_cap * (1.0 + pct / 100.0)).max(0.01);
    stock.rsi = (stock.rsi + rng.gen_range(-4.0..4.0)).clamp(0.0, 100.0);
    stock.macd += rng.gen_range(-0.3..0.3);
    stock.score = (stock.score + rng.gen_range(-3.0..3.0)).clamp(0.0, 100.0);
    stock.recommendation = Recommendation::from_score(stock.score);
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn universe_symbols_are_unique() {
        let universe = generate_universe(7, 250);
        let symbols: HashSet<_> = universe.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols.len(), universe.len());
    }

    #[test]
    fn universe_is_deterministic_for_a_seed() {
        let first = generate_universe(42, 50);
        let second = generate_universe(42, 50);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.symbol, b.symbol);
            assert_eq!(a.price, b.price);
            assert_eq!(a.score, b.score);
        }
    }

    #[test]
    fn generated_records_respect_invariants() {
        for stock in generate_universe(3, 200) {
            assert!(stock.price > 0.0, "price must be positive");
            assert!(
                (0.0..=100.0).contains(&stock.score),
                "score out of range: {}",
                stock.score
            );
            assert_eq!(stock.recommendation, Recommendation::from_score(stock.score));
            assert!(!stock.symbol.is_empty());
        }
    }

    #[test]
    fn refresh_keeps_invariants_over_many_rounds() {
        let mut universe = generate_universe(11, 40);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            for stock in universe.iter_mut() {
                refresh_stock(stock, &mut rng);
            }
        }
        for stock in &universe {
            assert!(stock.price > 0.0);
            assert!((0.0..=100.0).contains(&stock.score));
            assert!((0.0..=100.0).contains(&stock.rsi));
            assert_eq!(stock.recommendation, Recommendation::from_score(stock.score));
        }
    }

    #[test]
    fn refresh_updates_change_fields_consistently() {
        let mut universe = generate_universe(5, 1);
        let mut rng = StdRng::seed_from_u64(1);
        let before = universe[0].price;
        refresh_stock(&mut universe[0], &mut rng);
        let after = &universe[0];
        assert!((after.change - (after.price - before)).abs() < 1e-9);
    }
}
