use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Ordered set of watched symbols. Insertion order is what the user sees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Watchlist {
    symbols: IndexSet<String>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the symbol was already watched.
    pub fn add(&mut self, symbol: impl Into<String>) -> bool {
        self.symbols.insert(symbol.into())
    }

    /// Returns false when the symbol was not watched.
    pub fn remove(&mut self, symbol: &str) -> bool {
        self.symbols.shift_remove(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut watchlist = Watchlist::new();
        assert!(watchlist.add("TECH001"));
        assert!(watchlist.add("FIN000"));
        assert!(watchlist.add("ENG002"));
        let order: Vec<_> = watchlist.symbols().collect();
        assert_eq!(order, vec!["TECH001", "FIN000", "ENG002"]);
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut watchlist = Watchlist::new();
        assert!(watchlist.add("TECH001"));
        assert!(!watchlist.add("TECH001"));
        assert_eq!(watchlist.len(), 1);
    }

    #[test]
    fn remove_reports_membership() {
        let mut watchlist = Watchlist::new();
        watchlist.add("TECH001");
        assert!(watchlist.remove("TECH001"));
        assert!(!watchlist.remove("TECH001"));
        assert!(watchlist.is_empty());
    }
}
