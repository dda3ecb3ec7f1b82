// 9.0: price oracle boundary. the engine only ever asks "what is the
// current price of X" and "give me recent history"; the refresh cadence
// and upstream source live outside the core.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::types::{Price, Symbol};

pub trait PriceOracle: Send + Sync {
    // None = no fresh price this cycle. user ops turn that into a
    // retryable error, sweeps skip the row.
    fn current_price(&self, symbol: &Symbol) -> Option<Price>;

    fn history(&self, symbol: &Symbol, limit: usize) -> Vec<Price>;

    // one batched lookup per sweep; symbols without a price are absent
    fn snapshot(&self, symbols: &[Symbol]) -> HashMap<Symbol, Price> {
        symbols
            .iter()
            .filter_map(|s| self.current_price(s).map(|p| (s.clone(), p)))
            .collect()
    }
}

// In-memory oracle for the simulation and tests. Pushing a price appends
// to the history feed.
#[derive(Debug, Default)]
pub struct StaticOracle {
    prices: RwLock<HashMap<Symbol, Price>>,
    series: RwLock<HashMap<Symbol, Vec<Price>>>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, symbol: Symbol, price: Price) {
        self.prices
            .write()
            .expect("oracle lock poisoned")
            .insert(symbol.clone(), price);
        self.series
            .write()
            .expect("oracle lock poisoned")
            .entry(symbol)
            .or_default()
            .push(price);
    }

    pub fn clear_price(&self, symbol: &Symbol) {
        self.prices
            .write()
            .expect("oracle lock poisoned")
            .remove(symbol);
    }
}

impl PriceOracle for StaticOracle {
    fn current_price(&self, symbol: &Symbol) -> Option<Price> {
        self.prices
            .read()
            .expect("oracle lock poisoned")
            .get(symbol)
            .copied()
    }

    fn history(&self, symbol: &Symbol, limit: usize) -> Vec<Price> {
        let series = self.series.read().expect("oracle lock poisoned");
        let Some(points) = series.get(symbol) else {
            return Vec::new();
        };
        let start = points.len().saturating_sub(limit);
        points[start..].to_vec()
    }
}
