//! Universe configuration: the symbols each market runs over.
//!
//! Stored as TOML with one array per market key:
//!
//! ```toml
//! thai = ["PTT.BK", "AOT.BK"]
//! us = ["AAPL", "MSFT"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::provider::DataError;
use crate::market::MarketKey;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Universe {
    pub markets: BTreeMap<String, Vec<String>>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DataError::UniverseError(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse a universe; every key must name a market. Aliases (`th`, `cn`)
    /// are normalised to the canonical key.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        let raw: BTreeMap<String, Vec<String>> = toml::from_str(content)
            .map_err(|e| DataError::UniverseError(format!("parse universe TOML: {e}")))?;
        let mut markets: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, symbols) in raw {
            let market = key
                .parse::<MarketKey>()
                .map_err(|e| DataError::UniverseError(e.to_string()))?;
            markets
                .entry(market.as_str().to_string())
                .or_default()
                .extend(symbols);
        }
        Ok(Self { markets })
    }

    pub fn to_toml(&self) -> Result<String, DataError> {
        toml::to_string_pretty(self)
            .map_err(|e| DataError::UniverseError(format!("serialize universe: {e}")))
    }

    /// Symbols for a market, or an empty slice when it has none.
    pub fn symbols(&self, market: MarketKey) -> &[String] {
        self.markets
            .get(market.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn symbol_count(&self) -> usize {
        self.markets.values().map(Vec::len).sum()
    }

    /// Built-in reference lists for every market.
    pub fn defaults() -> Self {
        let markets = MarketKey::ALL
            .iter()
            .map(|&key| {
                let symbols = default_symbols(key).iter().map(|s| s.to_string()).collect();
                (key.as_str().to_string(), symbols)
            })
            .collect();
        Self { markets }
    }
}

fn default_symbols(market: MarketKey) -> &'static [&'static str] {
    match market {
        MarketKey::Thai => &[
            "PTT.BK", "AOT.BK", "CPALL.BK", "ADVANC.BK", "KBANK.BK", "SCB.BK", "BDMS.BK",
            "GULF.BK", "DELTA.BK", "PTTEP.BK",
        ],
        MarketKey::Us => &[
            "AAPL", "MSFT", "NVDA", "AMZN", "GOOGL", "META", "TSLA", "JPM", "XOM", "SPY",
        ],
        MarketKey::China => &[
            "600519.SS", "601318.SS", "600036.SS", "000858.SZ", "000333.SZ", "300750.SZ",
        ],
        MarketKey::HongKong => &["0700.HK", "9988.HK", "0005.HK", "1299.HK", "0941.HK", "3690.HK"],
        MarketKey::Taiwan => &["2330.TW", "2317.TW", "2454.TW", "2308.TW", "2882.TW", "2412.TW"],
        MarketKey::Metals15m | MarketKey::Metals30m => &["GC=F", "SI=F"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_market() {
        let u = Universe::defaults();
        for key in MarketKey::ALL {
            assert!(!u.symbols(key).is_empty(), "no symbols for {key}");
        }
        assert!(u.symbols(MarketKey::Thai).contains(&"PTT.BK".to_string()));
    }

    #[test]
    fn toml_roundtrip() {
        let u = Universe::defaults();
        let parsed = Universe::from_toml(&u.to_toml().unwrap()).unwrap();
        assert_eq!(u, parsed);
    }

    #[test]
    fn rejects_unknown_market() {
        assert!(matches!(
            Universe::from_toml("mars = [\"OLYMPUS\"]"),
            Err(DataError::UniverseError(_))
        ));
    }

    #[test]
    fn aliases_are_normalised() {
        let u = Universe::from_toml("th = [\"PTT.BK\"]").unwrap();
        assert_eq!(u.symbols(MarketKey::Thai), &["PTT.BK".to_string()]);
    }

    #[test]
    fn missing_market_is_empty() {
        let u = Universe::from_toml("us = [\"AAPL\"]").unwrap();
        assert_eq!(u.symbols(MarketKey::Us), &["AAPL".to_string()]);
        assert!(u.symbols(MarketKey::Taiwan).is_empty());
        assert_eq!(u.symbol_count(), 1);
    }
}
