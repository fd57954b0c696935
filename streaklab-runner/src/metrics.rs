//! Per-symbol aggregation of trades into the metrics table.
//!
//! Works from in-memory trades after a run and from trade-log rows read back
//! from disk; both paths go through the same win/loss statistics.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use streaklab_core::domain::Trade;
use streaklab_core::market::MarketDescriptor;
use streaklab_core::pattern::PatternStats;

use crate::trade_log::TradeLogRow;

/// One row of the metrics table. Serialised headers match the CSV layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMetrics {
    pub symbol: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Prob%")]
    pub prob_pct: f64,
    #[serde(rename = "RR_Ratio")]
    pub rrr: f64,
    #[serde(rename = "AvgWin%")]
    pub avg_win_pct: f64,
    #[serde(rename = "AvgLoss%")]
    pub avg_loss_pct: f64,
    #[serde(rename = "Expectancy")]
    pub expectancy: f64,
    pub passes: bool,
}

impl SymbolMetrics {
    /// Aggregate trader returns (percent) for one symbol.
    pub fn from_returns(
        symbol: &str,
        trader_returns: impl IntoIterator<Item = f64>,
        market: &MarketDescriptor,
    ) -> Self {
        let stats = PatternStats::from_outcomes(trader_returns);
        Self {
            symbol: symbol.to_string(),
            country: market.key.country().code().to_string(),
            count: stats.count,
            prob_pct: stats.win_rate_pct,
            rrr: stats.rrr,
            avg_win_pct: stats.avg_win_pct,
            avg_loss_pct: stats.avg_loss_pct,
            expectancy: stats.expectancy_pct(),
            passes: stats.count > 0
                && market
                    .pass_criteria
                    .passes(stats.win_rate_pct, stats.rrr, stats.count),
        }
    }

    pub fn from_trades(symbol: &str, trades: &[Trade], market: &MarketDescriptor) -> Self {
        Self::from_returns(symbol, trades.iter().map(|t| t.trader_return), market)
    }

    /// One entry per symbol in the log, sorted by symbol. Rows without a
    /// trader return are ignored.
    pub fn from_log_rows(rows: &[TradeLogRow], market: &MarketDescriptor) -> Vec<Self> {
        let mut by_symbol: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        let mut missing = 0usize;
        for row in rows {
            match row.trader_return {
                Some(r) if r.is_finite() => by_symbol.entry(row.symbol.as_str()).or_default().push(r),
                _ => missing += 1,
            }
        }
        if missing > 0 {
            log::warn!("{missing} trade-log rows without a trader return were ignored");
        }
        by_symbol
            .into_iter()
            .map(|(symbol, returns)| Self::from_returns(symbol, returns, market))
            .collect()
    }
}

/// Write the metrics table as CSV.
pub fn write_metrics_csv(path: &Path, metrics: &[SymbolMetrics]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create metrics CSV {}", path.display()))?;
    for m in metrics {
        writer.serialize(m)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write metrics CSV {}", path.display()))?;
    Ok(())
}

/// Fixed-width text rendering for the terminal.
pub fn render_table(metrics: &[SymbolMetrics]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>7} {:>6} {:>7} {:>8} {:>8} {:>9} {:>10} {:>6}",
        "symbol", "Country", "Count", "Prob%", "RR_Ratio", "AvgWin%", "AvgLoss%", "Expectancy", "passes"
    );
    for m in metrics {
        let _ = writeln!(
            out,
            "{:<12} {:>7} {:>6} {:>7.1} {:>8.2} {:>8.2} {:>9.2} {:>10.2} {:>6}",
            m.symbol,
            m.country,
            m.count,
            m.prob_pct,
            m.rrr,
            m.avg_win_pct,
            m.avg_loss_pct,
            m.expectancy,
            if m.passes { "yes" } else { "no" }
        );
    }
    out
}
