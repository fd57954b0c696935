//! Walk-forward loop.
//!
//! For each candidate entry bar `i` the forecaster only sees `bars[..=i]`;
//! the exit simulator then reads forward from `i + 1`. Entries stop
//! `max_hold` bars before the end so every trade has room to run its course.

use std::collections::BTreeMap;

use crate::domain::{Bar, Trade};
use crate::exit::ExitSimulator;
use crate::forecast::Forecaster;
use crate::market::MarketDescriptor;

use super::gatekeeper::Gatekeeper;

/// Which bars may be entered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryWindow {
    /// From the warmup boundary.
    #[default]
    Full,
    /// Only the last N bars; earlier history still feeds the statistics.
    LastBars(usize),
    /// From an absolute bar index (clamped to the warmup).
    FromIndex(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BacktestOptions {
    /// Skip ahead to the bar after each exit instead of re-entering every bar.
    pub fast: bool,
    pub window: EntryWindow,
}

/// Trades plus bookkeeping of what happened on the bars that were not traded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestOutcome {
    pub symbol: String,
    pub trades: Vec<Trade>,
    /// Bars for which a forecast was attempted.
    pub bars_evaluated: usize,
    pub forecasts: usize,
    /// No-forecast reasons by label.
    pub no_forecast: BTreeMap<&'static str, usize>,
    /// Gatekeeper rejections by label.
    pub rejected: BTreeMap<&'static str, usize>,
    /// Trades whose brackets used the ATR substitute.
    pub atr_fallbacks: usize,
}

#[derive(Debug, Clone)]
pub struct Backtester {
    forecaster: Forecaster,
    exits: ExitSimulator,
    gatekeeper: Gatekeeper,
}

impl Backtester {
    pub fn new(market: MarketDescriptor) -> Self {
        Self {
            exits: ExitSimulator::new(market.exit_policy),
            gatekeeper: Gatekeeper::for_market(&market),
            forecaster: Forecaster::new(market),
        }
    }

    pub fn market(&self) -> &MarketDescriptor {
        self.forecaster.market()
    }

    pub fn forecaster(&self) -> &Forecaster {
        &self.forecaster
    }

    /// First bar index eligible for entry.
    pub fn start_index(&self, n_bars: usize, window: EntryWindow) -> usize {
        let warmup = self.market().warmup;
        let requested = match window {
            EntryWindow::Full => 0,
            EntryWindow::LastBars(n) => n_bars.saturating_sub(n),
            EntryWindow::FromIndex(i) => i,
        };
        warmup.max(requested)
    }

    pub fn run(&self, symbol: &str, bars: &[Bar], options: BacktestOptions) -> BacktestOutcome {
        let mut outcome = BacktestOutcome {
            symbol: symbol.to_string(),
            ..BacktestOutcome::default()
        };
        let end = bars.len().saturating_sub(self.market().exit_policy.max_hold);
        let mut i = self.start_index(bars.len(), options.window);

        while i < end {
            outcome.bars_evaluated += 1;

            let forecast = match self.forecaster.forecast(&bars[..=i]) {
                Ok(f) => f,
                Err(reason) => {
                    log::trace!("{symbol} bar {i}: no forecast ({reason})");
                    *outcome.no_forecast.entry(reason.label()).or_default() += 1;
                    i += 1;
                    continue;
                }
            };
            outcome.forecasts += 1;

            if let Err(rejection) = self.gatekeeper.check(&forecast) {
                log::debug!(
                    "{symbol} bar {i}: {} {} p={:.1}% rejected ({})",
                    forecast.direction,
                    forecast.pattern,
                    forecast.probability,
                    rejection.label()
                );
                *outcome.rejected.entry(rejection.label()).or_default() += 1;
                i += 1;
                continue;
            }

            let Some(exit) = self.exits.simulate(bars, i, forecast.direction) else {
                break;
            };
            if exit.atr_fallback {
                if outcome.atr_fallbacks == 0 {
                    log::warn!("{symbol}: ATR undefined at bar {i}, using 2% of entry for brackets");
                }
                outcome.atr_fallbacks += 1;
            }

            let entry = &bars[i];
            let exit_bar = &bars[exit.exit_index];
            let d = forecast.direction.sign();
            outcome.trades.push(Trade {
                symbol: symbol.to_string(),
                direction: forecast.direction,
                entry_index: i,
                entry_time: entry.timestamp,
                entry_price: entry.close,
                exit_index: exit.exit_index,
                exit_time: exit_bar.timestamp,
                exit_price: exit.exit_price,
                exit_reason: exit.reason,
                realised_return: exit.return_pct * d,
                trader_return: exit.return_pct,
                hold_bars: exit.hold_bars,
                forecast_probability: forecast.probability,
                pattern: forecast.pattern,
            });

            i = if options.fast { exit.exit_index + 1 } else { i + 1 };
        }

        log::info!(
            "{symbol}: {} trades from {} forecasts over {} bars",
            outcome.trades.len(),
            outcome.forecasts,
            outcome.bars_evaluated
        );
        outcome
    }
}
