//! Group runner: one market, many symbols.
//!
//! Symbols are independent. Each worker loads its symbol, runs the
//! walk-forward backtest, appends the trades to the shared log and builds the
//! symbol's metrics. A symbol that fails to load is logged and skipped; only
//! trade-log I/O aborts the run. Results come back sorted by symbol
//! regardless of scheduling.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use streaklab_core::data::DataSource;
use streaklab_core::domain::{Bar, DatasetHash};
use streaklab_core::engine::{BacktestOptions, BacktestOutcome, Backtester, Gatekeeper, Rejection};
use streaklab_core::forecast::{Forecast, Forecaster, NoForecast};
use streaklab_core::market::MarketDescriptor;

use crate::config::ConfigError;
use crate::data_loader::{LoadError, LoadedBars};
use crate::metrics::SymbolMetrics;
use crate::trade_log::{TradeLogError, TradeLogWriter};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("trade log error: {0}")]
    TradeLog(#[from] TradeLogError),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
    #[error("no symbols to run")]
    NoSymbols,
}

/// Backtest result for one symbol.
#[derive(Debug, Clone)]
pub struct SymbolReport {
    pub symbol: String,
    pub source: DataSource,
    pub dataset_hash: DatasetHash,
    pub bar_count: usize,
    pub outcome: BacktestOutcome,
    pub metrics: SymbolMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct GroupReport {
    pub symbols: Vec<SymbolReport>,
    pub failures: Vec<SymbolFailure>,
    /// The cancel flag was raised before every symbol ran.
    pub cancelled: bool,
}

impl GroupReport {
    pub fn trade_count(&self) -> usize {
        self.symbols.iter().map(|s| s.outcome.trades.len()).sum()
    }

    pub fn metrics(&self) -> Vec<SymbolMetrics> {
        self.symbols.iter().map(|s| s.metrics.clone()).collect()
    }

    pub fn passing(&self) -> usize {
        self.symbols.iter().filter(|s| s.metrics.passes).count()
    }

    pub fn has_synthetic(&self) -> bool {
        self.symbols.iter().any(|s| s.source == DataSource::Synthetic)
    }
}

/// Latest forecast for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastStatus {
    Ready {
        forecast: Box<Forecast>,
        /// Why the backtest would not have traded it, if it would not.
        rejection: Option<Rejection>,
    },
    NoForecast(NoForecast),
    NoData(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolForecast {
    pub symbol: String,
    pub status: ForecastStatus,
}

enum SymbolStatus {
    Done(Box<SymbolReport>),
    Failed(SymbolFailure),
    Cancelled,
}

/// Backtest one symbol's bars and log its trades.
pub fn run_symbol(
    symbol: &str,
    bars: &[Bar],
    backtester: &Backtester,
    options: BacktestOptions,
    trade_log: Option<&TradeLogWriter>,
) -> Result<(BacktestOutcome, SymbolMetrics), RunError> {
    let outcome = backtester.run(symbol, bars, options);
    if let Some(log) = trade_log {
        log.append_trades(&outcome.trades, backtester.market())?;
    }
    let metrics = SymbolMetrics::from_trades(symbol, &outcome.trades, backtester.market());
    Ok((outcome, metrics))
}

pub struct GroupRunner<'a> {
    backtester: Backtester,
    options: BacktestOptions,
    trade_log: Option<&'a TradeLogWriter>,
    cancel: Option<&'a AtomicBool>,
    jobs: Option<usize>,
}

impl<'a> GroupRunner<'a> {
    pub fn new(market: MarketDescriptor, options: BacktestOptions) -> Self {
        Self {
            backtester: Backtester::new(market),
            options,
            trade_log: None,
            cancel: None,
            jobs: None,
        }
    }

    pub fn with_trade_log(mut self, log: &'a TradeLogWriter) -> Self {
        self.trade_log = Some(log);
        self
    }

    /// Checked before each symbol starts.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn market(&self) -> &MarketDescriptor {
        self.backtester.market()
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|f| f.load(Ordering::Relaxed))
    }

    /// Run every symbol through `load` and the backtester.
    pub fn run<L>(&self, symbols: &[String], load: L) -> Result<GroupReport, RunError>
    where
        L: Fn(&str) -> Result<LoadedBars, LoadError> + Sync,
    {
        if symbols.is_empty() {
            return Err(RunError::NoSymbols);
        }
        let market = self.market().key;
        log::info!("running {} symbols for {market}", symbols.len());

        let statuses = self.map_symbols(symbols, |symbol| self.run_one(symbol, &load))?;

        let mut report = GroupReport::default();
        for status in statuses {
            match status? {
                SymbolStatus::Done(r) => report.symbols.push(*r),
                SymbolStatus::Failed(f) => report.failures.push(f),
                SymbolStatus::Cancelled => report.cancelled = true,
            }
        }
        report.symbols.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        report.failures.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        log::info!(
            "{market}: {} symbols, {} trades, {} passing, {} without data{}",
            report.symbols.len(),
            report.trade_count(),
            report.passing(),
            report.failures.len(),
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    /// Latest forecast per symbol, sorted by symbol.
    pub fn forecast<L>(&self, symbols: &[String], load: L) -> Result<Vec<SymbolForecast>, RunError>
    where
        L: Fn(&str) -> Result<LoadedBars, LoadError> + Sync,
    {
        let forecaster: &Forecaster = self.backtester.forecaster();
        let gatekeeper = Gatekeeper::for_market(self.market());

        let mut out = self.map_symbols(symbols, |symbol| {
            let status = match load(symbol) {
                Ok(loaded) => match forecaster.forecast(&loaded.bars) {
                    Ok(f) => ForecastStatus::Ready {
                        rejection: gatekeeper.check(&f).err(),
                        forecast: Box::new(f),
                    },
                    Err(reason) => ForecastStatus::NoForecast(reason),
                },
                Err(e) => {
                    log::warn!("no data for {symbol}: {e}");
                    ForecastStatus::NoData(e.to_string())
                }
            };
            SymbolForecast {
                symbol: symbol.to_string(),
                status,
            }
        })?;
        out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(out)
    }

    fn run_one<L>(&self, symbol: &str, load: &L) -> Result<SymbolStatus, RunError>
    where
        L: Fn(&str) -> Result<LoadedBars, LoadError> + Sync,
    {
        if self.cancelled() {
            return Ok(SymbolStatus::Cancelled);
        }

        let loaded = match load(symbol) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::warn!("no data for {symbol}: {e}");
                return Ok(SymbolStatus::Failed(SymbolFailure {
                    symbol: symbol.to_string(),
                    error: e.to_string(),
                }));
            }
        };

        let (outcome, metrics) = run_symbol(
            symbol,
            &loaded.bars,
            &self.backtester,
            self.options,
            self.trade_log,
        )?;
        Ok(SymbolStatus::Done(Box::new(SymbolReport {
            symbol: symbol.to_string(),
            source: loaded.source,
            dataset_hash: loaded.dataset_hash,
            bar_count: loaded.bars.len(),
            outcome,
            metrics,
        })))
    }

    /// Apply `f` to every symbol, in parallel unless a single job was requested.
    fn map_symbols<T, F>(&self, symbols: &[String], f: F) -> Result<Vec<T>, RunError>
    where
        T: Send,
        F: Fn(&str) -> T + Sync,
    {
        if self.jobs == Some(1) {
            return Ok(symbols.iter().map(|s| f(s.as_str())).collect());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs.unwrap_or(0))
            .build()
            .map_err(|e| RunError::ThreadPool(e.to_string()))?;
        Ok(pool.install(|| symbols.par_iter().map(|s| f(s.as_str())).collect()))
    }
}
