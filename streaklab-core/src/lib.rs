//! StreakLab Core: streak-pattern forecasting and walk-forward backtesting.
//!
//! This crate contains the engine and its data collaborators:
//! - Domain types (bars, signals, patterns, trades)
//! - Per-market descriptors (return definition, thresholds, exits, pass criteria)
//! - Adaptive-threshold signal classification and active-pattern extraction
//! - Conditional-return index over streak sub-patterns and best-fit selection
//! - Forecaster, exit simulator and the walk-forward loop
//! - Data providers (Yahoo Finance, CSV), validation and the Parquet cache
//!
//! The engine is synchronous and never returns errors: a bar without a
//! forecast is reported through `NoForecast`, not `Err`.

pub mod data;
pub mod domain;
pub mod engine;
pub mod exit;
pub mod forecast;
pub mod indicators;
pub mod market;
pub mod pattern;
pub mod signal;

pub use domain::{Bar, Direction, ExitReason, Pattern, Signal, Trade};
pub use engine::{BacktestOptions, BacktestOutcome, Backtester, EntryWindow, Gatekeeper};
pub use exit::{ExitOutcome, ExitSimulator};
pub use forecast::{Forecast, Forecaster, NoForecast};
pub use market::{MarketDescriptor, MarketKey};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the runner moves across rayon workers
    /// is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Pattern>();
        require_sync::<domain::Pattern>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::DatasetHash>();
        require_sync::<domain::DatasetHash>();

        // Engine types
        require_send::<market::MarketDescriptor>();
        require_sync::<market::MarketDescriptor>();
        require_send::<Forecaster>();
        require_sync::<Forecaster>();
        require_send::<Forecast>();
        require_sync::<Forecast>();
        require_send::<ExitSimulator>();
        require_sync::<ExitSimulator>();
        require_send::<Backtester>();
        require_sync::<Backtester>();
        require_send::<BacktestOutcome>();
        require_sync::<BacktestOutcome>();
        require_send::<pattern::ConditionalReturnIndex>();
        require_sync::<pattern::ConditionalReturnIndex>();

        // Data collaborators
        require_send::<data::ParquetCache>();
        require_sync::<data::ParquetCache>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::CsvProvider>();
        require_sync::<data::CsvProvider>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
    }

    /// Architecture contract: the forecaster sees bars and nothing else.
    ///
    /// A forecast is a function of the history slice; no provider, cache or
    /// trade state can reach it.
    #[test]
    fn forecaster_takes_only_bars() {
        fn _check(f: &Forecaster, bars: &[Bar]) -> Result<Forecast, NoForecast> {
            f.forecast(bars)
        }
    }
}
