//! StreakLab Runner: group orchestration on top of `streaklab-core`.
//!
//! This crate provides:
//! - Run configuration from TOML with CLI overrides and a deterministic run id
//! - Bar loading with cache/download/CSV/synthetic fallback
//! - The append-only trade log
//! - Per-symbol metrics and pass criteria
//! - The parallel group runner

pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod runner;
pub mod trade_log;

pub use config::{ConfigError, DataConfig, ParamOverrides, RunConfig};
pub use data_loader::{generate_synthetic_bars, load_symbol, BarLoader, LoadError, LoadOptions, LoadedBars};
pub use metrics::{render_table, write_metrics_csv, SymbolMetrics};
pub use runner::{
    run_symbol, ForecastStatus, GroupReport, GroupRunner, RunError, SymbolFailure,
    SymbolForecast, SymbolReport,
};
pub use trade_log::{log_path, read_trade_log, TradeLog, TradeLogError, TradeLogRow, TradeLogWriter};
