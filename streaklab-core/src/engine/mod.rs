//! Walk-forward backtest: forecast each bar from its own history, gate it,
//! simulate the exit and record the trade.

pub mod backtest;
pub mod gatekeeper;

pub use backtest::{BacktestOptions, BacktestOutcome, Backtester, EntryWindow};
pub use gatekeeper::{Gatekeeper, Rejection};
