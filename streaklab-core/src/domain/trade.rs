//! Trade: one simulated round trip taken on a forecast.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::pattern::Pattern;
use super::signal::Direction;

/// Why a simulated position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TrailingStop,
    MaxHold,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TrailingStop => "TRAILING_STOP",
            ExitReason::MaxHold => "MAX_HOLD",
            ExitReason::EndOfData => "END_OF_DATA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TAKE_PROFIT" => Some(ExitReason::TakeProfit),
            "STOP_LOSS" => Some(ExitReason::StopLoss),
            "TRAILING_STOP" => Some(ExitReason::TrailingStop),
            "MAX_HOLD" => Some(ExitReason::MaxHold),
            "END_OF_DATA" => Some(ExitReason::EndOfData),
            _ => None,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed simulated trade.
///
/// Returns are in percent of the entry price. `realised_return` is the raw
/// price move; `trader_return` is sign-corrected for the direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub direction: Direction,

    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Outcome ──
    pub realised_return: f64,
    pub trader_return: f64,
    pub hold_bars: usize,

    // ── Forecast snapshot at entry ──
    pub forecast_probability: f64,
    pub pattern: Pattern,
}

impl Trade {
    /// 1 iff the trade made money for the trader.
    pub fn is_correct(&self) -> bool {
        self.trader_return > 0.0
    }

    /// Direction the price actually moved over the hold.
    pub fn actual_label(&self) -> &'static str {
        if self.realised_return > 0.0 {
            "UP"
        } else {
            "DOWN"
        }
    }
}
