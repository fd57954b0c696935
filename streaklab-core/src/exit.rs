//! Exit simulator: walks bars after an entry until a target, stop, trailing
//! stop, max-hold or the end of data closes the position.
//!
//! Per bar the order is fixed:
//! 1. take-profit (intrabar touch, filled at the target),
//! 2. stop (the level carried in from earlier bars, filled at the stop),
//! 3. trailing update from this bar's extreme and close,
//! 4. max-hold at the close.
//!
//! Checking the target before the stop is optimistic when one bar touches
//! both.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction, ExitReason};
use crate::indicators::Atr;
use crate::market::{ExitPolicy, TrailingStop};

/// ATR substitute (fraction of entry) when ATR is undefined at entry.
pub const ATR_FALLBACK_FRACTION: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitOutcome {
    pub exit_index: usize,
    pub exit_price: f64,
    /// Trader-signed return in percent of entry.
    pub return_pct: f64,
    pub reason: ExitReason,
    pub hold_bars: usize,
    /// ATR was undefined at entry and the 2% substitute was used.
    pub atr_fallback: bool,
}

/// Initial stop and target for an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brackets {
    pub stop: f64,
    pub target: f64,
    pub atr_fallback: bool,
}

/// Trailing stop state: running extreme, armed flag, current level.
#[derive(Debug, Clone, Copy)]
struct Trail {
    config: TrailingStop,
    extreme: f64,
    armed: bool,
}

impl Trail {
    /// Update from a completed bar; returns the new trailing level once armed.
    fn update(&mut self, bar: &Bar, entry: f64, direction: Direction) -> Option<f64> {
        let d = direction.sign();
        self.extreme = match direction {
            Direction::Long => self.extreme.max(bar.high),
            Direction::Short => self.extreme.min(bar.low),
        };
        let closing_profit_pct = d * (bar.close - entry) / entry * 100.0;
        if closing_profit_pct > self.config.activate_pct {
            self.armed = true;
        }
        self.armed
            .then(|| self.extreme - d * (self.extreme - entry).abs() * self.config.distance)
    }
}

#[derive(Debug, Clone)]
pub struct ExitSimulator {
    policy: ExitPolicy,
    atr: Atr,
}

impl ExitSimulator {
    pub fn new(policy: ExitPolicy) -> Self {
        Self {
            atr: Atr::new(policy.atr_period.max(1)),
            policy,
        }
    }

    pub fn policy(&self) -> &ExitPolicy {
        &self.policy
    }

    /// Stop and target for an entry at `entry_index`, using only bars up to it.
    pub fn brackets(&self, bars: &[Bar], entry_index: usize, direction: Direction) -> Brackets {
        let entry = bars[entry_index].close;
        let d = direction.sign();
        if !self.policy.use_atr {
            return Brackets {
                stop: entry * (1.0 - d * self.policy.sl_pct / 100.0),
                target: entry * (1.0 + d * self.policy.tp_pct / 100.0),
                atr_fallback: false,
            };
        }

        let (atr, atr_fallback) = match self.atr.last(&bars[..=entry_index]) {
            Some(atr) => (atr, false),
            None => (ATR_FALLBACK_FRACTION * entry, true),
        };
        Brackets {
            stop: entry - d * atr * self.policy.atr_sl,
            target: entry + d * atr * self.policy.atr_tp,
            atr_fallback,
        }
    }

    /// Simulate a position opened at the close of `entry_index`.
    ///
    /// `None` when there is no bar after the entry.
    pub fn simulate(
        &self,
        bars: &[Bar],
        entry_index: usize,
        direction: Direction,
    ) -> Option<ExitOutcome> {
        if entry_index + 1 >= bars.len() {
            return None;
        }
        let entry = bars[entry_index].close;
        let d = direction.sign();
        let Brackets {
            mut stop,
            target,
            atr_fallback,
        } = self.brackets(bars, entry_index, direction);

        let mut trail = self.policy.trailing.map(|config| Trail {
            config,
            extreme: entry,
            armed: false,
        });
        let mut trailing_stop = false;

        let close_at = |index: usize, price: f64, reason: ExitReason| ExitOutcome {
            exit_index: index,
            exit_price: price,
            return_pct: d * (price - entry) / entry * 100.0,
            reason,
            hold_bars: index - entry_index,
            atr_fallback,
        };

        let horizon = entry_index + self.policy.max_hold;
        let last = horizon.min(bars.len() - 1);
        for i in entry_index + 1..=last {
            let bar = &bars[i];

            let target_hit = match direction {
                Direction::Long => bar.high >= target,
                Direction::Short => bar.low <= target,
            };
            if target_hit {
                return Some(close_at(i, target, ExitReason::TakeProfit));
            }

            let stop_hit = match direction {
                Direction::Long => bar.low <= stop,
                Direction::Short => bar.high >= stop,
            };
            if stop_hit {
                let reason = if trailing_stop {
                    ExitReason::TrailingStop
                } else {
                    ExitReason::StopLoss
                };
                return Some(close_at(i, stop, reason));
            }

            // The trail only ever tightens the stop.
            if let Some(level) = trail.as_mut().and_then(|t| t.update(bar, entry, direction)) {
                let tighter = match direction {
                    Direction::Long => level > stop,
                    Direction::Short => level < stop,
                };
                if tighter {
                    stop = level;
                    trailing_stop = true;
                }
            }

            if i == horizon {
                return Some(close_at(i, bar.close, ExitReason::MaxHold));
            }
        }

        Some(close_at(last, bars[last].close, ExitReason::EndOfData))
    }
}
