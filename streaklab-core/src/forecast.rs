//! Forecaster: one forecast record for the newest bar of a history.
//!
//! Composes the signal series, the active pattern, the direction rule, the
//! trend gates, the conditional-return index and the best-fit selector. The
//! result depends only on the slice it is given, so a walk-forward caller
//! passes `&bars[..=i]` to forecast bar `i`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Bar, Direction, Pattern, Regime};
use crate::indicators::{volume::VOLUME_WINDOW, volume_ratio, Adx, Sma};
use crate::market::MarketDescriptor;
use crate::pattern::{
    select_best_fit, BestFitParams, ConditionalReturnIndex, IndexParams, RegimeFilter, Selection,
};
use crate::signal::{active_pattern, SignalSeries};

/// Fewest bars the forecaster will look at, regardless of warmup.
pub const MIN_HISTORY: usize = 50;

/// Target daily risk (percent) used to scale the suggested position size.
const RISK_BUDGET_PCT: f64 = 2.0;

/// A directional forecast for the bar after `bar_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    /// Close of the forecast bar; the price a trade on this forecast enters at.
    pub entry_price: f64,
    /// Current streak signature (up to the active lookback).
    pub active_pattern: Pattern,
    /// Selected sub-pattern (a suffix of `active_pattern`).
    pub pattern: Pattern,
    pub length: usize,
    pub direction: Direction,
    /// Win rate of the selected sub-pattern, percent.
    pub probability: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub rrr: f64,
    pub count: usize,
    pub expectancy: f64,
    pub selection: Selection,
    pub is_tradeable: bool,

    // ── Diagnostics ──
    pub threshold: f64,
    pub volume_ratio: Option<f64>,
    pub adx: Option<f64>,
    pub regime: Option<Regime>,
    /// Volatility-targeted size: risk budget over the threshold in percent.
    pub position_size: f64,
}

/// Why no forecast was produced. These are ordinary outcomes, not failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoForecast {
    InsufficientHistory { bars: usize, required: usize },
    /// The last move did not exceed the threshold (or the threshold is undefined).
    BelowThreshold,
    NoActivePattern,
    /// Short signal on a long-only market.
    ShortNotAllowed,
    /// Trend market with ADX under the floor or undefined.
    WeakTrend { adx: Option<f64> },
    /// No sub-pattern had enough history at an acceptable win rate.
    NoQualifyingPattern,
}

impl NoForecast {
    /// Stable label for counters and logs.
    pub fn label(&self) -> &'static str {
        match self {
            NoForecast::InsufficientHistory { .. } => "insufficient_history",
            NoForecast::BelowThreshold => "below_threshold",
            NoForecast::NoActivePattern => "no_active_pattern",
            NoForecast::ShortNotAllowed => "short_not_allowed",
            NoForecast::WeakTrend { .. } => "weak_trend",
            NoForecast::NoQualifyingPattern => "no_qualifying_pattern",
        }
    }
}

impl fmt::Display for NoForecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoForecast::InsufficientHistory { bars, required } => {
                write!(f, "insufficient history ({bars} bars, need {required})")
            }
            NoForecast::WeakTrend { adx: Some(adx) } => write!(f, "weak trend (ADX {adx:.1})"),
            NoForecast::WeakTrend { adx: None } => write!(f, "weak trend (ADX undefined)"),
            other => f.write_str(&other.label().replace('_', " ")),
        }
    }
}

/// Per-market forecaster. Cheap to clone; holds only parameters.
#[derive(Debug, Clone)]
pub struct Forecaster {
    market: MarketDescriptor,
    best_fit: BestFitParams,
    index_params: IndexParams,
}

impl Forecaster {
    pub fn new(market: MarketDescriptor) -> Self {
        let best_fit = BestFitParams::for_market(&market);
        let index_params = IndexParams {
            max_len: market.max_pattern_len,
            warmup: market.warmup,
        };
        Self {
            market,
            best_fit,
            index_params,
        }
    }

    pub fn market(&self) -> &MarketDescriptor {
        &self.market
    }

    /// Bars required before a forecast can be made.
    pub fn required_history(&self) -> usize {
        MIN_HISTORY.max(self.market.warmup + 1)
    }

    /// Forecast the bar after the last bar of `bars`.
    pub fn forecast(&self, bars: &[Bar]) -> Result<Forecast, NoForecast> {
        let required = self.required_history();
        let Some(last_bar) = bars.last().filter(|_| bars.len() >= required) else {
            return Err(NoForecast::InsufficientHistory {
                bars: bars.len(),
                required,
            });
        };
        let last = bars.len() - 1;

        let series = SignalSeries::for_market(bars, &self.market);
        let (ret, threshold) = (series.returns[last], series.thresholds[last]);
        if threshold.is_nan() || ret.is_nan() || ret.abs() <= threshold {
            return Err(NoForecast::BelowThreshold);
        }

        let active = active_pattern(&series.signals, self.market.active_lookback)
            .ok_or(NoForecast::NoActivePattern)?;
        let direction = self
            .market
            .strategy
            .direction_for(active.last_signal())
            .ok_or(NoForecast::NoActivePattern)?;
        if direction == Direction::Short && !self.market.allow_short {
            return Err(NoForecast::ShortNotAllowed);
        }

        let (adx, regimes) = if self.market.is_trend() {
            let adx = Adx::new(self.market.adx_period).last(bars);
            if !adx.is_some_and(|v| v >= self.market.adx_min) {
                return Err(NoForecast::WeakTrend { adx });
            }
            (adx, Some(Sma::new(self.market.regime_sma).regimes(bars)))
        } else {
            (None, None)
        };
        let regime = regimes.as_ref().map(|r| r[last]);
        let filter = regimes.as_deref().zip(regime).map(|(regimes, current)| RegimeFilter {
            regimes,
            current,
        });

        let index = ConditionalReturnIndex::build(
            &series.signals,
            &series.returns,
            self.index_params,
            filter,
        );
        let fit = select_best_fit(&active, &index, direction, &self.best_fit)
            .ok_or(NoForecast::NoQualifyingPattern)?;

        let stats = fit.stats;
        let is_tradeable =
            stats.win_rate_pct >= self.market.tradeable_prob && stats.count >= self.market.min_count;

        Ok(Forecast {
            bar_index: last,
            timestamp: last_bar.timestamp,
            entry_price: last_bar.close,
            length: fit.pattern.len(),
            active_pattern: active,
            pattern: fit.pattern,
            direction,
            probability: stats.win_rate_pct,
            avg_win: stats.avg_win_pct,
            avg_loss: stats.avg_loss_pct,
            rrr: stats.rrr,
            count: stats.count,
            expectancy: stats.expectancy_pct(),
            selection: fit.selection,
            is_tradeable,
            threshold,
            volume_ratio: volume_ratio(bars, VOLUME_WINDOW),
            adx,
            regime,
            position_size: RISK_BUDGET_PCT / (100.0 * threshold),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;
    use crate::market::MarketKey;

    /// Bars whose intraday bodies cycle through `+0.5% / -2% / +2% / ...`.
    fn cycling_bars(n: usize, bodies: &[f64]) -> Vec<Bar> {
        let data: Vec<(f64, f64, f64, f64)> = (0..n)
            .map(|i| {
                let open = 100.0;
                let close = open * (1.0 + bodies[i % bodies.len()]);
                (open, open.max(close) + 0.5, open.min(close) - 0.5, close)
            })
            .collect();
        make_ohlc_bars(&data)
    }

    #[test]
    fn short_history_is_insufficient() {
        let f = Forecaster::new(MarketDescriptor::preset(MarketKey::China));
        let bars = cycling_bars(100, &[0.02, -0.02]);
        assert_eq!(
            f.forecast(&bars),
            Err(NoForecast::InsufficientHistory {
                bars: 100,
                required: 253
            })
        );
    }

    #[test]
    fn neutral_last_bar_gives_no_forecast() {
        let f = Forecaster::new(MarketDescriptor::preset(MarketKey::China));
        let bars = cycling_bars(400, &[0.02, -0.02, 0.0]);
        let bars = &bars[..=398]; // 398 % 3 == 2 → flat body
        assert_eq!(f.forecast(bars), Err(NoForecast::BelowThreshold));
    }

    #[test]
    fn mean_reversion_fades_last_move() {
        // "+-." repeating: after "-" the next bar is flat (a loss for a long),
        // so no pattern clears the probability floor; the direction is still
        // decided before the index is consulted.
        let market = MarketDescriptor::preset(MarketKey::China);
        let f = Forecaster::new(market);
        let bars = cycling_bars(400, &[0.02, -0.02, 0.0]);
        let last_down = &bars[..=397]; // 397 % 3 == 1 → -2%
        assert_eq!(f.forecast(last_down), Err(NoForecast::NoQualifyingPattern));
    }

    #[test]
    fn forecast_from_repeating_cycle() {
        // "-+" repeating: every "-" is followed by "+", so a long after "-" always wins.
        let f = Forecaster::new(MarketDescriptor::preset(MarketKey::China));
        let bars = cycling_bars(400, &[0.02, -0.02]);
        let slice = &bars[..=399]; // 399 odd → -2%
        let fc = f.forecast(slice).unwrap();
        assert_eq!(fc.direction, Direction::Long);
        assert_eq!(fc.bar_index, 399);
        assert_eq!(fc.entry_price, slice[399].close);
        assert!(fc.pattern.as_str().ends_with('-'));
        assert!(fc.active_pattern.as_str().ends_with(fc.pattern.as_str()));
        assert_eq!(fc.probability, 100.0);
        assert!(fc.count >= 30);
        assert!(fc.is_tradeable);
        assert!(fc.adx.is_none() && fc.regime.is_none());
    }

    #[test]
    fn long_only_market_drops_shorts() {
        let f = Forecaster::new(MarketDescriptor::preset(MarketKey::Us));
        let bars = cycling_bars(400, &[0.02, -0.02]);
        // Trend rule: last "-" → short, which the US market does not take.
        assert_eq!(f.forecast(&bars[..=399]), Err(NoForecast::ShortNotAllowed));
    }

    /// `down` bars falling 2% then `up` bars rising 2%, each opening at the prior close.
    fn reversal_bars(down: usize, up: usize) -> Vec<Bar> {
        let mut prev = 1000.0;
        let data: Vec<(f64, f64, f64, f64)> = (0..down + up)
            .map(|i| {
                let open: f64 = prev;
                let close = if i < down { open * 0.98 } else { open * 1.02 };
                prev = close;
                (open, open.max(close) * 1.005, open.min(close) * 0.995, close)
            })
            .collect();
        make_ohlc_bars(&data)
    }

    #[test]
    fn trend_market_needs_adx_floor() {
        // Alternating bodies: directional movement cancels, ADX stays low.
        let market = MarketDescriptor::preset(MarketKey::Taiwan);
        let floor = market.adx_min;
        let f = Forecaster::new(market);
        let bars = cycling_bars(400, &[0.02, -0.02]);
        match f.forecast(&bars) {
            Err(NoForecast::WeakTrend { adx: Some(adx) }) => assert!(adx < floor, "adx {adx}"),
            other => panic!("expected weak trend, got {other:?}"),
        }
    }

    #[test]
    fn trend_forecast_counts_same_regime_history() {
        let market = MarketDescriptor::preset(MarketKey::Taiwan);
        let f = Forecaster::new(market.clone());
        let bars = reversal_bars(320, 100);
        let last = bars.len() - 1;

        let fc = f.forecast(&bars).unwrap();
        assert_eq!(fc.direction, Direction::Long);
        assert!(fc.adx.is_some_and(|adx| adx >= market.adx_min));

        let regimes = Sma::new(market.regime_sma).regimes(&bars);
        assert_eq!(regimes[last], Regime::Bull);
        assert_eq!(fc.regime, Some(regimes[last]));

        let series = SignalSeries::for_market(&bars, &market);
        let params = IndexParams {
            max_len: market.max_pattern_len,
            warmup: market.warmup,
        };
        let filter = RegimeFilter {
            regimes: &regimes,
            current: Regime::Bull,
        };
        let same_regime =
            ConditionalReturnIndex::build(&series.signals, &series.returns, params, Some(filter));
        let all = ConditionalReturnIndex::build(&series.signals, &series.returns, params, None);
        assert_eq!(fc.count, same_regime.count(&fc.pattern));
        // The early rebound bars still sit under the SMA and are left out.
        assert!(fc.count < all.count(&fc.pattern));
        assert_eq!(fc.probability, 100.0);
    }

    #[test]
    fn idempotent() {
        let f = Forecaster::new(MarketDescriptor::preset(MarketKey::China));
        let bars = cycling_bars(400, &[0.02, -0.02]);
        assert_eq!(f.forecast(&bars), f.forecast(&bars));
    }
}
