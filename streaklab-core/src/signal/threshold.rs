//! Volatility-adaptive move threshold.
//!
//! `t[i] = M * max(sd20[i], sd252[i], F)` where the rolling standard deviations
//! are population SDs of the return series and `F` is the market floor as a
//! fraction. The long window contributes 0 until it is full; the short window
//! must be defined or the threshold is NaN.

use crate::indicators::rolling_std;
use crate::market::MarketDescriptor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdParams {
    /// Floor as a fraction (0.006 = 0.6%).
    pub floor: f64,
    pub multiplier: f64,
    pub short_window: usize,
    pub long_window: usize,
}

impl ThresholdParams {
    pub const SHORT_WINDOW: usize = 20;
    pub const LONG_WINDOW: usize = 252;

    pub fn new(floor: f64, multiplier: f64) -> Self {
        Self {
            floor,
            multiplier,
            short_window: Self::SHORT_WINDOW,
            long_window: Self::LONG_WINDOW,
        }
    }

    pub fn for_market(market: &MarketDescriptor) -> Self {
        Self::new(market.floor_fraction(), market.multiplier)
    }
}

/// Threshold series, same length as `returns`.
pub fn adaptive_threshold(returns: &[f64], params: &ThresholdParams) -> Vec<f64> {
    let short = rolling_std(returns, params.short_window);
    let long = rolling_std(returns, params.long_window);

    short
        .iter()
        .zip(&long)
        .map(|(&s, &l)| {
            if s.is_nan() {
                return f64::NAN;
            }
            let l = if l.is_nan() { 0.0 } else { l };
            params.multiplier * s.max(l).max(params.floor)
        })
        .collect()
}
