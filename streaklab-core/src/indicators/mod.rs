//! Price indicators used by the forecaster and the exit simulator.
//!
//! Indicators are pure functions: bar history in, numeric series out. The
//! value at bar t depends only on bars `0..=t`, so slicing the history before
//! calling `compute` is equivalent to reading the full series at t.

use crate::domain::Bar;

pub mod adx;
pub mod atr;
pub mod rolling;
pub mod sma;
pub mod volume;

pub use adx::Adx;
pub use atr::{true_range, Atr};
pub use rolling::{rolling_mean, rolling_std};
pub use sma::Sma;
pub use volume::volume_ratio;

/// A causal indicator over a bar series.
///
/// `compute` returns a series of the same length as `bars`; the first
/// `lookback()` values are `f64::NAN`.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g. "sma_50", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic daily bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Bar::daily(
                base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                1000,
            )
        })
        .collect()
}

/// Create synthetic daily bars from closing prices (open = previous close).
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let data: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_ohlc_bars(&data)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
