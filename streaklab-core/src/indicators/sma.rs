//! Simple Moving Average (SMA) of closes, and the bull/bear regime it defines.
//!
//! Lookback: period - 1 (first valid value at index period-1).

use super::rolling::rolling_mean;
use super::Indicator;
use crate::domain::{Bar, Regime};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }

    /// Regime per bar: `Bull` iff close is strictly above the SMA.
    /// Bars inside the warmup read as `Bear`.
    pub fn regimes(&self, bars: &[Bar]) -> Vec<Regime> {
        self.compute(bars)
            .iter()
            .zip(bars)
            .map(|(&sma, bar)| Regime::classify(bar.close, sma))
            .collect()
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rolling_mean(&closes, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn sma_basic() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let sma = Sma::new(3).compute(&bars);
        assert!(sma[0].is_nan());
        assert!(sma[1].is_nan());
        assert_approx(sma[2], 11.0, DEFAULT_EPSILON);
        assert_approx(sma[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn regime_follows_close_vs_sma() {
        // Rising then collapsing closes.
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 5.0]);
        let regimes = Sma::new(3).regimes(&bars);
        assert_eq!(regimes[0], Regime::Bear); // warmup
        assert_eq!(regimes[3], Regime::Bull); // 13 > 12
        assert_eq!(regimes[4], Regime::Bear); // 5 < 10
    }

    #[test]
    fn close_equal_to_sma_is_bear() {
        let bars = make_bars(&[10.0, 10.0, 10.0]);
        assert_eq!(Sma::new(3).regimes(&bars)[2], Regime::Bear);
    }
}
