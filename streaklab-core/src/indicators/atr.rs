//! Average True Range.
//!
//! TR[i] = max(high-low, |high-prev_close|, |low-prev_close|); the first bar
//! has no previous close and its TR is undefined.
//! ATR is the simple mean of the last `period` true ranges, so the first valid
//! value sits at index `period`.

use super::rolling::rolling_mean;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }

    /// ATR at the last bar of `bars`, if defined.
    pub fn last(&self, bars: &[Bar]) -> Option<f64> {
        // Only the trailing window matters; avoid a full-series pass.
        let start = bars.len().saturating_sub(self.period + 1);
        self.compute(&bars[start..])
            .last()
            .copied()
            .filter(|v| v.is_finite())
    }
}

/// True range per bar; index 0 is NaN.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for (i, pair) in bars.windows(2).enumerate() {
        let (prev, bar) = (&pair[0], &pair[1]);
        let range = bar.high - bar.low;
        let up = (bar.high - prev.close).abs();
        let down = (bar.low - prev.close).abs();
        // f64::max ignores a single NaN operand.
        if range.is_nan() || up.is_nan() || down.is_nan() {
            continue;
        }
        tr[i + 1] = range.max(up).max(down);
    }
    tr
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_mean(&true_range(bars), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_uses_previous_close() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // max(8, 6, 2) = 8
            (110.0, 115.0, 108.0, 112.0), // gap: max(7, 9, 2) = 9
        ]);
        let tr = true_range(&bars);
        assert!(tr[0].is_nan());
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_is_simple_mean_of_true_range() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // 8
            (106.0, 107.0, 98.0, 99.0),   // 9
            (99.0, 103.0, 97.0, 101.0),   // 6
            (101.0, 106.0, 100.0, 105.0), // 6
        ]);
        let atr = Atr::new(3).compute(&bars);
        assert!(atr[2].is_nan());
        assert_approx(atr[3], (8.0 + 9.0 + 6.0) / 3.0, DEFAULT_EPSILON);
        assert_approx(atr[4], (9.0 + 6.0 + 6.0) / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn last_matches_full_series() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
            (99.0, 103.0, 97.0, 101.0),
            (101.0, 106.0, 100.0, 105.0),
            (105.0, 109.0, 104.0, 108.0),
        ]);
        let atr = Atr::new(3);
        let full = atr.compute(&bars);
        assert_approx(atr.last(&bars).unwrap(), full[5], DEFAULT_EPSILON);
    }

    #[test]
    fn last_is_none_during_warmup() {
        let bars = make_ohlc_bars(&[(100.0, 101.0, 99.0, 100.0), (100.0, 101.0, 99.0, 100.5)]);
        assert_eq!(Atr::new(14).last(&bars), None);
    }
}
