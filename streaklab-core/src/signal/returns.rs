//! Per-bar return series.
//!
//! A market uses exactly one definition for both classification and the
//! next-bar outcomes stored in the pattern index.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnMode {
    /// `(close - open) / open`: the bar's own body.
    IntradayBody,
    /// `close[i] / close[i-1] - 1`; undefined on the first bar.
    CloseToClose,
}

impl ReturnMode {
    /// Return series as fractions (0.01 = 1%). Non-finite results become NaN.
    pub fn series(self, bars: &[Bar]) -> Vec<f64> {
        let raw = |v: f64| if v.is_finite() { v } else { f64::NAN };
        match self {
            ReturnMode::IntradayBody => bars
                .iter()
                .map(|b| raw((b.close - b.open) / b.open))
                .collect(),
            ReturnMode::CloseToClose => std::iter::once(f64::NAN)
                .chain(bars.windows(2).map(|w| raw(w[1].close / w[0].close - 1.0)))
                .take(bars.len())
                .collect(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReturnMode::IntradayBody => "intraday_body",
            ReturnMode::CloseToClose => "close_to_close",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn intraday_body() {
        let bars = make_ohlc_bars(&[(100.0, 103.0, 99.0, 102.0), (102.0, 102.0, 96.0, 96.9)]);
        let r = ReturnMode::IntradayBody.series(&bars);
        assert_approx(r[0], 0.02, DEFAULT_EPSILON);
        assert_approx(r[1], -0.05, DEFAULT_EPSILON);
    }

    #[test]
    fn close_to_close_first_is_nan() {
        let bars = make_ohlc_bars(&[(100.0, 101.0, 99.0, 100.0), (100.0, 111.0, 99.0, 110.0)]);
        let r = ReturnMode::CloseToClose.series(&bars);
        assert_eq!(r.len(), 2);
        assert!(r[0].is_nan());
        assert_approx(r[1], 0.10, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_open_is_nan() {
        let bars = make_ohlc_bars(&[(0.0, 1.0, 0.0, 1.0)]);
        assert!(ReturnMode::IntradayBody.series(&bars)[0].is_nan());
    }

    #[test]
    fn empty_input() {
        assert!(ReturnMode::CloseToClose.series(&[]).is_empty());
        assert!(ReturnMode::IntradayBody.series(&[]).is_empty());
    }
}
