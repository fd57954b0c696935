//! ADX: Average Directional Index (Wilder).
//!
//! Used only as a regime gate: below the market's `adx_min` the trend engine
//! stays flat. With period n the first value appears at index 2n-1
//! (n bars of directional movement to seed the DI averages, n DX values to
//! seed the ADX average).

use super::atr::true_range;
use super::Indicator;
use crate::domain::Bar;

/// Wilder running average: seeded with the plain mean of the first `period`
/// inputs, then `avg = (avg * (n - 1) + x) / n`.
#[derive(Debug, Clone)]
struct WilderAverage {
    period: usize,
    seed_sum: f64,
    seen: usize,
    value: Option<f64>,
}

impl WilderAverage {
    fn new(period: usize) -> Self {
        Self {
            period,
            seed_sum: 0.0,
            seen: 0,
            value: None,
        }
    }

    fn push(&mut self, x: f64) -> Option<f64> {
        if !x.is_finite() {
            // A gap in the inputs restarts the seed.
            *self = Self::new(self.period);
            return None;
        }
        let n = self.period as f64;
        self.value = match self.value {
            Some(prev) => Some((prev * (n - 1.0) + x) / n),
            None => {
                self.seed_sum += x;
                self.seen += 1;
                (self.seen == self.period).then(|| self.seed_sum / n)
            }
        };
        self.value
    }
}

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }

    /// ADX at the last bar, if defined.
    pub fn last(&self, bars: &[Bar]) -> Option<f64> {
        self.compute(bars).last().copied().filter(|v| v.is_finite())
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut adx = vec![f64::NAN; n];
        let tr = true_range(bars);

        let mut tr_avg = WilderAverage::new(self.period);
        let mut plus_avg = WilderAverage::new(self.period);
        let mut minus_avg = WilderAverage::new(self.period);
        let mut dx_avg = WilderAverage::new(self.period);

        for i in 1..n {
            let up_move = bars[i].high - bars[i - 1].high;
            let down_move = bars[i - 1].low - bars[i].low;
            let plus_dm = if up_move > down_move && up_move > 0.0 {
                up_move
            } else {
                0.0
            };
            let minus_dm = if down_move > up_move && down_move > 0.0 {
                down_move
            } else {
                0.0
            };
            let (plus_dm, minus_dm) = if up_move.is_nan() || down_move.is_nan() {
                (f64::NAN, f64::NAN)
            } else {
                (plus_dm, minus_dm)
            };

            let smoothed = (
                tr_avg.push(tr[i]),
                plus_avg.push(plus_dm),
                minus_avg.push(minus_dm),
            );
            let (Some(atr), Some(plus), Some(minus)) = smoothed else {
                continue;
            };
            if atr <= 0.0 {
                continue;
            }

            let plus_di = 100.0 * plus / atr;
            let minus_di = 100.0 * minus / atr;
            let di_sum = plus_di + minus_di;
            let dx = if di_sum == 0.0 {
                0.0
            } else {
                100.0 * (plus_di - minus_di).abs() / di_sum
            };

            if let Some(value) = dx_avg.push(dx) {
                adx[i] = value;
            }
        }

        adx
    }
}
