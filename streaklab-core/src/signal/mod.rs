//! Returns, adaptive thresholds and the `+`/`-`/`.` signal array.

pub mod active;
pub mod classify;
pub mod returns;
pub mod threshold;

pub use active::active_pattern;
pub use classify::{classify, classify_bar};
pub use returns::ReturnMode;
pub use threshold::{adaptive_threshold, ThresholdParams};

use crate::domain::{Bar, Signal};
use crate::market::MarketDescriptor;

/// Returns, thresholds and signals for one bar history, index-aligned.
#[derive(Debug, Clone)]
pub struct SignalSeries {
    pub returns: Vec<f64>,
    pub thresholds: Vec<f64>,
    pub signals: Vec<Signal>,
}

impl SignalSeries {
    pub fn build(bars: &[Bar], mode: ReturnMode, params: &ThresholdParams) -> Self {
        let returns = mode.series(bars);
        let thresholds = adaptive_threshold(&returns, params);
        let signals = classify(&returns, &thresholds);
        Self {
            returns,
            thresholds,
            signals,
        }
    }

    pub fn for_market(bars: &[Bar], market: &MarketDescriptor) -> Self {
        Self::build(bars, market.return_mode, &ThresholdParams::for_market(market))
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}
