//! Gatekeeper: the last filter between a forecast and a simulated entry.

use crate::forecast::Forecast;
use crate::market::MarketDescriptor;

/// Why a forecast was not traded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rejection {
    LowProbability,
    NonPositiveExpectancy,
    /// Trend markets only: average win must exceed average loss.
    WinNotAboveLoss,
}

impl Rejection {
    pub fn label(self) -> &'static str {
        match self {
            Rejection::LowProbability => "low_probability",
            Rejection::NonPositiveExpectancy => "non_positive_expectancy",
            Rejection::WinNotAboveLoss => "win_not_above_loss",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gatekeeper {
    pub min_prob_pct: f64,
    pub require_win_above_loss: bool,
}

impl Gatekeeper {
    pub fn for_market(market: &MarketDescriptor) -> Self {
        Self {
            min_prob_pct: market.min_prob_gatekeeper,
            require_win_above_loss: market.is_trend(),
        }
    }

    pub fn check(&self, forecast: &Forecast) -> Result<(), Rejection> {
        if forecast.probability < self.min_prob_pct {
            return Err(Rejection::LowProbability);
        }
        if forecast.expectancy <= 0.0 {
            return Err(Rejection::NonPositiveExpectancy);
        }
        if self.require_win_above_loss && forecast.avg_win <= forecast.avg_loss {
            return Err(Rejection::WinNotAboveLoss);
        }
        Ok(())
    }
}
