//! Win/loss statistics over a list of next-bar returns.

use serde::{Deserialize, Serialize};

use crate::domain::Direction;

/// Summary of a return sample from the trader's point of view, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternStats {
    pub count: usize,
    /// Percent of strictly positive outcomes.
    pub win_rate_pct: f64,
    /// Mean winning outcome (percent), 0 without wins.
    pub avg_win_pct: f64,
    /// Magnitude of the mean losing outcome (percent), 0 without losses.
    pub avg_loss_pct: f64,
    /// `avg_win / avg_loss`, 0 when there are no losses.
    pub rrr: f64,
}

impl PatternStats {
    /// Stats of fractional returns (0.01 = 1%) taken in `direction`.
    pub fn from_returns(returns: &[f64], direction: Direction) -> Self {
        let sign = direction.sign();
        Self::from_outcomes(returns.iter().map(|r| sign * 100.0 * r))
    }

    /// Stats of outcomes already in percent and already signed for the trader.
    /// A zero outcome counts as a loss.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = f64>) -> Self {
        let mut count = 0usize;
        let (mut wins, mut win_sum) = (0usize, 0.0);
        let (mut losses, mut loss_sum) = (0usize, 0.0);
        for p in outcomes {
            count += 1;
            if p > 0.0 {
                wins += 1;
                win_sum += p;
            } else {
                losses += 1;
                loss_sum += p;
            }
        }
        if count == 0 {
            return Self::default();
        }

        let avg_win_pct = if wins > 0 { win_sum / wins as f64 } else { 0.0 };
        let avg_loss_pct = if losses > 0 {
            (loss_sum / losses as f64).abs()
        } else {
            0.0
        };
        let rrr = if avg_loss_pct > 0.0 {
            avg_win_pct / avg_loss_pct
        } else {
            0.0
        };
        Self {
            count,
            win_rate_pct: 100.0 * wins as f64 / count as f64,
            avg_win_pct,
            avg_loss_pct,
            rrr,
        }
    }

    /// `w * avg_win - (1 - w) * avg_loss`, percent per trade.
    pub fn expectancy_pct(&self) -> f64 {
        let w = self.win_rate_pct / 100.0;
        w * self.avg_win_pct - (1.0 - w) * self.avg_loss_pct
    }
}
