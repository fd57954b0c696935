//! Best-fit sub-pattern selection.
//!
//! Suffixes of the active pattern are scanned longest first. The first
//! marginal sample (between `min_count` and `strong_count`) is held as a
//! fallback; the first strong sample ends the scan and competes with the
//! fallback on win rate.

use serde::{Deserialize, Serialize};

use super::index::ConditionalReturnIndex;
use super::stats::PatternStats;
use crate::domain::{Direction, Pattern};
use crate::market::MarketDescriptor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestFitParams {
    pub min_count: usize,
    pub strong_count: usize,
    /// Win rate (percent) a lone fallback must reach.
    pub min_prob_pct: f64,
}

impl BestFitParams {
    pub fn for_market(market: &MarketDescriptor) -> Self {
        Self {
            min_count: market.min_count,
            strong_count: market.strong_count,
            min_prob_pct: market.min_prob_best_fit,
        }
    }
}

/// Which slot the chosen sub-pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Selection {
    Strong,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestFit {
    pub pattern: Pattern,
    pub stats: PatternStats,
    pub selection: Selection,
}

/// Run the selection over candidates already ordered longest → shortest.
pub fn select<I>(candidates: I, params: &BestFitParams) -> Option<BestFit>
where
    I: IntoIterator<Item = (Pattern, PatternStats)>,
{
    let mut fallback: Option<(Pattern, PatternStats)> = None;

    for (pattern, stats) in candidates {
        if stats.count < params.min_count {
            continue;
        }
        if stats.count < params.strong_count {
            fallback.get_or_insert((pattern, stats));
            continue;
        }
        return Some(match fallback {
            Some((fb_pattern, fb_stats)) if stats.win_rate_pct < fb_stats.win_rate_pct => BestFit {
                pattern: fb_pattern,
                stats: fb_stats,
                selection: Selection::Fallback,
            },
            _ => BestFit {
                pattern,
                stats,
                selection: Selection::Strong,
            },
        });
    }

    fallback
        .filter(|(_, stats)| stats.win_rate_pct >= params.min_prob_pct)
        .map(|(pattern, stats)| BestFit {
            pattern,
            stats,
            selection: Selection::Fallback,
        })
}

/// Best-fit sub-pattern of `active` given the index and a trade direction.
pub fn select_best_fit(
    active: &Pattern,
    index: &ConditionalReturnIndex,
    direction: Direction,
    params: &BestFitParams,
) -> Option<BestFit> {
    let candidates = active.suffixes().map(|suffix| {
        let stats = PatternStats::from_returns(index.get(&suffix), direction);
        (suffix, stats)
    });
    select(candidates, params)
}
