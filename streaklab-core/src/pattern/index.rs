//! Conditional-return index: sub-pattern → next-bar returns.
//!
//! Every maximal streak starting at or after the warmup bar is expanded into
//! all of its contiguous sub-patterns (full overlap, length-capped). Each
//! sub-pattern ending at bar `j` records `r[j+1]` when that return exists.

use std::collections::HashMap;

use crate::domain::{Pattern, Regime, Signal};

/// Only record matches whose end bar was in the `current` regime.
#[derive(Debug, Clone, Copy)]
pub struct RegimeFilter<'a> {
    pub regimes: &'a [Regime],
    pub current: Regime,
}

impl RegimeFilter<'_> {
    fn admits(&self, j: usize) -> bool {
        self.regimes.get(j) == Some(&self.current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexParams {
    /// Longest sub-pattern recorded.
    pub max_len: usize,
    /// First bar a streak may start on.
    pub warmup: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionalReturnIndex {
    entries: HashMap<Pattern, Vec<f64>>,
}

impl ConditionalReturnIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate streaks in `signals` and record next-bar `returns`.
    ///
    /// `returns` must come from the same return definition that produced
    /// `signals`.
    pub fn build(
        signals: &[Signal],
        returns: &[f64],
        params: IndexParams,
        filter: Option<RegimeFilter<'_>>,
    ) -> Self {
        let mut index = Self::new();
        let n = signals.len();
        let mut i = params.warmup;

        while i < n {
            if signals[i].is_neutral() {
                i += 1;
                continue;
            }
            let start = i;
            let end = signals[start..]
                .iter()
                .position(|s| s.is_neutral())
                .map_or(n, |offset| start + offset);
            let streak = &signals[start..end];

            for p in 0..streak.len() {
                let longest = (p + params.max_len).min(streak.len());
                for q in p + 1..=longest {
                    let j = start + q - 1;
                    let Some(&next) = returns.get(j + 1) else {
                        continue;
                    };
                    if !next.is_finite() || filter.is_some_and(|f| !f.admits(j)) {
                        continue;
                    }
                    if let Some(pattern) = Pattern::from_signals(&streak[p..q]) {
                        index.record(pattern, next);
                    }
                }
            }
            i = end;
        }

        index
    }

    /// Append one observed next-bar return for `pattern`.
    pub fn record(&mut self, pattern: Pattern, ret: f64) {
        self.entries.entry(pattern).or_default().push(ret);
    }

    /// Returns recorded for `pattern`, in bar order. Empty if never seen.
    pub fn get(&self, pattern: &Pattern) -> &[f64] {
        self.entries.get(pattern).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, pattern: &Pattern) -> usize {
        self.get(pattern).len()
    }

    /// Patterns present, sorted.
    pub fn patterns(&self) -> Vec<&Pattern> {
        let mut keys: Vec<&Pattern> = self.entries.keys().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total recorded observations across all patterns.
    pub fn observations(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sigs(s: &str) -> Vec<Signal> {
        s.chars().filter_map(Signal::from_char).collect()
    }

    fn pat(s: &str) -> Pattern {
        s.parse().unwrap()
    }

    const NO_WARMUP: IndexParams = IndexParams {
        max_len: 8,
        warmup: 0,
    };

    #[test]
    fn full_overlap_enumeration() {
        // "++-+" then neutral.
        let signals = sigs("++-+.");
        let returns = [0.0, 0.01, 0.02, 0.03, 0.04];
        let index = ConditionalReturnIndex::build(&signals, &returns, NO_WARMUP, None);

        // "+" ends at 0, 1, 3 → r[1], r[2], r[4]
        assert_eq!(index.get(&pat("+")), &[0.01, 0.02, 0.04]);
        assert_eq!(index.get(&pat("-")), &[0.03]);
        assert_eq!(index.get(&pat("++")), &[0.02]);
        assert_eq!(index.get(&pat("+-")), &[0.03]);
        assert_eq!(index.get(&pat("-+")), &[0.04]);
        assert_eq!(index.get(&pat("++-")), &[0.03]);
        assert_eq!(index.get(&pat("+-+")), &[0.04]);
        assert_eq!(index.get(&pat("++-+")), &[0.04]);
        assert_eq!(index.observations(), 10);
    }

    #[test]
    fn last_bar_has_no_outcome() {
        let signals = sigs(".++");
        let returns = [0.0, 0.01, 0.02];
        let index = ConditionalReturnIndex::build(&signals, &returns, NO_WARMUP, None);
        assert_eq!(index.get(&pat("+")), &[0.02]);
        assert_eq!(index.count(&pat("++")), 0);
    }

    #[test]
    fn length_cap() {
        let signals = sigs("++++.");
        let returns = [0.01; 5];
        let params = IndexParams {
            max_len: 2,
            warmup: 0,
        };
        let index = ConditionalReturnIndex::build(&signals, &returns, params, None);
        assert_eq!(index.count(&pat("+")), 4);
        assert_eq!(index.count(&pat("++")), 3);
        assert_eq!(index.count(&pat("+++")), 0);
    }

    #[test]
    fn warmup_starts_streak_mid_run() {
        // The run straddles the warmup boundary; enumeration starts at bar 2.
        let signals = sigs("+++.");
        let returns = [0.0, 0.0, 0.0, 0.05];
        let params = IndexParams {
            max_len: 8,
            warmup: 2,
        };
        let index = ConditionalReturnIndex::build(&signals, &returns, params, None);
        assert_eq!(index.patterns(), vec![&pat("+")]);
        assert_eq!(index.get(&pat("+")), &[0.05]);
    }

    #[test]
    fn non_finite_outcomes_skipped() {
        let signals = sigs("++.");
        let returns = [0.0, f64::NAN, 0.02];
        let index = ConditionalReturnIndex::build(&signals, &returns, NO_WARMUP, None);
        assert_eq!(index.get(&pat("+")), &[0.02]);
        assert_eq!(index.count(&pat("++")), 1);
    }

    #[test]
    fn regime_filter_uses_end_bar() {
        let signals = sigs("+.+.");
        let returns = [0.0, 0.01, 0.0, 0.03];
        let regimes = [Regime::Bull, Regime::Bull, Regime::Bear, Regime::Bear];
        let filter = RegimeFilter {
            regimes: &regimes,
            current: Regime::Bull,
        };
        let index = ConditionalReturnIndex::build(&signals, &returns, NO_WARMUP, Some(filter));
        assert_eq!(index.get(&pat("+")), &[0.01]);
    }

    #[test]
    fn all_neutral_is_empty() {
        let signals = sigs(".....");
        let index = ConditionalReturnIndex::build(&signals, &[0.0; 5], NO_WARMUP, None);
        assert!(index.is_empty());
    }
}
