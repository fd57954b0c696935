//! Look-ahead contamination tests.
//!
//! Every value computed for bar `t` must depend only on bars `0..=t`.
//! Each test computes on a full series and on a truncated copy, then checks
//! that the overlapping prefix is identical.

use chrono::NaiveDate;
use streaklab_core::domain::Bar;
use streaklab_core::engine::{BacktestOptions, Backtester};
use streaklab_core::forecast::Forecaster;
use streaklab_core::indicators::{Adx, Atr, Indicator, Sma};
use streaklab_core::market::{MarketDescriptor, MarketKey};
use streaklab_core::signal::SignalSeries;

/// Deterministic bars with a repeating seven-bar body cycle
/// (`+ - + - + - .`) plus LCG noise on bodies and levels.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let base_date = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
    let mut seed: u64 = 42;
    let mut next_unit = || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((seed >> 33) as f64) / (u32::MAX as f64) // [0, 1)
    };

    let mut open = 100.0;
    (0..n)
        .map(|i| {
            let noise = (next_unit() - 0.5) * 0.006;
            let body = match i % 7 {
                6 => 0.001,
                k if k % 2 == 0 => 0.025 + noise,
                _ => -0.025 - noise,
            };
            let close = open * (1.0 + body);
            let high = open.max(close) * (1.0 + 0.002 + next_unit() * 0.005);
            let low = open.min(close) * (1.0 - 0.002 - next_unit() * 0.005);
            let volume = 10_000 + (next_unit() * 5_000.0) as u64;
            let bar = Bar::daily(
                base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume,
            );
            open = close * (1.0 + (next_unit() - 0.5) * 0.004);
            bar
        })
        .collect()
}

fn same_value(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let full = indicator.compute(full_bars);
    let truncated = indicator.compute(&full_bars[..truncated_len]);

    for t in 0..truncated_len {
        assert!(
            same_value(full[t], truncated[t]),
            "{}: look-ahead at bar {t}: full={} truncated={}",
            indicator.name(),
            full[t],
            truncated[t]
        );
    }
}

// ── Indicators ───────────────────────────────────────────────────────

#[test]
fn atr_no_lookahead() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Atr::new(14), &bars, 120);
}

#[test]
fn adx_no_lookahead() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Adx::new(14), &bars, 120);
}

#[test]
fn sma_no_lookahead() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Sma::new(50), &bars, 120);
}

// ── Returns, thresholds, signals ─────────────────────────────────────

#[test]
fn signal_series_no_lookahead() {
    let bars = make_test_bars(600);
    for key in [MarketKey::China, MarketKey::Thai] {
        let market = MarketDescriptor::preset(key);
        let full = SignalSeries::for_market(&bars, &market);
        let truncated = SignalSeries::for_market(&bars[..400], &market);
        for t in 0..400 {
            assert!(same_value(full.returns[t], truncated.returns[t]), "{key}: return at {t}");
            assert!(
                same_value(full.thresholds[t], truncated.thresholds[t]),
                "{key}: threshold at {t}"
            );
            assert_eq!(full.signals[t], truncated.signals[t], "{key}: signal at {t}");
        }
    }
}

// ── Walk-forward ─────────────────────────────────────────────────────

#[test]
fn walk_forward_trades_ignore_later_bars() {
    let market = MarketDescriptor::preset(MarketKey::China);
    let max_hold = market.exit_policy.max_hold;
    let bt = Backtester::new(market);

    let bars = make_test_bars(500);
    let cut = 400;
    let full = bt.run("SYN", &bars, BacktestOptions::default());
    let truncated = bt.run("SYN", &bars[..cut], BacktestOptions::default());
    assert!(!truncated.trades.is_empty(), "fixture should produce trades");

    let overlapping: Vec<_> = full
        .trades
        .iter()
        .filter(|t| t.entry_index < cut - max_hold)
        .cloned()
        .collect();
    assert_eq!(overlapping, truncated.trades);
}

#[test]
fn trade_probability_matches_forecast_on_prefix() {
    let market = MarketDescriptor::preset(MarketKey::China);
    let forecaster = Forecaster::new(market.clone());
    let bars = make_test_bars(360);
    let out = Backtester::new(market).run("SYN", &bars, BacktestOptions::default());
    assert!(!out.trades.is_empty());

    for trade in &out.trades {
        let f = forecaster
            .forecast(&bars[..=trade.entry_index])
            .expect("traded bar must have a forecast");
        assert_eq!(f.probability, trade.forecast_probability);
        assert_eq!(f.pattern, trade.pattern);
        assert_eq!(f.direction, trade.direction);
        assert_eq!(f.entry_price, trade.entry_price);
    }
}
