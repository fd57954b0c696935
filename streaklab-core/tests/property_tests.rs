//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Signal classification agrees with the threshold rule and is symmetric
//! 2. Thresholds never fall below the floor once defined
//! 3. The conditional-return index matches a brute-force enumeration
//! 4. Pattern statistics are invariant to scaling the returns
//! 5. Exits stay inside the holding window and fill at their levels
//! 6. The walk-forward backtest is deterministic and causal

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::HashMap;
use streaklab_core::domain::{Bar, Direction, ExitReason, Pattern, Signal};
use streaklab_core::engine::{BacktestOptions, Backtester};
use streaklab_core::exit::ExitSimulator;
use streaklab_core::market::{ExitPolicy, MarketDescriptor, MarketKey};
use streaklab_core::pattern::{ConditionalReturnIndex, IndexParams, PatternStats};
use streaklab_core::signal::{adaptive_threshold, classify_bar, ThresholdParams};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_return() -> impl Strategy<Value = f64> {
    -0.08..0.08_f64
}

fn arb_signal() -> impl Strategy<Value = Signal> {
    prop_oneof![Just(Signal::Up), Just(Signal::Down), Just(Signal::Neutral)]
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Long), Just(Direction::Short)]
}

/// One bar as fractions of its open: (body, upper wick, lower wick).
fn arb_bar_shape() -> impl Strategy<Value = (f64, f64, f64)> {
    (-0.05..0.05_f64, 0.0..0.03_f64, 0.0..0.03_f64)
}

fn bars_from_shapes(start_open: f64, shapes: &[(f64, f64, f64)]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let mut open = start_open;
    shapes
        .iter()
        .enumerate()
        .map(|(i, &(body, up, down))| {
            let close = open * (1.0 + body);
            let high = open.max(close) * (1.0 + up);
            let low = open.min(close) * (1.0 - down);
            let bar = Bar::daily(base + chrono::Duration::days(i as i64), open, high, low, close, 1_000);
            open = close;
            bar
        })
        .collect()
}

// ── 1. Classification ────────────────────────────────────────────────

proptest! {
    /// `+` iff r > t, `-` iff r < -t, `.` otherwise; mirroring r mirrors the signal.
    #[test]
    fn classification_follows_threshold(r in arb_return(), t in 0.0001..0.05_f64) {
        let s = classify_bar(r, t);
        prop_assert_eq!(s == Signal::Up, r > t);
        prop_assert_eq!(s == Signal::Down, r < -t);

        let mirrored = match s {
            Signal::Up => Signal::Down,
            Signal::Down => Signal::Up,
            Signal::Neutral => Signal::Neutral,
        };
        prop_assert_eq!(classify_bar(-r, t), mirrored);
    }

    /// NaN on either side is always neutral.
    #[test]
    fn nan_is_neutral(r in arb_return()) {
        prop_assert_eq!(classify_bar(f64::NAN, 0.01), Signal::Neutral);
        prop_assert_eq!(classify_bar(r, f64::NAN), Signal::Neutral);
    }
}

// ── 2. Threshold Floor ───────────────────────────────────────────────

proptest! {
    #[test]
    fn threshold_never_below_floor(
        returns in prop::collection::vec(arb_return(), 30..300),
        floor in 0.001..0.02_f64,
        multiplier in 0.1..2.0_f64,
    ) {
        let t = adaptive_threshold(&returns, &ThresholdParams::new(floor, multiplier));
        prop_assert_eq!(t.len(), returns.len());
        for v in t.iter().filter(|v| !v.is_nan()) {
            prop_assert!(*v >= floor, "threshold {} below floor {}", v, floor);
        }
        // The short window is fully populated from index 19 on.
        prop_assert!(t[19..].iter().all(|v| v.is_finite()));
    }
}

// ── 3. Index Enumeration ─────────────────────────────────────────────

/// Every contiguous non-neutral window ending at j (starting at or after the
/// warmup, at most `max_len` long) records `returns[j + 1]`.
fn brute_force_index(
    signals: &[Signal],
    returns: &[f64],
    warmup: usize,
    max_len: usize,
) -> HashMap<Pattern, Vec<f64>> {
    let mut out: HashMap<Pattern, Vec<f64>> = HashMap::new();
    for j in warmup..signals.len().saturating_sub(1) {
        for len in 1..=max_len {
            if j + 1 < warmup + len {
                break;
            }
            let window = &signals[j + 1 - len..=j];
            if window.iter().any(|s| s.is_neutral()) {
                break;
            }
            if let Some(p) = Pattern::from_signals(window) {
                out.entry(p).or_default().push(returns[j + 1]);
            }
        }
    }
    out
}

proptest! {
    #[test]
    fn index_matches_brute_force(
        signals in prop::collection::vec(arb_signal(), 10..120),
        warmup in 0usize..10,
        max_len in 1usize..6,
    ) {
        let returns: Vec<f64> = (0..signals.len()).map(|i| (i as f64 + 1.0) / 1000.0).collect();
        let index = ConditionalReturnIndex::build(
            &signals,
            &returns,
            IndexParams { max_len, warmup },
            None,
        );
        let expected = brute_force_index(&signals, &returns, warmup, max_len);

        prop_assert_eq!(index.len(), expected.len());
        for (pattern, rets) in &expected {
            prop_assert_eq!(index.get(pattern), rets.as_slice(), "pattern {}", pattern);
        }
        for pattern in index.patterns() {
            prop_assert!(pattern.len() <= max_len);
        }
    }
}

// ── 4. Statistics ────────────────────────────────────────────────────

proptest! {
    /// Scaling every return by a positive factor leaves the win rate and the
    /// reward/risk ratio unchanged.
    #[test]
    fn stats_scale_invariant(
        returns in prop::collection::vec(arb_return(), 1..80),
        k in 0.1..10.0_f64,
        direction in arb_direction(),
    ) {
        let base = PatternStats::from_returns(&returns, direction);
        let scaled_returns: Vec<f64> = returns.iter().map(|r| r * k).collect();
        let scaled = PatternStats::from_returns(&scaled_returns, direction);

        prop_assert_eq!(base.count, scaled.count);
        prop_assert_eq!(base.win_rate_pct, scaled.win_rate_pct);
        prop_assert!((base.rrr - scaled.rrr).abs() <= 1e-9 * base.rrr.max(1.0));
    }

    /// Long and short stats of the same sample swap wins for losses
    /// (up to zero returns, which lose both ways).
    #[test]
    fn direction_flips_wins(returns in prop::collection::vec(-0.08..0.08_f64, 1..80)) {
        prop_assume!(returns.iter().all(|r| *r != 0.0));
        let long = PatternStats::from_returns(&returns, Direction::Long);
        let short = PatternStats::from_returns(&returns, Direction::Short);
        prop_assert!((long.win_rate_pct + short.win_rate_pct - 100.0).abs() < 1e-9);
        prop_assert!((long.avg_win_pct - short.avg_loss_pct).abs() < 1e-9);
    }
}

// ── 5. Exit Bounds ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn exit_stays_in_window(
        path in prop::collection::vec(arb_bar_shape(), 1..20),
        direction in arb_direction(),
        sl in 0.5..5.0_f64,
        tp in 0.5..8.0_f64,
        max_hold in 1usize..10,
        trailing in any::<bool>(),
    ) {
        let mut shapes = vec![(0.0, 0.001, 0.001)];
        shapes.extend(path);
        let bars = bars_from_shapes(100.0, &shapes);
        let mut policy = ExitPolicy::fixed(sl, tp, max_hold);
        if trailing {
            policy = policy.with_trailing(1.0, 0.4);
        }

        let out = ExitSimulator::new(policy).simulate(&bars, 0, direction).unwrap();
        prop_assert!(out.exit_index >= 1);
        prop_assert!(out.hold_bars <= max_hold);
        prop_assert_eq!(out.hold_bars, out.exit_index);

        match out.reason {
            ExitReason::TakeProfit => prop_assert!((out.return_pct - tp).abs() < 1e-9),
            ExitReason::StopLoss => prop_assert!((out.return_pct + sl).abs() < 1e-9),
            ExitReason::TrailingStop => {
                prop_assert!(trailing);
                prop_assert!(out.return_pct > -sl - 1e-9);
            }
            ExitReason::MaxHold => prop_assert_eq!(out.hold_bars, max_hold),
            ExitReason::EndOfData => prop_assert_eq!(out.exit_index, bars.len() - 1),
        }
    }
}

// ── 6. Walk-Forward ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn backtest_deterministic_and_bounded(
        shapes in prop::collection::vec(arb_bar_shape(), 280..330),
        key in prop_oneof![Just(MarketKey::China), Just(MarketKey::Thai), Just(MarketKey::Taiwan)],
    ) {
        let bars = bars_from_shapes(50.0, &shapes);
        let market = MarketDescriptor::preset(key);
        let max_hold = market.exit_policy.max_hold;
        let warmup = market.warmup;
        let bt = Backtester::new(market);

        let a = bt.run("P", &bars, BacktestOptions::default());
        let b = bt.run("P", &bars, BacktestOptions::default());
        prop_assert_eq!(&a, &b);

        for t in &a.trades {
            prop_assert!(t.entry_index >= warmup);
            prop_assert!(t.entry_index + max_hold < bars.len());
            prop_assert!(t.exit_index > t.entry_index);
            prop_assert!(t.hold_bars <= max_hold);
            prop_assert_eq!(t.trader_return, t.realised_return * t.direction.sign());
        }
        let no_forecast: usize = a.no_forecast.values().sum();
        prop_assert_eq!(a.bars_evaluated, a.forecasts + no_forecast);
    }
}
