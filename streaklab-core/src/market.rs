//! Per-market descriptors: return definition, threshold floor, direction rule,
//! sample-size floors, gatekeeper, exit policy and pass criteria.
//!
//! One descriptor per market; metals carry two (15-minute and 30-minute).
//! Every tunable the engine reads lives here so callers never fall back to
//! code-path defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{Direction, Signal};
use crate::signal::returns::ReturnMode;

/// Bars consumed before enumeration and before the backtest may trade.
pub const WARMUP_BARS: usize = 252;
/// Index key length cap.
pub const MAX_PATTERN_LEN: usize = 8;
/// How far back the active-pattern extractor walks.
pub const ACTIVE_LOOKBACK: usize = 15;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    #[error("unknown market '{0}' (valid: thai, us, china, hk, taiwan, metals15m, metals30m)")]
    UnknownMarket(String),
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Market identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKey {
    Thai,
    Us,
    China,
    #[serde(alias = "hk")]
    HongKong,
    Taiwan,
    #[serde(alias = "metals")]
    Metals15m,
    Metals30m,
}

impl MarketKey {
    pub const ALL: [MarketKey; 7] = [
        MarketKey::Thai,
        MarketKey::Us,
        MarketKey::China,
        MarketKey::HongKong,
        MarketKey::Taiwan,
        MarketKey::Metals15m,
        MarketKey::Metals30m,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MarketKey::Thai => "thai",
            MarketKey::Us => "us",
            MarketKey::China => "china",
            MarketKey::HongKong => "hk",
            MarketKey::Taiwan => "taiwan",
            MarketKey::Metals15m => "metals15m",
            MarketKey::Metals30m => "metals30m",
        }
    }

    pub fn country(self) -> Country {
        match self {
            MarketKey::Thai => Country::Th,
            MarketKey::Us => Country::Us,
            MarketKey::China => Country::Cn,
            MarketKey::HongKong => Country::Hk,
            MarketKey::Taiwan => Country::Tw,
            MarketKey::Metals15m | MarketKey::Metals30m => Country::Gl,
        }
    }

    pub fn interval(self) -> Interval {
        match self {
            MarketKey::Metals15m => Interval::Minutes15,
            MarketKey::Metals30m => Interval::Minutes30,
            _ => Interval::Daily,
        }
    }

    /// Exchange label written to the trade log.
    pub fn exchange(self) -> &'static str {
        match self {
            MarketKey::Thai => "SET",
            MarketKey::Us => "US",
            MarketKey::China => "SSE/SZSE",
            MarketKey::HongKong => "HKEX",
            MarketKey::Taiwan => "TWSE",
            MarketKey::Metals15m | MarketKey::Metals30m => "COMEX",
        }
    }
}

impl FromStr for MarketKey {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "thai" | "th" | "set" => Ok(MarketKey::Thai),
            "us" | "usa" => Ok(MarketKey::Us),
            "china" | "cn" => Ok(MarketKey::China),
            "hk" | "hongkong" | "hong_kong" => Ok(MarketKey::HongKong),
            "taiwan" | "tw" => Ok(MarketKey::Taiwan),
            "metals15m" | "metals" | "gold" | "metals_15m" => Ok(MarketKey::Metals15m),
            "metals30m" | "metals_30m" => Ok(MarketKey::Metals30m),
            _ => Err(MarketError::UnknownMarket(s.to_string())),
        }
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Country code used in the metrics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    #[serde(rename = "TH")]
    Th,
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "CN")]
    Cn,
    #[serde(rename = "HK")]
    Hk,
    #[serde(rename = "TW")]
    Tw,
    #[serde(rename = "GL")]
    Gl,
}

impl Country {
    pub fn code(self) -> &'static str {
        match self {
            Country::Th => "TH",
            Country::Us => "US",
            Country::Cn => "CN",
            Country::Hk => "HK",
            Country::Tw => "TW",
            Country::Gl => "GL",
        }
    }
}

/// Bar interval of a market's series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Daily,
    Minutes15,
    Minutes30,
}

impl Interval {
    /// Yahoo chart API interval token.
    pub fn as_yahoo(self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Minutes15 => "15m",
            Interval::Minutes30 => "30m",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Daily => "daily",
            Interval::Minutes15 => "15m",
            Interval::Minutes30 => "30m",
        }
    }
}

/// Direction rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    /// Fade the last move: `-` → long, `+` → short.
    MeanReversion,
    /// Follow the last move: `+` → long, `-` → short. Regime-filtered history.
    TrendFollow,
}

impl StrategyKind {
    /// Direction implied by the newest signal of the active pattern.
    pub fn direction_for(self, last: Signal) -> Option<Direction> {
        match (self, last) {
            (_, Signal::Neutral) => None,
            (StrategyKind::MeanReversion, Signal::Down) => Some(Direction::Long),
            (StrategyKind::MeanReversion, Signal::Up) => Some(Direction::Short),
            (StrategyKind::TrendFollow, Signal::Up) => Some(Direction::Long),
            (StrategyKind::TrendFollow, Signal::Down) => Some(Direction::Short),
        }
    }
}

/// Trailing-stop arming and give-back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStop {
    /// Closing unrealised profit (percent) that arms the trail.
    pub activate_pct: f64,
    /// Fraction of peak profit given back before the trail triggers (e.g. 0.40).
    pub distance: f64,
}

/// Exit policy for the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitPolicy {
    /// Fixed stop-loss distance in percent of entry.
    pub sl_pct: f64,
    /// Fixed take-profit distance in percent of entry.
    pub tp_pct: f64,
    /// ATR multiple for the stop.
    pub atr_sl: f64,
    /// ATR multiple for the target.
    pub atr_tp: f64,
    /// ATR multiples take precedence over fixed percents when set.
    pub use_atr: bool,
    pub atr_period: usize,
    /// Maximum bars held.
    pub max_hold: usize,
    pub trailing: Option<TrailingStop>,
}

impl ExitPolicy {
    pub fn fixed(sl_pct: f64, tp_pct: f64, max_hold: usize) -> Self {
        Self {
            sl_pct,
            tp_pct,
            atr_sl: 1.0,
            atr_tp: 5.0,
            use_atr: false,
            atr_period: 14,
            max_hold,
            trailing: None,
        }
    }

    pub fn atr(atr_sl: f64, atr_tp: f64, max_hold: usize) -> Self {
        Self {
            sl_pct: 1.5,
            tp_pct: 3.5,
            atr_sl,
            atr_tp,
            use_atr: true,
            atr_period: 14,
            max_hold,
            trailing: None,
        }
    }

    pub fn with_trailing(mut self, activate_pct: f64, distance: f64) -> Self {
        self.trailing = Some(TrailingStop {
            activate_pct,
            distance,
        });
        self
    }
}

/// Stock-level pass criteria on raw (unfiltered) trade statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassCriteria {
    pub min_prob_pct: f64,
    pub min_rrr: Option<f64>,
    pub min_count: Option<usize>,
}

impl PassCriteria {
    pub fn passes(&self, win_rate_pct: f64, rrr: f64, count: usize) -> bool {
        win_rate_pct >= self.min_prob_pct
            && self.min_rrr.map_or(true, |m| rrr >= m)
            && self.min_count.map_or(true, |m| count >= m)
    }
}

/// Everything the engine needs to know about one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDescriptor {
    pub key: MarketKey,
    pub return_mode: ReturnMode,
    /// Threshold floor in percent (0.6 = 0.6%).
    pub floor_pct: f64,
    pub multiplier: f64,
    pub strategy: StrategyKind,
    /// False drops short forecasts (US is long-only).
    pub allow_short: bool,
    pub min_count: usize,
    pub strong_count: usize,
    /// Best-fit fallback acceptance floor (percent).
    pub min_prob_best_fit: f64,
    /// Gatekeeper probability floor (percent).
    pub min_prob_gatekeeper: f64,
    /// Win rate (percent) at which a forecast is flagged tradeable.
    pub tradeable_prob: f64,
    pub adx_period: usize,
    pub adx_min: f64,
    pub regime_sma: usize,
    pub warmup: usize,
    pub max_pattern_len: usize,
    pub active_lookback: usize,
    pub exit_policy: ExitPolicy,
    pub pass_criteria: PassCriteria,
}

impl MarketDescriptor {
    /// Reference preset for a market.
    pub fn preset(key: MarketKey) -> Self {
        let mean_reversion = Self {
            key,
            return_mode: ReturnMode::IntradayBody,
            floor_pct: 0.8,
            multiplier: 0.9,
            strategy: StrategyKind::MeanReversion,
            allow_short: true,
            min_count: 30,
            strong_count: 50,
            min_prob_best_fit: 55.0,
            min_prob_gatekeeper: 53.0,
            tradeable_prob: 60.0,
            adx_period: 14,
            adx_min: 20.0,
            regime_sma: 50,
            warmup: WARMUP_BARS,
            max_pattern_len: MAX_PATTERN_LEN,
            active_lookback: ACTIVE_LOOKBACK,
            exit_policy: ExitPolicy::atr(1.0, 5.0, 3).with_trailing(1.0, 0.40),
            pass_criteria: PassCriteria {
                min_prob_pct: 60.0,
                min_rrr: Some(1.2),
                min_count: Some(15),
            },
        };
        let trend = Self {
            strategy: StrategyKind::TrendFollow,
            min_count: 15,
            strong_count: 30,
            min_prob_gatekeeper: 52.0,
            ..mean_reversion.clone()
        };

        match key {
            MarketKey::Thai => Self {
                return_mode: ReturnMode::CloseToClose,
                floor_pct: 1.0,
                min_prob_gatekeeper: 54.0,
                exit_policy: ExitPolicy::fixed(1.5, 3.5, 5),
                pass_criteria: PassCriteria {
                    min_prob_pct: 60.0,
                    min_rrr: Some(1.3),
                    min_count: Some(30),
                },
                ..mean_reversion
            },
            MarketKey::China | MarketKey::HongKong => mean_reversion,
            MarketKey::Us => Self {
                floor_pct: 0.6,
                allow_short: false,
                exit_policy: ExitPolicy::atr(1.0, 5.0, 5).with_trailing(1.0, 0.40),
                pass_criteria: PassCriteria {
                    min_prob_pct: 60.0,
                    min_rrr: Some(1.5),
                    min_count: Some(15),
                },
                ..trend
            },
            MarketKey::Taiwan => Self {
                floor_pct: 0.7,
                exit_policy: ExitPolicy::atr(1.0, 6.5, 10).with_trailing(1.0, 0.40),
                pass_criteria: PassCriteria {
                    min_prob_pct: 60.0,
                    min_rrr: Some(0.75),
                    min_count: Some(15),
                },
                ..trend
            },
            MarketKey::Metals15m | MarketKey::Metals30m => {
                let exit_policy = if key == MarketKey::Metals15m {
                    ExitPolicy::fixed(0.5, 1.0, 8)
                } else {
                    ExitPolicy::fixed(0.6, 1.2, 6)
                };
                Self {
                    return_mode: ReturnMode::CloseToClose,
                    floor_pct: 0.3,
                    min_prob_gatekeeper: 50.0,
                    exit_policy,
                    pass_criteria: PassCriteria {
                        min_prob_pct: 60.0,
                        min_rrr: None,
                        min_count: None,
                    },
                    ..mean_reversion
                }
            }
        }
    }

    pub fn is_trend(&self) -> bool {
        self.strategy == StrategyKind::TrendFollow
    }

    /// Threshold floor as a fraction of price.
    pub fn floor_fraction(&self) -> f64 {
        self.floor_pct / 100.0
    }

    /// Reject parameter combinations the engine cannot run with.
    pub fn validate(&self) -> Result<(), MarketError> {
        let invalid = |name: &'static str, reason: String| MarketError::InvalidParameter { name, reason };

        if !(self.multiplier > 0.0) {
            return Err(invalid("multiplier", format!("must be > 0, got {}", self.multiplier)));
        }
        if !(self.floor_pct >= 0.0) {
            return Err(invalid("floor_pct", format!("must be >= 0, got {}", self.floor_pct)));
        }
        if self.min_count == 0 || self.min_count > self.strong_count {
            return Err(invalid(
                "min_count",
                format!(
                    "must satisfy 0 < min_count <= strong_count ({} vs {})",
                    self.min_count, self.strong_count
                ),
            ));
        }
        if self.max_pattern_len == 0 {
            return Err(invalid("max_pattern_len", "must be >= 1".into()));
        }
        let exit = &self.exit_policy;
        if exit.max_hold == 0 {
            return Err(invalid("max_hold", "must be >= 1".into()));
        }
        if exit.use_atr && (exit.atr_sl <= 0.0 || exit.atr_tp <= 0.0) {
            return Err(invalid("atr_sl/atr_tp", "ATR multiples must be positive".into()));
        }
        if !exit.use_atr && (exit.sl_pct <= 0.0 || exit.tp_pct <= 0.0) {
            return Err(invalid("sl_pct/tp_pct", "fixed percents must be positive".into()));
        }
        if let Some(trail) = exit.trailing {
            if !(trail.distance > 0.0 && trail.distance < 1.0) {
                return Err(invalid(
                    "trail_distance",
                    format!("must be in (0, 1), got {}", trail.distance),
                ));
            }
            if trail.activate_pct < 0.0 {
                return Err(invalid("trail_activate", "must be >= 0".into()));
            }
        }
        Ok(())
    }
}
