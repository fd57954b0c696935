//! Per-bar classification, trade direction and trend regime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of one bar's return against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// Return above the threshold (`+`).
    Up,
    /// Return below the negative threshold (`-`).
    Down,
    /// Inside the band, or inputs undefined (`.`). Breaks any streak.
    Neutral,
}

impl Signal {
    pub fn as_char(self) -> char {
        match self {
            Signal::Up => '+',
            Signal::Down => '-',
            Signal::Neutral => '.',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Signal::Up),
            '-' => Some(Signal::Down),
            '.' => Some(Signal::Neutral),
            _ => None,
        }
    }

    pub fn is_neutral(self) -> bool {
        self == Signal::Neutral
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Render a signal array as a `+-.` string (handy in logs and tests).
pub fn render_signals(signals: &[Signal]) -> String {
    signals.iter().map(|s| s.as_char()).collect()
}

/// Side of a simulated position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    /// Trade-log label of the forecast: UP for long, DOWN for short.
    pub fn forecast_label(self) -> &'static str {
        match self {
            Direction::Long => "UP",
            Direction::Short => "DOWN",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Trend regime at a bar: close above or below its 50-bar SMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Bull,
    Bear,
}

impl Regime {
    /// `Bull` iff `close > sma`. An undefined SMA compares false and yields `Bear`.
    pub fn classify(close: f64, sma: f64) -> Self {
        if close > sma {
            Regime::Bull
        } else {
            Regime::Bear
        }
    }
}
