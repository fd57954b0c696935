//! Pattern: a non-empty run of `+`/`-` signals, oldest first.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::signal::Signal;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must not be empty")]
    Empty,
    #[error("invalid pattern character '{0}' (expected '+' or '-')")]
    InvalidChar(char),
}

/// A streak signature such as `++-`.
///
/// Stored as its string form so it can key the conditional-return index
/// directly. Never contains `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern(String);

impl Pattern {
    /// Build from signals. Returns `None` if the slice is empty or contains a neutral bar.
    pub fn from_signals(signals: &[Signal]) -> Option<Self> {
        if signals.is_empty() || signals.iter().any(|s| s.is_neutral()) {
            return None;
        }
        Some(Self(signals.iter().map(|s| s.as_char()).collect()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The newest signal in the pattern.
    pub fn last_signal(&self) -> Signal {
        match self.0.as_bytes().last() {
            Some(b'+') => Signal::Up,
            _ => Signal::Down,
        }
    }

    /// Suffixes from longest to shortest: `A[0:], A[1:], …, A[len-1:]`.
    pub fn suffixes(&self) -> impl Iterator<Item = Pattern> + '_ {
        (0..self.0.len()).map(move |start| Pattern(self.0[start..].to_string()))
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PatternError::Empty);
        }
        if let Some(bad) = s.chars().find(|c| *c != '+' && *c != '-') {
            return Err(PatternError::InvalidChar(bad));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Pattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pattern> for String {
    fn from(p: Pattern) -> Self {
        p.0
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
