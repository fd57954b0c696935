//! The signature of the streak that ends at the newest bar.

use crate::domain::{Pattern, Signal};

/// Walk back from the last signal for at most `lookback` bars, stopping at the
/// first neutral. `None` when the newest bar is neutral (or there are no bars).
pub fn active_pattern(signals: &[Signal], lookback: usize) -> Option<Pattern> {
    let run = signals
        .iter()
        .rev()
        .take(lookback)
        .take_while(|s| !s.is_neutral())
        .count();
    Pattern::from_signals(&signals[signals.len() - run..])
}
