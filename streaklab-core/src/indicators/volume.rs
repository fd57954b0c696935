//! Volume ratio: last bar's volume over the mean of the bars before it.

use crate::domain::Bar;

/// Bars averaged in the denominator.
pub const VOLUME_WINDOW: usize = 20;

/// `volume[-1] / mean(volume[-(window+1)..-1])`.
///
/// `None` with fewer than `window + 1` bars or a zero-volume history.
pub fn volume_ratio(bars: &[Bar], window: usize) -> Option<f64> {
    let (last, history) = bars.split_last()?;
    if window == 0 || history.len() < window {
        return None;
    }
    let prior = &history[history.len() - window..];
    let mean = prior.iter().map(|b| b.volume as f64).sum::<f64>() / window as f64;
    (mean > 0.0).then(|| last.volume as f64 / mean)
}
