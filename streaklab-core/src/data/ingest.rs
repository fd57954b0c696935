//! Post-fetch validation: every series the engine sees has passed through here.

use super::provider::DataError;
use crate::domain::Bar;

/// Validated bars plus a count of what was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub bars: Vec<Bar>,
    /// Rows with a NaN/infinite OHLC field.
    pub dropped_missing: usize,
    /// Rows with non-positive prices or high below low.
    pub dropped_invalid: usize,
    /// Later rows sharing a timestamp with an earlier one.
    pub dropped_duplicates: usize,
}

impl IngestReport {
    pub fn dropped(&self) -> usize {
        self.dropped_missing + self.dropped_invalid + self.dropped_duplicates
    }
}

/// Sort ascending, drop unusable rows and duplicate timestamps. Gaps are left as-is.
///
/// Fails only when nothing usable remains.
pub fn validate(symbol: &str, mut bars: Vec<Bar>) -> Result<IngestReport, DataError> {
    let total = bars.len();

    let before = bars.len();
    bars.retain(|b| !b.has_missing_prices());
    let dropped_missing = before - bars.len();

    let before = bars.len();
    bars.retain(|b| b.open > 0.0 && b.close > 0.0 && b.high >= b.low);
    let dropped_invalid = before - bars.len();

    // Stable sort keeps the first occurrence of a duplicated timestamp first.
    bars.sort_by_key(|b| b.timestamp);
    let before = bars.len();
    bars.dedup_by_key(|b| b.timestamp);
    let dropped_duplicates = before - bars.len();

    let report = IngestReport {
        bars,
        dropped_missing,
        dropped_invalid,
        dropped_duplicates,
    };
    if report.dropped() > 0 {
        log::warn!(
            "{symbol}: dropped {} of {total} bars ({} missing prices, {} invalid, {} duplicate timestamps)",
            report.dropped(),
            report.dropped_missing,
            report.dropped_invalid,
            report.dropped_duplicates
        );
    }
    if report.bars.is_empty() {
        return Err(DataError::ValidationError(format!(
            "{symbol}: no usable bars out of {total}"
        )));
    }
    Ok(report)
}
