//! Download orchestrator: fetch → validate → cache for a list of symbols.

use chrono::NaiveDate;

use super::cache::{CoverageResult, ParquetCache};
use super::ingest;
use super::provider::{DataError, DataProvider, DownloadProgress};
use crate::market::Interval;

#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest {
    pub interval: Interval,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Refetch even when the cache already covers the range.
    pub force: bool,
}

#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Download symbols one by one. A failing symbol is recorded and skipped;
/// a tripped circuit breaker fails the rest of the batch without requests.
pub fn download_symbols(
    provider: &dyn DataProvider,
    cache: &ParquetCache,
    symbols: &[String],
    request: DownloadRequest,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let total = symbols.len();
    let mut succeeded = 0;
    let mut errors: Vec<(String, DataError)> = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        if !request.force {
            let coverage = cache.covers_range(symbol, request.interval, request.start, request.end);
            if coverage == CoverageResult::FullyCovered {
                let cached = cache
                    .get_meta(symbol, request.interval)
                    .map_or(0, |m| m.bar_count);
                progress.on_complete(symbol, i, total, &Ok(cached));
                succeeded += 1;
                continue;
            }
        }

        let result = download_single(provider, cache, symbol, request);
        progress.on_complete(symbol, i, total, &result);
        match result {
            Ok(_) => succeeded += 1,
            Err(e) => errors.push((symbol.clone(), e)),
        }

        if !provider.is_available() {
            for sym in &symbols[i + 1..] {
                errors.push((sym.clone(), DataError::CircuitBreakerTripped));
            }
            break;
        }
    }

    let failed = errors.len();
    progress.on_batch_complete(succeeded, failed, total);
    DownloadSummary {
        total,
        succeeded,
        failed,
        errors,
    }
}

/// Fetch, validate and cache one symbol; returns the number of bars cached.
pub fn download_single(
    provider: &dyn DataProvider,
    cache: &ParquetCache,
    symbol: &str,
    request: DownloadRequest,
) -> Result<usize, DataError> {
    let fetched = provider.fetch(symbol, request.interval, request.start, request.end)?;
    let report = ingest::validate(symbol, fetched.bars)?;
    cache.write(symbol, request.interval, &report.bars, fetched.source)?;
    Ok(report.bars.len())
}
