//! Bar loading for the runner.
//!
//! Resolution order for one symbol:
//! 1. Parquet cache (unless `force`)
//! 2. Network provider (unless `offline`), validated and written to the cache
//! 3. CSV directory, if configured
//! 4. Synthetic bars, if `synthetic` is set (tagged as such)
//! 5. Otherwise the symbol fails with a `LoadError`
//!
//! A failure here is per-symbol; the group runner logs it and moves on.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use streaklab_core::data::{ingest, CsvProvider, DataError, DataProvider, DataSource, ParquetCache};
use streaklab_core::domain::{Bar, DatasetHash};
use streaklab_core::market::Interval;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no cached data for '{symbol}' and network access is disabled (use --synthetic for synthetic data)")]
    NoCachedDataOffline { symbol: String },

    #[error("no data for '{symbol}': {reason}")]
    NoData { symbol: String, reason: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub interval: Interval,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic bars when nothing else has data.
    pub synthetic: bool,
    /// Refetch even when cached.
    pub force: bool,
}

/// One symbol's validated bars with provenance.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub source: DataSource,
    pub dataset_hash: DatasetHash,
}

impl LoadedBars {
    fn new(symbol: &str, bars: Vec<Bar>, source: DataSource) -> Self {
        Self {
            symbol: symbol.to_string(),
            dataset_hash: DatasetHash::of_bars(&bars),
            bars,
            source,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

/// Everything a loader needs to resolve symbols. Shared across worker threads.
pub struct BarLoader<'a> {
    pub cache: &'a ParquetCache,
    pub provider: Option<&'a dyn DataProvider>,
    pub csv: Option<&'a CsvProvider>,
    pub options: LoadOptions,
}

impl BarLoader<'_> {
    pub fn load(&self, symbol: &str) -> Result<LoadedBars, LoadError> {
        load_symbol(symbol, self.cache, self.provider, self.csv, &self.options)
    }
}

pub fn load_symbol(
    symbol: &str,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
    csv: Option<&CsvProvider>,
    opts: &LoadOptions,
) -> Result<LoadedBars, LoadError> {
    let mut last_error: Option<DataError> = None;

    // Step 1: cache
    if !opts.force {
        match cache.load(symbol, opts.interval) {
            Ok(bars) => {
                let bars = clip(bars, opts.start, opts.end);
                if !bars.is_empty() {
                    return Ok(LoadedBars::new(symbol, bars, DataSource::Cache));
                }
            }
            Err(DataError::NoCachedData { .. }) => {}
            Err(e) => last_error = Some(e),
        }
    }

    // Step 2: network provider
    if let Some(prov) = provider.filter(|p| !opts.offline && p.is_available()) {
        match fetch_validated(prov, symbol, opts) {
            Ok((bars, source)) => {
                if let Err(e) = cache.write(symbol, opts.interval, &bars, source) {
                    log::warn!("{symbol}: fetched but not cached: {e}");
                }
                return Ok(LoadedBars::new(symbol, bars, source));
            }
            Err(e) => {
                log::warn!("{symbol}: {} fetch failed: {e}", prov.name());
                last_error = Some(e);
            }
        }
    }

    // Step 3: CSV directory
    if let Some(csv) = csv.filter(|c| c.is_available()) {
        match fetch_validated(csv, symbol, opts) {
            Ok((bars, source)) => return Ok(LoadedBars::new(symbol, bars, source)),
            Err(DataError::SymbolNotFound { .. }) => {}
            Err(e) => {
                log::warn!("{symbol}: CSV import failed: {e}");
                last_error = Some(e);
            }
        }
    }

    // Step 4: synthetic
    if opts.synthetic {
        log::warn!("{symbol}: generating synthetic bars; results are tagged synthetic");
        let bars = generate_synthetic_bars(symbol, opts.interval, opts.start, opts.end);
        return Ok(LoadedBars::new(symbol, bars, DataSource::Synthetic));
    }

    // Step 5: fail
    match last_error {
        Some(e) => Err(LoadError::NoData {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        }),
        None if opts.offline => Err(LoadError::NoCachedDataOffline {
            symbol: symbol.to_string(),
        }),
        None => Err(LoadError::NoData {
            symbol: symbol.to_string(),
            reason: "not cached and no provider available".into(),
        }),
    }
}

fn fetch_validated(
    provider: &dyn DataProvider,
    symbol: &str,
    opts: &LoadOptions,
) -> Result<(Vec<Bar>, DataSource), DataError> {
    let fetched = provider.fetch(symbol, opts.interval, opts.start, opts.end)?;
    let report = ingest::validate(symbol, fetched.bars)?;
    Ok((report.bars, fetched.source))
}

fn clip(bars: Vec<Bar>, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| (start..=end).contains(&b.date()))
        .collect()
}

fn bar_step(interval: Interval) -> Duration {
    match interval {
        Interval::Daily => Duration::days(1),
        Interval::Minutes15 => Duration::minutes(15),
        Interval::Minutes30 => Duration::minutes(30),
    }
}

/// Deterministic random-walk bars for development runs.
///
/// Seeded from the symbol name, so the same symbol always yields the same
/// series. Weekends are skipped.
pub fn generate_synthetic_bars(
    symbol: &str,
    interval: Interval,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Bar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let step = bar_step(interval);
    let scale = match interval {
        Interval::Daily => 1.0,
        Interval::Minutes15 | Interval::Minutes30 => 0.25,
    };

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current: NaiveDateTime = start.and_time(chrono::NaiveTime::MIN);
    let last = end.and_time(chrono::NaiveTime::MIN) + Duration::days(1);

    while current < last {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += step;
            continue;
        }

        let body: f64 = rng.gen_range(-0.03..0.03) * scale;
        let open = price * (1.0 + rng.gen_range(-0.004..0.004) * scale);
        let close = open * (1.0 + body);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01) * scale);
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01) * scale);
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            timestamp: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += step;
    }

    bars
}
