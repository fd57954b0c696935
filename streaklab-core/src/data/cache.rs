//! Parquet bar cache.
//!
//! Layout: `{cache_dir}/{interval}/symbol={SYMBOL}.parquet` with a JSON
//! sidecar `symbol={SYMBOL}.meta.json` next to it.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity validation on load (schema check, row count > 0)
//! - Corrupt files are quarantined (`.quarantined`) and reported as a miss

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::provider::{DataError, DataSource};
use crate::domain::{Bar, DatasetHash};
use crate::market::Interval;

const COLUMNS: [&str; 6] = ["timestamp_ms", "open", "high", "low", "close", "volume"];

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub interval: Interval,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub bar_count: usize,
    pub data_hash: DatasetHash,
    pub source: DataSource,
    pub cached_at: NaiveDateTime,
}

/// How well the cache covers a requested date range.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResult {
    NotCached,
    FullyCovered,
    PartiallyCovered {
        cached_start: NaiveDate,
        cached_end: NaiveDate,
    },
}

pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn interval_dir(&self, interval: Interval) -> PathBuf {
        self.cache_dir.join(interval.as_str())
    }

    fn data_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.interval_dir(interval)
            .join(format!("symbol={symbol}.parquet"))
    }

    fn meta_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.interval_dir(interval)
            .join(format!("symbol={symbol}.meta.json"))
    }

    /// Replace the cached series for a symbol.
    pub fn write(
        &self,
        symbol: &str,
        interval: Interval,
        bars: &[Bar],
        source: DataSource,
    ) -> Result<(), DataError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(DataError::CacheError("no bars to cache".into()));
        };

        let dir = self.interval_dir(interval);
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let path = self.data_path(symbol, interval);
        let tmp_path = path.with_extension("parquet.tmp");
        let mut df = bars_to_dataframe(bars)?;
        write_parquet(&mut df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            interval,
            start: first.timestamp,
            end: last.timestamp,
            bar_count: bars.len(),
            data_hash: DatasetHash::of_bars(bars),
            source,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol, interval), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        log::debug!("cached {} bars for {symbol} at {}", bars.len(), path.display());
        Ok(())
    }

    /// Load the cached series for a symbol, sorted by timestamp.
    pub fn load(&self, symbol: &str, interval: Interval) -> Result<Vec<Bar>, DataError> {
        let path = self.data_path(symbol, interval);
        if !path.exists() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        match load_and_validate_parquet(&path) {
            Ok(mut bars) => {
                bars.sort_by_key(|b| b.timestamp);
                Ok(bars)
            }
            Err(e) => {
                log::warn!("quarantining corrupt cache file {}: {e}", path.display());
                let _ = fs::rename(&path, path.with_extension("parquet.quarantined"));
                let _ = fs::remove_file(self.meta_path(symbol, interval));
                Err(DataError::NoCachedData {
                    symbol: symbol.to_string(),
                })
            }
        }
    }

    pub fn get_meta(&self, symbol: &str, interval: Interval) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol, interval)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn covers_range(
        &self,
        symbol: &str,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoverageResult {
        match self.get_meta(symbol, interval) {
            None => CoverageResult::NotCached,
            Some(meta) if meta.start.date() <= start && meta.end.date() >= end => {
                CoverageResult::FullyCovered
            }
            Some(meta) => CoverageResult::PartiallyCovered {
                cached_start: meta.start.date(),
                cached_end: meta.end.date(),
            },
        }
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn bars_to_dataframe(bars: &[Bar]) -> Result<DataFrame, DataError> {
    let timestamps: Vec<i64> = bars
        .iter()
        .map(|b| b.timestamp.and_utc().timestamp_millis())
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("timestamp_ms".into(), timestamps),
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }
    for col_name in COLUMNS {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!("missing column '{col_name}'")));
        }
    }

    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, DataError> {
    let column = |name: &str| {
        df.column(name)
            .map_err(|e| DataError::ParquetError(format!("column read: {e}")))
    };
    let type_err = |name: &str, e: PolarsError| DataError::ParquetError(format!("{name} column type: {e}"));

    let ts_col = column("timestamp_ms")?;
    let ts_ca = ts_col.i64().map_err(|e| type_err("timestamp_ms", e))?;
    let open_col = column("open")?;
    let open_ca = open_col.f64().map_err(|e| type_err("open", e))?;
    let high_col = column("high")?;
    let high_ca = high_col.f64().map_err(|e| type_err("high", e))?;
    let low_col = column("low")?;
    let low_ca = low_col.f64().map_err(|e| type_err("low", e))?;
    let close_col = column("close")?;
    let close_ca = close_col.f64().map_err(|e| type_err("close", e))?;
    let vol_col = column("volume")?;
    let vol_ca = vol_col.u64().map_err(|e| type_err("volume", e))?;

    let n = df.height();
    let mut bars = Vec::with_capacity(n);
    for i in 0..n {
        let ms = ts_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null timestamp at row {i}")))?;
        let timestamp = DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| DataError::ParquetError(format!("timestamp out of range at row {i}")))?;

        bars.push(Bar {
            timestamp,
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(0),
        });
    }
    Ok(bars)
}
