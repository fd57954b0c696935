//! Append-only trade log, one CSV per market group.
//!
//! Columns: `date, symbol, exchange, group, forecast, actual, correct, prob,
//! actual_return, trader_return, hold_days, exit_reason, pattern`.
//! Every trade is written and flushed as a single line under a lock, so
//! concurrent symbol workers never interleave partial rows.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use streaklab_core::domain::Trade;
use streaklab_core::market::{Interval, MarketDescriptor, MarketKey};

pub const TRADE_LOG_HEADER: [&str; 13] = [
    "date",
    "symbol",
    "exchange",
    "group",
    "forecast",
    "actual",
    "correct",
    "prob",
    "actual_return",
    "trader_return",
    "hold_days",
    "exit_reason",
    "pattern",
];

#[derive(Debug, Error)]
pub enum TradeLogError {
    #[error("trade log I/O on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("trade log CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One trade-log line. Numeric columns read back as `None` when empty or
/// unparseable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLogRow {
    pub date: String,
    pub symbol: String,
    pub exchange: String,
    pub group: String,
    /// `UP` or `DOWN`.
    pub forecast: String,
    pub actual: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub correct: Option<u8>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub prob: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub actual_return: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub trader_return: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub hold_days: Option<usize>,
    pub exit_reason: String,
    pub pattern: String,
}

impl TradeLogRow {
    pub fn from_trade(trade: &Trade, market: &MarketDescriptor) -> Self {
        let date = match market.key.interval() {
            Interval::Daily => trade.entry_time.format("%Y-%m-%d").to_string(),
            Interval::Minutes15 | Interval::Minutes30 => {
                trade.entry_time.format("%Y-%m-%d %H:%M").to_string()
            }
        };
        Self {
            date,
            symbol: trade.symbol.clone(),
            exchange: market.key.exchange().to_string(),
            group: market.key.as_str().to_string(),
            forecast: trade.direction.forecast_label().to_string(),
            actual: trade.actual_label().to_string(),
            correct: Some(u8::from(trade.is_correct())),
            prob: Some(trade.forecast_probability),
            actual_return: Some(trade.realised_return),
            trader_return: Some(trade.trader_return),
            hold_days: Some(trade.hold_bars),
            exit_reason: trade.exit_reason.as_str().to_string(),
            pattern: trade.pattern.to_string(),
        }
    }
}

/// `{output_dir}/trade_log_{group}.csv`
pub fn log_path(output_dir: &Path, market: MarketKey) -> PathBuf {
    output_dir.join(format!("trade_log_{}.csv", market.as_str()))
}

/// Shared appender. Opening an existing log keeps its contents; the header is
/// written only to a new or empty file.
pub struct TradeLogWriter {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
}

impl TradeLogWriter {
    pub fn open(path: &Path) -> Result<Self, TradeLogError> {
        let io_err = |source| TradeLogError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let has_content = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if !has_content {
            writer.write_record(TRADE_LOG_HEADER)?;
            writer.flush().map_err(io_err)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, row: &TradeLogRow) -> Result<(), TradeLogError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_line(&mut writer, row)
    }

    /// Append all trades of one symbol, keeping them contiguous in the file.
    pub fn append_trades(
        &self,
        trades: &[Trade],
        market: &MarketDescriptor,
    ) -> Result<usize, TradeLogError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        for trade in trades {
            self.write_line(&mut writer, &TradeLogRow::from_trade(trade, market))?;
        }
        Ok(trades.len())
    }

    fn write_line(
        &self,
        writer: &mut csv::Writer<File>,
        row: &TradeLogRow,
    ) -> Result<(), TradeLogError> {
        writer.serialize(row)?;
        writer.flush().map_err(|source| TradeLogError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Rows read back from a log, plus how many lines were unusable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeLog {
    pub rows: Vec<TradeLogRow>,
    pub skipped: usize,
}

/// Read a trade log. Malformed lines are skipped with a warning.
pub fn read_trade_log(path: &Path) -> Result<TradeLog, TradeLogError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut log = TradeLog::default();
    for (line, row) in reader.deserialize::<TradeLogRow>().enumerate() {
        match row {
            Ok(row) => log.rows.push(row),
            Err(e) => {
                log::warn!("{}: skipping line {}: {e}", path.display(), line + 2);
                log.skipped += 1;
            }
        }
    }
    Ok(log)
}
