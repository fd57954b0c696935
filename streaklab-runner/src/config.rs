//! Serializable run configuration.
//!
//! A run is one market group backtested with that market's preset plus any
//! parameter overrides. The TOML file and the CLI flags both land in a
//! [`RunConfig`]; flags are merged on top of the file.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use streaklab_core::data::{DataError, Universe};
use streaklab_core::domain::RunId;
use streaklab_core::engine::{BacktestOptions, EntryWindow};
use streaklab_core::market::{Interval, MarketDescriptor, MarketError, MarketKey, TrailingStop};

use crate::data_loader::LoadOptions;

/// Trailing-stop values used when an override turns the trail on for a
/// market whose preset has none.
const DEFAULT_TRAIL: TrailingStop = TrailingStop {
    activate_pct: 1.0,
    distance: 0.40,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid market parameters: {0}")]
    Market(#[from] MarketError),

    #[error("universe error: {0}")]
    Universe(#[from] DataError),

    #[error("no symbols configured for market '{0}'")]
    NoSymbols(MarketKey),

    #[error("--bars and --full are mutually exclusive")]
    ConflictingWindow,

    #[error("failed to hash config: {0}")]
    Hash(#[from] serde_json::Error),
}

/// Numeric overrides on top of a market preset. Unset fields keep the preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamOverrides {
    pub sl_pct: Option<f64>,
    pub tp_pct: Option<f64>,
    pub atr_sl: Option<f64>,
    pub atr_tp: Option<f64>,
    pub use_atr: Option<bool>,
    pub max_hold: Option<usize>,
    pub trail_activate: Option<f64>,
    pub trail_distance: Option<f64>,
    /// Gatekeeper probability floor, percent.
    pub min_prob: Option<f64>,
    pub min_count: Option<usize>,
    pub strong_count: Option<usize>,
    pub floor_pct: Option<f64>,
    pub multiplier: Option<f64>,
}

impl ParamOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fields set in `other` win.
    pub fn merged_with(&self, other: &ParamOverrides) -> ParamOverrides {
        ParamOverrides {
            sl_pct: other.sl_pct.or(self.sl_pct),
            tp_pct: other.tp_pct.or(self.tp_pct),
            atr_sl: other.atr_sl.or(self.atr_sl),
            atr_tp: other.atr_tp.or(self.atr_tp),
            use_atr: other.use_atr.or(self.use_atr),
            max_hold: other.max_hold.or(self.max_hold),
            trail_activate: other.trail_activate.or(self.trail_activate),
            trail_distance: other.trail_distance.or(self.trail_distance),
            min_prob: other.min_prob.or(self.min_prob),
            min_count: other.min_count.or(self.min_count),
            strong_count: other.strong_count.or(self.strong_count),
            floor_pct: other.floor_pct.or(self.floor_pct),
            multiplier: other.multiplier.or(self.multiplier),
        }
    }

    /// Write the set fields into `market`.
    pub fn apply(&self, market: &mut MarketDescriptor) {
        let policy = &mut market.exit_policy;
        if let Some(v) = self.sl_pct {
            policy.sl_pct = v;
        }
        if let Some(v) = self.tp_pct {
            policy.tp_pct = v;
        }
        if let Some(v) = self.atr_sl {
            policy.atr_sl = v;
        }
        if let Some(v) = self.atr_tp {
            policy.atr_tp = v;
        }
        if let Some(v) = self.use_atr {
            policy.use_atr = v;
        }
        if let Some(v) = self.max_hold {
            policy.max_hold = v;
        }
        if self.trail_activate.is_some() || self.trail_distance.is_some() {
            let mut trail = policy.trailing.unwrap_or(DEFAULT_TRAIL);
            if let Some(v) = self.trail_activate {
                trail.activate_pct = v;
            }
            if let Some(v) = self.trail_distance {
                trail.distance = v;
            }
            policy.trailing = Some(trail);
        }

        if let Some(v) = self.min_prob {
            market.min_prob_gatekeeper = v;
        }
        if let Some(v) = self.min_count {
            market.min_count = v;
        }
        if let Some(v) = self.strong_count {
            market.strong_count = v;
        }
        if let Some(v) = self.floor_pct {
            market.floor_pct = v;
        }
        if let Some(v) = self.multiplier {
            market.multiplier = v;
        }
    }
}

/// Default history fetched when no start date is configured. Intraday
/// history on the public chart endpoint only reaches back about 60 days.
fn default_lookback(interval: Interval) -> chrono::Duration {
    match interval {
        Interval::Daily => chrono::Duration::days(365 * 10),
        Interval::Minutes15 | Interval::Minutes30 => chrono::Duration::days(59),
    }
}

/// Data locations and the fetch window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Parquet cache root.
    pub dir: PathBuf,
    /// Optional directory of `{SYMBOL}.csv` files used when the cache misses.
    pub csv_dir: Option<PathBuf>,
    /// Universe TOML; built-in lists when unset.
    pub universe: Option<PathBuf>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub offline: bool,
    pub synthetic: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            csv_dir: None,
            universe: None,
            start: None,
            end: None,
            offline: false,
            synthetic: false,
        }
    }
}

/// Configuration for one `run` of a market group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub market: MarketKey,

    /// Restrict the run to these symbols instead of the universe list.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,

    /// Enter only on the last N bars. `None` backtests from the warmup.
    #[serde(default)]
    pub bars: Option<usize>,

    /// Skip to the bar after each exit.
    #[serde(default)]
    pub fast: bool,

    /// Worker threads; rayon's default when unset.
    #[serde(default)]
    pub jobs: Option<usize>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub overrides: ParamOverrides,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

impl RunConfig {
    /// Defaults for a market: preset parameters, built-in universe, full window.
    pub fn for_market(market: MarketKey) -> Self {
        Self {
            market,
            symbols: None,
            bars: None,
            fast: false,
            jobs: None,
            output_dir: default_output_dir(),
            data: DataConfig::default(),
            overrides: ParamOverrides::default(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Preset with overrides applied, validated.
    pub fn market_descriptor(&self) -> Result<MarketDescriptor, ConfigError> {
        let mut market = MarketDescriptor::preset(self.market);
        self.overrides.apply(&mut market);
        market.validate()?;
        Ok(market)
    }

    /// Symbols to run: the explicit list, else the universe file, else the
    /// built-in list for the market.
    pub fn resolve_symbols(&self) -> Result<Vec<String>, ConfigError> {
        let symbols = match (&self.symbols, &self.data.universe) {
            (Some(list), _) => list.clone(),
            (None, Some(path)) => Universe::from_file(path)?.symbols(self.market).to_vec(),
            (None, None) => Universe::defaults().symbols(self.market).to_vec(),
        };
        if symbols.is_empty() {
            return Err(ConfigError::NoSymbols(self.market));
        }
        Ok(symbols)
    }

    /// Loader options; the window ends at `today` unless configured.
    pub fn load_options(&self, today: NaiveDate) -> LoadOptions {
        let interval = self.market.interval();
        let end = self.data.end.unwrap_or(today);
        LoadOptions {
            interval,
            start: self.data.start.unwrap_or(end - default_lookback(interval)),
            end,
            offline: self.data.offline,
            synthetic: self.data.synthetic,
            force: false,
        }
    }

    /// Apply the `--bars N` / `--full` pair of flags.
    pub fn set_window(&mut self, bars: Option<usize>, full: bool) -> Result<(), ConfigError> {
        match (bars, full) {
            (Some(_), true) => Err(ConfigError::ConflictingWindow),
            (Some(n), false) => {
                self.bars = Some(n);
                Ok(())
            }
            (None, true) => {
                self.bars = None;
                Ok(())
            }
            (None, false) => Ok(()),
        }
    }

    pub fn backtest_options(&self) -> BacktestOptions {
        BacktestOptions {
            fast: self.fast,
            window: self.bars.map_or(EntryWindow::Full, EntryWindow::LastBars),
        }
    }

    /// Hash of everything that changes results: the effective market
    /// parameters, the entry window and the symbol selection.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        #[derive(Serialize)]
        struct Identity<'a> {
            market: MarketDescriptor,
            symbols: &'a Option<Vec<String>>,
            bars: Option<usize>,
            fast: bool,
            start: Option<NaiveDate>,
            end: Option<NaiveDate>,
            synthetic: bool,
        }
        let identity = Identity {
            market: self.market_descriptor()?,
            symbols: &self.symbols,
            bars: self.bars,
            fast: self.fast,
            start: self.data.start,
            end: self.data.end,
            synthetic: self.data.synthetic,
        };
        Ok(RunId::from_config(&identity)?)
    }
}
