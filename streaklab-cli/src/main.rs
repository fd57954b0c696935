//! StreakLab CLI: download, run, forecast and summarize commands.
//!
//! Commands:
//! - `download` : fetch a market group's bars from Yahoo Finance into the Parquet cache
//! - `run` : walk-forward backtest of a market group, appending to its trade log
//! - `forecast` : latest forecast per symbol of a market group
//! - `summarize` : rebuild the per-symbol metrics table from a trade log

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use streaklab_core::data::{
    download_symbols, CircuitBreaker, CsvProvider, DataProvider, DownloadRequest, ParquetCache,
    StdoutProgress, YahooProvider,
};
use streaklab_core::market::{MarketDescriptor, MarketKey};
use streaklab_runner::{
    log_path, read_trade_log, render_table, write_metrics_csv, BarLoader, ForecastStatus,
    GroupReport, GroupRunner, ParamOverrides, RunConfig, SymbolForecast, SymbolMetrics,
    TradeLogWriter,
};

#[derive(Parser)]
#[command(
    name = "streaklab",
    about = "StreakLab CLI: streak-pattern forecasting and walk-forward backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a market group's bars and cache them as Parquet.
    Download {
        /// Market group: thai, us, china, hk, taiwan, metals15m, metals30m.
        #[arg(long)]
        group: String,

        /// Symbols to download. Defaults to the group's universe.
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 10 years ago (59 days for intraday).
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Universe TOML with per-market symbol lists.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Walk-forward backtest of a market group.
    Run {
        /// Market group. Overrides the config file's market.
        #[arg(long)]
        group: Option<String>,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Enter only on the last N bars; earlier history still feeds the statistics.
        #[arg(long, conflicts_with = "full")]
        bars: Option<usize>,

        /// Backtest from the warmup boundary.
        #[arg(long, default_value_t = false)]
        full: bool,

        /// Skip to the bar after each exit instead of entering on every bar.
        #[arg(long, default_value_t = false)]
        fast: bool,

        /// Worker threads. Defaults to one per core.
        #[arg(long)]
        jobs: Option<usize>,

        /// Output directory for trade logs and metrics. Defaults to ./results.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Latest forecast for every symbol of a market group.
    Forecast {
        /// Market group. Overrides the config file's market.
        #[arg(long)]
        group: Option<String>,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print forecasts as JSON lines instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Rebuild the per-symbol metrics table from a trade log.
    Summarize {
        /// Trade log CSV.
        #[arg(long)]
        log: PathBuf,

        /// Market group for the pass criteria. Defaults to the log's group column.
        #[arg(long)]
        group: Option<String>,

        /// Also write the table as CSV.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Where bars come from.
#[derive(Args)]
struct DataArgs {
    /// Comma-separated symbols. Defaults to the group's universe.
    #[arg(long, value_delimiter = ',')]
    symbols: Option<Vec<String>>,

    /// Cache directory. Defaults to ./data.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory of {SYMBOL}.csv files used when the cache misses.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Universe TOML with per-market symbol lists.
    #[arg(long)]
    universe: Option<PathBuf>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Offline mode: no network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic data as a last-resort fallback.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

/// Parameter overrides on top of the market preset.
#[derive(Args)]
struct OverrideArgs {
    /// Fixed stop-loss, percent of entry.
    #[arg(long)]
    sl_pct: Option<f64>,
    /// Fixed take-profit, percent of entry.
    #[arg(long)]
    tp_pct: Option<f64>,
    /// Stop-loss in ATR multiples.
    #[arg(long)]
    atr_sl: Option<f64>,
    /// Take-profit in ATR multiples.
    #[arg(long)]
    atr_tp: Option<f64>,
    /// Use ATR brackets (true) or fixed percentages (false).
    #[arg(long)]
    use_atr: Option<bool>,
    /// Maximum holding period in bars.
    #[arg(long)]
    max_hold: Option<usize>,
    /// Closing profit (percent) that arms the trailing stop.
    #[arg(long)]
    trail_activate: Option<f64>,
    /// Fraction of the open profit given back before the trail exits.
    #[arg(long)]
    trail_distance: Option<f64>,
    /// Gatekeeper probability floor, percent.
    #[arg(long)]
    min_prob: Option<f64>,
    /// Minimum matches for a fallback pattern.
    #[arg(long)]
    min_count: Option<usize>,
    /// Minimum matches for a strong pattern.
    #[arg(long)]
    strong_count: Option<usize>,
    /// Threshold floor, percent.
    #[arg(long)]
    floor_pct: Option<f64>,
    /// Threshold volatility multiplier.
    #[arg(long)]
    multiplier: Option<f64>,
}

impl From<OverrideArgs> for ParamOverrides {
    fn from(a: OverrideArgs) -> Self {
        ParamOverrides {
            sl_pct: a.sl_pct,
            tp_pct: a.tp_pct,
            atr_sl: a.atr_sl,
            atr_tp: a.atr_tp,
            use_atr: a.use_atr,
            max_hold: a.max_hold,
            trail_activate: a.trail_activate,
            trail_distance: a.trail_distance,
            min_prob: a.min_prob,
            min_count: a.min_count,
            strong_count: a.strong_count,
            floor_pct: a.floor_pct,
            multiplier: a.multiplier,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            group,
            symbols,
            start,
            end,
            force,
            universe,
            data_dir,
        } => run_download(&group, symbols, start, end, force, universe, data_dir),
        Commands::Run {
            group,
            config,
            bars,
            full,
            fast,
            jobs,
            output_dir,
            data,
            overrides,
        } => {
            let mut run_config = build_config(config, group, data, overrides)?;
            run_config.set_window(bars, full)?;
            run_config.fast |= fast;
            if jobs.is_some() {
                run_config.jobs = jobs;
            }
            if let Some(dir) = output_dir {
                run_config.output_dir = dir;
            }
            run_group(&run_config)
        }
        Commands::Forecast {
            group,
            config,
            json,
            data,
            overrides,
        } => {
            let run_config = build_config(config, group, data, overrides)?;
            run_forecast(&run_config, json)
        }
        Commands::Summarize { log, group, output } => {
            run_summarize(&log, group.as_deref(), output.as_deref())
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// TOML file (if any) with flags layered on top.
fn build_config(
    config_path: Option<PathBuf>,
    group: Option<String>,
    data: DataArgs,
    overrides: OverrideArgs,
) -> Result<RunConfig> {
    let group: Option<MarketKey> = group.as_deref().map(str::parse).transpose()?;

    let mut config = match (&config_path, group) {
        (Some(path), _) => RunConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        (None, Some(market)) => RunConfig::for_market(market),
        (None, None) => bail!("one of --group or --config is required"),
    };
    if let Some(market) = group {
        config.market = market;
    }

    if data.symbols.is_some() {
        config.symbols = data.symbols;
    }
    if let Some(dir) = data.data_dir {
        config.data.dir = dir;
    }
    if data.csv_dir.is_some() {
        config.data.csv_dir = data.csv_dir;
    }
    if data.universe.is_some() {
        config.data.universe = data.universe;
    }
    if let Some(s) = data.start.as_deref() {
        config.data.start = Some(parse_date(s)?);
    }
    if let Some(s) = data.end.as_deref() {
        config.data.end = Some(parse_date(s)?);
    }
    config.data.offline |= data.offline;
    config.data.synthetic |= data.synthetic;

    config.overrides = config.overrides.merged_with(&overrides.into());
    Ok(config)
}

fn network_provider(config: &RunConfig) -> Result<Option<YahooProvider>> {
    if config.data.offline {
        return Ok(None);
    }
    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    Ok(Some(YahooProvider::new(circuit_breaker)?))
}

fn run_download(
    group: &str,
    symbols: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    force: bool,
    universe: Option<PathBuf>,
    data_dir: PathBuf,
) -> Result<()> {
    let mut config = RunConfig::for_market(group.parse()?);
    if !symbols.is_empty() {
        config.symbols = Some(symbols);
    }
    config.data.universe = universe;
    config.data.start = start.as_deref().map(parse_date).transpose()?;
    config.data.end = end.as_deref().map(parse_date).transpose()?;

    let symbols = config.resolve_symbols()?;
    let window = config.load_options(today());
    let request = DownloadRequest {
        interval: window.interval,
        start: window.start,
        end: window.end,
        force,
    };

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker)?;
    let cache = ParquetCache::new(data_dir);
    let progress = StdoutProgress;

    let summary = download_symbols(&provider, &cache, &symbols, request, &progress);

    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_group(config: &RunConfig) -> Result<()> {
    let market = config.market_descriptor()?;
    let symbols = config.resolve_symbols()?;
    let run_id = config.run_id()?;
    log::info!("run {} for {} ({} symbols)", run_id.short(), config.market, symbols.len());

    let cache = ParquetCache::new(&config.data.dir);
    let provider = network_provider(config)?;
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);
    let csv = config.data.csv_dir.as_ref().map(CsvProvider::new);
    let loader = BarLoader {
        cache: &cache,
        provider: provider_ref,
        csv: csv.as_ref(),
        options: config.load_options(today()),
    };

    let log_file = log_path(&config.output_dir, config.market);
    let writer = TradeLogWriter::open(&log_file)
        .with_context(|| format!("Failed to open trade log {}", log_file.display()))?;

    let mut runner = GroupRunner::new(market.clone(), config.backtest_options()).with_trade_log(&writer);
    if let Some(jobs) = config.jobs {
        runner = runner.with_jobs(jobs);
    }
    let report = runner.run(&symbols, |s| loader.load(s))?;

    let metrics = report.metrics();
    let metrics_file = config
        .output_dir
        .join(format!("metrics_{}.csv", config.market.as_str()));
    write_metrics_csv(&metrics_file, &metrics)?;
    let manifest_file = config
        .output_dir
        .join(format!("run_{}.json", config.market.as_str()));
    write_manifest(&manifest_file, run_id.to_string(), &market, &report)?;

    print_run_summary(config, run_id.short(), &report);
    println!("{}", render_table(&metrics));
    println!("Trade log:  {}", log_file.display());
    println!("Metrics:    {}", metrics_file.display());
    println!("Manifest:   {}", manifest_file.display());
    Ok(())
}

fn write_manifest(
    path: &Path,
    run_id: String,
    market: &MarketDescriptor,
    report: &GroupReport,
) -> Result<()> {
    let datasets: Vec<_> = report
        .symbols
        .iter()
        .map(|s| {
            serde_json::json!({
                "symbol": s.symbol,
                "source": s.source.as_str(),
                "dataset_hash": s.dataset_hash.to_string(),
                "bars": s.bar_count,
                "trades": s.outcome.trades.len(),
            })
        })
        .collect();
    let manifest = serde_json::json!({
        "run_id": run_id,
        "market": market,
        "datasets": datasets,
        "failures": report.failures,
        "cancelled": report.cancelled,
        "synthetic": report.has_synthetic(),
    });
    let content = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write manifest {}", path.display()))?;
    Ok(())
}

fn print_run_summary(config: &RunConfig, run_id: &str, report: &GroupReport) {
    println!();
    println!("=== Run Result ===");
    println!("Group:      {}", config.market);
    println!("Run id:     {run_id}");
    match config.bars {
        Some(n) => println!("Window:     last {n} bars"),
        None => println!("Window:     full"),
    }
    println!("Mode:       {}", if config.fast { "fast" } else { "every bar" });
    println!("Symbols:    {} run, {} without data", report.symbols.len(), report.failures.len());
    println!("Trades:     {}", report.trade_count());
    println!("Passing:    {}", report.passing());
    for failure in &report.failures {
        println!("  no data: {} ({})", failure.symbol, failure.error);
    }
    if report.cancelled {
        println!("WARNING: run cancelled before every symbol finished");
    }
    if report.has_synthetic() {
        println!();
        println!("WARNING: Results include SYNTHETIC data");
    }
    println!();
}

fn run_forecast(config: &RunConfig, json: bool) -> Result<()> {
    let market = config.market_descriptor()?;
    let symbols = config.resolve_symbols()?;

    let cache = ParquetCache::new(&config.data.dir);
    let provider = network_provider(config)?;
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);
    let csv = config.data.csv_dir.as_ref().map(CsvProvider::new);
    let loader = BarLoader {
        cache: &cache,
        provider: provider_ref,
        csv: csv.as_ref(),
        options: config.load_options(today()),
    };

    let mut runner = GroupRunner::new(market, config.backtest_options());
    if let Some(jobs) = config.jobs {
        runner = runner.with_jobs(jobs);
    }
    let forecasts = runner.forecast(&symbols, |s| loader.load(s))?;

    if json {
        for f in &forecasts {
            if let ForecastStatus::Ready { forecast, .. } = &f.status {
                println!("{}", serde_json::to_string(forecast)?);
            }
        }
    } else {
        print_forecasts(&forecasts);
    }
    Ok(())
}

fn print_forecasts(forecasts: &[SymbolForecast]) {
    println!(
        "{:<12} {:<6} {:<10} {:>7} {:>6} {:>6} {:>8}  Status",
        "Symbol", "Dir", "Pattern", "Prob%", "Count", "RRR", "Exp%"
    );
    println!("{}", "-".repeat(72));
    for f in forecasts {
        match &f.status {
            ForecastStatus::Ready {
                forecast,
                rejection,
            } => {
                let status = match rejection {
                    None => "TRADE".to_string(),
                    Some(r) => format!("skip ({})", r.label()),
                };
                println!(
                    "{:<12} {:<6} {:<10} {:>7.1} {:>6} {:>6.2} {:>8.3}  {status}",
                    f.symbol,
                    forecast.direction.forecast_label(),
                    forecast.pattern.as_str(),
                    forecast.probability,
                    forecast.count,
                    forecast.rrr,
                    forecast.expectancy,
                );
            }
            ForecastStatus::NoForecast(reason) => {
                println!("{:<12} {:<6} {:<10} {:>48}", f.symbol, "-", "-", reason.to_string());
            }
            ForecastStatus::NoData(e) => println!("{:<12} no data: {e}", f.symbol),
        }
    }
}

fn run_summarize(log: &Path, group: Option<&str>, output: Option<&Path>) -> Result<()> {
    let trade_log =
        read_trade_log(log).with_context(|| format!("Failed to read trade log {}", log.display()))?;

    let market_key: MarketKey = match group {
        Some(g) => g.parse()?,
        None => match trade_log.rows.first() {
            Some(row) => row.group.parse()?,
            None => bail!("trade log {} has no rows; pass --group", log.display()),
        },
    };
    let market = MarketDescriptor::preset(market_key);
    let rows: Vec<_> = trade_log
        .rows
        .into_iter()
        .filter(|r| r.group.parse::<MarketKey>().is_ok_and(|k| k == market_key))
        .collect();

    let metrics = SymbolMetrics::from_log_rows(&rows, &market);
    println!(
        "{}: {} trades across {} symbols ({} malformed lines skipped)",
        market_key,
        rows.len(),
        metrics.len(),
        trade_log.skipped
    );
    println!("{}", render_table(&metrics));

    if let Some(path) = output {
        write_metrics_csv(path, &metrics)?;
        println!("Metrics:    {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("streaklab").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn run_flags_layer_over_preset() {
        let Commands::Run {
            group,
            config,
            data,
            overrides,
            ..
        } = parse(&[
            "run", "--group", "thai", "--symbols", "PTT.BK,AOT.BK", "--offline", "--sl-pct", "2.5",
            "--min-prob", "58",
        ])
        else {
            panic!("expected run");
        };
        let cfg = build_config(config, group, data, overrides).unwrap();
        assert_eq!(cfg.market, MarketKey::Thai);
        assert_eq!(cfg.symbols, Some(vec!["PTT.BK".to_string(), "AOT.BK".to_string()]));
        assert!(cfg.data.offline);
        assert_eq!(cfg.overrides.sl_pct, Some(2.5));
        assert_eq!(cfg.overrides.min_prob, Some(58.0));
        assert_eq!(cfg.overrides.tp_pct, None);
    }

    #[test]
    fn bars_and_full_conflict() {
        let args = ["streaklab", "run", "--group", "us", "--bars", "100", "--full"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn group_or_config_required() {
        let Commands::Forecast {
            group,
            config,
            data,
            overrides,
            ..
        } = parse(&["forecast"])
        else {
            panic!("expected forecast");
        };
        assert!(build_config(config, group, data, overrides).is_err());
    }
}
