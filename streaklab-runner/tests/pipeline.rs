//! End-to-end group run: CSV bars → backtest → trade log → metrics rebuilt
//! from the log.

use std::fmt::Write as _;
use std::path::Path;

use chrono::NaiveDate;
use streaklab_core::data::{CsvProvider, DataSource, ParquetCache};
use streaklab_runner::{
    log_path, read_trade_log, write_metrics_csv, BarLoader, GroupRunner, RunConfig,
    SymbolMetrics, TradeLogWriter,
};

/// Alternating ±2% daily bodies, written as `{dir}/{symbol}.csv`.
fn write_alternating_csv(dir: &Path, symbol: &str, n: usize, phase: usize) {
    let base = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let mut csv = String::from("date,open,high,low,close,volume\n");
    for i in 0..n {
        let close = if (i + phase) % 2 == 0 { 102.0 } else { 98.0 };
        let date = base + chrono::Duration::days(i as i64);
        let _ = writeln!(csv, "{date},100.0,102.5,97.5,{close},{}", 1_000 + i);
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), csv).unwrap();
}

fn config_toml(root: &Path, fast: bool) -> String {
    format!(
        r#"
market = "china"
symbols = ["600519.SS", "000858.SZ", "601318.SS"]
fast = {fast}
output_dir = "{out}"

[data]
dir = "{cache}"
csv_dir = "{csv}"
start = "2018-01-01"
end = "2021-01-01"
offline = true
"#,
        out = root.join("out").display(),
        cache = root.join("cache").display(),
        csv = root.join("csv").display(),
    )
}

#[test]
fn group_run_logs_trades_and_rebuilds_metrics() {
    let root = tempfile::tempdir().unwrap();
    let csv_dir = root.path().join("csv");
    std::fs::create_dir_all(&csv_dir).unwrap();
    write_alternating_csv(&csv_dir, "600519.SS", 400, 0);
    write_alternating_csv(&csv_dir, "000858.SZ", 400, 1);
    // 601318.SS has no data anywhere.

    let config = RunConfig::from_toml(&config_toml(root.path(), false)).unwrap();
    let market = config.market_descriptor().unwrap();
    let symbols = config.resolve_symbols().unwrap();
    let today = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();

    let cache = ParquetCache::new(&config.data.dir);
    let csv = CsvProvider::new(config.data.csv_dir.clone().unwrap());
    let loader = BarLoader {
        cache: &cache,
        provider: None,
        csv: Some(&csv),
        options: config.load_options(today),
    };

    let log_file = log_path(&config.output_dir, config.market);
    let writer = TradeLogWriter::open(&log_file).unwrap();
    let report = GroupRunner::new(market.clone(), config.backtest_options())
        .with_trade_log(&writer)
        .with_jobs(2)
        .run(&symbols, |s| loader.load(s))
        .unwrap();
    drop(writer);

    assert_eq!(report.symbols.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].symbol, "601318.SS");
    assert!(report.symbols.iter().all(|s| s.source == DataSource::CsvImport));
    assert!(report.trade_count() > 0);

    // The log holds exactly the run's trades and reproduces its metrics.
    let log = read_trade_log(&log_file).unwrap();
    assert_eq!(log.skipped, 0);
    assert_eq!(log.rows.len(), report.trade_count());
    assert!(log.rows.iter().all(|r| r.group == "china" && r.exchange == "SSE/SZSE"));
    assert_eq!(SymbolMetrics::from_log_rows(&log.rows, &market), report.metrics());

    let metrics_file = config.output_dir.join("metrics_china.csv");
    write_metrics_csv(&metrics_file, &report.metrics()).unwrap();
    let table = std::fs::read_to_string(&metrics_file).unwrap();
    assert_eq!(table.lines().count(), 3);
    assert!(table.lines().skip(1).all(|l| l.contains(",CN,")));
}

#[test]
fn fast_mode_takes_fewer_trades() {
    let root = tempfile::tempdir().unwrap();
    let csv_dir = root.path().join("csv");
    std::fs::create_dir_all(&csv_dir).unwrap();
    write_alternating_csv(&csv_dir, "600519.SS", 420, 0);

    let today = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
    let run = |fast: bool| {
        let mut config = RunConfig::from_toml(&config_toml(root.path(), fast)).unwrap();
        config.symbols = Some(vec!["600519.SS".into()]);
        let cache = ParquetCache::new(&config.data.dir);
        let csv = CsvProvider::new(config.data.csv_dir.clone().unwrap());
        let loader = BarLoader {
            cache: &cache,
            provider: None,
            csv: Some(&csv),
            options: config.load_options(today),
        };
        GroupRunner::new(config.market_descriptor().unwrap(), config.backtest_options())
            .with_jobs(1)
            .run(&config.resolve_symbols().unwrap(), |s| loader.load(s))
            .unwrap()
    };

    let every_bar = run(false);
    let fast = run(true);
    assert!(fast.trade_count() > 0);
    assert!(fast.trade_count() < every_bar.trade_count());

    let trades = &fast.symbols[0].outcome.trades;
    for pair in trades.windows(2) {
        assert!(pair[1].entry_index > pair[0].exit_index);
    }
}
