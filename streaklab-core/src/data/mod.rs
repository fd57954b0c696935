//! Data collaborators: providers, validation, the Parquet cache and the universe.

pub mod cache;
pub mod circuit_breaker;
pub mod csv_import;
pub mod download;
pub mod ingest;
pub mod provider;
pub mod universe;
pub mod yahoo;

pub use cache::{CacheMeta, CoverageResult, ParquetCache};
pub use circuit_breaker::CircuitBreaker;
pub use csv_import::{read_csv, CsvProvider};
pub use download::{download_single, download_symbols, DownloadRequest, DownloadSummary};
pub use ingest::{validate, IngestReport};
pub use provider::{DataError, DataProvider, DataSource, DownloadProgress, FetchResult, StdoutProgress};
pub use universe::Universe;
pub use yahoo::YahooProvider;
