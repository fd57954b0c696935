use serde::{Deserialize, Serialize};
use std::fmt;

use super::bar::Bar;

/// Content hash of a bar series (BLAKE3 over timestamps and OHLCV).
///
/// Two loads of the same data produce the same hash regardless of source,
/// so run reports can tell whether a rerun saw identical history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn of_bars(bars: &[Bar]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for bar in bars {
            hasher.update(&bar.timestamp.and_utc().timestamp_millis().to_le_bytes());
            for v in [bar.open, bar.high, bar.low, bar.close] {
                hasher.update(&v.to_bits().to_le_bytes());
            }
            hasher.update(&bar.volume.to_le_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    /// First 12 hex chars, for logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic run id: BLAKE3 of the canonical JSON of the effective configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn from_config<T: Serialize>(config: &T) -> Result<Self, serde_json::Error> {
        // Round-trip through Value so map keys serialise sorted.
        let canonical = serde_json::to_value(config)?.to_string();
        Ok(Self(blake3::hash(canonical.as_bytes()).to_hex().to_string()))
    }

    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
