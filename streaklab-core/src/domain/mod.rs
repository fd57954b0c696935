//! Domain types for StreakLab

pub mod bar;
pub mod ids;
pub mod pattern;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use ids::{DatasetHash, RunId};
pub use pattern::{Pattern, PatternError};
pub use signal::{render_signals, Direction, Regime, Signal};
pub use trade::{ExitReason, Trade};
