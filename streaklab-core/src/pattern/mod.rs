//! Streak enumeration, conditional-return statistics and best-fit selection.

pub mod best_fit;
pub mod index;
pub mod stats;

pub use best_fit::{select_best_fit, BestFit, BestFitParams, Selection};
pub use index::{ConditionalReturnIndex, IndexParams, RegimeFilter};
pub use stats::PatternStats;
