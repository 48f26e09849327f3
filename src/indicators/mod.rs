pub mod candlestick;
pub mod fibonacci;
pub mod levels;
pub mod momentum;
pub mod structure;
pub mod trend;

pub use candlestick::{candlestick_pattern, CandlePattern};
pub use fibonacci::{fibonacci_levels, nearest_fib_level, FibLevel};
pub use levels::{nearest_level, pivot_levels, LevelKind, PivotLevels};
pub use momentum::{ema, latest_ema, latest_rsi, macd, rsi, Macd};
pub use structure::{summarize_structure, StructureSummary, StructureToggles};
pub use trend::{fit_trendlines, trend_direction, TrendlineFit};
