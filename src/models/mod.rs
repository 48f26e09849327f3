pub mod candle;
pub mod direction;
pub mod instrument;
pub mod timeframe;

pub use candle::{Candle, CandleSeries};
pub use direction::*;
pub use instrument::{pip_size, Pips};
pub use timeframe::Timeframe;
