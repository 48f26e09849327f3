pub mod aggregator;
pub mod chart;
pub mod filters;
pub mod sentiment;
pub mod signals;

pub use aggregator::{aggregate, strength_score};
pub use filters::{
    evaluate_filters, FilterEvaluation, FilterName, FilterResult, FilterResults, FilterStatus,
    TradeLevels,
};
pub use signals::{format_alert, Signal};
