use thiserror::Error;

/// Everything below `Configuration` narrows to "no signal for this symbol
/// this cycle"; only a configuration error aborts a cycle.
#[derive(Error, Debug)]
pub enum SignalError {
    #[error("insufficient data: need {needed} bars, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("computation error: {0}")]
    Computation(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },
}

impl SignalError {
    /// Skippable errors leave the rest of the scan cycle untouched.
    pub fn is_skip(&self) -> bool {
        !matches!(self, SignalError::Configuration(_))
    }
}

pub type SignalResult<T> = std::result::Result<T, SignalError>;
