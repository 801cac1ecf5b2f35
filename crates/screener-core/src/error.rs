use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreenerError {
    #[error("Source unavailable for {symbol}: {reason}")]
    SourceUnavailable { symbol: String, reason: String },

    #[error("No put quotes available for {symbol} expiring {expiration}")]
    NoQuotesAvailable { symbol: String, expiration: NaiveDate },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("No symbols left to process")]
    NoSymbols,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScreenerError {
    pub fn unavailable(symbol: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            symbol: symbol.into(),
            reason: reason.to_string(),
        }
    }

    /// Per-symbol failures that skip the symbol instead of aborting the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::NoQuotesAvailable { .. }
        )
    }
}
