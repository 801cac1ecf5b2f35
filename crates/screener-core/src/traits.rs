use async_trait::async_trait;
use chrono::NaiveDate;

use crate::options::{match_targets, sort_by_strike, StrikeMatch};
use crate::{OptionQuote, ScreenerError, TechnicalSnapshot, TickerSymbol};

/// Source of per-symbol technical figures.
///
/// Missing rows or fields leave the matching snapshot field empty. Only
/// transport failures (timeouts, bad status, unparseable payloads) are errors.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_technicals(&self, symbol: &TickerSymbol) -> Result<TechnicalSnapshot, ScreenerError>;
}

/// Source of put-side options chains.
#[async_trait]
pub trait OptionsChainSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// All puts for `symbol` expiring on `expiration`, ascending by strike.
    /// An empty put side is reported as [`ScreenerError::NoQuotesAvailable`].
    async fn fetch_put_quotes(
        &self,
        symbol: &TickerSymbol,
        expiration: NaiveDate,
    ) -> Result<Vec<OptionQuote>, ScreenerError>;

    /// Nearest-strike put for each distinct target, using a single chain fetch.
    async fn nearest_puts(
        &self,
        symbol: &TickerSymbol,
        expiration: NaiveDate,
        targets: &[f64],
    ) -> Result<Vec<StrikeMatch>, ScreenerError> {
        let mut quotes = self.fetch_put_quotes(symbol, expiration).await?;
        if quotes.is_empty() {
            return Err(ScreenerError::NoQuotesAvailable {
                symbol: symbol.to_string(),
                expiration,
            });
        }
        // Ties resolve to the lower strike only on an ascending chain.
        sort_by_strike(&mut quotes);
        Ok(match_targets(&quotes, targets))
    }
}
