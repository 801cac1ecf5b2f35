//! Quote source backed by the Yahoo Finance daily chart endpoint.
//!
//! Yahoo does not publish moving averages or historical volatility per
//! window, so both are computed locally from a year of daily closes.

use async_trait::async_trait;
use reqwest::StatusCode;
use screener_core::{QuoteSource, ScreenerError, TechnicalSnapshot, TickerSymbol};
use serde::Deserialize;
use std::time::Duration;

pub mod indicators;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Clone)]
pub struct YahooFinanceClient {
    client: reqwest::Client,
    chart_url: String,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl YahooFinanceClient {
    pub fn new(timeout: Duration) -> Self {
        Self::with_chart_url(CHART_URL, timeout)
    }

    pub fn with_chart_url(chart_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            chart_url: chart_url.trim_end_matches('/').to_string(),
        }
    }

    /// Daily closes for the past year, oldest first, plus the live price if reported.
    pub async fn get_daily_closes(&self, symbol: &TickerSymbol) -> Result<(Vec<f64>, Option<f64>), ScreenerError> {
        let url = format!("{}/{}", self.chart_url, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("range", "1y"), ("interval", "1d")])
            .send()
            .await
            .map_err(|e| ScreenerError::unavailable(symbol.as_str(), e))?;

        // Yahoo answers unknown symbols with 404 and a JSON error body; the
        // symbol is simply unavailable either way.
        let status = response.status();
        if !status.is_success() {
            let reason = if status == StatusCode::NOT_FOUND {
                "symbol not found".to_string()
            } else {
                format!("HTTP {}", status)
            };
            return Err(ScreenerError::unavailable(symbol.as_str(), reason));
        }

        let envelope: ChartEnvelope = response
            .json()
            .await
            .map_err(|e| ScreenerError::unavailable(symbol.as_str(), e))?;

        if let Some(error) = envelope.chart.error {
            return Err(ScreenerError::unavailable(
                symbol.as_str(),
                format!(
                    "{}: {}",
                    error.code.unwrap_or_default(),
                    error.description.unwrap_or_default()
                ),
            ));
        }

        let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok((Vec::new(), None));
        };

        let closes: Vec<f64> = result
            .indicators
            .and_then(|i| i.quote.into_iter().next())
            .map(|q| q.close.into_iter().flatten().filter(|c| c.is_finite()).collect())
            .unwrap_or_default();
        let live_price = result.meta.and_then(|m| m.regular_market_price);

        Ok((closes, live_price))
    }
}

#[async_trait]
impl QuoteSource for YahooFinanceClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_technicals(&self, symbol: &TickerSymbol) -> Result<TechnicalSnapshot, ScreenerError> {
        let (closes, live_price) = self.get_daily_closes(symbol).await?;
        let (moving_averages, historical_volatility) = indicators::window_figures(&closes);

        if closes.is_empty() {
            tracing::debug!("{}: chart returned no closes", symbol);
        }

        Ok(TechnicalSnapshot {
            symbol: symbol.clone(),
            current_price: live_price.or_else(|| closes.last().copied()),
            moving_averages,
            historical_volatility,
        })
    }
}
