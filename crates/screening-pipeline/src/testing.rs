//! In-memory adapters shared by the pipeline tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use screener_core::{
    Candidate, MaWindow, OptionQuote, OptionsChainSource, QuoteSource, ScreenerError, TechnicalSnapshot,
    TickerSymbol,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn expiration() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 18).unwrap()
}

pub fn candidate(symbol: &str) -> Candidate {
    Candidate {
        symbol: TickerSymbol::parse(symbol).unwrap(),
        name: Some(format!("{symbol} Corp")),
        country: Some("United States".to_string()),
        sector: None,
        industry: None,
        market_cap: 5e9,
        last_sale: 120.0,
    }
}

/// MA20 = 100, HV20 = 31.75%, price 120: a 2-sigma floor of 96.00.
/// Price sits above the 50, 100 and 200-day averages.
pub fn xyz_snapshot() -> TechnicalSnapshot {
    let mut snapshot = TechnicalSnapshot::empty(TickerSymbol::parse("XYZ").unwrap());
    snapshot.current_price = Some(120.0);
    snapshot.moving_averages.set(MaWindow::Day20, 100.0);
    snapshot.moving_averages.set(MaWindow::Day50, 110.0);
    snapshot.moving_averages.set(MaWindow::Day100, 105.0);
    snapshot.moving_averages.set(MaWindow::Day200, 100.0);
    snapshot.historical_volatility.set(MaWindow::Day20, 31.75);
    snapshot
}

pub fn put(strike: f64, bid: f64, ask: f64) -> OptionQuote {
    OptionQuote {
        base_symbol: String::new(),
        strike_price: strike,
        expiration_date: expiration(),
        bid_price: Some(bid),
        ask_price: Some(ask),
        delta: Some(-0.12),
        implied_volatility: Some(30.0),
    }
}

#[derive(Default)]
pub struct StaticQuotes {
    snapshots: HashMap<String, TechnicalSnapshot>,
    failing: HashSet<String>,
}

impl StaticQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, snapshot: TechnicalSnapshot) -> Self {
        self.snapshots.insert(snapshot.symbol.to_string(), snapshot);
        self
    }

    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }
}

#[async_trait]
impl QuoteSource for StaticQuotes {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_technicals(&self, symbol: &TickerSymbol) -> Result<TechnicalSnapshot, ScreenerError> {
        if self.failing.contains(symbol.as_str()) {
            return Err(ScreenerError::unavailable(symbol.as_str(), "HTTP 503 Service Unavailable"));
        }
        Ok(self
            .snapshots
            .get(symbol.as_str())
            .cloned()
            .unwrap_or_else(|| TechnicalSnapshot::empty(symbol.clone())))
    }
}

#[derive(Default)]
pub struct StaticChain {
    chains: HashMap<String, Vec<OptionQuote>>,
    calls: AtomicUsize,
}

impl StaticChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, quotes: Vec<OptionQuote>) -> Self {
        let quotes = quotes
            .into_iter()
            .map(|q| OptionQuote { base_symbol: symbol.to_string(), ..q })
            .collect();
        self.chains.insert(symbol.to_string(), quotes);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OptionsChainSource for StaticChain {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_put_quotes(
        &self,
        symbol: &TickerSymbol,
        _expiration: NaiveDate,
    ) -> Result<Vec<OptionQuote>, ScreenerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.chains.get(symbol.as_str()).cloned().unwrap_or_default())
    }
}
