use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::ScreenerError;

/// Normalized exchange symbol (`BRK/B` becomes `BRK-B`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickerSymbol(String);

impl TickerSymbol {
    /// Normalize a raw screener symbol. Blank symbols and non-equity
    /// instruments (anything containing `^`) yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || Self::is_non_equity(trimmed) {
            return None;
        }
        Some(Self(trimmed.replace('/', "-")))
    }

    pub fn is_non_equity(raw: &str) -> bool {
        raw.contains('^')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TickerSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trailing window lengths reported by the technicals sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaWindow {
    Day20,
    Day50,
    Day100,
    Day200,
}

impl MaWindow {
    pub const ALL: [MaWindow; 4] = [
        MaWindow::Day20,
        MaWindow::Day50,
        MaWindow::Day100,
        MaWindow::Day200,
    ];

    pub fn days(self) -> u32 {
        match self {
            MaWindow::Day20 => 20,
            MaWindow::Day50 => 50,
            MaWindow::Day100 => 100,
            MaWindow::Day200 => 200,
        }
    }

    pub fn from_days(days: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.days() == days)
    }

    /// Period label as printed by the technicals page, e.g. `20-Day`.
    pub fn label(self) -> &'static str {
        match self {
            MaWindow::Day20 => "20-Day",
            MaWindow::Day50 => "50-Day",
            MaWindow::Day100 => "100-Day",
            MaWindow::Day200 => "200-Day",
        }
    }

    /// Match a free-form period cell such as `"20-Day Average"` by substring.
    pub fn from_period_label(label: &str) -> Option<Self> {
        // Longest labels first so `200-Day` never resolves as a shorter window.
        [
            MaWindow::Day200,
            MaWindow::Day100,
            MaWindow::Day50,
            MaWindow::Day20,
        ]
        .into_iter()
        .find(|w| label.contains(w.label()))
    }
}

impl fmt::Display for MaWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.days())
    }
}

/// One optional value per window. `None` means the source did not report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSeries {
    pub day_20: Option<f64>,
    pub day_50: Option<f64>,
    pub day_100: Option<f64>,
    pub day_200: Option<f64>,
}

impl WindowSeries {
    pub fn get(&self, window: MaWindow) -> Option<f64> {
        match window {
            MaWindow::Day20 => self.day_20,
            MaWindow::Day50 => self.day_50,
            MaWindow::Day100 => self.day_100,
            MaWindow::Day200 => self.day_200,
        }
    }

    pub fn set(&mut self, window: MaWindow, value: f64) {
        let slot = match window {
            MaWindow::Day20 => &mut self.day_20,
            MaWindow::Day50 => &mut self.day_50,
            MaWindow::Day100 => &mut self.day_100,
            MaWindow::Day200 => &mut self.day_200,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        MaWindow::ALL.iter().all(|w| self.get(*w).is_none())
    }
}

/// Point-in-time technical figures for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub symbol: TickerSymbol,
    pub current_price: Option<f64>,
    pub moving_averages: WindowSeries,
    /// Annualized historical volatility, in percent.
    pub historical_volatility: WindowSeries,
}

impl TechnicalSnapshot {
    pub fn empty(symbol: TickerSymbol) -> Self {
        Self {
            symbol,
            current_price: None,
            moving_averages: WindowSeries::default(),
            historical_volatility: WindowSeries::default(),
        }
    }

    /// True when the current price is strictly above the moving average of
    /// every listed window. An absent price or average fails the check.
    pub fn is_above_averages(&self, windows: &[MaWindow]) -> bool {
        let Some(price) = self.current_price else {
            return false;
        };
        windows
            .iter()
            .all(|w| matches!(self.moving_averages.get(*w), Some(ma) if price > ma))
    }
}

/// A (window, sigma multiple) pair configured for floor estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorVariant {
    pub window: MaWindow,
    pub sigma: f64,
}

impl FloorVariant {
    pub fn new(window: MaWindow, sigma: f64) -> Self {
        Self { window, sigma }
    }

    /// Identifier used in the report, e.g. `MA20-2SD`.
    pub fn tag(&self) -> String {
        self.to_string()
    }

    /// Parse a comma separated list like `20:1,20:2,50:2`.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, ScreenerError> {
        let mut variants: Vec<Self> = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let variant: Self = part.parse()?;
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
        Ok(variants)
    }
}

impl fmt::Display for FloorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MA{}-{}SD", self.window.days(), self.sigma)
    }
}

impl FromStr for FloorVariant {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScreenerError::InvalidConfig(format!("invalid floor variant '{s}', expected WINDOW:SIGMA"));
        let (window, sigma) = s.split_once(':').ok_or_else(invalid)?;
        let window = window
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(MaWindow::from_days)
            .ok_or_else(invalid)?;
        let sigma: f64 = sigma.trim().parse().map_err(|_| invalid())?;
        if !sigma.is_finite() {
            return Err(invalid());
        }
        Ok(Self { window, sigma })
    }
}

impl Eq for FloorVariant {}

impl PartialOrd for FloorVariant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloorVariant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.window
            .cmp(&other.window)
            .then_with(|| self.sigma.total_cmp(&other.sigma))
    }
}

/// Volatility-adjusted downside price for one (window, sigma) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorEstimate {
    pub symbol: TickerSymbol,
    pub variant: FloorVariant,
    pub moving_average: f64,
    pub historical_volatility: f64,
    pub floor_price: f64,
}

/// Put option quote as returned by the options source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub base_symbol: String,
    pub strike_price: f64,
    pub expiration_date: NaiveDate,
    pub bid_price: Option<f64>,
    pub ask_price: Option<f64>,
    pub delta: Option<f64>,
    /// Implied volatility, in percent.
    pub implied_volatility: Option<f64>,
}

impl OptionQuote {
    /// Mid price over strike. `None` when bid or ask is missing or the strike is not positive.
    pub fn profitability(&self) -> Option<f64> {
        let (bid, ask) = (self.bid_price?, self.ask_price?);
        if self.strike_price <= 0.0 {
            return None;
        }
        Some(((bid + ask) / 2.0) / self.strike_price)
    }
}

/// One floor joined with the put whose strike is nearest to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub technicals: TechnicalSnapshot,
    pub floor: FloorEstimate,
    pub quote: OptionQuote,
}

/// Reference data for one candidate, taken from the screener export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: TickerSymbol,
    pub name: Option<String>,
    pub country: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: f64,
    pub last_sale: f64,
}

/// Left join of the enrichment output onto the candidate list. Candidates
/// without enrichment carry `None` in every enrichment column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRow {
    pub candidate: Candidate,
    pub technicals: Option<TechnicalSnapshot>,
    pub floor: Option<FloorEstimate>,
    pub quote: Option<OptionQuote>,
}

impl CandidateRow {
    pub fn unenriched(candidate: Candidate, technicals: Option<TechnicalSnapshot>) -> Self {
        Self {
            candidate,
            technicals,
            floor: None,
            quote: None,
        }
    }

    pub fn bid_price(&self) -> Option<f64> {
        self.quote.as_ref().and_then(|q| q.bid_price)
    }
}

/// A row that survived the screening filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub candidate: Candidate,
    pub technicals: Option<TechnicalSnapshot>,
    pub floor: FloorEstimate,
    pub quote: OptionQuote,
    pub profitability: f64,
}

impl ScreeningResult {
    pub fn current_price(&self) -> Option<f64> {
        self.technicals.as_ref().and_then(|t| t.current_price)
    }
}

impl From<ScreeningResult> for CandidateRow {
    fn from(result: ScreeningResult) -> Self {
        Self {
            candidate: result.candidate,
            technicals: result.technicals,
            floor: Some(result.floor),
            quote: Some(result.quote),
        }
    }
}
