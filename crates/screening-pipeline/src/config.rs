use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use rand::Rng;
use screener_core::{FloorVariant, MaWindow, ScreenerError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_DELAY_SECS: f64 = 300.0;

/// Uniform range for the pause between upstream requests, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    pub fn none() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn sample(&self) -> Duration {
        if self.max_secs <= self.min_secs {
            return Duration::try_from_secs_f64(self.min_secs.max(0.0)).unwrap_or(Duration::ZERO);
        }
        let secs = rand::thread_rng().gen_range(self.min_secs..=self.max_secs);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }

    fn validate(&self) -> Result<(), ScreenerError> {
        let ok = self.min_secs.is_finite()
            && self.max_secs.is_finite()
            && self.min_secs >= 0.0
            && self.min_secs <= self.max_secs
            && self.max_secs <= MAX_DELAY_SECS;
        if ok {
            Ok(())
        } else {
            Err(ScreenerError::InvalidConfig(format!(
                "delay range {}..{} must be non-negative, ordered and at most {}s",
                self.min_secs, self.max_secs, MAX_DELAY_SECS
            )))
        }
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::new(1.0, 2.5)
    }
}

/// Run parameters. Built once and passed into the pipeline; never mutated during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    // Universe
    pub market_cap_threshold: f64,         // 2e9, inclusive
    pub last_sale_threshold: f64,          // 150, exclusive

    // Enrichment
    pub floor_variants: Vec<FloorVariant>, // MA20 at 2 sigma
    pub trend_windows: Vec<MaWindow>,      // MA50/100/200; empty disables
    pub expiration_date: NaiveDate,
    pub delay: DelayRange,
    pub request_timeout_secs: u64,
    pub concurrency: usize,

    // Screening
    pub profit_target: f64,                // 0.01
    pub delta_floor: Option<f64>,          // e.g. -0.15
    pub spread_ceiling: f64,               // 1.5
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            market_cap_threshold: 2e9,
            last_sale_threshold: 150.0,
            floor_variants: vec![FloorVariant::new(MaWindow::Day20, 2.0)],
            trend_windows: vec![MaWindow::Day50, MaWindow::Day100, MaWindow::Day200],
            expiration_date: next_monthly_expiration(Local::now().date_naive()),
            delay: DelayRange::default(),
            request_timeout_secs: 10,
            concurrency: 1,
            profit_target: 0.01,
            delta_floor: None,
            spread_ceiling: 1.5,
        }
    }
}

impl ScreenerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ScreenerError> {
        let invalid = |msg: &str| Err(ScreenerError::InvalidConfig(msg.to_string()));

        if !self.market_cap_threshold.is_finite() || self.market_cap_threshold < 0.0 {
            return invalid("market cap threshold must be a non-negative number");
        }
        if !self.last_sale_threshold.is_finite() || self.last_sale_threshold <= 0.0 {
            return invalid("last sale threshold must be positive");
        }
        if self.floor_variants.is_empty() {
            return invalid("at least one floor variant is required");
        }
        if !self.profit_target.is_finite() || self.profit_target < 0.0 {
            return invalid("profit target must be a non-negative number");
        }
        if matches!(self.delta_floor, Some(d) if !d.is_finite()) {
            return invalid("delta floor must be a finite number");
        }
        if !self.spread_ceiling.is_finite() || self.spread_ceiling <= 0.0 {
            return invalid("spread ceiling must be positive");
        }
        if self.request_timeout_secs == 0 {
            return invalid("request timeout must be at least one second");
        }
        if self.concurrency == 0 {
            return invalid("concurrency must be at least 1");
        }
        self.delay.validate()
    }
}

/// Third Friday of the given month, the standard monthly options expiration.
pub fn third_friday(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let to_friday = (Weekday::Fri.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
    first.checked_add_days(Days::new(u64::from(to_friday) + 14))
}

/// The nearest monthly expiration on or after `today`.
pub fn next_monthly_expiration(today: NaiveDate) -> NaiveDate {
    if let Some(this_month) = third_friday(today.year(), today.month()) {
        if this_month >= today {
            return this_month;
        }
    }
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    third_friday(year, month).unwrap_or(today)
}
