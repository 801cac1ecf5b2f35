use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use screener_core::{FloorVariant, MaWindow, ScreenerError};
use screening_pipeline::{next_monthly_expiration, DelayRange, ScreenerConfig};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// Scraped Barchart technical-analysis page
    Barchart,
    /// Figures computed from Yahoo daily closes
    Yahoo,
}

#[derive(Parser, Debug)]
#[command(name = "put-screener")]
#[command(about = "Screen put-selling candidates against volatility-adjusted floors", long_about = None)]
pub struct Args {
    /// Screener export CSV, or a directory of exports (newest is used)
    #[arg(short, long, env = "SCREENER_INPUT", default_value = ".")]
    pub input: PathBuf,

    /// Result table destination
    #[arg(short, long, env = "SCREENER_OUTPUT", default_value = "stocks_data.csv")]
    pub output: PathBuf,

    /// Minimum market cap, inclusive
    #[arg(long, env = "SCREENER_MARKET_CAP", default_value_t = 2e9)]
    pub market_cap: f64,

    /// Last sale must be strictly below this
    #[arg(long, env = "SCREENER_LAST_SALE", default_value_t = 150.0)]
    pub last_sale: f64,

    #[arg(long, env = "SCREENER_PROFIT_TARGET", default_value_t = 0.01)]
    pub profit_target: f64,

    /// Keep only puts with delta >= this value, e.g. -0.15
    #[arg(long, env = "SCREENER_DELTA_FLOOR", allow_hyphen_values = true)]
    pub delta_floor: Option<f64>,

    /// Maximum ask/bid ratio, exclusive
    #[arg(long, env = "SCREENER_SPREAD_CEILING", default_value_t = 1.5)]
    pub spread_ceiling: f64,

    /// Floor variants as WINDOW:SIGMA pairs, e.g. 20:1,20:2,50:2
    #[arg(long, env = "SCREENER_FLOORS", default_value = "20:2")]
    pub floors: String,

    /// Require price above these moving averages
    #[arg(long, env = "SCREENER_TREND", value_delimiter = ',', default_value = "50,100,200")]
    pub trend: Vec<u32>,

    /// Skip the moving-average trend condition
    #[arg(long, env = "SCREENER_NO_TREND", conflicts_with = "trend")]
    pub no_trend: bool,

    /// Options expiration (YYYY-MM-DD); defaults to the next monthly expiration
    #[arg(long, env = "SCREENER_EXPIRATION")]
    pub expiration: Option<NaiveDate>,

    /// Minimum pause between requests, seconds
    #[arg(long, env = "SCREENER_DELAY_MIN", default_value_t = 1.0)]
    pub delay_min: f64,

    /// Maximum pause between requests, seconds
    #[arg(long, env = "SCREENER_DELAY_MAX", default_value_t = 2.5)]
    pub delay_max: f64,

    /// Per-request timeout, seconds
    #[arg(long, env = "SCREENER_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,

    /// Symbols enriched in parallel; the request throttle stays global
    #[arg(long, env = "SCREENER_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Technicals source; options always come from Barchart
    #[arg(long, env = "SCREENER_SOURCE", value_enum, default_value_t = Source::Barchart)]
    pub source: Source,

    /// Result rows to log after the run
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

impl Args {
    pub fn to_config(&self, today: NaiveDate) -> Result<ScreenerConfig, ScreenerError> {
        let trend: &[u32] = if self.no_trend { &[] } else { &self.trend };
        let trend_windows = trend
            .iter()
            .map(|days| {
                MaWindow::from_days(*days)
                    .ok_or_else(|| ScreenerError::InvalidConfig(format!("unsupported trend window {days}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let config = ScreenerConfig {
            market_cap_threshold: self.market_cap,
            last_sale_threshold: self.last_sale,
            floor_variants: FloorVariant::parse_list(&self.floors)?,
            trend_windows,
            expiration_date: self.expiration.unwrap_or_else(|| next_monthly_expiration(today)),
            delay: DelayRange::new(self.delay_min, self.delay_max),
            request_timeout_secs: self.timeout,
            concurrency: self.concurrency,
            profit_target: self.profit_target,
            delta_floor: self.delta_floor,
            spread_ceiling: self.spread_ceiling,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["put-screener"]).unwrap();
        let config = args.to_config(today()).unwrap();

        assert_eq!(config.market_cap_threshold, 2e9);
        assert_eq!(config.last_sale_threshold, 150.0);
        assert_eq!(config.floor_variants, vec![FloorVariant::new(MaWindow::Day20, 2.0)]);
        assert_eq!(
            config.trend_windows,
            vec![MaWindow::Day50, MaWindow::Day100, MaWindow::Day200]
        );
        assert_eq!(config.expiration_date, NaiveDate::from_ymd_opt(2025, 7, 18).unwrap());
        assert_eq!(config.delta_floor, None);
        assert_eq!(args.source, Source::Barchart);
    }

    #[test]
    fn test_full_flag_set() {
        let args = Args::try_parse_from([
            "put-screener",
            "--input",
            "exports",
            "--floors",
            "20:1,20:2,50:2",
            "--trend",
            "50,100,200",
            "--delta-floor",
            "-0.15",
            "--expiration",
            "2025-08-15",
            "--source",
            "yahoo",
            "--concurrency",
            "2",
        ])
        .unwrap();
        let config = args.to_config(today()).unwrap();

        assert_eq!(args.input, PathBuf::from("exports"));
        assert_eq!(config.floor_variants.len(), 3);
        assert_eq!(
            config.trend_windows,
            vec![MaWindow::Day50, MaWindow::Day100, MaWindow::Day200]
        );
        assert_eq!(config.delta_floor, Some(-0.15));
        assert_eq!(config.expiration_date, NaiveDate::from_ymd_opt(2025, 8, 15).unwrap());
        assert_eq!(config.concurrency, 2);
        assert_eq!(args.source, Source::Yahoo);
    }

    #[test]
    fn test_trend_can_be_disabled() {
        let args = Args::try_parse_from(["put-screener", "--no-trend"]).unwrap();
        let config = args.to_config(today()).unwrap();
        assert!(config.trend_windows.is_empty());

        let args = Args::try_parse_from(["put-screener", "--trend", "200"]).unwrap();
        assert_eq!(args.to_config(today()).unwrap().trend_windows, vec![MaWindow::Day200]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let args = Args::try_parse_from(["put-screener", "--trend", "30"]).unwrap();
        assert!(matches!(args.to_config(today()), Err(ScreenerError::InvalidConfig(_))));

        let args = Args::try_parse_from(["put-screener", "--floors", "20-2"]).unwrap();
        assert!(args.to_config(today()).is_err());

        let args = Args::try_parse_from(["put-screener", "--delay-min", "3"]).unwrap();
        assert!(args.to_config(today()).is_err());

        assert!(Args::try_parse_from(["put-screener", "--expiration", "next friday"]).is_err());
    }
}
