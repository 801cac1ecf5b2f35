//! Candidate universe loading from a stock screener CSV export.
//!
//! Filters run in a fixed order: market cap floor, non-equity removal,
//! symbol normalization, then the last sale ceiling.

use csv::{ReaderBuilder, StringRecord, Trim};
use screener_core::{Candidate, ScreenerError, TickerSymbol};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

use crate::config::ScreenerConfig;

const SYMBOL: &str = "Symbol";
const MARKET_CAP: &str = "Market Cap";
const LAST_SALE: &str = "Last Sale";
const NAME: &str = "Name";
const COUNTRY: &str = "Country";
const SECTOR: &str = "Sector";
const INDUSTRY: &str = "Industry";

/// Row counts after each universe filter stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniverseReport {
    pub rows_read: usize,
    pub after_market_cap: usize,
    pub after_non_equity: usize,
    pub after_last_sale: usize,
}

struct Columns {
    symbol: usize,
    market_cap: usize,
    last_sale: usize,
    name: Option<usize>,
    country: Option<usize>,
    sector: Option<usize>,
    industry: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, ScreenerError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| ScreenerError::MalformedInput(format!("missing required column '{name}'")))
        };

        Ok(Self {
            symbol: require(SYMBOL)?,
            market_cap: require(MARKET_CAP)?,
            last_sale: require(LAST_SALE)?,
            name: find(NAME),
            country: find(COUNTRY),
            sector: find(SECTOR),
            industry: find(INDUSTRY),
        })
    }
}

/// A directory resolves to its most recently modified `.csv` file.
pub fn resolve_input_path(path: &Path) -> Result<PathBuf, ScreenerError> {
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let candidate = entry.path();
        let is_csv = candidate
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv || !candidate.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, candidate));
        }
    }

    newest.map(|(_, p)| p).ok_or_else(|| {
        ScreenerError::MalformedInput(format!("no .csv files found in {}", path.display()))
    })
}

/// Parse and filter a screener export. Returns the surviving candidates in
/// file order along with the per-stage counts.
pub fn read_candidates<R: Read>(
    reader: R,
    config: &ScreenerConfig,
) -> Result<(Vec<Candidate>, UniverseReport), ScreenerError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| ScreenerError::MalformedInput(e.to_string()))?
        .clone();
    let columns = Columns::locate(&headers)?;

    let mut report = UniverseReport::default();
    let mut candidates = Vec::new();

    for record in rdr.records() {
        let record = record.map_err(|e| ScreenerError::MalformedInput(e.to_string()))?;
        report.rows_read += 1;

        let market_cap = record.get(columns.market_cap).and_then(parse_amount);
        let Some(market_cap) = market_cap.filter(|m| *m >= config.market_cap_threshold) else {
            continue;
        };
        report.after_market_cap += 1;

        let raw_symbol = record.get(columns.symbol).unwrap_or_default();
        let Some(symbol) = TickerSymbol::parse(raw_symbol) else {
            continue;
        };
        report.after_non_equity += 1;

        let last_sale = record.get(columns.last_sale).and_then(parse_amount);
        let Some(last_sale) = last_sale.filter(|p| *p < config.last_sale_threshold) else {
            continue;
        };
        report.after_last_sale += 1;

        let text = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        candidates.push(Candidate {
            symbol,
            name: text(columns.name),
            country: text(columns.country),
            sector: text(columns.sector),
            industry: text(columns.industry),
            market_cap,
            last_sale,
        });
    }

    Ok((candidates, report))
}

/// Load the candidate universe from a file or directory. Fails with
/// `NoSymbols` when nothing survives the filters.
pub fn load_candidates(path: &Path, config: &ScreenerConfig) -> Result<Vec<Candidate>, ScreenerError> {
    let resolved = resolve_input_path(path)?;
    info!("Loading candidates from {}", resolved.display());

    let file = fs::File::open(&resolved)?;
    let (candidates, report) = read_candidates(file, config)?;

    info!(
        "Universe: {} rows, {} >= market cap {}, {} equities, {} < last sale {}",
        report.rows_read,
        report.after_market_cap,
        config.market_cap_threshold,
        report.after_non_equity,
        report.after_last_sale,
        config.last_sale_threshold
    );

    if candidates.is_empty() {
        return Err(ScreenerError::NoSymbols);
    }
    Ok(candidates)
}

/// Parse an exported amount such as `$1,234.50`. Blank cells yield `None`.
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
