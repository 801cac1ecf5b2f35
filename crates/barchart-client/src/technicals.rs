//! Parsing of the Barchart technical-analysis page.
//!
//! The page renders several `div.analysis-table-wrapper` blocks. The first
//! holds moving averages (period label, value), the third holds historical
//! volatility (period label, .., .., percentage). Rows that do not parse are
//! skipped so a partially rendered page still yields whatever it has.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use screener_core::{MaWindow, TechnicalSnapshot, TickerSymbol, WindowSeries};
use std::sync::LazyLock;

const MA_TABLE_INDEX: usize = 0;
const MA_VALUE_COLUMN: usize = 1;
const HV_TABLE_INDEX: usize = 2;
const HV_VALUE_COLUMN: usize = 3;

static WRAPPER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.analysis-table-wrapper").expect("static selector"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").expect("static selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("static selector"));
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("static selector"));
static LAST_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""lastPrice":"([\d.,]+)""#).expect("static regex"));

pub fn parse_technicals(symbol: TickerSymbol, html: &str) -> TechnicalSnapshot {
    let document = Html::parse_document(html);
    let wrappers: Vec<ElementRef> = document.select(&WRAPPER).collect();

    let mut snapshot = TechnicalSnapshot::empty(symbol);
    if let Some(wrapper) = wrappers.get(MA_TABLE_INDEX) {
        read_window_table(wrapper, MA_VALUE_COLUMN, &mut snapshot.moving_averages);
    }
    if let Some(wrapper) = wrappers.get(HV_TABLE_INDEX) {
        read_window_table(wrapper, HV_VALUE_COLUMN, &mut snapshot.historical_volatility);
    }
    snapshot.current_price = extract_last_price(html);

    if snapshot.moving_averages.is_empty() {
        tracing::debug!("{}: no moving averages found on technicals page", snapshot.symbol);
    }

    snapshot
}

/// Read the first `table` inside `wrapper` into `series`, taking the period
/// label from the first cell and the value from `value_column`.
fn read_window_table(wrapper: &ElementRef, value_column: usize, series: &mut WindowSeries) {
    let Some(table) = wrapper.select(&TABLE).next() else {
        return;
    };

    for row in table.select(&ROW) {
        let cells: Vec<String> = row.select(&CELL).map(cell_text).collect();
        if cells.len() < 2 {
            continue;
        }
        let Some(window) = MaWindow::from_period_label(&cells[0]) else {
            continue;
        };
        let Some(value) = cells.get(value_column).and_then(|c| parse_number(c)) else {
            continue;
        };
        series.set(window, value);
    }
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Parse a displayed number, tolerating thousands separators and a trailing `%`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '%' | '$' | '+'))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Last traded price from the JSON blob embedded in the page.
pub fn extract_last_price(html: &str) -> Option<f64> {
    LAST_PRICE
        .captures(html)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_number(m.as_str()))
}
