//! Screening filter applied to the left-joined enrichment output.
//!
//! Stages run in a fixed order and each only narrows the set:
//! missing bid, profitability, profit target, optional delta floor,
//! zero bid, then the ask/bid spread ceiling.

use screener_core::{CandidateRow, ScreeningResult};
use tracing::info;

use crate::config::ScreenerConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterThresholds {
    pub profit_target: f64,
    pub delta_floor: Option<f64>,
    pub spread_ceiling: f64,
}

impl From<&ScreenerConfig> for FilterThresholds {
    fn from(config: &ScreenerConfig) -> Self {
        Self {
            profit_target: config.profit_target,
            delta_floor: config.delta_floor,
            spread_ceiling: config.spread_ceiling,
        }
    }
}

/// Rows remaining after each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub input: usize,
    pub with_bid: usize,
    pub with_profitability: usize,
    pub above_profit_target: usize,
    pub above_delta_floor: usize,
    pub nonzero_bid: usize,
    pub within_spread: usize,
}

struct Staged {
    row: CandidateRow,
    bid: f64,
    profitability: f64,
}

pub fn screen(rows: Vec<CandidateRow>, thresholds: &FilterThresholds) -> (Vec<ScreeningResult>, FilterReport) {
    let mut report = FilterReport {
        input: rows.len(),
        ..FilterReport::default()
    };

    // 1. Missing bid
    let with_bid: Vec<(CandidateRow, f64)> = rows
        .into_iter()
        .filter_map(|row| row.bid_price().map(|bid| (row, bid)))
        .collect();
    report.with_bid = with_bid.len();

    // 2. Profitability
    let staged: Vec<Staged> = with_bid
        .into_iter()
        .filter_map(|(row, bid)| {
            let profitability = row.quote.as_ref()?.profitability()?;
            Some(Staged { row, bid, profitability })
        })
        .collect();
    report.with_profitability = staged.len();

    // 3. Profit target
    let staged: Vec<Staged> = staged
        .into_iter()
        .filter(|s| s.profitability >= thresholds.profit_target)
        .collect();
    report.above_profit_target = staged.len();

    // 4. Delta floor; an unreported delta fails when the floor is set
    let staged: Vec<Staged> = match thresholds.delta_floor {
        Some(floor) => staged
            .into_iter()
            .filter(|s| matches!(s.row.quote.as_ref().and_then(|q| q.delta), Some(d) if d >= floor))
            .collect(),
        None => staged,
    };
    report.above_delta_floor = staged.len();

    // 5. Zero bid
    let staged: Vec<Staged> = staged.into_iter().filter(|s| s.bid != 0.0).collect();
    report.nonzero_bid = staged.len();

    // 6. Spread
    let results: Vec<ScreeningResult> = staged
        .into_iter()
        .filter(|s| {
            s.row
                .quote
                .as_ref()
                .and_then(|q| q.ask_price)
                .is_some_and(|ask| ask / s.bid < thresholds.spread_ceiling)
        })
        .filter_map(|s| {
            let Staged { row, profitability, .. } = s;
            Some(ScreeningResult {
                candidate: row.candidate,
                technicals: row.technicals,
                floor: row.floor?,
                quote: row.quote?,
                profitability,
            })
        })
        .collect();
    report.within_spread = results.len();

    info!(
        "Screening: {} rows -> {} with bid -> {} priced -> {} >= target {} -> {} delta -> {} nonzero bid -> {} spread < {}",
        report.input,
        report.with_bid,
        report.with_profitability,
        report.above_profit_target,
        thresholds.profit_target,
        report.above_delta_floor,
        report.nonzero_bid,
        report.within_spread,
        thresholds.spread_ceiling
    );

    (results, report)
}
